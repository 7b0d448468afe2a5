//! Keyboard geometry: per-key neighbor sets and normalized touch distances.
//!
//! The decoder only asks two questions: which code points are close enough
//! to a key to count as a proximity match, and how far (normalized to key
//! size) a touch landed from a key's center.

use std::collections::HashMap;

use crate::dict::CodePoint;
use crate::unicode::to_lower;

/// Upper bound on proximity characters tracked per key.
pub const MAX_PROXIMITY_CHARS: usize = 16;

/// Neighbor radius as a multiple of the larger key dimension.
const PROXIMITY_SEARCH_RADIUS: f32 = 1.4;

#[derive(Debug, Clone, Copy)]
pub struct Key {
    pub code_point: CodePoint,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Key {
    fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    fn diagonal(&self) -> f32 {
        ((self.width * self.width + self.height * self.height) as f32).sqrt()
    }
}

pub struct ProximityInfo {
    keys: Vec<Key>,
    index_by_code: HashMap<CodePoint, usize>,
    /// Per key: the key's own code point first, then its neighbors.
    neighbors: Vec<Vec<CodePoint>>,
}

impl ProximityInfo {
    pub fn new(keys: Vec<Key>) -> Self {
        let index_by_code: HashMap<CodePoint, usize> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (to_lower(k.code_point), i))
            .collect();

        let neighbors = keys
            .iter()
            .map(|key| {
                let (cx, cy) = key.center();
                let radius = PROXIMITY_SEARCH_RADIUS * key.width.max(key.height) as f32;
                let mut near: Vec<(f32, CodePoint)> = keys
                    .iter()
                    .filter(|other| other.code_point != key.code_point)
                    .filter_map(|other| {
                        let (ox, oy) = other.center();
                        let d = ((cx - ox).powi(2) + (cy - oy).powi(2)).sqrt();
                        (d <= radius).then_some((d, to_lower(other.code_point)))
                    })
                    .collect();
                near.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                let mut list = vec![to_lower(key.code_point)];
                list.extend(near.into_iter().map(|(_, cp)| cp));
                list.truncate(MAX_PROXIMITY_CHARS);
                list
            })
            .collect();

        Self {
            keys,
            index_by_code,
            neighbors,
        }
    }

    /// A standard QWERTY layout with uniform key size, for tests and the
    /// command-line harness.
    pub fn qwerty() -> Self {
        const ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];
        const KEY_W: i32 = 40;
        const KEY_H: i32 = 60;
        let mut keys = Vec::new();
        for (row_idx, row) in ROWS.iter().enumerate() {
            // Stagger alternate rows like a physical keyboard.
            let x_offset = (row_idx as i32 * KEY_W) / 2;
            for (col, c) in row.chars().enumerate() {
                keys.push(Key {
                    code_point: c as CodePoint,
                    x: x_offset + col as i32 * KEY_W,
                    y: row_idx as i32 * KEY_H,
                    width: KEY_W,
                    height: KEY_H,
                });
            }
        }
        Self::new(keys)
    }

    fn key_for(&self, code_point: CodePoint) -> Option<&Key> {
        self.index_by_code
            .get(&to_lower(code_point))
            .map(|&i| &self.keys[i])
    }

    /// The key's own code point first, then its proximity neighbors.
    /// Unknown keys have no neighbors.
    pub fn neighbors_of(&self, code_point: CodePoint) -> &[CodePoint] {
        match self.index_by_code.get(&to_lower(code_point)) {
            Some(&i) => &self.neighbors[i],
            None => &[],
        }
    }

    /// Whether `candidate` is `typed` itself or one of its neighbors.
    pub fn is_near(&self, typed: CodePoint, candidate: CodePoint) -> bool {
        let candidate = to_lower(candidate);
        if to_lower(typed) == candidate {
            return true;
        }
        self.neighbors_of(typed).iter().any(|&cp| cp == candidate)
    }

    /// Distance from a touch (or, without geometry, the typed key's center)
    /// to `candidate`'s key, normalized by the key diagonal and clamped to
    /// [0, 1].
    pub fn normalized_distance(
        &self,
        typed: CodePoint,
        x: i32,
        y: i32,
        candidate: CodePoint,
    ) -> f32 {
        let Some(target) = self.key_for(candidate) else {
            return 1.0;
        };
        let (tx, ty) = if x >= 0 && y >= 0 {
            (x as f32, y as f32)
        } else {
            match self.key_for(typed) {
                Some(key) => key.center(),
                None => return 1.0,
            }
        };
        let (cx, cy) = target.center();
        let d = ((tx - cx).powi(2) + (ty - cy).powi(2)).sqrt();
        (d / target.diagonal()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qwerty_neighbors() {
        let proximity = ProximityInfo::qwerty();
        let near_a = proximity.neighbors_of('a' as i32);
        assert_eq!(near_a[0], 'a' as i32);
        assert!(near_a.contains(&('q' as i32)));
        assert!(near_a.contains(&('s' as i32)));
        assert!(!near_a.contains(&('p' as i32)));
        assert!(near_a.len() <= MAX_PROXIMITY_CHARS);
    }

    #[test]
    fn test_is_near_includes_self() {
        let proximity = ProximityInfo::qwerty();
        assert!(proximity.is_near('a' as i32, 'a' as i32));
        assert!(proximity.is_near('a' as i32, 'q' as i32));
        assert!(!proximity.is_near('a' as i32, 'p' as i32));
    }

    #[test]
    fn test_exact_touch_distance_is_zero() {
        let proximity = ProximityInfo::qwerty();
        // Without geometry the typed key's own center is used.
        let d = proximity.normalized_distance('a' as i32, -1, -1, 'a' as i32);
        assert!(d.abs() < f32::EPSILON);
        let far = proximity.normalized_distance('a' as i32, -1, -1, 'p' as i32);
        assert!(far > d);
    }
}
