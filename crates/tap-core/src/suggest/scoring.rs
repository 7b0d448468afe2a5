//! Traversal cost constants and input/key match classification.
//!
//! Two scales coexist: `cost` orders the best-first frontier (lower is
//! better, accumulated per edit), while the demotion rates from settings
//! multiply the final candidate score. Cost constants are normalized to a
//! unit key distance.

use super::proximity::ProximityInfo;
use super::InputPoint;
use crate::dict::{CodePoint, MAX_PROBABILITY};
use crate::unicode::to_lower;

pub(crate) const DISTANCE_WEIGHT_LENGTH: f32 = 0.132;
pub(crate) const PROXIMITY_COST: f32 = 0.086;
pub(crate) const OMISSION_COST: f32 = 0.388;
pub(crate) const INSERTION_COST: f32 = 0.670;
pub(crate) const TRANSPOSITION_COST: f32 = 0.494;
pub(crate) const SPACE_SUBSTITUTION_COST: f32 = 0.239;
pub(crate) const SUBSTITUTION_COST: f32 = 0.363;
pub(crate) const COST_NEW_WORD: f32 = 0.054;
pub(crate) const DISTANCE_WEIGHT_LANGUAGE: f32 = 1.123;

pub(crate) enum MatchKind {
    /// The candidate is the touched key itself.
    Exact(f32),
    /// The candidate is a proximity neighbor of the touched key.
    Near(f32),
    NoMatch,
}

pub(crate) fn classify(
    proximity: &ProximityInfo,
    point: &InputPoint,
    candidate: CodePoint,
) -> MatchKind {
    let typed = point.code_point;
    let distance = proximity.normalized_distance(typed, point.x, point.y, candidate);
    if to_lower(typed) == to_lower(candidate) {
        MatchKind::Exact(distance)
    } else if proximity.is_near(typed, candidate) {
        MatchKind::Near(distance)
    } else {
        MatchKind::NoMatch
    }
}

/// Language-model term added to a terminal's traversal cost. The formula is
/// intentionally kept as-is.
pub(crate) fn improbability(probability: i32) -> f32 {
    (MAX_PROBABILITY - probability) as f32 / MAX_PROBABILITY as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_exact_and_near() {
        let proximity = ProximityInfo::qwerty();
        let point = InputPoint::from_code_point('a' as i32);
        assert!(matches!(
            classify(&proximity, &point, 'a' as i32),
            MatchKind::Exact(_)
        ));
        assert!(matches!(
            classify(&proximity, &point, 'q' as i32),
            MatchKind::Near(_)
        ));
        assert!(matches!(
            classify(&proximity, &point, 'p' as i32),
            MatchKind::NoMatch
        ));
    }

    #[test]
    fn test_improbability_range() {
        assert_eq!(improbability(MAX_PROBABILITY), 0.0);
        assert_eq!(improbability(0), 1.0);
        assert!(improbability(100) > improbability(200));
    }
}
