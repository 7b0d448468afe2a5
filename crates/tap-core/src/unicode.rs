//! Code-point helpers.
//!
//! Words travel through the engine as `i32` code-point buffers (0-terminated
//! in fixed-stride output slots, negative = sentinel). These helpers convert
//! between that representation and Rust strings at the edges.

use crate::dict::{CodePoint, NOT_A_CODE_POINT};

/// The word separator emitted inside multi-word suggestions.
pub const CODE_POINT_SPACE: CodePoint = ' ' as CodePoint;

/// Convert a string to a code-point buffer.
pub fn code_points_from_str(s: &str) -> Vec<CodePoint> {
    s.chars().map(|c| c as CodePoint).collect()
}

/// Convert a code-point buffer back to a string, stopping at the first
/// terminator or invalid scalar.
pub fn string_from_code_points(code_points: &[CodePoint]) -> String {
    code_points
        .iter()
        .take_while(|&&cp| cp > 0)
        .filter_map(|&cp| char::from_u32(cp as u32))
        .collect()
}

/// Simple one-to-one lowercase folding. Multi-char expansions (e.g. ß) keep
/// the original code point, matching how dictionary keys are stored.
pub fn to_lower(cp: CodePoint) -> CodePoint {
    if cp < 0 {
        return NOT_A_CODE_POINT;
    }
    match char::from_u32(cp as u32) {
        Some(c) => {
            let mut it = c.to_lowercase();
            match (it.next(), it.next()) {
                (Some(l), None) => l as CodePoint,
                _ => cp,
            }
        }
        None => cp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cps = code_points_from_str("naïve");
        assert_eq!(string_from_code_points(&cps), "naïve");
    }

    #[test]
    fn test_terminator_stops_conversion() {
        assert_eq!(string_from_code_points(&[99, 97, 0, 116]), "ca");
    }

    #[test]
    fn test_to_lower() {
        assert_eq!(to_lower('A' as CodePoint), 'a' as CodePoint);
        assert_eq!(to_lower('é' as CodePoint), 'é' as CodePoint);
        assert_eq!(to_lower(-1), NOT_A_CODE_POINT);
    }
}
