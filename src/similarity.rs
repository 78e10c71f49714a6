//! Fingerprint comparison.
//!
//! Classifies two perceptual fingerprints as near duplicates by counting
//! differing bits. Fingerprints arrive in their stored hex form and may be
//! absent, so comparison is defined over `Option<&str>`: anything that cannot
//! be compared bit-for-bit yields a sentinel that no threshold treats as
//! similar.

/// Sentinel distance for inputs that cannot be compared.
///
/// Returned when either fingerprint is missing, is not valid hex, or the two
/// decode to different bit lengths. Never within any similarity threshold.
pub const NOT_COMPARABLE: i32 = -1;

/// Hamming distance between two hex-encoded fingerprints.
///
/// Symmetric, and ranges 0..=64 for two well-formed 64-bit fingerprints.
///
/// # Returns
///
/// The number of differing bits, or [`NOT_COMPARABLE`] if either input is
/// absent, undecodable, or the lengths differ.
pub fn distance(a: Option<&str>, b: Option<&str>) -> i32 {
    let (Some(a), Some(b)) = (a, b) else {
        return NOT_COMPARABLE;
    };

    let (Ok(a), Ok(b)) = (hex::decode(a), hex::decode(b)) else {
        return NOT_COMPARABLE;
    };

    if a.len() != b.len() || a.is_empty() {
        return NOT_COMPARABLE;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones() as i32)
        .sum()
}

/// Whether two fingerprints are within `threshold` differing bits.
///
/// Always `false` when [`distance`] is the sentinel, regardless of the
/// threshold.
pub fn is_similar(a: Option<&str>, b: Option<&str>, threshold: u32) -> bool {
    let d = distance(a, b);
    // Compare in unsigned space: thresholds above i32::MAX must not wrap
    d >= 0 && d as u32 <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        assert_eq!(
            distance(Some("0f0f0f0f0f0f0f0f"), Some("0f0f0f0f0f0f0f0f")),
            0
        );
    }

    #[test]
    fn test_distance_full_complement() {
        // Every bit differs: 64
        assert_eq!(
            distance(Some("0f0f0f0f0f0f0f0f"), Some("f0f0f0f0f0f0f0f0")),
            64
        );
    }

    #[test]
    fn test_distance_single_bit() {
        assert_eq!(
            distance(Some("0000000000000000"), Some("0000000000000001")),
            1
        );
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Some("deadbeefcafebabe");
        let b = Some("0123456789abcdef");
        assert_eq!(distance(a, b), distance(b, a));
    }

    #[test]
    fn test_distance_missing_input() {
        assert_eq!(distance(None, Some("0f0f0f0f0f0f0f0f")), NOT_COMPARABLE);
        assert_eq!(distance(Some("0f0f0f0f0f0f0f0f"), None), NOT_COMPARABLE);
        assert_eq!(distance(None, None), NOT_COMPARABLE);
    }

    #[test]
    fn test_distance_length_mismatch() {
        assert_eq!(distance(Some("0f0f"), Some("0f0f0f0f0f0f0f0f")), NOT_COMPARABLE);
    }

    #[test]
    fn test_distance_invalid_hex() {
        assert_eq!(
            distance(Some("zzzzzzzzzzzzzzzz"), Some("0f0f0f0f0f0f0f0f")),
            NOT_COMPARABLE
        );
        assert_eq!(distance(Some(""), Some("")), NOT_COMPARABLE);
    }

    #[test]
    fn test_is_similar_threshold_boundary() {
        // 8 bits apart: similar at 8, not at 7
        let a = Some("00000000000000ff");
        let b = Some("0000000000000000");
        assert_eq!(distance(a, b), 8);
        assert!(is_similar(a, b, 8));
        assert!(!is_similar(a, b, 7));
    }

    #[test]
    fn test_is_similar_just_over_threshold() {
        // 9 bits apart: not similar at the default threshold of 8
        let a = Some("00000000000001ff");
        let b = Some("0000000000000000");
        assert_eq!(distance(a, b), 9);
        assert!(!is_similar(a, b, 8));
    }

    #[test]
    fn test_is_similar_at_thresholds_beyond_distance_range() {
        // Identical fingerprints stay similar at any threshold, including
        // values above i32::MAX that would wrap a signed comparison
        let a = Some("0f0f0f0f0f0f0f0f");
        assert!(is_similar(a, a, 2_147_483_648));
        assert!(is_similar(a, a, u32::MAX));
    }

    #[test]
    fn test_is_similar_never_on_sentinel() {
        assert!(!is_similar(None, Some("0f0f0f0f0f0f0f0f"), u32::MAX));
        assert!(!is_similar(Some("0f0f"), Some("0f0f0f0f0f0f0f0f"), u32::MAX));
    }

    #[test]
    fn test_is_similar_identical_at_zero_threshold() {
        assert!(is_similar(
            Some("0f0f0f0f0f0f0f0f"),
            Some("0f0f0f0f0f0f0f0f"),
            0
        ));
    }
}
