//! Fixed-point helpers for ratio decisions.
//!
//! The scheduler compares unit ratios and economy shares every tick. Those
//! comparisons go through [`Fixed`] so two runs on different machines make
//! the same choice.

use fixed::types::I32F32;

/// Fixed-point number type for all ratio math.
pub type Fixed = I32F32;

/// `num / den` as a fixed-point ratio. A zero denominator yields `Fixed::MAX`.
#[must_use]
pub fn ratio(num: u32, den: u32) -> Fixed {
    if den == 0 {
        return Fixed::MAX;
    }
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Convert a per-mille integer (as stored in config files) to a ratio.
#[must_use]
pub fn from_permille(permille: u32) -> Fixed {
    Fixed::from_num(permille) / Fixed::from_num(1000)
}

/// Serde support for fixed-point numbers.
///
/// Serializes as the raw bit representation (i64) to preserve exact
/// precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_basic() {
        assert_eq!(ratio(1, 4), Fixed::from_num(0.25));
        assert_eq!(ratio(10, 2), Fixed::from_num(5));
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(3, 0), Fixed::MAX);
        assert_eq!(ratio(0, 0), Fixed::MAX);
    }

    #[test]
    fn test_permille() {
        assert_eq!(from_permille(200), ratio(1, 5));
        assert!(from_permille(150) < from_permille(200));
    }
}
