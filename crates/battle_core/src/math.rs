//! Fixed-point and integer helpers for deterministic stat math.
//!
//! Property values carry fractional bonuses (a 5% cargo bonus on a
//! 50-capacity fighter is 2.5), so they are computed in fixed point.
//! Battle arithmetic works on whole numbers and uses the integer helpers.

use fixed::types::I32F32;

/// Fixed-point number type for property values.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// `percent`% of `value`, saturating at the fixed-point bounds.
#[must_use]
pub fn percent_of(value: Fixed, percent: i64) -> Fixed {
    value.saturating_mul_int(percent) / 100
}

/// Convert a base stat to fixed point, saturating instead of overflowing.
#[must_use]
pub fn fixed_from_u64(value: u64) -> Fixed {
    Fixed::saturating_from_num(value)
}

/// Whole-number part of a non-negative fixed-point value.
///
/// Negative values clamp to zero.
#[must_use]
pub fn whole_units(value: Fixed) -> u64 {
    value.max(Fixed::ZERO).saturating_to_num::<u64>()
}

/// `percent`% of an integer amount, rounded down.
///
/// Uses 128-bit intermediates so large fleets cannot overflow.
#[must_use]
pub fn scale_percent(value: u64, percent: u32) -> u64 {
    let scaled = u128::from(value) * u128::from(percent) / 100;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their exact decimal string so
/// reports stay readable and round-trip without loss.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as its decimal representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserialize a fixed-point number from its decimal representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Fixed::from_str(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_keeps_fractions() {
        let value = percent_of(Fixed::from_num(50), 5);
        assert_eq!(value, Fixed::from_num(2.5));
    }

    #[test]
    fn test_percent_of_negative() {
        let value = percent_of(Fixed::from_num(20), -25);
        assert_eq!(value, Fixed::from_num(-5));
    }

    #[test]
    fn test_percent_of_saturates() {
        let value = percent_of(Fixed::MAX, 1000);
        assert_eq!(value, Fixed::MAX / 100);
    }

    #[test]
    fn test_whole_units_clamps_negative() {
        assert_eq!(whole_units(Fixed::from_num(-3)), 0);
        assert_eq!(whole_units(Fixed::from_num(12.75)), 12);
    }

    #[test]
    fn test_scale_percent() {
        assert_eq!(scale_percent(1_000, 30), 300);
        assert_eq!(scale_percent(7, 50), 3);
        assert_eq!(scale_percent(u64::MAX, 100), u64::MAX);
    }

    #[test]
    fn test_fixed_from_u64_saturates() {
        assert_eq!(fixed_from_u64(u64::MAX), Fixed::MAX);
        assert_eq!(fixed_from_u64(9_000_000), Fixed::from_num(9_000_000));
    }
}
