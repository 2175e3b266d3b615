//! Confidence scores attached to every `SolveResult`.
//!
//! A confidence is a number in `[0, 1]` that a cascade stage attaches to its
//! answer. It gates the cascade and drives advisory downgrades; it is not a
//! calibrated probability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfidenceOutOfRange;

/// Validated confidence value.
///
/// # Examples
///
/// ```
/// use mathroute::Confidence;
///
/// let conf = Confidence::new(0.85).unwrap();
/// assert_eq!(conf.value(), 0.85);
/// assert!(Confidence::new(1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Confidence(f32);

impl Confidence {
    /// Minimum valid confidence value.
    pub const MIN_VALUE: f32 = 0.0;

    /// Maximum valid confidence value.
    pub const MAX_VALUE: f32 = 1.0;

    /// Terminal results (rejections, exhausted cascade).
    pub const ZERO: Self = Self(0.0);

    /// Identity-table overrides.
    pub const ONE: Self = Self(1.0);

    /// Symbolic derivative.
    pub const DERIVATIVE: Self = Self(0.8);

    /// Symbolic antiderivative.
    pub const INTEGRAL: Self = Self(0.8);

    /// Symbolic limit.
    pub const LIMIT: Self = Self(0.75);

    /// Equation solved for its default variable.
    pub const EQUATION: Self = Self(0.85);

    /// Numeric evaluation.
    pub const ARITHMETIC: Self = Self(0.9);

    /// Generated answer that survived verification.
    pub const VERIFIED: Self = Self(0.9);

    /// Generated answer that failed verification.
    pub const UNVERIFIED: Self = Self(0.75);

    /// Creates a confidence, rejecting values outside `[0, 1]` and NaN.
    ///
    /// # Errors
    ///
    /// Returns `ConfidenceOutOfRange` if the value is not in `[0.0, 1.0]`.
    pub fn new(value: f32) -> Result<Self, ConfidenceOutOfRange> {
        if value.is_nan() || !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            return Err(ConfidenceOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Creates a confidence from an untrusted score, clamping into range.
    ///
    /// NaN maps to zero. Used for collaborator scores (e.g. cosine similarity)
    /// which are confidences only by convention.
    #[must_use]
    pub fn saturating(value: f32) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(Self::MIN_VALUE, Self::MAX_VALUE))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Returns true if the value is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    /// Returns true if the value strictly exceeds `threshold`.
    #[must_use]
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.0 > threshold
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = f32::deserialize(deserializer)?;
        Confidence::new(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<f32> for Confidence {
    type Error = ConfidenceOutOfRange;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_valid_values() {
        assert!(Confidence::new(0.0).is_ok());
        assert!(Confidence::new(0.5).is_ok());
        assert!(Confidence::new(1.0).is_ok());
    }

    #[test]
    fn test_confidence_invalid_values() {
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(1.1).is_err());
        assert!(Confidence::new(f32::NAN).is_err());
    }

    #[test]
    fn test_saturating_clamps() {
        assert_eq!(Confidence::saturating(1.0000001).value(), 1.0);
        assert_eq!(Confidence::saturating(-3.0).value(), 0.0);
        assert_eq!(Confidence::saturating(f32::NAN).value(), 0.0);
    }

    #[test]
    fn test_exceeds_is_strict() {
        let conf = Confidence::new(0.85).unwrap();
        assert!(!conf.exceeds(0.85));
        assert!(Confidence::new(0.86).unwrap().exceeds(0.85));
    }

    #[test]
    fn test_stage_constants_in_range() {
        for c in [
            Confidence::DERIVATIVE,
            Confidence::INTEGRAL,
            Confidence::LIMIT,
            Confidence::EQUATION,
            Confidence::ARITHMETIC,
            Confidence::VERIFIED,
            Confidence::UNVERIFIED,
        ] {
            assert!(Confidence::new(c.value()).is_ok());
        }
        assert!(Confidence::UNVERIFIED < Confidence::VERIFIED);
    }

    #[test]
    fn test_confidence_serialization() {
        let conf = Confidence::new(0.75).unwrap();
        let json = serde_json::to_string(&conf).unwrap();
        assert_eq!(json, "0.75");
        let back: Confidence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conf);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let result: Result<Confidence, _> = serde_json::from_str("1.5");
        assert!(result.is_err());
    }
}
