//! Validated primitive types shared across the CardioSim crates.
//!
//! These wrappers guarantee their invariant once constructed, so downstream code (scenario
//! loading, backend response decoding, pose landmark handling) never re-checks them.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TypesError {
    /// Blank after trimming
    #[error("text must not be blank")]
    Empty,
    /// The numeric value was outside `[0, 1]` or not finite
    #[error("value {0} is outside the unit interval [0, 1]")]
    OutOfRange(f64),
}

/// Trimmed text with at least one visible character: scenario ids, diagnosis names,
/// explanation bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trim `input`; fails with [`TypesError::Empty`] when nothing is left.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A finite `f64` in the closed interval `[0, 1]`.
///
/// Used for diagnosis confidence scores and landmark visibility.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct UnitInterval(f64);

impl UnitInterval {
    pub const ZERO: UnitInterval = UnitInterval(0.0);
    pub const ONE: UnitInterval = UnitInterval(1.0);

    pub fn new(value: f64) -> Result<Self, TypesError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(TypesError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Clamps any finite value into range; non-finite input maps to zero.
    pub fn saturating(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self::ZERO
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for UnitInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl serde::Serialize for UnitInterval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for UnitInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = f64::deserialize(deserializer)?;
        UnitInterval::new(v).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        let text = NonEmptyText::new("  ST elevation V1-V4 ").expect("valid text");
        assert_eq!(text.as_str(), "ST elevation V1-V4");
        assert_eq!(NonEmptyText::new("   "), Err(TypesError::Empty));
    }

    #[test]
    fn non_empty_text_deserialize_rejects_empty_string() {
        let err = serde_json::from_str::<NonEmptyText>("\"\"").expect_err("should reject");
        assert!(err.to_string().contains("must not be blank"));
    }

    #[test]
    fn unit_interval_bounds() {
        assert_eq!(UnitInterval::new(0.97).map(UnitInterval::get), Ok(0.97));
        assert!(UnitInterval::new(1.01).is_err());
        assert!(UnitInterval::new(-0.1).is_err());
        assert!(UnitInterval::new(f64::NAN).is_err());
        assert_eq!(UnitInterval::saturating(3.0), UnitInterval::ONE);
        assert_eq!(UnitInterval::saturating(f64::INFINITY), UnitInterval::ZERO);
    }

    #[test]
    fn unit_interval_deserialize_validates() {
        let ok: UnitInterval = serde_json::from_str("0.5").expect("parse");
        assert_eq!(ok.get(), 0.5);
        assert!(serde_json::from_str::<UnitInterval>("2.0").is_err());
    }
}
