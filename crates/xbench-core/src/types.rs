use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quantity family a tolerance binds to.
///
/// Families are the unit of comparison: a case declares one digit range per
/// family and the comparator emits at most one verdict per family and pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Extinction (cross section or efficiency).
    Ext,
    /// Absorption (cross section or efficiency).
    Abs,
    /// Solver residual.
    Res,
    /// Internal field.
    Int,
    /// Radiation force.
    Force,
    /// Radiation torque.
    Torque,
    /// Mueller scattering matrix.
    Mueller,
}

impl Family {
    /// Every family in report order.
    pub const ALL: [Family; 7] = [
        Family::Ext,
        Family::Abs,
        Family::Res,
        Family::Int,
        Family::Force,
        Family::Torque,
        Family::Mueller,
    ];

    /// Lowercase label used in tags, reports and console lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Ext => "ext",
            Family::Abs => "abs",
            Family::Res => "res",
            Family::Int => "int",
            Family::Force => "force",
            Family::Torque => "torque",
            Family::Mueller => "mueller",
        }
    }

    /// Whether a case may escalate this family with a `need_*` flag.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Family::Int | Family::Force | Family::Torque | Family::Mueller
        )
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| format!("unknown quantity family `{s}`"))
    }
}

/// Inclusive range of accepted digits of agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitRange {
    /// Fewest digits that still pass.
    pub min: u32,
    /// Most digits expected; agreement beyond this is flagged, not failed.
    pub max: u32,
}

impl DigitRange {
    /// Creates a range, rejecting inverted bounds.
    pub fn new(min: u32, max: u32) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// Returns whether the provided digit count lies within the inclusive range.
    pub fn contains(&self, digits: f64) -> bool {
        digits >= f64::from(self.min) && digits <= f64::from(self.max)
    }
}

impl fmt::Display for DigitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_labels_round_trip() {
        for family in Family::ALL {
            assert_eq!(family.as_str().parse::<Family>(), Ok(family));
        }
        assert!("extinction".parse::<Family>().is_err());
    }

    #[test]
    fn digit_range_is_inclusive() {
        let range = DigitRange::new(11, 16).expect("valid range");
        assert!(range.contains(11.0));
        assert!(range.contains(16.0));
        assert!(!range.contains(10.99));
        assert!(DigitRange::new(5, 4).is_none());
    }
}
