use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{PlanError, PlanResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Glucose {
    Low,
    Normal,
    High,
}

impl Glucose {
    pub const ALL: [Glucose; 3] = [Glucose::Low, Glucose::Normal, Glucose::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Glucose::Low => "low",
            Glucose::Normal => "normal",
            Glucose::High => "high",
        }
    }
}

impl fmt::Display for Glucose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Glucose {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Glucose {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Glucose::Low),
            "normal" => Ok(Glucose::Normal),
            "high" => Ok(Glucose::High),
            _ => Err(PlanError::InvalidGlucose {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    pub const ALL: [Risk; 3] = [Risk::Low, Risk::Medium, Risk::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Risk {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Risk {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Risk::Low),
            "medium" => Ok(Risk::Medium),
            "high" => Ok(Risk::High),
            _ => Err(PlanError::InvalidRisk {
                value: s.to_string(),
            }),
        }
    }
}

/// Patient condition as seen by the planner.
///
/// Values are compared and hashed structurally, so two states built from the
/// same categories are interchangeable as explored-set keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PatientState {
    pub glucose: Glucose,
    pub risk: Risk,
}

impl PatientState {
    pub fn new(glucose: Glucose, risk: Risk) -> Self {
        Self { glucose, risk }
    }

    /// Builds a state from upstream category labels, rejecting anything
    /// outside the known domains.
    pub fn parse(glucose: &str, risk: &str) -> PlanResult<Self> {
        Ok(Self {
            glucose: glucose.parse()?,
            risk: risk.parse()?,
        })
    }

    pub fn is_goal(&self) -> bool {
        self.glucose == Glucose::Normal
    }

    pub fn normalized(&self) -> Self {
        Self {
            glucose: Glucose::Normal,
            risk: self.risk,
        }
    }

    /// Every (glucose, risk) combination, glucose-major.
    pub fn all() -> impl Iterator<Item = PatientState> {
        Glucose::ALL
            .into_iter()
            .flat_map(|glucose| Risk::ALL.into_iter().map(move |risk| Self::new(glucose, risk)))
    }
}

impl fmt::Display for PatientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "glucose={} risk={}", self.glucose, self.risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_accepts_known_categories() {
        let state = PatientState::parse("High", " low ").unwrap();
        assert_eq!(state, PatientState::new(Glucose::High, Risk::Low));
        assert!(!state.is_goal());
        assert!(state.normalized().is_goal());
        assert_eq!(state.normalized().risk, Risk::Low);
    }

    #[test]
    fn parse_rejects_unknown_categories() {
        assert_eq!(
            PatientState::parse("elevated", "low"),
            Err(PlanError::InvalidGlucose {
                value: "elevated".into()
            })
        );
        assert_eq!(
            PatientState::parse("normal", "extreme"),
            Err(PlanError::InvalidRisk {
                value: "extreme".into()
            })
        );
    }

    #[test]
    fn states_hash_structurally() {
        let mut seen = HashSet::new();
        seen.insert(PatientState::new(Glucose::Low, Risk::High));
        assert!(seen.contains(&PatientState::parse("low", "high").unwrap()));
        assert_eq!(PatientState::all().collect::<HashSet<_>>().len(), 9);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&PatientState::new(Glucose::Normal, Risk::Medium)).unwrap();
        assert_eq!(json, r#"{"glucose":"normal","risk":"medium"}"#);
    }

    #[test]
    fn deserialize_accepts_the_same_labels_as_parse() {
        let state: PatientState =
            serde_json::from_str(r#"{"glucose":"High","risk":" low "}"#).unwrap();
        assert_eq!(state, PatientState::parse("High", " low ").unwrap());

        let err = serde_json::from_str::<PatientState>(r#"{"glucose":"sky","risk":"low"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown glucose category: sky"));
    }
}
