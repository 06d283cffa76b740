//! Classification enums shared by expenses, the commission engine and reporting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Labor/material composition of an expense. Determines baseline hak ediş eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkScopeLevel {
    /// Pure manufacturing labor.
    PureImalat,
    /// Material plus installation; resolved by the hak ediş policy.
    MalzemePlusImalat,
    /// Raw material only.
    PureMalzeme,
    /// Not manufacturing related at all.
    NonImalat,
}

impl WorkScopeLevel {
    pub const ALL: [WorkScopeLevel; 4] = [
        WorkScopeLevel::PureImalat,
        WorkScopeLevel::MalzemePlusImalat,
        WorkScopeLevel::PureMalzeme,
        WorkScopeLevel::NonImalat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkScopeLevel::PureImalat => "PURE_IMALAT",
            WorkScopeLevel::MalzemePlusImalat => "MALZEME_PLUS_IMALAT",
            WorkScopeLevel::PureMalzeme => "PURE_MALZEME",
            WorkScopeLevel::NonImalat => "NON_IMALAT",
        }
    }

    /// Matches the canonical spelling only, without trimming or case folding.
    pub fn parse_exact(s: &str) -> Result<Self, UnknownVariant> {
        WorkScopeLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                field: "work_scope_level",
                value: s.to_string(),
            })
    }

    /// Scopes that carry manufacturing labor and therefore count towards potential exposure.
    pub fn has_labor(&self) -> bool {
        matches!(
            self,
            WorkScopeLevel::PureImalat | WorkScopeLevel::MalzemePlusImalat
        )
    }
}

impl fmt::Display for WorkScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkScopeLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        WorkScopeLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| UnknownVariant {
                field: "work_scope_level",
                value: s.trim().to_string(),
            })
    }
}

/// Secondary classification resolving mixed material/labor expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HakEdisPolicy {
    AlwaysIncluded,
    AlwaysExcluded,
    /// Excluded until the owner approves an override.
    Conditional,
}

impl HakEdisPolicy {
    pub const ALL: [HakEdisPolicy; 3] = [
        HakEdisPolicy::AlwaysIncluded,
        HakEdisPolicy::AlwaysExcluded,
        HakEdisPolicy::Conditional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HakEdisPolicy::AlwaysIncluded => "ALWAYS_INCLUDED",
            HakEdisPolicy::AlwaysExcluded => "ALWAYS_EXCLUDED",
            HakEdisPolicy::Conditional => "CONDITIONAL",
        }
    }

    /// Matches the canonical spelling only, without trimming or case folding.
    pub fn parse_exact(s: &str) -> Result<Self, UnknownVariant> {
        HakEdisPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                field: "hak_edis_policy",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for HakEdisPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HakEdisPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        HakEdisPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str() == normalized)
            .ok_or_else(|| UnknownVariant {
                field: "hak_edis_policy",
                value: s.trim().to_string(),
            })
    }
}

/// Raised when a classification string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field}: {value}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "malzeme_plus_imalat".parse::<WorkScopeLevel>().unwrap(),
            WorkScopeLevel::MalzemePlusImalat
        );
        assert_eq!(
            " CONDITIONAL ".parse::<HakEdisPolicy>().unwrap(),
            HakEdisPolicy::Conditional
        );
    }

    #[test]
    fn exact_parse_rejects_other_spellings() {
        assert_eq!(
            WorkScopeLevel::parse_exact("PURE_IMALAT"),
            Ok(WorkScopeLevel::PureImalat)
        );
        assert!(WorkScopeLevel::parse_exact("pure_imalat").is_err());
        assert!(HakEdisPolicy::parse_exact(" conditional ").is_err());
        assert!(HakEdisPolicy::parse_exact("Conditional").is_err());
    }

    #[test]
    fn unknown_value_names_the_field() {
        let err = "WELDING".parse::<WorkScopeLevel>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid work_scope_level: WELDING");
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&WorkScopeLevel::NonImalat).unwrap();
        assert_eq!(json, "\"NON_IMALAT\"");
        let policy: HakEdisPolicy = serde_json::from_str("\"ALWAYS_EXCLUDED\"").unwrap();
        assert_eq!(policy, HakEdisPolicy::AlwaysExcluded);
    }
}
