//! A-book / B-book routing decision
//!
//! A trade whose score reaches its instrument group's threshold is retained
//! internally (B-book); everything else goes to external liquidity (A-book).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Group used whenever an instrument group has no threshold of its own
pub const FALLBACK_GROUP: &str = "Other";

const FALLBACK_KEY: &str = "other";

/// Where an order is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookRoute {
    /// External liquidity provider
    #[serde(rename = "A_BOOK")]
    ABook,
    /// Counter-risk retained internally
    #[serde(rename = "B_BOOK")]
    BBook,
}

impl BookRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookRoute::ABook => "A_BOOK",
            BookRoute::BBook => "B_BOOK",
        }
    }
}

impl fmt::Display for BookRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare a score against a threshold. The boundary belongs to the B-book side.
pub fn decide(score: f32, threshold: f32) -> BookRoute {
    if score >= threshold {
        BookRoute::BBook
    } else {
        BookRoute::ABook
    }
}

/// Threshold table construction errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("Threshold table has no \"Other\" fallback group")]
    MissingFallbackGroup,

    #[error("Threshold for group '{group}' is not a finite number: {value}")]
    NotFinite { group: String, value: f32 },
}

/// Per instrument-group thresholds
///
/// Group names match case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, f32>", into = "HashMap<String, f32>")]
pub struct RoutingThresholds {
    groups: HashMap<String, f32>,
    fallback: f32,
}

impl RoutingThresholds {
    /// Create a table holding only the fallback group
    pub fn new(fallback_threshold: f32) -> Result<Self, ThresholdError> {
        Self::try_from(HashMap::from([(FALLBACK_GROUP.to_string(), fallback_threshold)]))
    }

    /// Add or replace a group threshold
    pub fn with_group(
        mut self,
        group: impl Into<String>,
        threshold: f32,
    ) -> Result<Self, ThresholdError> {
        let group = group.into();
        if !threshold.is_finite() {
            return Err(ThresholdError::NotFinite { group, value: threshold });
        }
        let key = group.to_ascii_lowercase();
        if key == FALLBACK_KEY {
            self.fallback = threshold;
        }
        self.groups.insert(key, threshold);
        Ok(self)
    }

    /// Threshold for a group, falling back to the `"Other"` group when unrecognized
    pub fn threshold_for(&self, group: &str) -> f32 {
        self.groups
            .get(&group.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Group name actually used for a lookup
    pub fn resolve_group<'a>(&self, group: &'a str) -> &'a str {
        if self.groups.contains_key(&group.to_ascii_lowercase()) {
            group
        } else {
            FALLBACK_GROUP
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, f32)> {
        self.groups.iter().map(|(g, t)| (g.as_str(), *t))
    }
}

impl TryFrom<HashMap<String, f32>> for RoutingThresholds {
    type Error = ThresholdError;

    fn try_from(groups: HashMap<String, f32>) -> Result<Self, Self::Error> {
        if let Some((group, value)) = groups.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ThresholdError::NotFinite {
                group: group.clone(),
                value: *value,
            });
        }
        let groups: HashMap<String, f32> = groups
            .into_iter()
            .map(|(group, threshold)| (group.to_ascii_lowercase(), threshold))
            .collect();
        let fallback = *groups
            .get(FALLBACK_KEY)
            .ok_or(ThresholdError::MissingFallbackGroup)?;
        Ok(Self { groups, fallback })
    }
}

impl From<RoutingThresholds> for HashMap<String, f32> {
    fn from(thresholds: RoutingThresholds) -> Self {
        thresholds.groups
    }
}

/// Routing verdict returned to the host adapter for logging and execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub decision: BookRoute,
    pub score: f32,
    pub threshold: f32,
    /// Group whose threshold was applied
    pub group: String,
}

/// Look up the group threshold and decide
pub fn route(score: f32, group: &str, thresholds: &RoutingThresholds) -> RoutingOutcome {
    let threshold = thresholds.threshold_for(group);
    RoutingOutcome {
        decision: decide(score, threshold),
        score,
        threshold,
        group: thresholds.resolve_group(group).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingThresholds {
        RoutingThresholds::new(0.08)
            .unwrap()
            .with_group("Forex", 0.12)
            .unwrap()
            .with_group("Metals", 0.2)
            .unwrap()
    }

    #[test]
    fn test_boundary_is_b_book() {
        assert_eq!(decide(0.09, 0.08), BookRoute::BBook);
        assert_eq!(decide(0.07, 0.08), BookRoute::ABook);
        assert_eq!(decide(0.08, 0.08), BookRoute::BBook);
    }

    #[test]
    fn test_unknown_group_uses_other() {
        let thresholds = table();
        assert_eq!(thresholds.threshold_for("Forex"), 0.12);
        assert_eq!(thresholds.threshold_for("Crypto"), 0.08);

        let outcome = route(0.09, "Crypto", &thresholds);
        assert_eq!(outcome.decision, BookRoute::BBook);
        assert_eq!(outcome.threshold, 0.08);
        assert_eq!(outcome.group, FALLBACK_GROUP);

        let outcome = route(0.09, "Forex", &thresholds);
        assert_eq!(outcome.decision, BookRoute::ABook);
        assert_eq!(outcome.group, "Forex");
    }

    #[test]
    fn test_table_requires_other_group() {
        let groups = HashMap::from([("Forex".to_string(), 0.1f32)]);
        assert_eq!(
            RoutingThresholds::try_from(groups),
            Err(ThresholdError::MissingFallbackGroup)
        );
    }

    #[test]
    fn test_rejects_non_finite_threshold() {
        let err = RoutingThresholds::new(0.08)
            .unwrap()
            .with_group("Indices", f32::NAN)
            .unwrap_err();
        assert!(matches!(err, ThresholdError::NotFinite { .. }));
    }

    #[test]
    fn test_overwriting_other_moves_fallback() {
        let thresholds = table().with_group(FALLBACK_GROUP, 0.5).unwrap();
        assert_eq!(thresholds.threshold_for("Unlisted"), 0.5);
    }

    #[test]
    fn test_group_lookup_ignores_case() {
        let thresholds = table();
        assert_eq!(thresholds.threshold_for("forex"), 0.12);
        assert_eq!(thresholds.threshold_for("METALS"), 0.2);

        let lowered = RoutingThresholds::try_from(HashMap::from([("other".to_string(), 0.3f32)]))
            .unwrap();
        assert_eq!(lowered.threshold_for("Anything"), 0.3);
    }

    #[test]
    fn test_deserialize_from_map() {
        let thresholds: RoutingThresholds =
            serde_json::from_str(r#"{"Other":0.08,"Forex":0.1}"#).unwrap();
        assert_eq!(thresholds.threshold_for("Forex"), 0.1);

        let missing: Result<RoutingThresholds, _> = serde_json::from_str(r#"{"Forex":0.1}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(BookRoute::ABook.to_string(), "A_BOOK");
        assert_eq!(serde_json::to_string(&BookRoute::BBook).unwrap(), "\"B_BOOK\"");
    }
}
