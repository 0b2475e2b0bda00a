//! Trial identity, lifecycle state and read-only snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::HopaasResult;
use crate::validation_error;

/// Server-side trial number within a study.
pub type TrialId = u64;

/// Key the server uses to identify a trial in every payload.
pub const TRIAL_KEY: &str = "hopaas_trial";

/// Whether the study minimizes or maximizes the loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimize => f.write_str("minimize"),
            Self::Maximize => f.write_str("maximize"),
        }
    }
}

/// Lifecycle of a trial once the server handed it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    Active,
    Completed,
    Failed,
    /// Abandoned after a positive prune decision; nothing was reported.
    Pruned,
}

impl TrialState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// `"<study_id>:<trial_id>"` as sent in `hopaas_trial`.
pub fn format_trial_tag(study_id: &str, trial_id: TrialId) -> String {
    format!("{study_id}:{trial_id}")
}

/// Split a `hopaas_trial` tag into its study and trial ids.
///
/// The study id is everything before the last `:`.
pub fn parse_trial_tag(tag: &str) -> HopaasResult<(String, TrialId)> {
    let (study_id, trial_id) = tag
        .rsplit_once(':')
        .ok_or_else(|| validation_error!("malformed trial tag {tag:?}: missing ':'"))?;
    let trial_id = trial_id
        .trim()
        .parse::<TrialId>()
        .map_err(|e| validation_error!("malformed trial tag {tag:?}: {e}"))?;
    Ok((study_id.to_string(), trial_id))
}

/// Immutable copy of a trial as last seen by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    pub study_id: String,
    pub trial_id: TrialId,
    pub loss: Option<f64>,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub state: TrialState,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_tag_round_trip() {
        let tag = format_trial_tag("abc", 7);
        assert_eq!(tag, "abc:7");
        assert_eq!(parse_trial_tag(&tag).unwrap(), ("abc".to_string(), 7));
    }

    #[test]
    fn trial_tag_keeps_colons_in_study_id() {
        assert_eq!(
            parse_trial_tag("TEST::Study:12").unwrap(),
            ("TEST::Study".to_string(), 12)
        );
    }

    #[test]
    fn malformed_trial_tags() {
        assert!(parse_trial_tag("abc").is_err());
        assert!(parse_trial_tag("abc:x").is_err());
        assert!(parse_trial_tag("abc:-1").is_err());
    }

    #[test]
    fn direction_wire_names() {
        assert_eq!(serde_json::to_value(Direction::Minimize).unwrap(), "minimize");
        assert_eq!(Direction::Maximize.to_string(), "maximize");
        assert_eq!(Direction::default(), Direction::Minimize);
    }

    #[test]
    fn only_active_is_unfinished() {
        assert!(!TrialState::Active.is_finished());
        assert!(TrialState::Completed.is_finished());
        assert!(TrialState::Failed.is_finished());
        assert!(TrialState::Pruned.is_finished());
    }
}
