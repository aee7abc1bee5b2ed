//! Parsing of frames received on a group subscription.
//!
//! The server sends `{"type": "<kind>", "data": {...}}`. Kinds this client
//! does not know are skipped rather than treated as protocol errors, so the
//! server can add message types without breaking older clients.

use platepick_core::sync::FeedMessage;
use serde::Deserialize;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Message kinds this client understands.
const KNOWN_KINDS: &[&str] = &["decision.snapshot"];

/// Parse one text frame.
///
/// Returns `Ok(None)` for well-formed messages of an unknown kind.
pub fn parse_message(text: &str) -> Result<Option<FeedMessage>, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if !KNOWN_KINDS.contains(&envelope.kind.as_str()) {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::{TimeZone, Utc};
    use platepick_core::decision::{Decision, DecisionMethod, DecisionScope, DecisionStatus};

    use super::*;

    fn decision() -> Decision {
        let at = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
        Decision {
            id: 3,
            scope: DecisionScope::Group,
            group_id: Some(9),
            created_by: 1,
            collection_id: 4,
            method: DecisionMethod::Tiered,
            status: DecisionStatus::Active,
            deadline: Some(at),
            visit_date: at,
            participants: BTreeSet::from([1, 2]),
            votes: BTreeMap::new(),
            result: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn parses_decision_snapshot() {
        let text = serde_json::to_string(&FeedMessage::DecisionSnapshot(decision())).unwrap();

        let parsed = parse_message(&text).unwrap();

        assert_eq!(parsed, Some(FeedMessage::DecisionSnapshot(decision())));
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let parsed = parse_message(r#"{"type":"decision.typing","data":{"user_id":2}}"#).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(parse_message("not json").is_err());
        assert!(parse_message(r#"{"data":{}}"#).is_err());
        assert!(parse_message(r#"{"type":"decision.snapshot","data":{"id":"x"}}"#).is_err());
    }
}
