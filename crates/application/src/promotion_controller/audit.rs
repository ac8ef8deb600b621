//! Audit records persisted as manifest annotations.
//!
//! The latest record of each kind is stored as a JSON object, and every
//! record is appended to a JSON array history stored oldest-first.

use std::collections::BTreeMap;

use floe_core::{AppError, AppResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Annotation holding the latest promotion record.
pub const PROMOTION_ANNOTATION: &str = "dev.floe.promotion";
/// Annotation holding the promotion history.
pub const PROMOTION_HISTORY_ANNOTATION: &str = "dev.floe.promotion.history";
/// Annotation holding the latest rollback record.
pub const ROLLBACK_ANNOTATION: &str = "dev.floe.rollback";
/// Annotation holding the rollback history.
pub const ROLLBACK_HISTORY_ANNOTATION: &str = "dev.floe.rollback.history";

/// Decodes a history annotation, treating a missing key as empty history.
pub(super) fn decode_history<T: DeserializeOwned>(
    annotations: &BTreeMap<String, String>,
    key: &str,
) -> AppResult<Vec<T>> {
    let Some(raw) = annotations.get(key) else {
        return Ok(Vec::new());
    };

    serde_json::from_str(raw).map_err(|error| {
        AppError::Internal(format!("annotation '{key}' holds malformed history: {error}"))
    })
}

/// Builds the annotation update recording `entry` as latest and appending it
/// to the history, keeping at most `max_entries` newest entries.
pub(super) fn record_annotations<T: Serialize>(
    existing: &BTreeMap<String, String>,
    latest_key: &str,
    history_key: &str,
    entry: &T,
    max_entries: usize,
) -> AppResult<BTreeMap<String, String>> {
    let mut history: Vec<serde_json::Value> = decode_history(existing, history_key)?;
    history.push(to_value(entry)?);

    let overflow = history.len().saturating_sub(max_entries.max(1));
    history.drain(..overflow);

    Ok(BTreeMap::from([
        (latest_key.to_owned(), encode(&to_value(entry)?)?),
        (history_key.to_owned(), encode(&history)?),
    ]))
}

fn to_value<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to encode audit record: {error}")))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|error| AppError::Internal(format!("failed to encode audit record: {error}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use super::{decode_history, record_annotations};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Entry {
        id: u32,
    }

    #[test]
    fn missing_history_decodes_as_empty() {
        let history = decode_history::<Entry>(&BTreeMap::new(), "dev.floe.promotion.history");
        assert_eq!(history.ok(), Some(Vec::new()));
    }

    #[test]
    fn malformed_history_is_reported() {
        let annotations = BTreeMap::from([(
            "dev.floe.promotion.history".to_owned(),
            "{not an array".to_owned(),
        )]);

        let result = decode_history::<Entry>(&annotations, "dev.floe.promotion.history");
        assert!(result.is_err_and(|error| error.to_string().contains("dev.floe.promotion.history")));
    }

    #[test]
    fn appends_and_caps_history_dropping_oldest() {
        let mut annotations = BTreeMap::new();
        for id in 1..=4 {
            let update = record_annotations(
                &annotations,
                "latest",
                "history",
                &Entry { id },
                3,
            );
            let Ok(update) = update else {
                panic!("encoding should succeed");
            };
            annotations.extend(update);
        }

        let history = decode_history::<Entry>(&annotations, "history");
        assert_eq!(
            history.ok(),
            Some(vec![Entry { id: 2 }, Entry { id: 3 }, Entry { id: 4 }])
        );
        assert_eq!(
            annotations.get("latest").map(String::as_str),
            Some(r#"{"id":4}"#)
        );
    }
}
