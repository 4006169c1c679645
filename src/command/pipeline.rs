//! The command pipeline: intake, classification, dispatch, persistence.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;
use thiserror::Error;

use super::classify::IntentClassifier;
use crate::db::Database;
use crate::vector::VectorIndex;

/// Terminal status of an envelope. `pending` exists only on stored command
/// rows; a returned envelope is always success or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Failed,
}

impl EnvelopeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeStatus::Success => "success",
            EnvelopeStatus::Failed => "failed",
        }
    }
}

/// The uniform `{status, message, data}` shape every handler returns.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: EnvelopeStatus,
    pub message: String,
    pub data: Map<String, Value>,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Failed,
            message: message.into(),
            data: Map::new(),
        }
    }
}

/// What the caller gets back from `process`. `command_id` is absent only
/// when the pipeline failed before the command row could be created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<i64>,
    pub status: EnvelopeStatus,
    pub message: String,
    pub data: Map<String, Value>,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: i64,
}

/// The only error `process` surfaces to the caller. Everything downstream
/// of intake is folded into a failed envelope instead.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command text must not be empty")]
    EmptyCommand,
}

pub struct CommandProcessor {
    pub(crate) db: Database,
    pub(crate) classifier: Box<dyn IntentClassifier>,
    pub(crate) index: Box<dyn VectorIndex>,
}

impl CommandProcessor {
    pub fn new(
        db: Database,
        classifier: Box<dyn IntentClassifier>,
        index: Box<dyn VectorIndex>,
    ) -> Self {
        Self {
            db,
            classifier,
            index,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Run one natural-language command end to end.
    ///
    /// Empty text is rejected before any record exists. Past that point the
    /// caller always receives a well-formed outcome: errors escaping the
    /// pipeline are logged, folded into a failed envelope, and the command
    /// row (when one was created) gets a best-effort final status write so
    /// it cannot stay pending forever.
    pub fn process(&self, user_id: i64, text: &str) -> Result<CommandOutcome, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let started = Instant::now();
        let mut command_id = None;

        match self.run_pipeline(user_id, text, started, &mut command_id) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(user_id, error = %e, "command pipeline failed");
                let elapsed = started.elapsed().as_millis() as i64;

                if let Some(id) = command_id {
                    if let Err(write_err) = self.db.finish_command(
                        id,
                        "failed",
                        &e.to_string(),
                        &Map::new(),
                        elapsed,
                        &[],
                        None,
                    ) {
                        tracing::warn!(
                            command_id = id,
                            error = %write_err,
                            "could not record command failure"
                        );
                    }
                }

                Ok(CommandOutcome {
                    command_id,
                    status: EnvelopeStatus::Failed,
                    message: e.to_string(),
                    data: Map::new(),
                    execution_time_ms: elapsed,
                })
            }
        }
    }

    fn run_pipeline(
        &self,
        user_id: i64,
        text: &str,
        started: Instant,
        command_id: &mut Option<i64>,
    ) -> Result<CommandOutcome> {
        let id = self.db.create_command(user_id, text)?;
        *command_id = Some(id);

        let classification = self.classifier.classify(text);
        self.db.set_command_classification(
            id,
            classification.intent.as_str(),
            &classification.parameters,
        )?;

        tracing::debug!(
            command_id = id,
            intent = classification.intent.as_str(),
            "command classified"
        );

        let envelope = self.dispatch(user_id, classification.intent, &classification.parameters);
        let elapsed = started.elapsed().as_millis() as i64;

        let matched_images = matched_image_ids(&envelope.data);
        let created_album_id = envelope.data.get("albumId").and_then(Value::as_i64);
        self.db.finish_command(
            id,
            envelope.status.as_str(),
            &envelope.message,
            &envelope.data,
            elapsed,
            &matched_images,
            created_album_id,
        )?;

        Ok(CommandOutcome {
            command_id: Some(id),
            status: envelope.status,
            message: envelope.message,
            data: envelope.data,
            execution_time_ms: elapsed,
        })
    }
}

fn matched_image_ids(data: &Map<String, Value>) -> Vec<i64> {
    data.get("matchedImages")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{processor_with, ErrorIndex, FixedClassifier, FixedIndex};
    use crate::command::Intent;
    use serde_json::Map;
    use tempfile::tempdir;

    #[test]
    fn empty_text_is_rejected_before_any_record() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, Map::new()),
            FixedIndex::empty(),
        );

        assert!(matches!(
            processor.process(1, "   "),
            Err(CommandError::EmptyCommand)
        ));
        assert_eq!(processor.db().count_commands(1).unwrap(), 0);
    }

    #[test]
    fn unknown_intent_returns_fixed_failure() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Unknown, Map::new()),
            FixedIndex::empty(),
        );

        let outcome = processor.process(1, "do something weird").unwrap();
        assert_eq!(outcome.status, EnvelopeStatus::Failed);
        assert_eq!(outcome.message, "cannot understand command intent");
        assert!(outcome.data.is_empty());

        let record = processor
            .db()
            .get_command(1, outcome.command_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.result_status, "failed");
        assert_eq!(record.intent, "unknown");
    }

    #[test]
    fn handler_failure_still_finalizes_the_record() {
        let dir = tempdir().unwrap();
        let mut parameters = Map::new();
        parameters.insert("query".into(), "beach".into());
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, parameters),
            ErrorIndex,
        );

        let outcome = processor.process(1, "find beach photos").unwrap();
        assert_eq!(outcome.status, EnvelopeStatus::Failed);
        assert!(outcome.message.contains("index unavailable"));

        let record = processor
            .db()
            .get_command(1, outcome.command_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.result_status, "failed");
    }

    #[test]
    fn pipeline_failure_still_marks_the_row_failed() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, Map::new()),
            FixedIndex::empty(),
        );

        // Break the classification write so the error escapes past intake
        // and hits the outer boundary.
        processor
            .db()
            .conn
            .execute_batch("DROP INDEX idx_commands_intent; ALTER TABLE commands DROP COLUMN intent;")
            .unwrap();

        let outcome = processor.process(1, "find beach photos").unwrap();
        assert_eq!(outcome.status, EnvelopeStatus::Failed);

        // The row was created before the failure, so it must be finalized,
        // never left pending.
        let id = outcome.command_id.unwrap();
        let status: String = processor
            .db()
            .conn
            .query_row(
                "SELECT result_status FROM commands WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "failed");
    }

    #[test]
    fn classification_is_not_overwritten_by_dispatch() {
        let dir = tempdir().unwrap();
        let mut parameters = Map::new();
        parameters.insert("query".into(), "beach".into());
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, parameters.clone()),
            FixedIndex::empty(),
        );

        let outcome = processor.process(1, "find beach photos").unwrap();
        let record = processor
            .db()
            .get_command(1, outcome.command_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.intent, "search");
        assert_eq!(record.parameters, parameters);
    }

    #[test]
    fn outcome_always_reports_execution_time() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Unknown, Map::new()),
            FixedIndex::empty(),
        );

        let outcome = processor.process(1, "anything").unwrap();
        assert!(outcome.execution_time_ms >= 0);

        let record = processor
            .db()
            .get_command(1, outcome.command_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.execution_time_ms, outcome.execution_time_ms);
    }
}
