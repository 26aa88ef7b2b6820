//! External collaborator contracts.
//!
//! # Responsibility
//! - Define the boundary traits this core consumes: notification,
//!   content validation, usage events and the view template fallback.
//! - Ship inert defaults so services can be assembled bare.
//!
//! # Invariants
//! - Collaborator failures are never surfaced through core results;
//!   notification and usage logging are fire-and-forget.
//! - Content validation is a black-box precondition to any
//!   create/update; the core never interprets the payload beyond it.

use crate::model::identity::Identity;
use crate::model::record::{RecordId, RecordKind};
use std::sync::Arc;

/// Observational action kinds reported to the usage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageAction {
    Create,
    Read,
    Update,
    Delete,
}

impl UsageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Field-level validation failure detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Asynchronous notification delivery (e.g. email). Dispatch is
/// fire-and-forget; the core neither retries nor observes failures.
pub trait Notifier {
    fn notify(&self, recipients: &[String], subject: &str, body: &str);
}

/// Validates raw content payloads before they reach a record.
pub trait ContentValidator {
    /// Returns the validated content value, or field-level errors.
    fn validate(&self, raw: &str) -> Result<String, Vec<FieldError>>;
}

/// Receives observational usage events. No return value is consumed.
pub trait UsageLog {
    fn log(&self, action: UsageAction, record_id: RecordId, identity: &Identity);
}

/// Supplies default content for records that fall back to a template
/// (views gain a session default when the visibility set is empty).
pub trait TemplateProvider {
    fn default_content(&self, kind: RecordKind) -> Option<String>;
}

/// Notifier that drops every message.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _recipients: &[String], _subject: &str, _body: &str) {}
}

/// Usage log that ignores every event.
#[derive(Debug, Default)]
pub struct NoopUsageLog;

impl UsageLog for NoopUsageLog {
    fn log(&self, _action: UsageAction, _record_id: RecordId, _identity: &Identity) {}
}

/// Template provider with no defaults configured.
#[derive(Debug, Default)]
pub struct NoTemplates;

impl TemplateProvider for NoTemplates {
    fn default_content(&self, _kind: RecordKind) -> Option<String> {
        None
    }
}

/// Default content validator: the payload must be well-formed JSON.
///
/// The analytic definition is opaque to this core, but the original
/// system transports it as JSON and rejects malformed documents with a
/// field error rather than a transport failure.
#[derive(Debug, Default)]
pub struct JsonContentValidator;

impl ContentValidator for JsonContentValidator {
    fn validate(&self, raw: &str) -> Result<String, Vec<FieldError>> {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(_) => Ok(raw.to_string()),
            Err(err) => Err(vec![FieldError {
                field: "content",
                message: format!("content is not valid JSON: {err}"),
            }]),
        }
    }
}

/// Collaborator bundle handed to services.
///
/// Defaults are inert except validation, which enforces JSON payloads.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub validator: Arc<dyn ContentValidator>,
    pub usage: Arc<dyn UsageLog>,
    pub templates: Arc<dyn TemplateProvider>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            notifier: Arc::new(NoopNotifier),
            validator: Arc::new(JsonContentValidator),
            usage: Arc::new(NoopUsageLog),
            templates: Arc::new(NoTemplates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentValidator, JsonContentValidator};

    #[test]
    fn json_validator_accepts_wellformed_payloads() {
        let validated = JsonContentValidator
            .validate("{\"columns\": [1, 2]}")
            .expect("valid json should pass");
        assert_eq!(validated, "{\"columns\": [1, 2]}");
    }

    #[test]
    fn json_validator_reports_field_errors() {
        let errors = JsonContentValidator
            .validate("{not json")
            .expect_err("malformed json must fail");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "content");
    }
}
