//! Caller-supplied render parameters and their validation.

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;

/// Upper bound on the number of outputs one job may request.
pub const MAX_OUTPUTS: usize = 32;

/// The parameter subset a job (or a regeneration) is run with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenderParameters {
    /// Output artifacts to produce, e.g. `["petition", "summons"]`.
    #[validate(
        length(min = 1, max = 32, message = "select between 1 and 32 outputs"),
        custom(function = "validate_output_names")
    )]
    pub outputs: Vec<String>,

    /// Where to send the completion notification, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "notifyEmail must be a valid email address"))]
    pub notify_email: Option<String>,
}

impl RenderParameters {
    pub fn new(outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            outputs: outputs.into_iter().map(Into::into).collect(),
            notify_email: None,
        }
    }

    pub fn with_notify_email(mut self, email: impl Into<String>) -> Self {
        self.notify_email = Some(email.into());
        self
    }

    /// Run validation, converting failures into [`CoreError::Validation`].
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|errors| CoreError::Validation(errors.to_string()))
    }
}

/// Output names are lowercase identifiers and must not repeat.
#[allow(clippy::ptr_arg)]
fn validate_output_names(outputs: &Vec<String>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for name in outputs {
        let well_formed = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !well_formed {
            return Err(ValidationError::new("invalid_output_name").with_message(Cow::Owned(
                format!("output '{name}' must be a lowercase identifier"),
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::new("duplicate_output").with_message(Cow::Owned(
                format!("output '{name}' is listed more than once"),
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn accepts_simple_selection() {
        let params = RenderParameters::new(["petition", "summons"]).with_notify_email("a@b.org");
        assert!(params.check().is_ok());
    }

    #[test]
    fn rejects_empty_selection() {
        let params = RenderParameters::new(Vec::<String>::new());
        assert_matches!(params.check(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_too_many_outputs() {
        let params = RenderParameters::new((0..=MAX_OUTPUTS).map(|i| format!("doc_{i}")));
        assert_matches!(params.check(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_duplicates() {
        let params = RenderParameters::new(["petition", "petition"]);
        assert_matches!(params.check(), Err(CoreError::Validation(msg)) if msg.contains("more than once"));
    }

    #[test]
    fn rejects_malformed_names() {
        let params = RenderParameters::new(["Petition Form"]);
        assert_matches!(params.check(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_bad_email() {
        let params = RenderParameters::new(["petition"]).with_notify_email("not-an-email");
        assert_matches!(params.check(), Err(CoreError::Validation(msg)) if msg.contains("notifyEmail"));
    }

    #[test]
    fn deserializes_camel_case() {
        let params: RenderParameters =
            serde_json::from_value(serde_json::json!({"outputs": ["a"], "notifyEmail": "x@y.io"}))
                .unwrap();
        assert_eq!(params.notify_email.as_deref(), Some("x@y.io"));
    }
}
