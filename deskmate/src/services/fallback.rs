//! Where failures in the answer pipeline turn into something a user can read.
//!
//! Components return `Result`; the decision to degrade to a fixed reply or a
//! default label is made here and nowhere else.

use crate::error::{DeskmateError, ErrorKind, Result};
use crate::intelligence::Intent;

/// Sent when the model produced nothing usable or could not be reached.
pub const FALLBACK_ANSWER: &str = "I'm sorry, I couldn't prepare an answer right now. \
Please try again later or contact the IT support department.";

/// Sent when the pipeline itself failed (retrieval, storage).
pub const GENERIC_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

fn log_failure(stage: &str, error: &DeskmateError) {
    match error.kind() {
        ErrorKind::MalformedOutput => {
            tracing::warn!(stage, error = %error, "Model output unusable, using fallback")
        }
        ErrorKind::Configuration => {
            tracing::error!(stage, error = %error, "Misconfigured service, using fallback")
        }
        _ => tracing::error!(stage, error = %error, "Service call failed, using fallback"),
    }
}

/// Generated text, or [`FALLBACK_ANSWER`] when generation failed or came back blank.
pub fn answer_or_fallback(result: Result<String>) -> String {
    match result {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!(stage = "generate", "Model returned blank text, using fallback");
            FALLBACK_ANSWER.to_string()
        }
        Err(e) => {
            log_failure("generate", &e);
            FALLBACK_ANSWER.to_string()
        }
    }
}

/// Classified intent, or `Question` when classification failed.
pub fn intent_or_default(result: Result<Intent>) -> Intent {
    match result {
        Ok(intent) => intent,
        Err(e) => {
            log_failure("classify", &e);
            Intent::Question
        }
    }
}

/// Pass a pipeline result through, or log it and hand back
/// [`GENERIC_APOLOGY`] for the user.
pub fn reply_or_apology<T>(result: Result<T>) -> std::result::Result<T, &'static str> {
    result.map_err(|e| {
        log_failure("pipeline", &e);
        GENERIC_APOLOGY
    })
}
