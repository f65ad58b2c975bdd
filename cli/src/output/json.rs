//! JSON output helpers for `--json`.

use anyhow::{Context, Result};

use crate::domain::{BakeError, BakedImage, ConfigError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format the result of a successful bake.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_image(image: &BakedImage) -> Result<String> {
    let obj = serde_json::json!({
        "image_id": image.image_id,
        "name": image.name,
        "instance_id": image.instance_id,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable code for a top-level error.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(bake) = err.downcast_ref::<BakeError>() {
        return bake.code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "config";
    }
    "error"
}
