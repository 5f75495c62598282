//! Request parsing, validation and error mapping for `POST /api/feedback`.

use crate::response::ApiResponse;
use ai::ProviderKind;
use axum::{
    Json,
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use marker::error::{FeedbackError, ProviderError};
use marker::types::{AssignmentContext, Attachment, GenerationParams};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, warn};
use util::{config, paths};
use validator::{Validate, ValidationErrors};

/// Mark scheme formats the providers can read.
pub const MARK_SCHEME_EXTENSIONS: [&str; 8] =
    [".txt", ".md", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".pdf"];

/// Scalar form fields every request must carry.
pub const REQUIRED_TEXT_FIELDS: [&str; 6] = [
    "assignment_id",
    "assignment_title",
    "question_id",
    "question_title",
    "subject",
    "qualification",
];

/// Everything that can go wrong while serving a feedback request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Missing, empty or invalid input. Maps to `400`.
    #[error("{0}")]
    BadRequest(String),
    /// An upload over `MAX_UPLOAD_BYTES`. Maps to `413`.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// A model provider failure, mapped by kind.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The whole request ran past `REQUEST_TIMEOUT_SECS` (the value in seconds).
    #[error("feedback generation did not finish within {0} seconds")]
    Timeout(u64),
    /// Server-side failure; the detail is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl From<FeedbackError> for RequestError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::Provider(e) => RequestError::Provider(e),
            FeedbackError::InvalidInput(msg) => RequestError::BadRequest(msg),
        }
    }
}

impl RequestError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Provider(ProviderError::NotConfigured(_)) => StatusCode::BAD_REQUEST,
            RequestError::Provider(ProviderError::Timeout(_)) | RequestError::Timeout(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            RequestError::Provider(_) => StatusCode::BAD_GATEWAY,
            RequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            RequestError::Provider(e) => e.is_retryable(),
            RequestError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            RequestError::Internal(_) => "An unexpected error occurred".to_string(),
            RequestError::Provider(ProviderError::NotConfigured(name)) => {
                format!("Model provider '{name}' is not configured on this server")
            }
            RequestError::Provider(e) if self.is_retryable() => {
                format!("Model provider error: {e}. Please retry later")
            }
            RequestError::Provider(e) => format!("Model provider error: {e}"),
            RequestError::Timeout(_) => format!("{self}. Please retry later"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "feedback request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "feedback request rejected");
        }
        (status, Json(ApiResponse::<()>::error(self.message()))).into_response()
    }
}

/// Joins every validator message into one sorted, `; `-separated string.
///
/// # Arguments
///
/// * `errors` - The errors returned by [`Validate::validate`].
///
/// # Returns
///
/// * `String` - The messages in a stable order, suitable for a `400` body.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// A file field received in the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name as sent by the client.
    pub file_name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lower-cased extension with its leading dot, or empty when there is none.
    pub fn extension(&self) -> String {
        paths::extension_of(&self.file_name)
    }

    /// MIME type guessed from the file name, `application/octet-stream` when unknown.
    pub fn media_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Converts the upload into an [`Attachment`] the providers can send.
    pub fn into_attachment(self) -> Attachment {
        let media_type = self.media_type();
        Attachment::new(self.file_name, media_type, self.bytes)
    }
}

/// Text and file fields of a multipart body, keyed by field name. Later duplicates win.
#[derive(Debug, Default)]
pub struct MultipartFields {
    /// Fields sent without a file name.
    pub text: HashMap<String, String>,
    /// Fields sent with a non-empty file name.
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartFields {
    /// Drains the multipart stream into text and file maps.
    ///
    /// # Arguments
    ///
    /// * `multipart` - The request body extractor.
    ///
    /// # Returns
    ///
    /// * `Ok(MultipartFields)` - Every named field, split by whether it carried a file name.
    /// * `Err(RequestError::PayloadTooLarge)` - If the body limit was hit while reading.
    /// * `Err(RequestError::BadRequest)` - If the body is malformed or a text field is not UTF-8.
    pub async fn collect(mut multipart: Multipart) -> Result<Self, RequestError> {
        let mut fields = Self::default();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    return Err(RequestError::PayloadTooLarge(format!(
                        "Upload exceeds the {} byte limit",
                        config::max_upload_bytes()
                    )));
                }
                Err(e) => {
                    return Err(RequestError::BadRequest(format!(
                        "Malformed multipart body: {}",
                        e.body_text()
                    )));
                }
            };
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    RequestError::PayloadTooLarge(format!(
                        "Upload exceeds the {} byte limit",
                        config::max_upload_bytes()
                    ))
                } else {
                    RequestError::BadRequest(format!("Could not read field '{name}': {}", e.body_text()))
                }
            })?;

            match file_name {
                Some(file_name) if !file_name.is_empty() => {
                    fields.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                _ => {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        RequestError::BadRequest(format!("Field '{name}' is not valid UTF-8"))
                    })?;
                    fields.text.insert(name, text);
                }
            }
        }
        Ok(fields)
    }
}

/// Validated scalar fields of the feedback form.
#[derive(Debug, Clone, Validate)]
pub struct FeedbackForm {
    /// Assignment identifier, also used to name stored uploads.
    #[validate(length(min = 1, message = "assignment_id must not be empty"))]
    pub assignment_id: String,
    /// Assignment title shown to the model.
    #[validate(length(min = 1, message = "assignment_title must not be empty"))]
    pub assignment_title: String,
    /// Question identifier.
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
    /// The question the student answered.
    #[validate(length(min = 1, message = "question_title must not be empty"))]
    pub question_title: String,
    /// Subject, e.g. `History`.
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub subject: String,
    /// Qualification, e.g. `GCSE`.
    #[validate(length(min = 1, message = "qualification must not be empty"))]
    pub qualification: String,
    /// Provider chosen by the `model` field, or `DEFAULT_PROVIDER`.
    pub model: ProviderKind,
    /// Completion token cap for every category call.
    #[validate(range(
        min = 1,
        max = 32000,
        message = "max_completion_tokens must be between 1 and 32000"
    ))]
    pub max_completion_tokens: u32,
    /// Sampling temperature for every category call.
    #[validate(range(min = 0.0, max = 2.0, message = "temperature must be between 0 and 2"))]
    pub temperature: f32,
}

fn optional_field<'a>(text: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    text.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl FeedbackForm {
    /// Reads and validates the scalar fields, applying configured defaults.
    ///
    /// # Arguments
    ///
    /// * `text` - The text fields collected from the multipart body.
    ///
    /// # Returns
    ///
    /// * `Ok(FeedbackForm)` - Trimmed, range-checked values.
    /// * `Err(RequestError::BadRequest)` - If a required field is missing or a value is out of range.
    pub fn from_fields(text: &HashMap<String, String>) -> Result<Self, RequestError> {
        for key in REQUIRED_TEXT_FIELDS {
            if !text.contains_key(key) {
                return Err(RequestError::BadRequest(format!(
                    "Missing required field: {key}"
                )));
            }
        }
        let required = |key: &str| text.get(key).map(|v| v.trim().to_string()).unwrap_or_default();

        let model = optional_field(text, "model")
            .map(str::to_string)
            .unwrap_or_else(config::default_provider)
            .parse::<ProviderKind>()
            .map_err(RequestError::BadRequest)?;

        let max_completion_tokens = match optional_field(text, "max_completion_tokens") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                RequestError::BadRequest("max_completion_tokens must be a positive integer".into())
            })?,
            None => config::default_max_completion_tokens(),
        };

        let temperature = match optional_field(text, "temperature") {
            Some(raw) => raw
                .parse::<f32>()
                .ok()
                .filter(|t| t.is_finite())
                .ok_or_else(|| RequestError::BadRequest("temperature must be a number".into()))?,
            None => config::default_temperature(),
        };

        let form = Self {
            assignment_id: required("assignment_id"),
            assignment_title: required("assignment_title"),
            question_id: required("question_id"),
            question_title: required("question_title"),
            subject: required("subject"),
            qualification: required("qualification"),
            model,
            max_completion_tokens,
            temperature,
        };

        form.validate()
            .map_err(|e| RequestError::BadRequest(format_validation_errors(&e)))?;
        Ok(form)
    }

    /// Assignment and question details for the prompts.
    ///
    /// # Returns
    ///
    /// * `AssignmentContext` - An owned copy of the six descriptive fields.
    pub fn context(&self) -> AssignmentContext {
        AssignmentContext {
            assignment_id: self.assignment_id.clone(),
            assignment_title: self.assignment_title.clone(),
            question_id: self.question_id.clone(),
            question_title: self.question_title.clone(),
            subject: self.subject.clone(),
            qualification: self.qualification.clone(),
        }
    }

    /// Sampling parameters for every provider call of this request.
    ///
    /// # Returns
    ///
    /// * `GenerationParams` - The validated token cap and temperature.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_completion_tokens: self.max_completion_tokens,
            temperature: self.temperature,
        }
    }
}

/// Checks the mark scheme's presence, size and file type.
///
/// # Arguments
///
/// * `file` - The `mark_scheme` upload, if one was sent.
///
/// # Returns
///
/// * `Ok(())` - If the file is present, non-empty and of an allowed type.
/// * `Err(RequestError::BadRequest)` - Naming the first problem found.
pub fn check_mark_scheme(file: Option<&UploadedFile>) -> Result<(), RequestError> {
    let Some(file) = file else {
        return Err(RequestError::BadRequest(
            "Missing required file: mark_scheme".into(),
        ));
    };
    if file.bytes.is_empty() {
        return Err(RequestError::BadRequest(
            "Empty file provided: mark_scheme".into(),
        ));
    }
    let ext = file.extension();
    if !MARK_SCHEME_EXTENSIONS.contains(&ext.as_str()) {
        let shown = if ext.is_empty() { "(none)" } else { ext.as_str() };
        return Err(RequestError::BadRequest(format!(
            "Unsupported mark scheme file type: {shown}. Allowed: {}",
            MARK_SCHEME_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

/// Writes an upload to `{UPLOAD_ROOT}/{field}-{assignment_id}{ext}`.
///
/// # Arguments
///
/// * `field` - Form field the file came from, used as the name prefix.
/// * `assignment_id` - Assignment the upload belongs to.
/// * `file` - The upload to write.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Where the file was written. An existing file is overwritten.
/// * `Err(RequestError::Internal)` - If the directory or file cannot be written.
pub async fn store_upload(
    field: &str,
    assignment_id: &str,
    file: &UploadedFile,
) -> Result<PathBuf, RequestError> {
    let path = paths::upload_path(field, assignment_id, &file.file_name);
    paths::ensure_parent_dir(&path)
        .map_err(|e| RequestError::Internal(format!("creating {}: {e}", path.display())))?;
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|e| RequestError::Internal(format!("writing {}: {e}", path.display())))?;
    Ok(path)
}
