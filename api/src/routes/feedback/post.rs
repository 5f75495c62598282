use super::common::{FeedbackForm, MultipartFields, RequestError, check_mark_scheme, store_upload};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use marker::FeedbackJob;
use marker::report::FeedbackReport;
use marker::types::Submission;
use std::time::Duration;
use tracing::info;
use util::config;

/// POST /api/feedback
///
/// Generate structured feedback for one student submission against a mark scheme.
/// The model is asked for each feedback category in turn; replies are repaired,
/// split into records and, for text submissions, located in the submission.
///
/// ### Request Body (Multipart Form Data)
/// - `assignment_id`, `assignment_title`, `question_id`, `question_title`,
///   `subject`, `qualification` (string, required)
/// - `mark_scheme` (file, required): `.txt`, `.md`, `.png`, `.jpg`, `.jpeg`, `.gif`, `.webp` or `.pdf`
/// - `submission` (string or file, required): the student's answer. A non-empty
///   uploaded file takes precedence over a text value.
/// - `model` (string, optional): `openai` (default), `anthropic` or `gemini`
/// - `max_completion_tokens` (integer, optional): 1 to 32000
/// - `temperature` (number, optional): 0 to 2
///
/// ### Responses
///
/// - `200 OK`
/// ```json
/// {
///   "status": "completed",
///   "submission": "an importent decision",
///   "feedback": [
///     {
///       "category": "SPaG",
///       "incorrect_text": "importent",
///       "feedback_text": "important",
///       "citation": null,
///       "start": [3],
///       "end": [12],
///       "colour": "orange"
///     }
///   ]
/// }
/// ```
///
/// - `400 Bad Request`
/// ```json
/// {
///   "success": false,
///   "data": null,
///   "message": "Missing required field: subject" // or "Unsupported mark scheme file type: .docx. Allowed: ..." etc.
/// }
/// ```
///
/// - `413 Payload Too Large` when an upload exceeds `MAX_UPLOAD_BYTES`
/// - `429 Too Many Requests` when the client IP exceeds `RATE_LIMIT_PER_MINUTE`
///   (a `Retry-After` header gives the wait in seconds)
/// - `502 Bad Gateway` when the model provider returns an error
/// - `504 Gateway Timeout` when the provider or the whole request runs out of time
/// - `500 Internal Server Error`
/// ```json
/// {
///   "success": false,
///   "data": null,
///   "message": "An unexpected error occurred"
/// }
/// ```
pub async fn generate_feedback(State(app_state): State<AppState>, multipart: Multipart) -> Response {
    match handle(app_state, multipart).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle(app_state: AppState, multipart: Multipart) -> Result<FeedbackReport, RequestError> {
    let mut fields = MultipartFields::collect(multipart).await?;
    let form = FeedbackForm::from_fields(&fields.text)?;

    check_mark_scheme(fields.files.get("mark_scheme"))?;
    let provider = app_state.providers().get(form.model)?;

    let text_submission = fields
        .text
        .get("submission")
        .filter(|s| !s.trim().is_empty())
        .cloned();
    let file_submission = fields
        .files
        .remove("submission")
        .filter(|f| !f.bytes.is_empty());
    let submission = match (file_submission, text_submission) {
        (Some(file), _) => {
            store_upload("submission", &form.assignment_id, &file).await?;
            Submission::File(file.into_attachment())
        }
        (None, Some(text)) => Submission::Text(text),
        (None, None) => {
            return Err(RequestError::BadRequest(
                "Missing required field: submission".into(),
            ));
        }
    };

    let mark_scheme = fields
        .files
        .remove("mark_scheme")
        .ok_or_else(|| RequestError::BadRequest("Missing required file: mark_scheme".into()))?;
    store_upload("mark_scheme", &form.assignment_id, &mark_scheme).await?;

    info!(
        assignment_id = %form.assignment_id,
        question_id = %form.question_id,
        provider = %form.model,
        "generating feedback"
    );

    let job = FeedbackJob::new(form.context(), submission, mark_scheme.into_attachment(), provider)
        .with_params(form.params())
        .with_call_timeout(Duration::from_secs(config::provider_timeout_secs().max(1)));

    let limit = config::request_timeout_secs().max(1);
    let report = tokio::time::timeout(Duration::from_secs(limit), job.run())
        .await
        .map_err(|_| RequestError::Timeout(limit))??;
    Ok(report)
}
