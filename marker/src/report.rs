//! # Feedback Report Module
//!
//! The serializable result of a [`crate::FeedbackJob`], returned verbatim as the success
//! body of `POST /api/feedback`.
//!
//! ## JSON Output Example
//!
//! ```json
//! {
//!   "status": "completed",
//!   "submission": "an importent policys decision",
//!   "feedback": [
//!     {
//!       "category": "SPaG",
//!       "incorrect_text": "importent",
//!       "feedback_text": "important",
//!       "citation": null,
//!       "start": [3],
//!       "end": [12],
//!       "colour": "orange"
//!     }
//!   ],
//!   "failed_categories": ["marking"]
//! }
//! ```
//!
//! `failed_categories` is omitted when every category parsed.

use crate::formatter::FormattedFeedback;
use crate::types::{FeedbackCategory, FeedbackRecord, Submission};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub status: ReportStatus,
    /// Submission text, or the uploaded file's name for file submissions.
    pub submission: String,
    pub feedback: Vec<FeedbackRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_categories: Vec<FeedbackCategory>,
}

impl FeedbackReport {
    pub fn completed(submission: &Submission, formatted: FormattedFeedback) -> Self {
        Self {
            status: ReportStatus::Completed,
            submission: submission.display_text(),
            feedback: formatted.records,
            failed_categories: formatted.failed_categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_categories_omitted_when_empty() {
        let report = FeedbackReport::completed(
            &Submission::Text("essay".into()),
            FormattedFeedback::default(),
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"status": "completed", "submission": "essay", "feedback": []})
        );
    }

    #[test]
    fn failed_categories_listed() {
        let report = FeedbackReport::completed(
            &Submission::Text("essay".into()),
            FormattedFeedback {
                records: vec![],
                failed_categories: vec![FeedbackCategory::Marking],
            },
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["failed_categories"], json!(["marking"]));
    }

    #[test]
    fn saved_report_deserializes() {
        let saved = json!({
            "status": "completed",
            "submission": "an importent decision",
            "feedback": [{
                "category": "SPaG",
                "incorrect_text": "importent",
                "feedback_text": "important",
                "citation": null,
                "start": [3],
                "end": [12],
                "colour": "orange"
            }]
        });
        let report: FeedbackReport = serde_json::from_value(saved).unwrap();
        assert_eq!(report.feedback.len(), 1);
        assert!(report.failed_categories.is_empty());
    }
}
