//! # Marker Library
//!
//! This crate turns a student's submission and a mark scheme into structured, highlightable
//! feedback by asking a language model one category at a time.
//!
//! ## Key Concepts
//! - **FeedbackJob**: one submission's run through every [`FeedbackCategory`], in order,
//!   over a single growing conversation.
//! - **ChatProvider**: the pluggable model backend ([`traits::provider::ChatProvider`]).
//! - **Formatter**: repairs raw replies, splits bullets and locates corrections in the
//!   submission ([`formatter`]).
//! - **Highlight**: merges located spans into blended colour runs for display ([`highlight`]).

pub mod error;
pub mod formatter;
pub mod highlight;
pub mod parsers;
pub mod prompts;
pub mod report;
pub mod traits;
pub mod types;
pub mod utilities;

use crate::error::{FeedbackError, ProviderError};
use crate::formatter::format_outputs;
use crate::report::FeedbackReport;
use crate::traits::provider::ChatProvider;
use crate::types::{
    AssignmentContext, Attachment, Conversation, FeedbackCategory, GenerationParams, Message,
    RawCategoryOutput, Role, Submission,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Feedback generation for a single submission.
///
/// # Fields
/// - `context`: assignment and question metadata used in the prompts.
/// - `submission`: the student's work, text or file.
/// - `mark_scheme`: attached to the opening turn of the conversation.
/// - `provider`: the model backend every category prompt is sent to.
/// - `params`: token limit and temperature forwarded on each call.
/// - `call_timeout`: optional deadline per provider call.
/// - `categories`: categories to request, in order.
pub struct FeedbackJob {
    context: AssignmentContext,
    submission: Submission,
    mark_scheme: Attachment,
    provider: Arc<dyn ChatProvider>,
    params: GenerationParams,
    call_timeout: Option<Duration>,
    categories: Vec<FeedbackCategory>,
}

impl FeedbackJob {
    /// Create a job requesting all four categories with default generation parameters.
    pub fn new(
        context: AssignmentContext,
        submission: Submission,
        mark_scheme: Attachment,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            context,
            submission,
            mark_scheme,
            provider,
            params: GenerationParams::default(),
            call_timeout: None,
            categories: FeedbackCategory::ALL.to_vec(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Bound each provider call; an elapsed deadline fails the job with [`ProviderError::Timeout`].
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Restrict the job to a subset of categories. Order is normalised to declaration order.
    pub fn with_categories(mut self, categories: &[FeedbackCategory]) -> Self {
        self.categories = FeedbackCategory::ALL
            .into_iter()
            .filter(|c| categories.contains(c))
            .collect();
        self
    }

    fn validate(&self) -> Result<(), FeedbackError> {
        if let Submission::Text(text) = &self.submission {
            if text.trim().is_empty() {
                return Err(FeedbackError::InvalidInput("submission is empty".into()));
            }
        }
        if self.mark_scheme.data.is_empty() {
            return Err(FeedbackError::InvalidInput("mark scheme is empty".into()));
        }
        Ok(())
    }

    async fn call(&self, conversation: &Conversation) -> Result<String, ProviderError> {
        let request = self.provider.complete(conversation, &self.params);
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| ProviderError::Timeout(self.provider.name().to_string()))?,
            None => request.await,
        }
    }

    /// Run every category in order and format the replies.
    ///
    /// Each category prompt and its reply are appended to the shared conversation so later
    /// categories see earlier feedback. A reply that cannot be parsed marks its category as
    /// failed; a provider error aborts the whole job.
    pub async fn run(self) -> Result<FeedbackReport, FeedbackError> {
        self.validate()?;

        let mut conversation =
            prompts::opening_conversation(&self.context, &self.submission, &self.mark_scheme);
        let mut outputs = Vec::with_capacity(self.categories.len());

        for &category in &self.categories {
            conversation.push(Message::text(
                Role::User,
                prompts::category_prompt(category, &self.context),
            ));
            info!(
                assignment_id = %self.context.assignment_id,
                provider = self.provider.name(),
                %category,
                "requesting feedback"
            );
            let reply = self.call(&conversation).await?;
            debug!(%category, chars = reply.chars().count(), "received reply");
            conversation.push(Message::text(Role::Assistant, reply.clone()));
            outputs.push(RawCategoryOutput {
                category,
                text: reply,
            });
        }

        let formatted = format_outputs(&outputs, &self.submission);
        info!(
            assignment_id = %self.context.assignment_id,
            records = formatted.records.len(),
            failed = formatted.failed_categories.len(),
            "feedback complete"
        );
        Ok(FeedbackReport::completed(&self.submission, formatted))
    }
}
