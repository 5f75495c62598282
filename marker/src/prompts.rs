//! # Prompts
//!
//! The fixed conversation used for every feedback job: system instructions describing the
//! JSON reply contract, a user turn carrying the submission and mark scheme, a short
//! assistant acknowledgement, and then one user prompt per [`FeedbackCategory`].

use crate::types::{
    AssignmentContext, Attachment, BulletShape, Conversation, FeedbackCategory, Message,
    MessagePart, Role, Submission,
};

/// Assistant turn inserted after the materials so providers that require alternating
/// roles accept the first category prompt.
pub const MATERIALS_ACK: &str = "I have read the submission and the mark scheme. \
I will give feedback one category at a time, in the requested JSON format.";

/// JSON key the model is asked to use for each category.
pub fn category_title(category: FeedbackCategory) -> &'static str {
    match category {
        FeedbackCategory::Spag => "Spelling, Punctuation and Grammar",
        FeedbackCategory::HistoricalAccuracy => {
            "Historical Accuracy and Analysis of Cause and Effect"
        }
        FeedbackCategory::OverallComments => "Overall Comments and Areas for Improvement",
        FeedbackCategory::Marking => "Marking",
    }
}

pub fn system_instructions(ctx: &AssignmentContext) -> String {
    format!(
        "You are an experienced assessor of {qualification}-level {subject}. \
You are marking the assignment '{assignment}', question '{question}'. \
Give accurate, thorough feedback, using the attached mark scheme where relevant.\n\n\
Feedback is requested one category at a time. For each request reply with a single JSON \
object whose only key is the category title and whose value is a list of bullet strings:\n\
{{\n    \"<category title>\": [\n        \"- first point\",\n        \"- second point\"\n    ]\n}}\n\n\
Write nothing outside that JSON object. Use double quotes for every JSON string and \
reserve single quotes for apostrophes inside the text.",
        qualification = ctx.qualification,
        subject = ctx.subject,
        assignment = ctx.assignment_title,
        question = ctx.question_title,
    )
}

/// Text attachments are inlined; binary ones travel as attachments.
fn attachment_parts(label: &str, attachment: &Attachment) -> Vec<MessagePart> {
    if attachment.is_text() {
        vec![MessagePart::Text(format!(
            "{label} ({}):\n{}",
            attachment.file_name,
            attachment.text_content()
        ))]
    } else {
        vec![
            MessagePart::Text(format!("{label} is attached as '{}'.", attachment.file_name)),
            MessagePart::Attachment(attachment.clone()),
        ]
    }
}

/// The user turn carrying the student's work and the mark scheme.
pub fn materials_message(submission: &Submission, mark_scheme: &Attachment) -> Message {
    let mut parts = match submission {
        Submission::Text(text) => vec![MessagePart::Text(format!(
            "The student's submission is below.\n\n{text}"
        ))],
        Submission::File(file) => attachment_parts("The student's submission", file),
    };
    parts.extend(attachment_parts("The mark scheme", mark_scheme));
    parts.push(MessagePart::Text(
        "Read both carefully and wait for the feedback categories.".to_string(),
    ));
    Message {
        role: Role::User,
        parts,
    }
}

/// Conversation every category prompt is appended to.
pub fn opening_conversation(
    ctx: &AssignmentContext,
    submission: &Submission,
    mark_scheme: &Attachment,
) -> Conversation {
    let mut conversation = Conversation::default();
    conversation.push(Message::text(Role::System, system_instructions(ctx)));
    conversation.push(materials_message(submission, mark_scheme));
    conversation.push(Message::text(Role::Assistant, MATERIALS_ACK));
    conversation
}

pub fn category_prompt(category: FeedbackCategory, ctx: &AssignmentContext) -> String {
    let (task, bullet_format, quantity) = match category {
        FeedbackCategory::Spag => (
            "List corrections for spelling, punctuation and grammar mistakes.",
            "- incorrect word/phrase -> correct word/phrase",
            "Give one bullet per distinct mistake, even if it occurs several times.",
        ),
        FeedbackCategory::HistoricalAccuracy => (
            "List corrections for errors of historical fact, awareness of the time period, \
or reasoning about cause and effect.",
            "- incorrect fact/reasoning -> corrected fact/reasoning",
            "Give as many corrections as needed.",
        ),
        FeedbackCategory::OverallComments => (
            "Give overall comments on the work and suggestions for how the student can improve it.",
            "- comment or suggestion",
            "Give at most 3 bullets, addressed directly to the student.",
        ),
        FeedbackCategory::Marking => (
            "Estimate the marks the work would receive, applying the mark scheme closely.",
            "- marking comment",
            "Give at most 3 bullets, addressed directly to the student.",
        ),
    };
    let quoting = match category.shape() {
        BulletShape::Correction => {
            "\nQuote the incorrect text EXACTLY as it appears in the submission, \
with ' -> ' between it and the correction."
        }
        BulletShape::Comment => "",
    };
    format!(
        "{title}: {task}\n\
Reply only with this JSON, containing only feedback for this category:\n\
{{\n    \"{title}\": [\n        \"{bullet_format}\",\n        \"- ...\"\n    ]\n}}{quoting}\n\
{quantity} Pitch the feedback at a {qualification}-level {subject} student.",
        title = category_title(category),
        qualification = ctx.qualification,
        subject = ctx.subject,
    )
}
