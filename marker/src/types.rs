//! # Types Module
//!
//! This module defines the core data structures used throughout the feedback pipeline:
//! feedback categories and their colours, the formatted [`FeedbackRecord`], submissions,
//! and the conversation model exchanged with chat providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Shape of the bullets a category asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletShape {
    /// `incorrect -> correct` pairs, located in the submission.
    Correction,
    /// Free-form comment strings, never located.
    Comment,
}

/// One of the four fixed feedback dimensions.
///
/// Declaration order is processing order: later prompts see earlier replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackCategory {
    #[serde(rename = "SPaG")]
    Spag,
    #[serde(rename = "historical_accuracy")]
    HistoricalAccuracy,
    #[serde(rename = "overall_comments")]
    OverallComments,
    #[serde(rename = "marking")]
    Marking,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 4] = [
        FeedbackCategory::Spag,
        FeedbackCategory::HistoricalAccuracy,
        FeedbackCategory::OverallComments,
        FeedbackCategory::Marking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackCategory::Spag => "SPaG",
            FeedbackCategory::HistoricalAccuracy => "historical_accuracy",
            FeedbackCategory::OverallComments => "overall_comments",
            FeedbackCategory::Marking => "marking",
        }
    }

    pub fn shape(&self) -> BulletShape {
        match self {
            FeedbackCategory::Spag | FeedbackCategory::HistoricalAccuracy => {
                BulletShape::Correction
            }
            FeedbackCategory::OverallComments | FeedbackCategory::Marking => BulletShape::Comment,
        }
    }

    pub fn colour(&self) -> Colour {
        match self {
            FeedbackCategory::Spag => Colour::Orange,
            FeedbackCategory::HistoricalAccuracy => Colour::Blue,
            FeedbackCategory::OverallComments => Colour::Green,
            FeedbackCategory::Marking => Colour::Purple,
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display colour bound to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    Orange,
    Blue,
    Green,
    Purple,
}

impl Colour {
    pub fn rgb(&self) -> Rgb {
        match self {
            Colour::Orange => Rgb::new(0xff, 0xa5, 0x00),
            Colour::Blue => Rgb::new(0x89, 0xcf, 0xf0),
            Colour::Green => Rgb::new(0x90, 0xee, 0x90),
            Colour::Purple => Rgb::new(0xcb, 0xc3, 0xe3),
        }
    }
}

/// A concrete 24-bit colour, printed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Arithmetic mean of each channel, rounded down. `None` for an empty slice.
    pub fn blend(colours: &[Rgb]) -> Option<Rgb> {
        if colours.is_empty() {
            return None;
        }
        let n = colours.len() as u32;
        let (r, g, b) = colours.iter().fold((0u32, 0u32, 0u32), |(r, g, b), c| {
            (r + c.r as u32, g + c.g as u32, b + c.b as u32)
        });
        Some(Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A `[start, end)` character-offset range into the submission text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One formatted feedback item.
///
/// `spans` is `None` when location does not apply (comment categories, file
/// submissions) and `Some(vec![])` when the phrase was searched for but not found.
///
/// On the wire the spans travel as parallel `start` / `end` arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireRecord", from = "WireRecord")]
pub struct FeedbackRecord {
    pub category: FeedbackCategory,
    pub incorrect_text: Option<String>,
    pub feedback_text: String,
    pub citation: Option<String>,
    pub spans: Option<Vec<Span>>,
    pub colour: Colour,
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
    category: FeedbackCategory,
    incorrect_text: Option<String>,
    feedback_text: String,
    citation: Option<String>,
    start: Option<Vec<usize>>,
    end: Option<Vec<usize>>,
    colour: Colour,
}

impl From<FeedbackRecord> for WireRecord {
    fn from(record: FeedbackRecord) -> Self {
        let (start, end) = match record.spans {
            Some(spans) => (
                Some(spans.iter().map(|s| s.start).collect()),
                Some(spans.iter().map(|s| s.end).collect()),
            ),
            None => (None, None),
        };
        WireRecord {
            category: record.category,
            incorrect_text: record.incorrect_text,
            feedback_text: record.feedback_text,
            citation: record.citation,
            start,
            end,
            colour: record.colour,
        }
    }
}

impl From<WireRecord> for FeedbackRecord {
    fn from(wire: WireRecord) -> Self {
        let spans = match (wire.start, wire.end) {
            (Some(starts), Some(ends)) => Some({
                if starts.len() != ends.len() {
                    warn!(
                        starts = starts.len(),
                        ends = ends.len(),
                        feedback_text = %wire.feedback_text,
                        "start/end arrays differ in length, unpaired offsets dropped"
                    );
                }
                starts
                    .into_iter()
                    .zip(ends)
                    .map(|(start, end)| Span::new(start, end))
                    .collect()
            }),
            _ => None,
        };
        FeedbackRecord {
            category: wire.category,
            incorrect_text: wire.incorrect_text,
            feedback_text: wire.feedback_text,
            citation: wire.citation,
            spans,
            colour: wire.colour,
        }
    }
}

/// Unparsed model text for one category.
#[derive(Debug, Clone)]
pub struct RawCategoryOutput {
    pub category: FeedbackCategory,
    pub text: String,
}

/// Binary content sent to a provider alongside the prompt (mark schemes, uploaded submissions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn is_text(&self) -> bool {
        self.media_type.starts_with("text/")
    }

    /// UTF-8 content of a text attachment, lossily decoded.
    pub fn text_content(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// What the student handed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Literal text; corrections are located inside it.
    Text(String),
    /// An uploaded file; opaque to span location.
    File(Attachment),
}

impl Submission {
    /// The text reported back to the client: the submission itself, or the uploaded file name.
    pub fn display_text(&self) -> String {
        match self {
            Submission::Text(text) => text.clone(),
            Submission::File(file) => file.file_name.clone(),
        }
    }
}

/// Identifiers and titles describing what is being assessed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentContext {
    pub assignment_id: String,
    pub assignment_title: String,
    pub question_id: String,
    pub question_title: String,
    pub subject: String,
    pub qualification: String,
}

/// Sampling options forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_completion_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_completion_tokens: 1000,
            temperature: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    Text(String),
    Attachment(Attachment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    /// Concatenated text parts, ignoring attachments.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text(t) => Some(t.as_str()),
                MessagePart::Attachment(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Ordered chat history shared by every category of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// System instructions (all system messages joined), if any.
    pub fn system_prompt(&self) -> Option<String> {
        let joined = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(Message::joined_text)
            .collect::<Vec<_>>()
            .join("\n\n");
        if joined.is_empty() { None } else { Some(joined) }
    }

    /// Non-system messages in order.
    pub fn turns(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }
}
