use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The origin of a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person typing (or speaking) into the widget.
    User,

    /// The automated responder behind the chat endpoint.
    Bot,
}

impl Speaker {
    /// The CSS class used for rows and bubbles of this speaker.
    pub fn css_class(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Bot => "bot",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

/// Error returned when parsing an invalid speaker string.
#[derive(Debug)]
pub struct SpeakerParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for SpeakerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown speaker: {}", self.invalid_value)
    }
}

impl std::error::Error for SpeakerParseError {}

impl FromStr for Speaker {
    type Err = SpeakerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Speaker::User),
            "bot" => Ok(Speaker::Bot),
            _ => Err(SpeakerParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// One chat turn.
///
/// Messages are immutable once created: the fields are private and there
/// are no setters.  A session only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    speaker: Speaker,
    text: String,
}

impl Message {
    /// Create a message from a speaker and its text.
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    /// Create a bot message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Speaker::Bot, text)
    }

    /// Who said it.
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    /// What was said.
    pub fn text(&self) -> &str {
        &self.text
    }
}
