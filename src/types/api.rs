use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::TabId;

/// Content type assumed for speech clips that arrive without one.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message, already trimmed.
    pub message: String,

    /// The tab the message was typed into.
    pub chat: TabId,
}

impl ChatRequest {
    /// Create a chat request for `tab`.
    pub fn new(message: impl Into<String>, chat: TabId) -> Self {
        Self {
            message: message.into(),
            chat,
        }
    }
}

/// Body returned by `POST /api/chat`.
///
/// The endpoint answers either `{"reply": ...}` or `{"error": ...}`.  Both
/// fields are optional here so one type covers both shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The bot's reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    /// Application-level failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Echo of the tab the endpoint answered for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<TabId>,

    /// Sentiment of the reply in [-1, 1], when the endpoint scores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<f32>,
}

impl ChatResponse {
    /// Convert the wire shape into a reply, mapping an `error` field to the
    /// same failure path as a non-2xx status.
    pub fn into_reply(self) -> Result<ChatReply> {
        if let Some(error) = self.error {
            return Err(Error::bad_request(error, None));
        }
        match self.reply {
            Some(text) => Ok(ChatReply {
                text,
                emotion: self.emotion,
            }),
            None => Err(Error::serialization("response has no reply", None)),
        }
    }
}

/// A successful answer from the chat endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// The bot's reply text.
    pub text: String,

    /// Sentiment of the reply, if the endpoint provided one.
    pub emotion: Option<f32>,
}

impl ChatReply {
    /// Create a reply without a sentiment score.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion: None,
        }
    }
}

/// Body of `POST /api/tts`.
///
/// This is the only request shape the widget sends.  Emotion-dependent
/// delivery is resolved client-side into `rate` and `pitch` before the
/// request is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    /// The text to synthesize.
    pub text: String,

    /// Remote voice name, e.g. `zh-CN-YunxiNeural`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Relative speaking rate, e.g. `-10%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,

    /// Relative pitch, e.g. `+2Hz`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
}

impl SpeechRequest {
    /// Create a request that lets the endpoint pick every voice parameter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            rate: None,
            pitch: None,
        }
    }

    /// Sets the voice.
    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    /// Sets the rate.
    pub fn with_rate(mut self, rate: Option<String>) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the pitch.
    pub fn with_pitch(mut self, pitch: Option<String>) -> Self {
        self.pitch = pitch;
        self
    }
}

/// A rendered speech clip returned by `POST /api/tts`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    bytes: Bytes,
    content_type: Option<String>,
}

impl AudioClip {
    /// Wrap raw audio bytes.
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// The encoded audio.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The content type reported by the endpoint, or the default.
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
    }

    /// True when the endpoint returned no audio at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encode the clip as a `data:` URL for hosts that play clips through a
    /// media element.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_uses_chat_field_for_the_tab() {
        let request = ChatRequest::new("hello", TabId::new("chat1"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hello", "chat": "chat1"}));
    }

    #[test]
    fn response_with_reply() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"reply": "hi", "chat": "chat1"}"#).unwrap();
        let reply = response.into_reply().unwrap();
        assert_eq!(reply.text, "hi");
        assert_eq!(reply.emotion, None);
    }

    #[test]
    fn response_error_field_wins_over_reply() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"reply": "leak", "error": "nope"}"#).unwrap();
        let err = response.into_reply().unwrap_err();
        assert!(err.is_bad_request());
        assert!(!err.to_string().contains("leak"));
    }

    #[test]
    fn response_without_reply_is_an_error() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_reply().is_err());
    }

    #[test]
    fn speech_request_omits_unset_fields() {
        let request = SpeechRequest::new("hi").with_voice(Some("zh-CN-YunxiNeural".into()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "hi", "voice": "zh-CN-YunxiNeural"})
        );
    }

    #[test]
    fn clip_data_url() {
        let clip = AudioClip::new(Bytes::from_static(b"ID3"), None);
        assert_eq!(clip.to_data_url(), "data:audio/mpeg;base64,SUQz");
        let wav = AudioClip::new(Bytes::from_static(b""), Some("audio/wav".into()));
        assert!(wav.is_empty());
        assert_eq!(wav.content_type(), "audio/wav");
    }
}
