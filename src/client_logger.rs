//! Logging trait for chat client operations.
//!
//! This module provides the [`ClientLogger`] trait that lets callers observe
//! every request passing through [`crate::ChatApi`], and [`TracingLogger`],
//! which forwards them to `tracing`.

use crate::error::Error;
use crate::types::{ChatReply, ChatRequest, SpeechRequest};

/// A trait for logging chat client operations.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
/// use tabchat::{ChatReply, ChatRequest, ClientLogger, Error};
///
/// #[derive(Default)]
/// struct Transcript {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl ClientLogger for Transcript {
///     fn log_request(&self, request: &ChatRequest) {
///         self.lines.lock().unwrap().push(format!("> {}", request.message));
///     }
///
///     fn log_reply(&self, _request: &ChatRequest, reply: &ChatReply) {
///         self.lines.lock().unwrap().push(format!("< {}", reply.text));
///     }
///
///     fn log_failure(&self, _request: &ChatRequest, error: &Error) {
///         self.lines.lock().unwrap().push(format!("! {error}"));
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Called before a chat request is sent.
    fn log_request(&self, request: &ChatRequest);

    /// Called once per successful chat request.
    fn log_reply(&self, request: &ChatRequest, reply: &ChatReply);

    /// Called once per failed chat request, whatever the cause.
    fn log_failure(&self, request: &ChatRequest, error: &Error);

    /// Called when a speech clip is requested.
    fn log_speech_request(&self, _request: &SpeechRequest) {}
}

/// Logs chat traffic through `tracing`.
///
/// Requests are logged at debug level, failures at warn.  Message text is
/// only included at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn log_request(&self, request: &ChatRequest) {
        tracing::debug!(chat = %request.chat, len = request.message.len(), "chat request");
        tracing::trace!(chat = %request.chat, message = %request.message, "chat request body");
    }

    fn log_reply(&self, request: &ChatRequest, reply: &ChatReply) {
        tracing::debug!(
            chat = %request.chat,
            len = reply.text.len(),
            emotion = ?reply.emotion,
            "chat reply"
        );
    }

    fn log_failure(&self, request: &ChatRequest, error: &Error) {
        tracing::warn!(chat = %request.chat, error = %error, "chat request failed");
    }

    fn log_speech_request(&self, request: &SpeechRequest) {
        tracing::debug!(
            voice = ?request.voice,
            rate = ?request.rate,
            pitch = ?request.pitch,
            "speech clip request"
        );
    }
}
