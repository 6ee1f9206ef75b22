//! Voice input.
//!
//! Recognition is a two-state machine.  [`transition`] is the whole table;
//! [`SpeechInput`] runs the effects it names against the host's recognizer
//! and microphone probe.
//!
//! | state     | event         | next      | effect                          |
//! |-----------|---------------|-----------|---------------------------------|
//! | Idle      | Press         | Listening | permission check, start engine  |
//! | Listening | Press         | Idle      | stop engine                     |
//! | Listening | Transcript(t) | Listening | t replaces the input box        |
//! | Idle      | Transcript(t) | Idle      | t replaces the input box        |
//! | any       | Ended         | Idle      | finish (maybe auto-submit)      |
//! | any       | Failed(r)     | Idle      | annotate the mic button with r  |

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::observability::{
    INPUT_PERMISSION_DENIED, INPUT_RECOGNITION_ERRORS, INPUT_SESSIONS, INPUT_TRANSCRIPTS,
};

/// Tooltip when the host cannot recognize speech.
pub const UNSUPPORTED_HINT: &str = "Speech recognition is not supported here";

/// Tooltip after the microphone was refused.
pub const PERMISSION_HINT: &str = "Cannot access the microphone; check permissions";

/// A speech recognition engine.
///
/// Results arrive asynchronously and are fed back through
/// [`SpeechInput::handle_engine`].
pub trait SpeechRecognizer: Send {
    /// Begin one single-utterance recognition session in `lang`.
    fn start(&mut self, lang: &str) -> Result<()>;

    /// End the session early.  The engine still reports `Ended`.
    fn stop(&mut self);
}

/// Asks the user for microphone access.
#[async_trait]
pub trait MicrophoneProbe: Send {
    /// True if access was granted.
    async fn request_access(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenState {
    #[default]
    Idle,
    Listening,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The mic button was pressed.
    Press,
    /// The engine recognized some text.
    Transcript(String),
    /// The engine finished its session.
    Ended,
    /// The engine failed, with an error code if it gave one.
    Failed(Option<String>),
}

/// What the recognition engine reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Transcript(String),
    Ended,
    Failed(Option<String>),
}

impl From<EngineEvent> for InputEvent {
    fn from(event: EngineEvent) -> Self {
        match event {
            EngineEvent::Transcript(text) => InputEvent::Transcript(text),
            EngineEvent::Ended => InputEvent::Ended,
            EngineEvent::Failed(code) => InputEvent::Failed(code),
        }
    }
}

/// Side effects named by the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Start,
    Stop,
    Fill(String),
    Finish,
    Fail(Option<String>),
    Ignore,
}

/// The transition table.
pub fn transition(state: ListenState, event: InputEvent) -> (ListenState, Effect) {
    use ListenState::*;
    match (state, event) {
        (Idle, InputEvent::Press) => (Listening, Effect::Start),
        (Listening, InputEvent::Press) => (Idle, Effect::Stop),
        (state, InputEvent::Transcript(text)) => {
            let text = text.trim();
            if text.is_empty() {
                (state, Effect::Ignore)
            } else {
                (state, Effect::Fill(text.to_string()))
            }
        }
        (_, InputEvent::Ended) => (Idle, Effect::Finish),
        (_, InputEvent::Failed(code)) => (Idle, Effect::Fail(code)),
    }
}

/// What a press or engine event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// No recognizer on this host.
    Unsupported,
    /// The microphone is off limits for the rest of the session.
    PermissionDenied,
    /// Listening started.
    Started,
    /// Listening was stopped by the user.
    Stopped,
    /// This text should replace the input box.
    Heard(String),
    /// The session ended.  `auto_submit` is set when the input box should
    /// be sent on the user's behalf.
    Finished { auto_submit: bool },
    /// Recognition failed; `hint` is the mic button's new tooltip.
    Failed { hint: String },
    /// Nothing to do.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    Unknown,
    Granted,
    Denied,
}

/// Voice input for one widget.
pub struct SpeechInput {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    probe: Option<Box<dyn MicrophoneProbe>>,
    permission: Permission,
    state: ListenState,
    heard: bool,
    lang: String,
    auto_send: bool,
}

impl SpeechInput {
    /// Voice input in `lang`.  Without a probe, access counts as granted.
    pub fn new(
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        probe: Option<Box<dyn MicrophoneProbe>>,
        lang: impl Into<String>,
        auto_send: bool,
    ) -> Self {
        let permission = if probe.is_some() {
            Permission::Unknown
        } else {
            Permission::Granted
        };
        Self {
            recognizer,
            probe,
            permission,
            state: ListenState::Idle,
            heard: false,
            lang: lang.into(),
            auto_send,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// False once microphone access was refused.
    pub fn is_available(&self) -> bool {
        self.is_supported() && self.permission != Permission::Denied
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenState::Listening
    }

    pub fn auto_send(&self) -> bool {
        self.auto_send
    }

    /// Handle a mic button press.
    ///
    /// ```
    /// # use tabchat::Result;
    /// # use tabchat::speech::{EngineEvent, InputOutcome, SpeechInput, SpeechRecognizer};
    /// struct Quiet;
    ///
    /// impl SpeechRecognizer for Quiet {
    ///     fn start(&mut self, _lang: &str) -> Result<()> {
    ///         Ok(())
    ///     }
    ///
    ///     fn stop(&mut self) {}
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let mut input = SpeechInput::new(Some(Box::new(Quiet)), None, "zh-CN", true);
    /// assert_eq!(input.press().await, InputOutcome::Started);
    /// input.handle_engine(EngineEvent::Transcript("hello".to_string()));
    /// assert_eq!(
    ///     input.handle_engine(EngineEvent::Ended),
    ///     InputOutcome::Finished { auto_submit: true }
    /// );
    /// # });
    /// ```
    pub async fn press(&mut self) -> InputOutcome {
        if self.recognizer.is_none() {
            return InputOutcome::Unsupported;
        }
        if self.permission == Permission::Denied {
            return InputOutcome::PermissionDenied;
        }
        let (next, effect) = transition(self.state, InputEvent::Press);
        match effect {
            Effect::Start => {
                if !self.ensure_permission().await {
                    return InputOutcome::PermissionDenied;
                }
                match self.start_engine() {
                    Ok(()) => {
                        self.state = next;
                        self.heard = false;
                        INPUT_SESSIONS.click();
                        InputOutcome::Started
                    }
                    Err(err) if err.is_unsupported() => InputOutcome::Unsupported,
                    Err(err) => {
                        INPUT_RECOGNITION_ERRORS.click();
                        tracing::warn!(error = %err, "speech recognition did not start");
                        InputOutcome::Failed {
                            hint: failure_hint(&err),
                        }
                    }
                }
            }
            Effect::Stop => {
                if let Some(recognizer) = self.recognizer.as_mut() {
                    recognizer.stop();
                }
                self.state = next;
                InputOutcome::Stopped
            }
            _ => InputOutcome::Ignored,
        }
    }

    /// Handle something the engine reported.
    pub fn handle_engine(&mut self, event: EngineEvent) -> InputOutcome {
        let (next, effect) = transition(self.state, event.into());
        self.state = next;
        match effect {
            Effect::Fill(text) => {
                self.heard = true;
                INPUT_TRANSCRIPTS.click();
                InputOutcome::Heard(text)
            }
            Effect::Finish => {
                let heard = std::mem::take(&mut self.heard);
                InputOutcome::Finished {
                    auto_submit: self.auto_send && heard,
                }
            }
            Effect::Fail(code) => {
                self.heard = false;
                INPUT_RECOGNITION_ERRORS.click();
                let err = Error::recognition(code);
                tracing::warn!(error = %err, "speech recognition failed");
                InputOutcome::Failed {
                    hint: failure_hint(&err),
                }
            }
            Effect::Start | Effect::Stop | Effect::Ignore => InputOutcome::Ignored,
        }
    }

    async fn ensure_permission(&mut self) -> bool {
        if self.permission == Permission::Unknown {
            let granted = match self.probe.as_mut() {
                Some(probe) => probe.request_access().await,
                None => true,
            };
            self.permission = if granted {
                Permission::Granted
            } else {
                INPUT_PERMISSION_DENIED.click();
                tracing::info!("microphone access denied; voice input disabled");
                Permission::Denied
            };
        }
        self.permission == Permission::Granted
    }

    fn start_engine(&mut self) -> Result<()> {
        match self.recognizer.as_mut() {
            Some(recognizer) => recognizer.start(&self.lang),
            None => Err(Error::unsupported("speech recognition")),
        }
    }
}

/// The mic tooltip after a failure.
///
/// Engines that fail to start may return [`Error::Recognition`] with a code
/// of their own; it is shown the same way as a code reported mid-session.
pub fn failure_hint(err: &Error) -> String {
    match err {
        Error::Recognition { code: Some(code) } if !code.is_empty() => {
            format!("Voice error: {code}")
        }
        _ => "Speech recognition failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, s: impl Into<String>) {
            self.0.lock().unwrap().push(s.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeRecognizer(Log);

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&mut self, lang: &str) -> Result<()> {
            self.0.push(format!("start {lang}"));
            Ok(())
        }

        fn stop(&mut self) {
            self.0.push("stop");
        }
    }

    struct FakeProbe(Log, bool);

    #[async_trait]
    impl MicrophoneProbe for FakeProbe {
        async fn request_access(&mut self) -> bool {
            self.0.push("probe");
            self.1
        }
    }

    fn input(log: &Log, grant: Option<bool>, auto_send: bool) -> SpeechInput {
        let probe =
            grant.map(|g| Box::new(FakeProbe(log.clone(), g)) as Box<dyn MicrophoneProbe>);
        SpeechInput::new(
            Some(Box::new(FakeRecognizer(log.clone()))),
            probe,
            "zh-CN",
            auto_send,
        )
    }

    #[test]
    fn table() {
        use ListenState::*;
        assert_eq!(transition(Idle, InputEvent::Press), (Listening, Effect::Start));
        assert_eq!(transition(Listening, InputEvent::Press), (Idle, Effect::Stop));
        assert_eq!(
            transition(Listening, InputEvent::Transcript(" hi ".into())),
            (Listening, Effect::Fill("hi".into()))
        );
        assert_eq!(
            transition(Listening, InputEvent::Transcript("  ".into())),
            (Listening, Effect::Ignore)
        );
        assert_eq!(transition(Listening, InputEvent::Ended), (Idle, Effect::Finish));
        assert_eq!(transition(Idle, InputEvent::Ended), (Idle, Effect::Finish));
        assert_eq!(
            transition(Listening, InputEvent::Failed(Some("network".into()))),
            (Idle, Effect::Fail(Some("network".into())))
        );
    }

    #[tokio::test]
    async fn unsupported_without_recognizer() {
        let mut input = SpeechInput::new(None, None, "zh-CN", false);
        assert!(!input.is_supported());
        assert_eq!(input.press().await, InputOutcome::Unsupported);
    }

    #[tokio::test]
    async fn permission_is_probed_once() {
        let log = Log::default();
        let mut input = input(&log, Some(true), false);
        assert_eq!(input.press().await, InputOutcome::Started);
        assert_eq!(input.press().await, InputOutcome::Stopped);
        assert_eq!(input.press().await, InputOutcome::Started);
        assert_eq!(log.entries(), vec!["probe", "start zh-CN", "stop", "start zh-CN"]);
    }

    #[tokio::test]
    async fn denial_is_cached() {
        let log = Log::default();
        let mut input = input(&log, Some(false), false);
        assert_eq!(input.press().await, InputOutcome::PermissionDenied);
        assert_eq!(input.press().await, InputOutcome::PermissionDenied);
        assert!(!input.is_available());
        assert_eq!(input.state(), ListenState::Idle);
        assert_eq!(log.entries(), vec!["probe"]);
    }

    #[tokio::test]
    async fn transcript_then_end_auto_submits() {
        let log = Log::default();
        let mut input = input(&log, None, true);
        input.press().await;
        assert_eq!(
            input.handle_engine(EngineEvent::Transcript("order status".into())),
            InputOutcome::Heard("order status".into())
        );
        assert!(input.is_listening());
        assert_eq!(
            input.handle_engine(EngineEvent::Ended),
            InputOutcome::Finished { auto_submit: true }
        );
        assert_eq!(input.state(), ListenState::Idle);
    }

    #[tokio::test]
    async fn end_without_transcript_does_not_submit() {
        let log = Log::default();
        let mut input = input(&log, None, true);
        input.press().await;
        assert_eq!(
            input.handle_engine(EngineEvent::Ended),
            InputOutcome::Finished { auto_submit: false }
        );
    }

    struct Refusing(Error);

    impl SpeechRecognizer for Refusing {
        fn start(&mut self, _lang: &str) -> Result<()> {
            Err(self.0.clone())
        }

        fn stop(&mut self) {}
    }

    #[tokio::test]
    async fn engine_start_errors_become_outcomes() {
        let code = Error::recognition(Some("audio-capture".into()));
        let mut input = SpeechInput::new(Some(Box::new(Refusing(code))), None, "zh-CN", false);
        assert_eq!(
            input.press().await,
            InputOutcome::Failed {
                hint: "Voice error: audio-capture".into()
            }
        );
        assert!(!input.is_listening());

        let other = Error::speech("device busy");
        let mut input = SpeechInput::new(Some(Box::new(Refusing(other))), None, "zh-CN", false);
        assert_eq!(
            input.press().await,
            InputOutcome::Failed {
                hint: "Speech recognition failed".into()
            }
        );

        let gone = Error::unsupported("speech recognition");
        let mut input = SpeechInput::new(Some(Box::new(Refusing(gone))), None, "zh-CN", false);
        assert_eq!(input.press().await, InputOutcome::Unsupported);
    }

    #[test]
    fn hints_use_the_engine_code() {
        assert_eq!(
            failure_hint(&Error::recognition(Some("network".into()))),
            "Voice error: network"
        );
        assert_eq!(
            failure_hint(&Error::recognition(Some(String::new()))),
            "Speech recognition failed"
        );
        assert_eq!(failure_hint(&Error::recognition(None)), "Speech recognition failed");
    }

    #[tokio::test]
    async fn failure_returns_to_idle_with_hint() {
        let log = Log::default();
        let mut input = input(&log, None, true);
        input.press().await;
        input.handle_engine(EngineEvent::Transcript("half".into()));
        assert_eq!(
            input.handle_engine(EngineEvent::Failed(Some("no-speech".into()))),
            InputOutcome::Failed {
                hint: "Voice error: no-speech".into()
            }
        );
        assert_eq!(input.state(), ListenState::Idle);
        assert_eq!(
            input.handle_engine(EngineEvent::Ended),
            InputOutcome::Finished { auto_submit: false }
        );
    }
}
