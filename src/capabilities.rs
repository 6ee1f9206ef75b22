//! What the host can do, decided once at startup.

use std::fmt;
use std::sync::Arc;

use crate::client::SpeechClipSource;
use crate::speech::{AudioPlayer, MicrophoneProbe, SpeechRecognizer, SpeechSynthesizer};

/// The optional services a host plugs into the widget.
///
/// Every field may be absent; the widget disables the matching control.
#[derive(Default)]
pub struct HostServices {
    pub synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    pub player: Option<Box<dyn AudioPlayer>>,
    pub clips: Option<Arc<dyn SpeechClipSource>>,
    pub recognizer: Option<Box<dyn SpeechRecognizer>>,
    pub microphone: Option<Box<dyn MicrophoneProbe>>,
}

impl HostServices {
    /// A host with no speech support at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_synthesizer(mut self, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Remote speech needs both a clip source and a player.
    pub fn with_remote_speech(
        mut self,
        clips: Arc<dyn SpeechClipSource>,
        player: Box<dyn AudioPlayer>,
    ) -> Self {
        self.clips = Some(clips);
        self.player = Some(player);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_microphone(mut self, microphone: Box<dyn MicrophoneProbe>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    /// Presence flags for these services.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            speech_synthesis: self.synthesizer.is_some(),
            remote_audio: self.clips.is_some() && self.player.is_some(),
            speech_recognition: self.recognizer.is_some(),
            microphone_probe: self.microphone.is_some(),
        }
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostServices")
            .field(&self.capabilities())
            .finish()
    }
}

/// Presence flags, one per optional feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub speech_synthesis: bool,
    pub remote_audio: bool,
    pub speech_recognition: bool,
    pub microphone_probe: bool,
}

impl Capabilities {
    /// True if replies can be read aloud one way or another.
    pub fn can_speak(&self) -> bool {
        self.speech_synthesis || self.remote_audio
    }
}
