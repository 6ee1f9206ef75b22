//! Speech output and voice input.

pub mod input;
pub mod output;
pub mod prosody;
pub mod voices;

pub use input::{
    EngineEvent, InputEvent, InputOutcome, ListenState, MicrophoneProbe, SpeechInput,
    SpeechRecognizer,
};
pub use output::{
    AudioPlayer, SpeechOutput, SpeechSettings, SpeechStrategy, SpeechSynthesizer, Spoken,
    Utterance,
};
pub use prosody::{Prosody, ProsodyProfile};
pub use voices::{ResolveStep, VoicePreferences, VoiceResolver};
