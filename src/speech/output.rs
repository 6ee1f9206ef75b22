//! Reading bot replies aloud.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SpeechClipSource;
use crate::error::{Error, Result};
use crate::observability::{
    SPEECH_DROPPED, SPEECH_REMOTE_CLIPS, SPEECH_REMOTE_FALLBACKS, SPEECH_UTTERANCES,
};
use crate::speech::prosody::ProsodyProfile;
use crate::types::{AudioClip, SpeechRequest, Voice};

/// A local speech synthesis engine.
pub trait SpeechSynthesizer: Send {
    /// The voices the engine currently offers.  May be empty while loading.
    fn voices(&self) -> Vec<Voice>;

    /// Start speaking `utterance`.
    fn speak(&mut self, utterance: Utterance) -> Result<()>;

    /// Stop the utterance in progress, if any.
    fn cancel(&mut self);
}

/// Plays remotely rendered audio clips.
#[async_trait]
pub trait AudioPlayer: Send {
    /// Start playing `clip`.  Resolves once playback has started.
    async fn play(&mut self, clip: AudioClip) -> Result<()>;

    /// Stop the clip in progress, if any.
    fn stop(&mut self);
}

/// One unit of local speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// What to say.
    pub text: String,
    /// Language tag of the text.
    pub lang: String,
    /// The voice, or `None` for the engine default.
    pub voice: Option<Voice>,
    /// Speaking rate, 1.0 is normal.
    pub rate: f32,
    /// Pitch, 1.0 is normal.
    pub pitch: f32,
    /// Volume from 0.0 to 1.0.
    pub volume: f32,
}

/// Delivery settings for local speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            lang: "zh-CN".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// How a tab's replies are spoken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeechStrategy {
    /// Local synthesis.  `voice` overrides the tab's resolved preference.
    Local {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
    },
    /// A clip from the speech endpoint, falling back to local synthesis.
    Remote {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pitch: Option<String>,
        /// When set and the reply carries an emotion, rate and pitch follow
        /// the emotion instead of the fixed values above.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prosody: Option<ProsodyProfile>,
    },
}

impl Default for SpeechStrategy {
    fn default() -> Self {
        SpeechStrategy::Local { voice: None }
    }
}

impl SpeechStrategy {
    /// The clip request for `text` under this strategy, or `None` for local
    /// strategies.
    pub fn request(&self, text: &str, emotion: Option<f32>) -> Option<SpeechRequest> {
        let SpeechStrategy::Remote {
            voice,
            rate,
            pitch,
            prosody,
        } = self
        else {
            return None;
        };
        let request = match (prosody, emotion) {
            (Some(profile), Some(emotion)) => {
                let mapped = profile.map(emotion);
                SpeechRequest::new(text)
                    .with_voice(Some(mapped.voice))
                    .with_rate(Some(mapped.rate))
                    .with_pitch(Some(mapped.pitch))
            }
            _ => SpeechRequest::new(text)
                .with_voice(voice.clone())
                .with_rate(rate.clone())
                .with_pitch(pitch.clone()),
        };
        Some(request)
    }
}

/// How a call to [`SpeechOutput::speak`] ended up being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spoken {
    Local,
    Remote,
    /// Nothing was spoken: output is off, the text was empty, or every
    /// available strategy failed.
    Skipped,
}

/// Choose a voice for local speech.
///
/// An exact name match wins, then the first voice speaking `lang`, else
/// `None` and the engine uses its default.
pub fn select_voice(voices: &[Voice], name: Option<&str>, lang: &str) -> Option<Voice> {
    name.filter(|n| !n.is_empty())
        .and_then(|n| voices.iter().find(|v| v.name == n))
        .or_else(|| voices.iter().find(|v| v.speaks(lang)))
        .cloned()
}

/// Speech output across the local and remote strategies.
pub struct SpeechOutput {
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    player: Option<Box<dyn AudioPlayer>>,
    clips: Option<Arc<dyn SpeechClipSource>>,
    settings: SpeechSettings,
    enabled: bool,
}

impl SpeechOutput {
    /// Create speech output from whichever capabilities the host has.
    ///
    /// Output starts enabled when `enabled` is true and some strategy is
    /// available.
    pub fn new(
        synthesizer: Option<Box<dyn SpeechSynthesizer>>,
        player: Option<Box<dyn AudioPlayer>>,
        clips: Option<Arc<dyn SpeechClipSource>>,
        settings: SpeechSettings,
        enabled: bool,
    ) -> Self {
        let mut output = Self {
            synthesizer,
            player,
            clips,
            settings,
            enabled: false,
        };
        output.enabled = enabled && output.is_supported();
        output
    }

    /// True if local synthesis is available.
    pub fn has_local(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// True if remote clips can be fetched and played.
    pub fn has_remote(&self) -> bool {
        self.player.is_some() && self.clips.is_some()
    }

    /// True if any strategy is available.
    pub fn is_supported(&self) -> bool {
        self.has_local() || self.has_remote()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn output on or off.  Turning it off silences speech in progress.
    /// Returns the resulting state, which stays off when unsupported.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        self.enabled = enabled && self.is_supported();
        if !self.enabled {
            self.cancel();
        }
        self.enabled
    }

    /// Silence whatever is being spoken.
    pub fn cancel(&mut self) {
        if let Some(synthesizer) = self.synthesizer.as_mut() {
            synthesizer.cancel();
        }
        if let Some(player) = self.player.as_mut() {
            player.stop();
        }
    }

    /// The local engine's voices.
    pub fn voices(&self) -> Vec<Voice> {
        self.synthesizer
            .as_ref()
            .map(|s| s.voices())
            .unwrap_or_default()
    }

    pub fn settings(&self) -> &SpeechSettings {
        &self.settings
    }

    /// Speak `text` using `strategy`.
    ///
    /// Speech in progress is cancelled first.  A remote strategy falls back
    /// to local synthesis on any failure.  `preferred_voice` is used for local
    /// synthesis unless the strategy names its own voice.
    pub async fn speak(
        &mut self,
        text: &str,
        strategy: &SpeechStrategy,
        preferred_voice: Option<&str>,
        emotion: Option<f32>,
    ) -> Spoken {
        if !self.enabled || text.trim().is_empty() {
            return Spoken::Skipped;
        }
        self.cancel();

        if let Some(request) = strategy.request(text, emotion) {
            if self.has_remote() {
                match self.play_remote(&request).await {
                    Ok(()) => {
                        SPEECH_REMOTE_CLIPS.click();
                        return Spoken::Remote;
                    }
                    Err(err) => {
                        SPEECH_REMOTE_FALLBACKS.click();
                        tracing::warn!(error = %err, "remote speech failed, using local synthesis");
                    }
                }
            }
        }

        let voice = match strategy {
            SpeechStrategy::Local { voice: Some(v) } => Some(v.as_str()),
            _ => preferred_voice,
        };
        self.speak_local(text, voice)
    }

    async fn play_remote(&mut self, request: &SpeechRequest) -> Result<()> {
        let (Some(clips), Some(player)) = (self.clips.as_ref(), self.player.as_mut()) else {
            return Err(Error::unsupported("remote speech"));
        };
        let clip = clips.synthesize(request).await?;
        player.play(clip).await
    }

    fn speak_local(&mut self, text: &str, voice: Option<&str>) -> Spoken {
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            SPEECH_DROPPED.click();
            tracing::debug!("no local synthesizer, speech dropped");
            return Spoken::Skipped;
        };
        let utterance = Utterance {
            text: text.to_string(),
            lang: self.settings.lang.clone(),
            voice: select_voice(&synthesizer.voices(), voice, &self.settings.lang),
            rate: self.settings.rate,
            pitch: self.settings.pitch,
            volume: self.settings.volume,
        };
        match synthesizer.speak(utterance) {
            Ok(()) => {
                SPEECH_UTTERANCES.click();
                Spoken::Local
            }
            Err(err) => {
                SPEECH_DROPPED.click();
                tracing::warn!(error = %err, "local speech failed");
                Spoken::Skipped
            }
        }
    }
}
