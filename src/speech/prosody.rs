//! Emotion-dependent delivery for remote speech.
//!
//! A reply's sentiment in [-1, 1] nudges the remote voice's rate and pitch:
//! faint sentiment changes nothing, negative sentiment slows down and lowers
//! the voice (a little more strongly), positive sentiment speeds up and
//! raises it.

use serde::{Deserialize, Serialize};

/// Sentiment magnitudes at or below this are treated as neutral.
pub const DEAD_BAND: f32 = 0.12;

/// Exponent applied after the dead band; above 1 it flattens small values.
pub const GAMMA: f32 = 1.25;

/// Rate and pitch limits of one remote voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProsodyProfile {
    /// Remote voice name.
    pub voice: String,
    /// Rate offset at neutral sentiment, in percent.
    #[serde(default)]
    pub base_rate_pct: i32,
    /// Pitch offset at neutral sentiment, in Hz.
    #[serde(default)]
    pub base_pitch_hz: i32,
    /// Added rate at sentiment +1, in percent.
    pub rate_pos_max: f32,
    /// Added rate at sentiment -1, in percent (negative).
    pub rate_neg_max: f32,
    /// Added pitch at sentiment +1, in Hz.
    pub pitch_pos_max: f32,
    /// Added pitch at sentiment -1, in Hz (negative).
    pub pitch_neg_max: f32,
}

/// Rate and pitch strings ready for a speech request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prosody {
    /// Remote voice name.
    pub voice: String,
    /// Signed percentage, e.g. `+5%`.
    pub rate: String,
    /// Signed frequency offset, e.g. `-3Hz`.
    pub pitch: String,
}

impl ProsodyProfile {
    /// A young male voice.
    pub fn yunxi() -> Self {
        Self {
            voice: "zh-CN-YunxiNeural".to_string(),
            base_rate_pct: 0,
            base_pitch_hz: 0,
            rate_pos_max: 12.0,
            rate_neg_max: -18.0,
            pitch_pos_max: 20.0,
            pitch_neg_max: -12.0,
        }
    }

    /// A female voice.
    pub fn xiaoxiao() -> Self {
        Self {
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            base_rate_pct: 0,
            base_pitch_hz: 0,
            rate_pos_max: 10.0,
            rate_neg_max: -16.0,
            pitch_pos_max: 16.0,
            pitch_neg_max: -10.0,
        }
    }

    /// Map `emotion` to this voice's rate and pitch.
    pub fn map(&self, emotion: f32) -> Prosody {
        let s = shape(emotion);
        let (rate_delta, pitch_delta) = if s >= 0.0 {
            (s * self.rate_pos_max, s * self.pitch_pos_max)
        } else {
            (-s * self.rate_neg_max, -s * self.pitch_neg_max)
        };
        let rate = (self.base_rate_pct as f32 + rate_delta).round() as i32;
        let pitch = (self.base_pitch_hz as f32 + pitch_delta).round() as i32;
        Prosody {
            voice: self.voice.clone(),
            rate: format!("{rate:+}%"),
            pitch: format!("{pitch:+}Hz"),
        }
    }
}

/// Clamp `emotion` to [-1, 1], zero the dead band, rescale the rest to
/// [-1, 1] and apply [`GAMMA`].  NaN counts as neutral.
pub fn shape(emotion: f32) -> f32 {
    if emotion.is_nan() {
        return 0.0;
    }
    let e = emotion.clamp(-1.0, 1.0);
    if e.abs() <= DEAD_BAND {
        return 0.0;
    }
    let magnitude = ((e.abs() - DEAD_BAND) / (1.0 - DEAD_BAND)).powf(GAMMA);
    magnitude.copysign(e)
}
