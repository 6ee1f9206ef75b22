mod api;
mod message;
mod tab;
mod voice;

pub use api::{
    AudioClip, ChatReply, ChatRequest, ChatResponse, DEFAULT_AUDIO_CONTENT_TYPE, SpeechRequest,
};
pub use message::{Message, Speaker, SpeakerParseError};
pub use tab::{RequestId, TabId};
pub use voice::Voice;
