use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("tabchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("tabchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("tabchat.client.request_duration_seconds");
pub(crate) static CLIENT_CLIP_REQUESTS: Counter = Counter::new("tabchat.client.clip_requests");
pub(crate) static CLIENT_CLIP_BYTES: Counter = Counter::new("tabchat.client.clip_bytes");

pub(crate) static SPEECH_UTTERANCES: Counter = Counter::new("tabchat.speech.utterances");
pub(crate) static SPEECH_REMOTE_CLIPS: Counter = Counter::new("tabchat.speech.remote_clips");
pub(crate) static SPEECH_REMOTE_FALLBACKS: Counter =
    Counter::new("tabchat.speech.remote_fallbacks");
pub(crate) static SPEECH_DROPPED: Counter = Counter::new("tabchat.speech.dropped");

pub(crate) static INPUT_SESSIONS: Counter = Counter::new("tabchat.input.sessions");
pub(crate) static INPUT_TRANSCRIPTS: Counter = Counter::new("tabchat.input.transcripts");
pub(crate) static INPUT_RECOGNITION_ERRORS: Counter =
    Counter::new("tabchat.input.recognition_errors");
pub(crate) static INPUT_PERMISSION_DENIED: Counter =
    Counter::new("tabchat.input.permission_denied");

pub(crate) static WIDGET_SENDS: Counter = Counter::new("tabchat.widget.sends");
pub(crate) static WIDGET_SEND_FAILURES: Counter = Counter::new("tabchat.widget.send_failures");
pub(crate) static WIDGET_BUSY_REJECTIONS: Counter =
    Counter::new("tabchat.widget.busy_rejections");
pub(crate) static WIDGET_TAB_SWITCHES: Counter = Counter::new("tabchat.widget.tab_switches");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_CLIP_REQUESTS);
    collector.register_counter(&CLIENT_CLIP_BYTES);

    collector.register_counter(&SPEECH_UTTERANCES);
    collector.register_counter(&SPEECH_REMOTE_CLIPS);
    collector.register_counter(&SPEECH_REMOTE_FALLBACKS);
    collector.register_counter(&SPEECH_DROPPED);

    collector.register_counter(&INPUT_SESSIONS);
    collector.register_counter(&INPUT_TRANSCRIPTS);
    collector.register_counter(&INPUT_RECOGNITION_ERRORS);
    collector.register_counter(&INPUT_PERMISSION_DENIED);

    collector.register_counter(&WIDGET_SENDS);
    collector.register_counter(&WIDGET_SEND_FAILURES);
    collector.register_counter(&WIDGET_BUSY_REJECTIONS);
    collector.register_counter(&WIDGET_TAB_SWITCHES);
}
