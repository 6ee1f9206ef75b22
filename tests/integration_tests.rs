//! End-to-end widget scenarios against a mock chat server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tabchat::chat::{TabConfig, WidgetConfig, WidgetFile};
use tabchat::dom::{Control, DEFAULT_TAB_AVATAR, DomContract, InPageEvent};
use tabchat::speech::input::PERMISSION_HINT;
use tabchat::speech::{
    AudioPlayer, EngineEvent, InputOutcome, MicrophoneProbe, SpeechRecognizer, SpeechSynthesizer,
    Spoken, Utterance,
};
use tabchat::{
    AudioClip, ChatApi, ChatBackend, ChatReply, ChatRequest, ChatWidget, HostServices, MarkupView,
    Result, SendOutcome, Speaker, Voice,
};

#[derive(Clone, Default)]
struct Spoke(Arc<Mutex<Vec<Utterance>>>);

impl Spoke {
    fn texts(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|u| u.text.clone()).collect()
    }
}

struct Synth {
    spoke: Spoke,
    voices: Vec<Voice>,
    empty_reads: Arc<Mutex<u32>>,
}

impl Synth {
    fn new(spoke: &Spoke) -> Self {
        Self {
            spoke: spoke.clone(),
            voices: vec![Voice::new("Xiaoxiao", "zh-CN"), Voice::new("Yunxia Boy", "zh-CN")],
            empty_reads: Arc::new(Mutex::new(0)),
        }
    }
}

impl SpeechSynthesizer for Synth {
    fn voices(&self) -> Vec<Voice> {
        let mut empty = self.empty_reads.lock().unwrap();
        if *empty > 0 {
            *empty -= 1;
            return Vec::new();
        }
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.spoke.0.lock().unwrap().push(utterance);
        Ok(())
    }

    fn cancel(&mut self) {}
}

#[derive(Clone, Default)]
struct Player(Arc<Mutex<Vec<AudioClip>>>);

#[async_trait]
impl AudioPlayer for Player {
    async fn play(&mut self, clip: AudioClip) -> Result<()> {
        self.0.lock().unwrap().push(clip);
        Ok(())
    }

    fn stop(&mut self) {}
}

struct Recognizer;

impl SpeechRecognizer for Recognizer {
    fn start(&mut self, _lang: &str) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

struct Microphone(bool);

#[async_trait]
impl MicrophoneProbe for Microphone {
    async fn request_access(&mut self) -> bool {
        self.0
    }
}

/// Replies "re: <message>" without a network.
struct Echo;

#[async_trait]
impl ChatBackend for Echo {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        Ok(ChatReply::new(format!("re: {}", request.message)))
    }
}

fn view() -> MarkupView {
    MarkupView::new(DomContract::default())
}

fn widget_for(
    server: &MockServer,
    config: WidgetConfig,
    host: HostServices,
) -> ChatWidget<MarkupView> {
    let api = ChatApi::new(&server.uri()).unwrap();
    ChatWidget::new(config, Arc::new(api), host, view()).unwrap()
}

fn texts(widget: &ChatWidget<MarkupView>, tab: &str) -> Vec<(Speaker, String)> {
    widget
        .messages(tab)
        .iter()
        .map(|m| (m.speaker(), m.text().to_string()))
        .collect()
}

#[tokio::test]
async fn hello_gets_hi() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({"message": "hello", "chat": "chat1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "hi"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut widget = widget_for(&server, WidgetConfig::new(), HostServices::none());
    widget.set_input("hello");
    let outcome = widget.send_input().await;

    assert!(matches!(outcome, SendOutcome::Replied { ref tab, .. } if tab == "chat1"));
    assert_eq!(
        texts(&widget, "chat1"),
        vec![
            (Speaker::User, "hello".to_string()),
            (Speaker::Bot, "hi".to_string())
        ]
    );
    let rows = widget.view().rows();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].speaker, rows[0].text.as_str()), (Speaker::User, "hello"));
    assert_eq!((rows[1].speaker, rows[1].text.as_str()), (Speaker::Bot, "hi"));
    assert_eq!(rows[1].avatar, "/static/img/lbxx_chat.png");
    assert!(widget.view().is_scrolled_to_latest());
    assert_eq!(widget.input(), "");
    assert_eq!(widget.view().input(), "");
}

#[tokio::test]
async fn server_error_becomes_one_bot_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "upstream failed", "reply": "secret"})),
        )
        .mount(&server)
        .await;

    let mut widget = widget_for(&server, WidgetConfig::new(), HostServices::none());
    let outcome = widget.send("hello").await;

    let SendOutcome::Failed { error, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(error.is_server_error());
    let messages = texts(&widget, "chat1");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], (Speaker::User, "hello".to_string()));
    assert_eq!(messages[1].0, Speaker::Bot);
    assert!(messages[1].1.starts_with("Error: "), "{}", messages[1].1);
    assert!(messages[1].1.contains("upstream failed"));
    assert!(!messages[1].1.contains("secret"));
    assert_eq!(widget.view().rows().len(), 2);
}

#[tokio::test]
async fn error_prefix_is_configurable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "quota"})))
        .mount(&server)
        .await;

    let config = WidgetConfig::new().with_error_prefix("出错: ");
    let mut widget = widget_for(&server, config, HostServices::none());
    widget.send("hello").await;
    assert!(widget.messages("chat1")[1].text().starts_with("出错: "));
}

#[tokio::test]
async fn blank_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "hi"})))
        .expect(0)
        .mount(&server)
        .await;

    let mut widget = widget_for(&server, WidgetConfig::new(), HostServices::none());
    for blank in ["", "   ", "\n\t "] {
        widget.set_input(blank);
        assert!(matches!(widget.send_input().await, SendOutcome::Ignored));
    }
    assert!(widget.messages("chat1").is_empty());
    assert!(widget.view().rows().is_empty());
}

#[tokio::test]
async fn tabs_keep_separate_histories() {
    let mut widget = ChatWidget::new(
        WidgetConfig::new(),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .unwrap();
    let clears = widget.view().clear_count();

    assert!(!widget.switch_tab("chat1"));
    assert!(!widget.switch_tab("chat9"));
    assert_eq!(widget.view().clear_count(), clears);

    widget.send("first").await;
    assert!(widget.switch_tab("chat2"));
    assert_eq!(widget.view().active_tab().map(|t| t.as_str()), Some("chat2"));
    assert!(widget.view().rows().is_empty());

    widget.send("second").await;
    assert!(widget.switch_tab("chat1"));
    let rows: Vec<&str> = widget.view().rows().iter().map(|r| r.text.as_str()).collect();
    assert_eq!(rows, vec!["first", "re: first"]);
    assert_eq!(
        texts(&widget, "chat2"),
        vec![
            (Speaker::User, "second".to_string()),
            (Speaker::Bot, "re: second".to_string())
        ]
    );
    assert!(widget.view().to_html().contains(r#"class="chat-tab active" data-chat="chat1""#));
}

#[tokio::test]
async fn render_all_reproduces_insertion_order() {
    let mut widget = ChatWidget::new(
        WidgetConfig::new(),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .unwrap();
    for i in 0..5 {
        widget.send(&format!("m{i}")).await;
        widget.switch_tab(if i % 2 == 0 { "chat2" } else { "chat1" });
    }
    widget.switch_tab("chat1");
    widget.redraw();
    let stored: Vec<(Speaker, String)> = texts(&widget, "chat1");
    let drawn: Vec<(Speaker, String)> = widget
        .view()
        .rows()
        .iter()
        .map(|r| (r.speaker, r.text.clone()))
        .collect();
    assert_eq!(stored, drawn);
    assert_eq!(stored.len(), 6);
}

#[tokio::test]
async fn second_send_on_a_busy_tab_is_refused() {
    let mut widget = ChatWidget::new(
        WidgetConfig::new(),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .unwrap();

    let SendOutcome::Pending(first) = widget.begin_send("one") else {
        panic!("first send should be pending");
    };
    widget.set_input("two");
    let input = widget.input().to_string();
    assert!(matches!(widget.begin_send(&input), SendOutcome::Busy(ref tab) if tab == "chat1"));
    assert_eq!(widget.input(), "two");

    widget.switch_tab("chat2");
    let SendOutcome::Pending(other) = widget.begin_send("elsewhere") else {
        panic!("another tab is not busy");
    };
    assert_ne!(first.id, other.id);

    let outcome = widget
        .complete_send(first, Ok(ChatReply::new("late reply")))
        .await;
    assert!(matches!(outcome, SendOutcome::Replied { spoken: Spoken::Skipped, .. }));
    assert_eq!(widget.messages("chat1")[1].text(), "late reply");
    assert!(widget.view().rows().iter().all(|r| r.text != "late reply"));
    assert!(widget.state().in_flight("chat1").is_none());
    assert!(widget.state().in_flight("chat2").is_some());
}

#[tokio::test]
async fn voice_input_auto_submits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({"message": "order status", "chat": "chat1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "shipped"})))
        .expect(1)
        .mount(&server)
        .await;

    let host = HostServices::none()
        .with_recognizer(Box::new(Recognizer))
        .with_microphone(Box::new(Microphone(true)));
    let config = WidgetConfig::new().with_auto_send(true);
    let mut widget = widget_for(&server, config, host);

    assert_eq!(widget.press_mic().await, InputOutcome::Started);
    assert!(widget.view().control(Control::Mic).active);

    let heard = widget
        .recognition_event(EngineEvent::Transcript("order status".to_string()))
        .await;
    assert_eq!(heard.outcome, InputOutcome::Heard("order status".to_string()));
    assert!(heard.sent.is_none());
    assert_eq!(widget.view().input(), "order status");

    let ended = widget.recognition_event(EngineEvent::Ended).await;
    assert_eq!(ended.outcome, InputOutcome::Finished { auto_submit: true });
    assert!(matches!(ended.sent, Some(SendOutcome::Replied { .. })));
    assert_eq!(widget.view().events(), &[InPageEvent::VoiceAutoSend]);
    assert!(!widget.view().control(Control::Mic).active);
    assert_eq!(
        texts(&widget, "chat1"),
        vec![
            (Speaker::User, "order status".to_string()),
            (Speaker::Bot, "shipped".to_string())
        ]
    );
}

#[tokio::test]
async fn voice_input_without_auto_send_only_fills_the_box() {
    let host = HostServices::none().with_recognizer(Box::new(Recognizer));
    let mut widget =
        ChatWidget::new(WidgetConfig::new(), Arc::new(Echo), host, view()).unwrap();

    widget.press_mic().await;
    widget
        .recognition_event(EngineEvent::Transcript("order status".to_string()))
        .await;
    let ended = widget.recognition_event(EngineEvent::Ended).await;
    assert_eq!(ended.outcome, InputOutcome::Finished { auto_submit: false });
    assert!(ended.sent.is_none());
    assert_eq!(widget.input(), "order status");
    assert!(widget.messages("chat1").is_empty());
}

#[tokio::test]
async fn denied_microphone_disables_voice_input() {
    let host = HostServices::none()
        .with_recognizer(Box::new(Recognizer))
        .with_microphone(Box::new(Microphone(false)));
    let mut widget =
        ChatWidget::new(WidgetConfig::new(), Arc::new(Echo), host, view()).unwrap();

    assert_eq!(widget.press_mic().await, InputOutcome::PermissionDenied);
    let mic = widget.view().control(Control::Mic);
    assert!(!mic.enabled);
    assert_eq!(mic.hint.as_deref(), Some(PERMISSION_HINT));
    assert_eq!(widget.press_mic().await, InputOutcome::PermissionDenied);
    assert!(!widget.is_listening());
}

#[tokio::test]
async fn recognition_error_resets_with_a_tooltip() {
    let host = HostServices::none().with_recognizer(Box::new(Recognizer));
    let mut widget =
        ChatWidget::new(WidgetConfig::new(), Arc::new(Echo), host, view()).unwrap();

    widget.press_mic().await;
    let failed = widget
        .recognition_event(EngineEvent::Failed(Some("network".to_string())))
        .await;
    assert!(matches!(failed.outcome, InputOutcome::Failed { .. }));
    assert!(!widget.is_listening());
    let mic = widget.view().control(Control::Mic);
    assert!(!mic.active);
    assert_eq!(mic.hint.as_deref(), Some("Voice error: network"));
    assert_eq!(widget.press_mic().await, InputOutcome::Started);
}

#[tokio::test]
async fn missing_capabilities_disable_controls() {
    let widget = ChatWidget::new(
        WidgetConfig::new(),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .unwrap();
    assert!(!widget.view().control(Control::Mic).enabled);
    assert!(widget.view().control(Control::Mic).hint.is_some());
    assert!(!widget.view().control(Control::SpeechToggle).enabled);
    assert!(!widget.is_speech_enabled());
    assert!(widget.view().control(Control::Send).enabled);
}

#[tokio::test]
async fn remote_speech_falls_back_to_local() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"reply": "你好", "emotion": 0.8})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .and(body_partial_json(json!({"text": "你好", "voice": "zh-CN-YunxiNeural"})))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "tts down"})))
        .expect(1)
        .mount(&server)
        .await;

    let spoke = Spoke::default();
    let player = Player::default();
    let api = Arc::new(ChatApi::new(&server.uri()).unwrap());
    let host = HostServices::none()
        .with_synthesizer(Box::new(Synth::new(&spoke)))
        .with_remote_speech(api.clone(), Box::new(player.clone()));
    let mut widget = ChatWidget::new(WidgetConfig::new(), api, host, view()).unwrap();
    assert!(widget.view().control(Control::SpeechToggle).active);

    let outcome = widget.send("hi").await;
    assert!(matches!(outcome, SendOutcome::Replied { spoken: Spoken::Local, .. }));
    assert_eq!(spoke.texts(), vec!["你好".to_string()]);
    assert!(player.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn remote_speech_plays_the_clip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "好的"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .and(body_json(json!({
            "text": "好的",
            "voice": "zh-CN-YunxiNeural",
            "rate": "-10%",
            "pitch": "+2Hz"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "audio/mpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let spoke = Spoke::default();
    let player = Player::default();
    let api = Arc::new(ChatApi::new(&server.uri()).unwrap());
    let host = HostServices::none()
        .with_synthesizer(Box::new(Synth::new(&spoke)))
        .with_remote_speech(api.clone(), Box::new(player.clone()));
    let mut widget = ChatWidget::new(WidgetConfig::new(), api, host, view()).unwrap();

    let outcome = widget.send("hi").await;
    assert!(matches!(outcome, SendOutcome::Replied { spoken: Spoken::Remote, .. }));
    assert_eq!(player.0.lock().unwrap().len(), 1);
    assert!(spoke.texts().is_empty());
}

#[tokio::test]
async fn speech_off_reads_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "quiet"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8], "audio/mpeg"))
        .expect(0)
        .mount(&server)
        .await;

    let spoke = Spoke::default();
    let api = Arc::new(ChatApi::new(&server.uri()).unwrap());
    let host = HostServices::none()
        .with_synthesizer(Box::new(Synth::new(&spoke)))
        .with_remote_speech(api.clone(), Box::new(Player::default()));
    let mut widget = ChatWidget::new(WidgetConfig::new(), api, host, view()).unwrap();

    assert!(!widget.toggle_speech());
    assert!(!widget.view().control(Control::SpeechToggle).active);
    let outcome = widget.send("hi").await;
    assert!(matches!(outcome, SendOutcome::Replied { spoken: Spoken::Skipped, .. }));
    widget.switch_tab("chat2");
    widget.send("hi").await;
    assert!(spoke.texts().is_empty());
    assert!(widget.toggle_speech());
}

#[tokio::test(start_paused = true)]
async fn voices_resolve_after_the_engine_loads() {
    let spoke = Spoke::default();
    let synth = Synth::new(&spoke);
    *synth.empty_reads.lock().unwrap() = 3;
    let host = HostServices::none().with_synthesizer(Box::new(synth));
    let mut widget = ChatWidget::new(
        WidgetConfig::new().with_tabs(vec![TabConfig::new("chat1"), TabConfig::new("chat2")]),
        Arc::new(Echo),
        host,
        view(),
    )
    .unwrap();

    assert!(widget.resolve_voices().await);
    assert_eq!(widget.state().voices().get("chat1"), Some("Yunxia Boy"));
    assert_eq!(widget.state().voices().get("chat2"), Some("Xiaoxiao"));

    widget.switch_tab("chat2");
    widget.send("hi").await;
    let utterances = spoke.0.lock().unwrap();
    assert_eq!(
        utterances[0].voice.as_ref().map(|v| v.name.as_str()),
        Some("Xiaoxiao")
    );
}

#[tokio::test(start_paused = true)]
async fn voice_resolution_gives_up() {
    let spoke = Spoke::default();
    let synth = Synth::new(&spoke);
    *synth.empty_reads.lock().unwrap() = 100;
    let host = HostServices::none().with_synthesizer(Box::new(synth));
    let mut widget = ChatWidget::new(WidgetConfig::new(), Arc::new(Echo), host, view()).unwrap();

    assert!(!widget.resolve_voices().await);
    assert!(widget.state().voices().is_empty());
}

#[tokio::test]
async fn broken_tab_avatar_falls_back_once() {
    let mut tabs = tabchat::chat::default_tabs();
    tabs[0].avatar = Some("/img/broken.png".to_string());
    let mut widget = ChatWidget::new(
        WidgetConfig::new().with_tabs(tabs),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .unwrap();

    assert_eq!(widget.view().tab_avatar("chat1"), Some("/img/broken.png"));
    assert_eq!(widget.view().tab_avatar("chat2"), Some(DEFAULT_TAB_AVATAR));
    widget.tab_avatar_failed("chat1");
    assert_eq!(widget.view().tab_avatar("chat1"), Some(DEFAULT_TAB_AVATAR));
    widget.tab_avatar_failed("chat1");
    widget.tab_avatar_failed("nope");
    assert_eq!(widget.view().tab_avatar("chat1"), Some(DEFAULT_TAB_AVATAR));
}

#[test]
fn empty_tab_list_is_rejected() {
    let err = ChatWidget::new(
        WidgetConfig::new().with_tabs(Vec::new()),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .err()
    .unwrap();
    assert!(err.is_validation());
}

#[tokio::test]
async fn configured_element_names_reach_the_view() {
    let file = WidgetFile::parse(
        "dom:\n  output: \"#chat-log\"\n  input: \"#prompt\"\n  tab_attribute: data-room\n",
    )
    .unwrap();
    let config = file.apply(WidgetConfig::new());
    let mut widget = ChatWidget::new(
        config,
        Arc::new(Echo),
        HostServices::none(),
        MarkupView::default(),
    )
    .unwrap();
    widget.send("hi").await;

    let html = widget.view().to_html();
    assert!(html.starts_with(r#"<div id="chat-log">"#), "{html}");
    assert!(html.contains(r#"<input id="prompt" value="">"#), "{html}");
    assert!(html.contains(r#"data-room="chat1""#), "{html}");
    assert!(!html.contains("data-chat"), "{html}");
}

#[test]
fn blank_tab_avatar_uses_the_default() {
    let mut tabs = tabchat::chat::default_tabs();
    tabs[1].avatar = Some("   ".to_string());
    let widget = ChatWidget::new(
        WidgetConfig::new().with_tabs(tabs),
        Arc::new(Echo),
        HostServices::none(),
        view(),
    )
    .unwrap();
    assert_eq!(widget.view().tab_avatar("chat2"), Some(DEFAULT_TAB_AVATAR));
}
