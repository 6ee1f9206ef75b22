//! The widget controller.
//!
//! [`ChatWidget`] owns every piece of mutable state ([`AppState`]), the host's
//! speech capabilities and the view.  Page events map one-to-one onto its
//! methods: send button or Enter → [`ChatWidget::send_input`], tab click →
//! [`ChatWidget::switch_tab`], mic click → [`ChatWidget::press_mic`], speech
//! toggle → [`ChatWidget::toggle_speech`], recognizer callbacks →
//! [`ChatWidget::recognition_event`].
//!
//! Sends are serialized per tab.  While a tab waits for its reply, further
//! sends on that tab are refused with [`SendOutcome::Busy`]; other tabs are
//! unaffected.  A reply always lands in the tab that asked, whichever tab is
//! showing by then.

use std::collections::HashMap;
use std::sync::Arc;

use crate::capabilities::{Capabilities, HostServices};
use crate::chat::WidgetConfig;
use crate::client::ChatBackend;
use crate::dom::{Control, DEFAULT_TAB_AVATAR, InPageEvent, TabAvatars, TabButton};
use crate::error::{Error, Result};
use crate::observability::{
    WIDGET_BUSY_REJECTIONS, WIDGET_SEND_FAILURES, WIDGET_SENDS, WIDGET_TAB_SWITCHES,
};
use crate::render::{AvatarSet, View, append_one, render_all};
use crate::speech::input::{PERMISSION_HINT, UNSUPPORTED_HINT};
use crate::speech::{
    EngineEvent, InputOutcome, ResolveStep, SpeechInput, SpeechOutput, Spoken, VoicePreferences,
    VoiceResolver,
};
use crate::store::SessionStore;
use crate::types::{ChatReply, ChatRequest, Message, RequestId, TabId};

/// Tooltip of the speech toggle when nothing can speak.
pub const SPEECH_UNSUPPORTED_HINT: &str = "Reading aloud is not supported here";

/// Everything the widget remembers between events.
#[derive(Debug)]
pub struct AppState {
    store: SessionStore,
    voices: VoicePreferences,
    input: String,
    in_flight: HashMap<TabId, RequestId>,
    last_request: RequestId,
}

impl AppState {
    /// Fresh state for `tabs`; the first tab is active.
    pub fn new(tabs: Vec<TabId>) -> Result<Self> {
        Ok(Self {
            store: SessionStore::new(tabs)?,
            voices: VoicePreferences::default(),
            input: String::new(),
            in_flight: HashMap::new(),
            last_request: RequestId::default(),
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn voices(&self) -> &VoicePreferences {
        &self.voices
    }

    /// The input box contents.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The request `tab` is waiting on, if any.
    pub fn in_flight(&self, tab: &str) -> Option<RequestId> {
        self.in_flight.get(tab).copied()
    }

    fn next_request(&mut self) -> RequestId {
        self.last_request = self.last_request.next();
        self.last_request
    }
}

/// A chat request that has been recorded but not yet answered.
///
/// Returned by [`ChatWidget::begin_send`]; hand the backend's answer to
/// [`ChatWidget::complete_send`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTurn {
    pub id: RequestId,
    pub request: ChatRequest,
}

impl PendingTurn {
    /// The tab that sent the request.
    pub fn tab(&self) -> &TabId {
        &self.request.chat
    }
}

/// What became of a send.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Nothing to send.
    Ignored,
    /// The tab is still waiting for a reply; the input box is untouched.
    Busy(TabId),
    /// The user message is recorded and the request is ready to go.
    Pending(PendingTurn),
    /// The reply was appended to `tab`.
    Replied {
        tab: TabId,
        id: RequestId,
        spoken: Spoken,
    },
    /// The request failed; an error message was appended to `tab`.
    Failed {
        tab: TabId,
        id: RequestId,
        error: Error,
    },
}

/// A recognizer event and the send it may have triggered.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub outcome: InputOutcome,
    pub sent: Option<SendOutcome>,
}

/// The two-tab chat widget.
pub struct ChatWidget<V: View> {
    config: WidgetConfig,
    state: AppState,
    backend: Arc<dyn ChatBackend>,
    output: SpeechOutput,
    input: SpeechInput,
    capabilities: Capabilities,
    avatars: AvatarSet,
    tab_avatars: TabAvatars,
    view: V,
}

impl<V: View> ChatWidget<V> {
    /// Build the widget and draw its initial state into `view`.
    pub fn new(
        config: WidgetConfig,
        backend: Arc<dyn ChatBackend>,
        host: HostServices,
        view: V,
    ) -> Result<Self> {
        let capabilities = host.capabilities();
        let state = AppState::new(config.tab_ids())?;
        let HostServices {
            synthesizer,
            player,
            clips,
            recognizer,
            microphone,
        } = host;
        let output = SpeechOutput::new(
            synthesizer,
            player,
            clips,
            config.speech.clone(),
            config.speech_enabled,
        );
        let input = SpeechInput::new(recognizer, microphone, config.lang(), config.auto_send);
        // Read each button as the page declares it, so a blank avatar
        // attribute falls back like a missing one.
        let dom = &config.dom;
        let buttons: Vec<TabButton> = config
            .tabs
            .iter()
            .filter_map(|t| {
                TabButton::from_attributes(
                    dom,
                    [
                        (dom.tab_attribute.as_str(), t.id.as_str()),
                        (dom.avatar_attribute.as_str(), t.avatar.as_deref().unwrap_or("")),
                    ],
                )
            })
            .collect();
        let tab_avatars = TabAvatars::resolve(&buttons, DEFAULT_TAB_AVATAR);
        let avatars = config.row_avatars();
        tracing::debug!(?capabilities, tabs = buttons.len(), "widget created");

        let mut widget = Self {
            config,
            state,
            backend,
            output,
            input,
            capabilities,
            avatars,
            tab_avatars,
            view,
        };
        widget.mount();
        Ok(widget)
    }

    fn mount(&mut self) {
        self.view.set_contract(&self.config.dom);
        for tab in self.state.store.tabs() {
            if let Some(src) = self.tab_avatars.source(tab.as_str()) {
                self.view.set_tab_avatar(tab, src);
            }
        }
        self.view.mark_active_tab(self.state.store.active());
        self.redraw();

        self.view.set_enabled(Control::Send, true);
        self.view.set_input(&self.state.input);

        self.view.set_enabled(Control::Mic, self.input.is_supported());
        if !self.input.is_supported() {
            self.view.set_hint(Control::Mic, UNSUPPORTED_HINT);
        }

        self.view
            .set_enabled(Control::SpeechToggle, self.output.is_supported());
        if !self.output.is_supported() {
            self.view
                .set_hint(Control::SpeechToggle, SPEECH_UNSUPPORTED_HINT);
        }
        self.view
            .set_active(Control::SpeechToggle, self.output.is_enabled());
    }

    /// Redraw the active tab from the store.
    pub fn redraw(&mut self) {
        let tab = self.state.store.active().clone();
        render_all(&mut self.view, &self.state.store, &self.avatars, tab.as_str());
    }

    /// Append `message` to `tab`, drawing it if `tab` is showing.
    fn push_message(&mut self, tab: &TabId, message: Message) {
        if let Err(err) = self.state.store.append(tab, message.clone()) {
            tracing::error!(tab = %tab, error = %err, "message for unknown tab dropped");
            return;
        }
        if self.state.store.is_active(tab.as_str()) {
            append_one(&mut self.view, &self.avatars, tab.as_str(), &message);
        }
    }

    /// Replace the input box contents.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input = text.into();
        self.view.set_input(&self.state.input);
    }

    /// The input box contents.
    pub fn input(&self) -> &str {
        &self.state.input
    }

    /// Send whatever is in the input box.
    pub async fn send_input(&mut self) -> SendOutcome {
        let text = self.state.input.clone();
        self.send(&text).await
    }

    /// Send `text` on the active tab and wait for the reply.
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        match self.begin_send(text) {
            SendOutcome::Pending(turn) => {
                let result = self.backend.send_chat(&turn.request).await;
                self.complete_send(turn, result).await
            }
            other => other,
        }
    }

    /// Record `text` as a user message on the active tab and prepare its
    /// request.
    ///
    /// Blank text is ignored.  A tab that is already waiting for a reply
    /// refuses the send and keeps the input box as it is.
    pub fn begin_send(&mut self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }
        let tab = self.state.store.active().clone();
        if let Some(pending) = self.state.in_flight(tab.as_str()) {
            WIDGET_BUSY_REJECTIONS.click();
            tracing::debug!(tab = %tab, pending = %pending, "tab busy, send refused");
            return SendOutcome::Busy(tab);
        }

        self.push_message(&tab, Message::user(text));
        self.set_input(String::new());
        let id = self.state.next_request();
        self.state.in_flight.insert(tab.clone(), id);
        WIDGET_SENDS.click();
        tracing::debug!(tab = %tab, id = %id, "send");
        SendOutcome::Pending(PendingTurn {
            id,
            request: ChatRequest::new(text, tab),
        })
    }

    /// Finish a send started by [`Self::begin_send`].
    ///
    /// A reply is appended to the requesting tab and read aloud if that tab
    /// is showing.  A failure is appended as a bot message carrying the error
    /// prefix; the failed response's reply text, if any, is never shown.
    pub async fn complete_send(
        &mut self,
        turn: PendingTurn,
        result: Result<ChatReply>,
    ) -> SendOutcome {
        let PendingTurn { id, request } = turn;
        let tab = request.chat;
        if self.state.in_flight.get(&tab) == Some(&id) {
            self.state.in_flight.remove(&tab);
        }

        match result {
            Ok(reply) => {
                self.push_message(&tab, Message::bot(reply.text.clone()));
                let spoken = if self.state.store.is_active(tab.as_str()) {
                    self.speak_reply(&tab, &reply).await
                } else {
                    Spoken::Skipped
                };
                SendOutcome::Replied { tab, id, spoken }
            }
            Err(error) => {
                WIDGET_SEND_FAILURES.click();
                tracing::warn!(tab = %tab, id = %id, error = %error, "send failed");
                let text = format!("{}{}", self.config.error_prefix, error);
                self.push_message(&tab, Message::bot(text));
                SendOutcome::Failed { tab, id, error }
            }
        }
    }

    async fn speak_reply(&mut self, tab: &TabId, reply: &ChatReply) -> Spoken {
        let Some(tab_config) = self.config.tab(tab.as_str()) else {
            return Spoken::Skipped;
        };
        let preferred = self.state.voices.get(tab.as_str());
        self.output
            .speak(&reply.text, &tab_config.speech, preferred, reply.emotion)
            .await
    }

    /// Show `tab`.  Unknown tabs and the tab already showing are no-ops.
    pub fn switch_tab(&mut self, tab: &str) -> bool {
        if !self.state.store.switch_active(tab) {
            return false;
        }
        WIDGET_TAB_SWITCHES.click();
        tracing::debug!(tab, "tab switched");
        self.view.mark_active_tab(self.state.store.active());
        self.redraw();
        true
    }

    /// Flip speech output.  Returns the new state.
    pub fn toggle_speech(&mut self) -> bool {
        let on = !self.output.is_enabled();
        self.set_speech_enabled(on)
    }

    /// Turn speech output on or off.  Returns the resulting state, which
    /// stays off when nothing can speak.
    pub fn set_speech_enabled(&mut self, enabled: bool) -> bool {
        let on = self.output.set_enabled(enabled);
        self.view.set_active(Control::SpeechToggle, on);
        on
    }

    pub fn is_speech_enabled(&self) -> bool {
        self.output.is_enabled()
    }

    /// Handle a mic button press.
    pub async fn press_mic(&mut self) -> InputOutcome {
        let outcome = self.input.press().await;
        match &outcome {
            InputOutcome::Started => self.view.set_active(Control::Mic, true),
            InputOutcome::Stopped => self.view.set_active(Control::Mic, false),
            InputOutcome::PermissionDenied => {
                self.view.set_active(Control::Mic, false);
                self.view.set_enabled(Control::Mic, false);
                self.view.set_hint(Control::Mic, PERMISSION_HINT);
            }
            InputOutcome::Unsupported => {
                self.view.set_enabled(Control::Mic, false);
                self.view.set_hint(Control::Mic, UNSUPPORTED_HINT);
            }
            InputOutcome::Failed { hint } => {
                self.view.set_active(Control::Mic, false);
                self.view.set_hint(Control::Mic, hint);
            }
            InputOutcome::Heard(_) | InputOutcome::Finished { .. } | InputOutcome::Ignored => {}
        }
        outcome
    }

    /// Handle a recognizer callback.
    ///
    /// A transcript replaces the input box.  When the session ends with
    /// auto-submit on, `voice:autoSend` is raised on the input element and
    /// the input box is sent.
    pub async fn recognition_event(&mut self, event: EngineEvent) -> Recognition {
        let outcome = self.input.handle_engine(event);
        let mut sent = None;
        match &outcome {
            InputOutcome::Heard(text) => self.set_input(text.clone()),
            InputOutcome::Finished { auto_submit } => {
                self.view.set_active(Control::Mic, false);
                if *auto_submit && !self.state.input.trim().is_empty() {
                    let event = InPageEvent::VoiceAutoSend;
                    self.view.dispatch(&event);
                    sent = Some(self.handle_event(&event).await);
                }
            }
            InputOutcome::Failed { hint } => {
                self.view.set_active(Control::Mic, false);
                self.view.set_hint(Control::Mic, hint);
            }
            _ => {}
        }
        Recognition { outcome, sent }
    }

    /// React to an in-page event.
    pub async fn handle_event(&mut self, event: &InPageEvent) -> SendOutcome {
        match event {
            InPageEvent::VoiceAutoSend => self.send_input().await,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.input.is_listening()
    }

    /// Pick a voice for every tab once the synthesizer has loaded its voice
    /// list, polling a bounded number of times.  Returns true if resolved.
    pub async fn resolve_voices(&mut self) -> bool {
        if !self.output.has_local() {
            return false;
        }
        let tabs = self.state.store.tabs().cloned().collect();
        let mut resolver = VoiceResolver::new(tabs, self.config.lang());
        loop {
            match resolver.attempt(&self.output.voices()) {
                ResolveStep::Resolved(prefs) => {
                    tracing::debug!(tabs = prefs.len(), "voices resolved");
                    self.state.voices = prefs;
                    return true;
                }
                ResolveStep::Retry(delay) => tokio::time::sleep(delay).await,
                ResolveStep::GaveUp => {
                    tracing::debug!(attempts = resolver.attempts(), "no voices, giving up");
                    return false;
                }
            }
        }
    }

    /// A tab button's avatar failed to load; show the default instead.
    pub fn tab_avatar_failed(&mut self, tab: &str) {
        let Some(tab_id) = self.state.store.tab(tab).cloned() else {
            return;
        };
        if let Some(src) = self.tab_avatars.load_failed(tab) {
            self.view.set_tab_avatar(&tab_id, src);
        }
    }

    /// The tab showing.
    pub fn active_tab(&self) -> &TabId {
        self.state.store.active()
    }

    /// The messages of `tab`, oldest first.
    pub fn messages(&self, tab: &str) -> &[Message] {
        self.state.store.messages(tab).unwrap_or_default()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }
}
