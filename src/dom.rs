//! The page contract the widget binds to.
//!
//! A host page provides an output area, an input box, send/mic/speech
//! buttons and one button per chat tab.  [`DomContract`] names those
//! elements; [`TabButton`] is what the widget reads off each tab button.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::TabId;

/// Avatar used for tab buttons without a usable `data-avatar`.
pub const DEFAULT_TAB_AVATAR: &str = "/static/img/user.svg";

/// Selectors, attributes and class names the widget expects on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomContract {
    /// The scrolling message list.
    pub output: String,
    /// The text input box.
    pub input: String,
    /// The send button.
    pub send_button: String,
    /// The microphone button.
    pub mic_button: String,
    /// The speech on/off toggle.
    pub speech_button: String,
    /// One of these per chat tab.
    pub tab_button: String,
    /// Image inside a tab button.
    pub tab_avatar: String,
    /// Attribute of a tab button holding its tab id.
    pub tab_attribute: String,
    /// Optional attribute of a tab button holding its avatar URL.
    pub avatar_attribute: String,
    /// Class marking the active tab button.
    pub active_class: String,
    /// Class marking the mic button while listening.
    pub recording_class: String,
    /// Class marking the speech toggle while speech is on.
    pub speech_on_class: String,
}

impl Default for DomContract {
    fn default() -> Self {
        Self {
            output: "#output".to_string(),
            input: "#message".to_string(),
            send_button: "#send".to_string(),
            mic_button: "#mic".to_string(),
            speech_button: "#tts".to_string(),
            tab_button: ".chat-tab".to_string(),
            tab_avatar: ".chat-avatar".to_string(),
            tab_attribute: "data-chat".to_string(),
            avatar_attribute: "data-avatar".to_string(),
            active_class: "active".to_string(),
            recording_class: "recording".to_string(),
            speech_on_class: "tts-on".to_string(),
        }
    }
}

impl DomContract {
    /// The element id behind an `#id` selector.
    pub fn id_of(selector: &str) -> &str {
        selector.strip_prefix('#').unwrap_or(selector)
    }

    /// The class name behind a `.class` selector.
    pub fn class_of(selector: &str) -> &str {
        selector.strip_prefix('.').unwrap_or(selector)
    }

    /// The selector of `control`.
    pub fn selector(&self, control: Control) -> &str {
        match control {
            Control::Send => &self.send_button,
            Control::Mic => &self.mic_button,
            Control::SpeechToggle => &self.speech_button,
        }
    }

    /// The class a control carries while it is "on", if it has one.
    pub fn active_class_of(&self, control: Control) -> Option<&str> {
        match control {
            Control::Send => None,
            Control::Mic => Some(&self.recording_class),
            Control::SpeechToggle => Some(&self.speech_on_class),
        }
    }
}

/// The buttons of the widget other than the tab buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Control {
    /// Sends the input box contents.
    Send,
    /// Starts and stops voice input.
    Mic,
    /// Turns speech output on and off.
    SpeechToggle,
}

/// Signals the widget raises on its own elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InPageEvent {
    /// Voice input finished with a transcript and auto-submit is on.
    /// Raised on the input element.
    VoiceAutoSend,
}

impl InPageEvent {
    /// The event name as seen by page scripts.
    pub fn name(&self) -> &'static str {
        match self {
            InPageEvent::VoiceAutoSend => "voice:autoSend",
        }
    }
}

/// What the widget reads off one tab button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabButton {
    /// The tab the button switches to.
    pub tab: TabId,
    /// Avatar URL from the avatar attribute, if present and non-empty.
    pub avatar: Option<String>,
}

impl TabButton {
    /// Create a tab button descriptor.
    pub fn new(tab: impl Into<TabId>, avatar: Option<String>) -> Self {
        Self {
            tab: tab.into(),
            avatar,
        }
    }

    /// Read a tab button from its attributes.
    ///
    /// Returns `None` when the tab attribute is missing or blank; such a
    /// button does nothing when clicked.
    pub fn from_attributes<'a, I>(contract: &DomContract, attributes: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut tab = None;
        let mut avatar = None;
        for (name, value) in attributes {
            if name == contract.tab_attribute {
                tab = Some(value.trim());
            } else if name == contract.avatar_attribute {
                avatar = Some(value.trim());
            }
        }
        let tab = tab.filter(|t| !t.is_empty())?;
        let avatar = avatar.filter(|a| !a.is_empty()).map(str::to_string);
        Some(Self::new(tab, avatar))
    }
}

/// Avatar image shown on each tab button.
///
/// An avatar that fails to load is replaced once by the default; a failing
/// default is left alone so a broken default cannot loop.
#[derive(Debug, Clone, Default)]
pub struct TabAvatars {
    default: String,
    sources: HashMap<TabId, String>,
}

impl TabAvatars {
    /// Resolve the avatar of every button, falling back to `default`.
    pub fn resolve<'a, I>(buttons: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = &'a TabButton>,
    {
        let default = default.into();
        let sources = buttons
            .into_iter()
            .map(|b| {
                let src = b.avatar.clone().unwrap_or_else(|| default.clone());
                (b.tab.clone(), src)
            })
            .collect();
        Self { default, sources }
    }

    /// The avatar URL currently shown for `tab`.
    pub fn source(&self, tab: &str) -> Option<&str> {
        self.sources.get(tab).map(String::as_str)
    }

    /// Record that `tab`'s avatar failed to load.
    ///
    /// Returns the replacement URL, or `None` if the tab already shows the
    /// default.
    pub fn load_failed(&mut self, tab: &str) -> Option<&str> {
        let src = self.sources.get_mut(tab)?;
        if *src == self.default {
            return None;
        }
        src.clone_from(&self.default);
        Some(src.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_strip_their_sigils() {
        let contract = DomContract::default();
        assert_eq!(DomContract::id_of(&contract.output), "output");
        assert_eq!(DomContract::class_of(&contract.tab_button), "chat-tab");
        assert_eq!(contract.selector(Control::Mic), "#mic");
        assert_eq!(contract.active_class_of(Control::Send), None);
    }

    #[test]
    fn tab_button_from_attributes() {
        let contract = DomContract::default();
        let button = TabButton::from_attributes(
            &contract,
            [("class", "chat-tab"), ("data-chat", "chat2"), ("data-avatar", " /a.png ")],
        )
        .unwrap();
        assert_eq!(button.tab, "chat2");
        assert_eq!(button.avatar.as_deref(), Some("/a.png"));

        let blank_avatar =
            TabButton::from_attributes(&contract, [("data-chat", "chat1"), ("data-avatar", "")])
                .unwrap();
        assert_eq!(blank_avatar.avatar, None);

        assert!(TabButton::from_attributes(&contract, [("data-chat", "  ")]).is_none());
        assert!(TabButton::from_attributes(&contract, [("data-avatar", "/a.png")]).is_none());
    }

    #[test]
    fn tab_avatars_fall_back_once() {
        let buttons = vec![
            TabButton::new("chat1", Some("/custom.png".to_string())),
            TabButton::new("chat2", None),
        ];
        let mut avatars = TabAvatars::resolve(&buttons, DEFAULT_TAB_AVATAR);
        assert_eq!(avatars.source("chat1"), Some("/custom.png"));
        assert_eq!(avatars.source("chat2"), Some(DEFAULT_TAB_AVATAR));

        assert_eq!(avatars.load_failed("chat1"), Some(DEFAULT_TAB_AVATAR));
        assert_eq!(avatars.load_failed("chat1"), None);
        assert_eq!(avatars.load_failed("chat2"), None);
        assert_eq!(avatars.load_failed("chat9"), None);
    }

    #[test]
    fn event_name() {
        assert_eq!(InPageEvent::VoiceAutoSend.name(), "voice:autoSend");
    }
}
