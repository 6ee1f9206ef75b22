//! A [`View`] that keeps the widget's page elements in memory.
//!
//! `MarkupView` follows the [`DomContract`]: each message becomes a
//! `.msg-row` holding a `.msg` bubble and an `img.avatar`, with the avatar
//! on the left for bot rows and on the right for user rows.  The element
//! state can be inspected directly or serialized with
//! [`MarkupView::to_html`].

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::dom::{Control, DomContract, InPageEvent};
use crate::render::{MessageRow, View};
use crate::types::{Speaker, TabId};

/// State of one button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    /// False when the control is disabled.
    pub enabled: bool,
    /// True while the control carries its "on" class.
    pub active: bool,
    /// Tooltip text.
    pub hint: Option<String>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            enabled: true,
            active: false,
            hint: None,
        }
    }
}

/// One drawn message row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    /// Row speaker.
    pub speaker: Speaker,
    /// Bubble text, unescaped.
    pub text: String,
    /// Avatar URL.
    pub avatar: String,
}

/// In-memory rendition of the widget's elements.
#[derive(Debug, Clone, Default)]
pub struct MarkupView {
    contract: DomContract,
    rows: Vec<RenderedRow>,
    input: String,
    controls: HashMap<Control, ControlState>,
    tabs: Vec<(TabId, Option<String>)>,
    active_tab: Option<TabId>,
    scrolled_rows: usize,
    clears: usize,
    events: Vec<InPageEvent>,
}

impl MarkupView {
    /// Creates a view following `contract`.
    pub fn new(contract: DomContract) -> Self {
        Self {
            contract,
            ..Self::default()
        }
    }

    /// The rows currently in the message list.
    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    /// The input box contents.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The state of `control`.
    pub fn control(&self, control: Control) -> ControlState {
        self.controls.get(&control).cloned().unwrap_or_default()
    }

    /// The highlighted tab.
    pub fn active_tab(&self) -> Option<&TabId> {
        self.active_tab.as_ref()
    }

    /// The avatar shown on `tab`'s button.
    pub fn tab_avatar(&self, tab: &str) -> Option<&str> {
        self.tabs
            .iter()
            .find(|(t, _)| t == tab)
            .and_then(|(_, src)| src.as_deref())
    }

    /// True if the list was scrolled after its last row was added.
    pub fn is_scrolled_to_latest(&self) -> bool {
        self.scrolled_rows == self.rows.len()
    }

    /// How many times the list was cleared.
    pub fn clear_count(&self) -> usize {
        self.clears
    }

    /// In-page events raised on the elements, oldest first.
    pub fn events(&self) -> &[InPageEvent] {
        &self.events
    }

    /// Serialize the widget's elements to HTML.
    pub fn to_html(&self) -> String {
        let c = &self.contract;
        let mut html = String::new();
        let _ = write!(html, r#"<div id="{}">"#, DomContract::id_of(&c.output));
        for row in &self.rows {
            let class = row.speaker.css_class();
            let avatar = format!(
                r#"<img class="avatar" alt="{class}" src="{}">"#,
                escape(&row.avatar)
            );
            let bubble = format!(r#"<div class="msg {class}">{}</div>"#, escape(&row.text));
            let _ = write!(html, r#"<div class="msg-row {class}">"#);
            match row.speaker {
                Speaker::Bot => html.push_str(&(avatar + &bubble)),
                Speaker::User => html.push_str(&(bubble + &avatar)),
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
        let _ = write!(
            html,
            r#"<input id="{}" value="{}">"#,
            DomContract::id_of(&c.input),
            escape(&self.input)
        );
        for control in [Control::Send, Control::Mic, Control::SpeechToggle] {
            html.push_str(&self.control_html(control));
        }
        for (tab, avatar) in &self.tabs {
            let mut class = DomContract::class_of(&c.tab_button).to_string();
            if self.active_tab.as_ref() == Some(tab) {
                class.push(' ');
                class.push_str(&c.active_class);
            }
            let _ = write!(
                html,
                r#"<button class="{class}" {}="{}">"#,
                c.tab_attribute,
                escape(tab.as_str())
            );
            if let Some(src) = avatar {
                let _ = write!(
                    html,
                    r#"<img class="{}" src="{}">"#,
                    DomContract::class_of(&c.tab_avatar),
                    escape(src)
                );
            }
            html.push_str("</button>");
        }
        html
    }

    fn control_html(&self, control: Control) -> String {
        let state = self.control(control);
        let mut attrs = format!(r#"id="{}""#, DomContract::id_of(self.contract.selector(control)));
        if state.active
            && let Some(class) = self.contract.active_class_of(control)
        {
            let _ = write!(attrs, r#" class="{class}""#);
        }
        if let Some(hint) = &state.hint {
            let _ = write!(attrs, r#" title="{}""#, escape(hint));
        }
        if !state.enabled {
            attrs.push_str(" disabled");
        }
        format!("<button {attrs}></button>")
    }

    fn control_mut(&mut self, control: Control) -> &mut ControlState {
        self.controls.entry(control).or_default()
    }
}

impl View for MarkupView {
    fn set_contract(&mut self, contract: &DomContract) {
        self.contract = contract.clone();
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.scrolled_rows = 0;
        self.clears += 1;
    }

    fn append_row(&mut self, row: &MessageRow<'_>) {
        self.rows.push(RenderedRow {
            speaker: row.speaker,
            text: row.text.to_string(),
            avatar: row.avatar.to_string(),
        });
    }

    fn scroll_to_latest(&mut self) {
        self.scrolled_rows = self.rows.len();
    }

    fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    fn mark_active_tab(&mut self, tab: &TabId) {
        if !self.tabs.iter().any(|(t, _)| t == tab) {
            self.tabs.push((tab.clone(), None));
        }
        self.active_tab = Some(tab.clone());
    }

    fn set_tab_avatar(&mut self, tab: &TabId, src: &str) {
        match self.tabs.iter_mut().find(|(t, _)| t == tab) {
            Some((_, avatar)) => *avatar = Some(src.to_string()),
            None => self.tabs.push((tab.clone(), Some(src.to_string()))),
        }
    }

    fn set_enabled(&mut self, control: Control, enabled: bool) {
        self.control_mut(control).enabled = enabled;
    }

    fn set_active(&mut self, control: Control, active: bool) {
        self.control_mut(control).active = active;
    }

    fn dispatch(&mut self, event: &InPageEvent) {
        self.events.push(event.clone());
    }

    fn set_hint(&mut self, control: Control, hint: &str) {
        self.control_mut(control).hint = Some(hint.to_string());
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
