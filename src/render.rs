//! Message list rendering.
//!
//! The widget draws through the [`View`] trait so the same controller can
//! target a page ([`crate::markup::MarkupView`]) or a terminal
//! ([`TerminalView`]).  [`render_all`] redraws a tab from the store and
//! [`append_one`] adds a single row; both leave the view scrolled to the
//! latest message.

use std::collections::HashMap;
use std::io::{self, Stdout, Write};

use serde::{Deserialize, Serialize};

use crate::dom::{Control, DomContract, InPageEvent};
use crate::store::SessionStore;
use crate::types::{Message, Speaker, TabId};

/// ANSI escape code for dim text (used for hints and headers).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the bot label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code that clears the screen and homes the cursor.
const ANSI_CLEAR: &str = "\x1b[2J\x1b[H";

/// One visible row of the message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRow<'a> {
    /// Who said it; selects the row's class and avatar side.
    pub speaker: Speaker,
    /// The bubble text.
    pub text: &'a str,
    /// The avatar image URL.
    pub avatar: &'a str,
}

/// Something the widget can draw into.
///
/// Only the message-list methods are required.  Control and tab methods
/// default to doing nothing for views without buttons.
pub trait View: Send {
    /// Bind to the page's element names.  Called once, before anything is
    /// drawn.
    fn set_contract(&mut self, _contract: &DomContract) {}

    /// Remove every row from the message list.
    fn clear(&mut self);

    /// Add one row at the bottom of the message list.
    fn append_row(&mut self, row: &MessageRow<'_>);

    /// Scroll so the most recent row is visible.
    fn scroll_to_latest(&mut self);

    /// Replace the input box contents.
    fn set_input(&mut self, _text: &str) {}

    /// Highlight `tab`'s button and un-highlight the rest.
    fn mark_active_tab(&mut self, _tab: &TabId) {}

    /// Show `tab`'s button avatar.
    fn set_tab_avatar(&mut self, _tab: &TabId, _src: &str) {}

    /// Enable or disable a control.
    fn set_enabled(&mut self, _control: Control, _enabled: bool) {}

    /// Toggle a control's "on" styling (recording, speech on).
    fn set_active(&mut self, _control: Control, _active: bool) {}

    /// Set a control's tooltip.
    fn set_hint(&mut self, _control: Control, _hint: &str) {}

    /// Raise an in-page event on the widget's elements.
    fn dispatch(&mut self, _event: &InPageEvent) {}
}

/// Avatar URLs for message rows.
///
/// The user avatar is shared by every tab.  The bot avatar can differ per
/// tab and falls back to `bot` when a tab has no override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarSet {
    /// Avatar for user rows.
    pub user: String,
    /// Default avatar for bot rows.
    pub bot: String,
    /// Per-tab bot avatars.
    pub bot_by_tab: HashMap<TabId, String>,
}

impl Default for AvatarSet {
    fn default() -> Self {
        Self {
            user: "/static/img/user.svg".to_string(),
            bot: "/static/img/bot.svg".to_string(),
            bot_by_tab: HashMap::new(),
        }
    }
}

impl AvatarSet {
    /// Sets the bot avatar for one tab.
    pub fn with_bot_avatar(mut self, tab: TabId, src: impl Into<String>) -> Self {
        self.bot_by_tab.insert(tab, src.into());
        self
    }

    /// The avatar for `speaker` in `tab`.
    pub fn for_speaker(&self, speaker: Speaker, tab: &str) -> &str {
        match speaker {
            Speaker::User => &self.user,
            Speaker::Bot => self.bot_by_tab.get(tab).unwrap_or(&self.bot),
        }
    }

    /// Build the row for `message` in `tab`.
    pub fn row<'a>(&'a self, tab: &str, message: &'a Message) -> MessageRow<'a> {
        MessageRow {
            speaker: message.speaker(),
            text: message.text(),
            avatar: self.for_speaker(message.speaker(), tab),
        }
    }
}

/// Clear the view and redraw every message of `tab` in insertion order.
///
/// Unknown tabs draw an empty list.
pub fn render_all(view: &mut dyn View, store: &SessionStore, avatars: &AvatarSet, tab: &str) {
    view.clear();
    for message in store.messages(tab).unwrap_or_default() {
        view.append_row(&avatars.row(tab, message));
    }
    view.scroll_to_latest();
}

/// Add a single row for `message` without redrawing the rest.
pub fn append_one(view: &mut dyn View, avatars: &AvatarSet, tab: &str, message: &Message) {
    view.append_row(&avatars.row(tab, message));
    view.scroll_to_latest();
}

/// Terminal view with optional ANSI styling.
///
/// A terminal cannot take rows back, so [`View::clear`] clears the screen
/// when color is on and prints a tab header otherwise.  Text placed in the
/// input box is held until the REPL asks for it with
/// [`TerminalView::take_input`].
pub struct TerminalView<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    active_tab: Option<TabId>,
    pending_input: Option<String>,
}

impl TerminalView<Stdout> {
    /// Creates a new TerminalView on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new TerminalView on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for TerminalView<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> TerminalView<W> {
    /// Creates a TerminalView writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            active_tab: None,
            pending_input: None,
        }
    }

    /// Text the widget placed in the input box since the last call.
    pub fn take_input(&mut self) -> Option<String> {
        self.pending_input.take()
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Print an informational message.
    pub fn print_info(&mut self, info: &str) {
        let _ = writeln!(self.out, "{info}");
        self.flush();
    }

    /// Print an error message.
    pub fn print_error(&mut self, error: &str) {
        if self.use_color {
            let _ = writeln!(self.out, "{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.out, "Error: {error}");
        }
        self.flush();
    }

    fn print_dim(&mut self, text: &str) {
        if self.use_color {
            let _ = writeln!(self.out, "{ANSI_DIM}{text}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.out, "{text}");
        }
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> View for TerminalView<W> {
    fn clear(&mut self) {
        let header = match &self.active_tab {
            Some(tab) => format!("----- {tab} -----"),
            None => "-----".to_string(),
        };
        if self.use_color {
            let _ = write!(self.out, "{ANSI_CLEAR}");
        }
        self.print_dim(&header);
    }

    fn append_row(&mut self, row: &MessageRow<'_>) {
        let (label, color) = match row.speaker {
            Speaker::User => ("You", ANSI_CYAN),
            Speaker::Bot => ("Bot", ANSI_GREEN),
        };
        if self.use_color {
            let _ = writeln!(self.out, "{color}{label}:{ANSI_RESET} {}", row.text);
        } else {
            let _ = writeln!(self.out, "{label}: {}", row.text);
        }
    }

    fn scroll_to_latest(&mut self) {
        self.flush();
    }

    fn set_input(&mut self, text: &str) {
        self.pending_input = if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    fn mark_active_tab(&mut self, tab: &TabId) {
        self.active_tab = Some(tab.clone());
    }

    fn set_active(&mut self, control: Control, active: bool) {
        match (control, active) {
            (Control::Mic, true) => self.print_dim("[listening]"),
            (Control::Mic, false) => self.print_dim("[stopped listening]"),
            (Control::SpeechToggle, on) => {
                self.print_dim(if on { "[speech on]" } else { "[speech off]" })
            }
            (Control::Send, _) => {}
        }
        self.flush();
    }

    fn set_hint(&mut self, control: Control, hint: &str) {
        let name = match control {
            Control::Send => "send",
            Control::Mic => "mic",
            Control::SpeechToggle => "speech",
        };
        self.print_dim(&format!("[{name}] {hint}"));
        self.flush();
    }
}
