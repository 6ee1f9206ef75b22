//! Configuration types for the widget.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, and command-line arguments parsed via `arrrg`.

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_BASE_URL;
use crate::dom::DomContract;
use crate::error::{Error, Result};
use crate::render::AvatarSet;
use crate::speech::{ProsodyProfile, SpeechSettings, SpeechStrategy};
use crate::types::TabId;

/// Language for speech in both directions unless configured otherwise.
pub const DEFAULT_LANG: &str = "zh-CN";

/// Prefix of the bot message that reports a failed request.
pub const DEFAULT_ERROR_PREFIX: &str = "Error: ";

/// Command-line arguments for the tabchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct WidgetArgs {
    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Root URL of the chat server.
    #[arrrg(optional, "Chat server root (default: http://127.0.0.1:5000/)", "URL")]
    pub endpoint: Option<String>,

    /// Speech language tag.
    #[arrrg(optional, "Speech language (default: zh-CN)", "LANG")]
    pub lang: Option<String>,

    /// Send recognized speech without waiting for the user.
    #[arrrg(flag, "Send voice input as soon as it is recognized")]
    pub auto_send: bool,

    /// Start with speech output off.
    #[arrrg(flag, "Start with speech output off")]
    pub no_speech: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Per-request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECS")]
    pub timeout_secs: Option<u64>,
}

/// One chat tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabConfig {
    /// The id sent to the server as `chat`.
    pub id: TabId,

    /// Button caption.  Defaults to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Avatar on the tab button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Avatar on this tab's bot rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_avatar: Option<String>,

    /// How replies in this tab are read aloud.
    #[serde(default)]
    pub speech: SpeechStrategy,
}

impl TabConfig {
    /// A tab with local speech and default avatars.
    pub fn new(id: impl Into<TabId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            avatar: None,
            bot_avatar: None,
            speech: SpeechStrategy::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_bot_avatar(mut self, src: impl Into<String>) -> Self {
        self.bot_avatar = Some(src.into());
        self
    }

    pub fn with_speech(mut self, speech: SpeechStrategy) -> Self {
        self.speech = speech;
        self
    }

    /// The button caption.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }
}

/// The two tabs the widget ships with.
///
/// `chat1` reads replies with a remote voice, slightly slower and higher
/// than neutral, and follows the reply's emotion when the server sends one.
/// `chat2` uses local synthesis.
///
/// The emotion curve for `chat1` is centered on its fixed `-10%`/`+2Hz`
/// delivery rather than on neutral: the base offsets are added to the mapped
/// swing, so emotion `+1.0` yields `+2%` (not `+12%`) and `-1.0` yields
/// `-28%`.  Replies without an emotion keep the fixed values.
pub fn default_tabs() -> Vec<TabConfig> {
    let yunxi = ProsodyProfile {
        base_rate_pct: -10,
        base_pitch_hz: 2,
        ..ProsodyProfile::yunxi()
    };
    vec![
        TabConfig::new("chat1")
            .with_bot_avatar("/static/img/lbxx_chat.png")
            .with_speech(SpeechStrategy::Remote {
                voice: Some(yunxi.voice.clone()),
                rate: Some("-10%".to_string()),
                pitch: Some("+2Hz".to_string()),
                prosody: Some(yunxi),
            }),
        TabConfig::new("chat2"),
    ]
}

/// Resolved configuration for a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// Root URL of the chat server.
    pub base_url: String,

    /// Speech language and local delivery settings.
    pub speech: SpeechSettings,

    /// Whether voice input sends as soon as recognition ends.
    pub auto_send: bool,

    /// Whether speech output starts on.
    pub speech_enabled: bool,

    /// Whether the terminal host uses ANSI colors and styles.
    pub use_color: bool,

    /// Prefix of in-band error messages.
    pub error_prefix: String,

    /// Per-request timeout.  `None` waits as long as the server does.
    pub timeout: Option<Duration>,

    /// Avatars for message rows.
    pub avatars: AvatarSet,

    /// Element names the page uses.
    pub dom: DomContract,

    /// The tabs, in button order.  The first starts active.
    pub tabs: Vec<TabConfig>,
}

impl WidgetConfig {
    /// Creates a WidgetConfig with default values.
    ///
    /// Defaults:
    /// - Server: http://127.0.0.1:5000/
    /// - Language: zh-CN
    /// - Auto-send: off
    /// - Speech: on
    /// - Timeout: none
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            speech: SpeechSettings::default(),
            auto_send: false,
            speech_enabled: true,
            use_color: true,
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
            timeout: None,
            avatars: AvatarSet::default(),
            dom: DomContract::default(),
            tabs: default_tabs(),
        }
    }

    /// Defaults, then the YAML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(WidgetFile::load(path)?.apply(Self::new()))
    }

    /// Defaults, then the `--config` file if given, then the other flags.
    pub fn from_args(args: WidgetArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        if let Some(endpoint) = args.endpoint {
            config = config.with_base_url(endpoint);
        }
        if let Some(lang) = args.lang {
            config = config.with_lang(lang);
        }
        if args.auto_send {
            config = config.with_auto_send(true);
        }
        if args.no_speech {
            config = config.with_speech_enabled(false);
        }
        if args.no_color {
            config = config.without_color();
        }
        if let Some(secs) = args.timeout_secs {
            config = config.with_timeout(Some(Duration::from_secs(secs)));
        }
        Ok(config)
    }

    /// Sets the server root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the speech language.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.speech.lang = lang.into();
        self
    }

    pub fn with_speech_settings(mut self, speech: SpeechSettings) -> Self {
        self.speech = speech;
        self
    }

    pub fn with_auto_send(mut self, auto_send: bool) -> Self {
        self.auto_send = auto_send;
        self
    }

    pub fn with_speech_enabled(mut self, enabled: bool) -> Self {
        self.speech_enabled = enabled;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    pub fn with_error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_avatars(mut self, avatars: AvatarSet) -> Self {
        self.avatars = avatars;
        self
    }

    pub fn with_dom(mut self, dom: DomContract) -> Self {
        self.dom = dom;
        self
    }

    /// Replaces the tab list.
    pub fn with_tabs(mut self, tabs: Vec<TabConfig>) -> Self {
        self.tabs = tabs;
        self
    }

    /// The speech language.
    pub fn lang(&self) -> &str {
        &self.speech.lang
    }

    /// Tab ids in button order.
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id.clone()).collect()
    }

    /// The configuration of `tab`.
    pub fn tab(&self, tab: &str) -> Option<&TabConfig> {
        self.tabs.iter().find(|t| t.id == tab)
    }

    /// Row avatars, with each tab's bot avatar folded in.
    pub fn row_avatars(&self) -> AvatarSet {
        self.tabs
            .iter()
            .filter_map(|t| t.bot_avatar.as_ref().map(|src| (t.id.clone(), src)))
            .fold(self.avatars.clone(), |set, (tab, src)| {
                set.with_bot_avatar(tab, src.clone())
            })
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The YAML configuration file.  Every field is optional.
///
/// ```yaml
/// base_url: http://127.0.0.1:5000/
/// auto_send: true
/// speech:
///   lang: zh-CN
///   rate: 1.1
/// tabs:
///   - id: chat1
///     speech: { kind: remote, voice: zh-CN-YunxiNeural }
///   - id: chat2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetFile {
    pub base_url: Option<String>,
    pub speech: Option<SpeechSettings>,
    pub auto_send: Option<bool>,
    pub speech_enabled: Option<bool>,
    pub error_prefix: Option<String>,
    pub timeout_secs: Option<u64>,
    pub avatars: Option<AvatarSet>,
    pub dom: Option<DomContract>,
    pub tabs: Option<Vec<TabConfig>>,
}

impl WidgetFile {
    /// Read and parse `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("cannot read {}", path.display()), e))?;
        Self::parse(&text)
    }

    /// Parse YAML text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlay the fields that are set onto `config`.
    pub fn apply(self, mut config: WidgetConfig) -> WidgetConfig {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(speech) = self.speech {
            config.speech = speech;
        }
        if let Some(auto_send) = self.auto_send {
            config.auto_send = auto_send;
        }
        if let Some(enabled) = self.speech_enabled {
            config.speech_enabled = enabled;
        }
        if let Some(prefix) = self.error_prefix {
            config.error_prefix = prefix;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(avatars) = self.avatars {
            config.avatars = avatars;
        }
        if let Some(dom) = self.dom {
            config.dom = dom;
        }
        if let Some(tabs) = self.tabs {
            config.tabs = tabs;
        }
        config
    }
}
