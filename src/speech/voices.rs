//! Per-tab voice preferences.
//!
//! Engines often report an empty voice list until they finish loading, so
//! [`VoiceResolver`] retries a bounded number of times before giving up.

use std::collections::HashMap;
use std::time::Duration;

use crate::types::{TabId, Voice};

/// How many times the voice list is re-read before giving up.
pub const RESOLVE_ATTEMPTS: u32 = 10;

/// Delay between voice list reads.
pub const RESOLVE_INTERVAL: Duration = Duration::from_millis(300);

const CHILD_WORDS: &[&str] = &["child", "kid", "boy"];
const MALE_WORDS: &[&str] = &["male", "man"];

/// The preferred voice name of each tab, if one was resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoicePreferences {
    by_tab: HashMap<TabId, String>,
}

impl VoicePreferences {
    /// The preferred voice name for `tab`.
    pub fn get(&self, tab: &str) -> Option<&str> {
        self.by_tab.get(tab).map(String::as_str)
    }

    /// Set the preferred voice for `tab`.
    pub fn set(&mut self, tab: TabId, voice: impl Into<String>) {
        self.by_tab.insert(tab, voice.into());
    }

    /// True if no tab has a preference.
    pub fn is_empty(&self) -> bool {
        self.by_tab.is_empty()
    }

    /// Number of tabs with a preference.
    pub fn len(&self) -> usize {
        self.by_tab.len()
    }
}

/// Pick a voice for each of `tabs` from `voices`.
///
/// The first tab prefers a `lang` voice that sounds like a child, then one
/// that sounds male, then any `lang` voice, then any voice at all.  Every
/// later tab prefers a `lang` voice nobody has yet, then any unused voice, and
/// otherwise shares the first tab's voice.
pub fn choose_voices(voices: &[Voice], tabs: &[TabId], lang: &str) -> VoicePreferences {
    let mut prefs = VoicePreferences::default();
    let Some((first_tab, rest)) = tabs.split_first() else {
        return prefs;
    };
    let native: Vec<&Voice> = voices.iter().filter(|v| v.speaks(lang)).collect();
    let first = native
        .iter()
        .find(|v| v.mentions(CHILD_WORDS))
        .or_else(|| native.iter().find(|v| v.mentions(MALE_WORDS)))
        .copied()
        .or_else(|| native.first().copied())
        .or_else(|| voices.first());
    let Some(first) = first else {
        return prefs;
    };
    prefs.set(first_tab.clone(), first.name.clone());

    let mut taken = vec![first.name.as_str()];
    for tab in rest {
        let unused = |v: &&Voice| !taken.contains(&v.name.as_str());
        let pick = native
            .iter()
            .copied()
            .find(unused)
            .or_else(|| voices.iter().find(unused))
            .unwrap_or(first);
        taken.push(pick.name.as_str());
        prefs.set(tab.clone(), pick.name.clone());
    }
    prefs
}

/// What to do after one attempt to resolve voices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStep {
    /// Voices were available; here are the preferences.
    Resolved(VoicePreferences),
    /// The list was empty; try again after the delay.
    Retry(Duration),
    /// The list stayed empty; preferences stay unresolved.
    GaveUp,
}

/// Bounded retry loop around [`choose_voices`].
#[derive(Debug, Clone)]
pub struct VoiceResolver {
    tabs: Vec<TabId>,
    lang: String,
    attempts: u32,
}

impl VoiceResolver {
    /// Resolve voices for `tabs` in language `lang`.
    pub fn new(tabs: Vec<TabId>, lang: impl Into<String>) -> Self {
        Self {
            tabs,
            lang: lang.into(),
            attempts: 0,
        }
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Feed the engine's current voice list.
    pub fn attempt(&mut self, voices: &[Voice]) -> ResolveStep {
        if !voices.is_empty() {
            return ResolveStep::Resolved(choose_voices(voices, &self.tabs, &self.lang));
        }
        if self.attempts >= RESOLVE_ATTEMPTS {
            return ResolveStep::GaveUp;
        }
        self.attempts += 1;
        ResolveStep::Retry(RESOLVE_INTERVAL)
    }
}
