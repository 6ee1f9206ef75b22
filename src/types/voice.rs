use serde::{Deserialize, Serialize};

/// A synthesis voice as reported by the host's speech engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-unique display name, e.g. `Microsoft Yunxi Online`.
    pub name: String,

    /// BCP 47 language tag, e.g. `zh-CN`.  Some engines report `zh_CN`.
    pub lang: String,
}

impl Voice {
    /// Create a voice descriptor.
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    /// True if this voice speaks the language of `tag`.
    ///
    /// Only the primary subtag is compared, case-insensitively, so a `zh-CN`
    /// widget accepts `zh-TW` and `zh_HK` voices.
    pub fn speaks(&self, tag: &str) -> bool {
        let ours = primary_subtag(&self.lang);
        !ours.is_empty() && ours.eq_ignore_ascii_case(primary_subtag(tag))
    }

    /// True if a word of the name or language equals one of `keywords`,
    /// case-insensitively.
    ///
    /// Whole words are compared so that `male` does not match `Female`.
    pub fn mentions(&self, keywords: &[&str]) -> bool {
        self.name
            .split(|c: char| !c.is_alphanumeric())
            .chain(self.lang.split(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .any(|w| keywords.iter().any(|k| w.eq_ignore_ascii_case(k)))
    }
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or("").trim()
}
