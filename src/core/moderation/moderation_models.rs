// Moderation domain models - word lists and verdicts for the content filter.
//
// These are pure domain types. The policy is plain data so callers can load it
// from configuration or swap in fixtures for tests.

use serde::{Deserialize, Serialize};

const DEFAULT_BANNED_WORDS: &[&str] = &[
    "porn", "p0rn", "xxx", "sex", "gambling", "casino", "betting", "poker", "slots", "nude",
    "viagra", "escort", "adult", "dating", "hookup",
];

const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "imagekit.io",
    "youtube.com",
    "youtu.be",
    "microbit.org",
    "makecode.microbit.org",
    "images.unsplash.com",
    "api.dicebear.com",
    "picsum.photos",
];

/// The two fixed lists the content filter checks against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPolicy {
    /// Matched as substrings of normalized text
    #[serde(default)]
    pub banned_words: Vec<String>,
    /// Hosts allowed in links, subdomains included
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

impl ModerationPolicy {
    pub fn new<W, D>(banned_words: W, allowed_domains: D) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            banned_words: clean_entries(banned_words),
            allowed_domains: clean_entries(allowed_domains),
        }
    }

    /// Lowercase and trim every entry, dropping blanks.
    ///
    /// A blank banned word would match every string, so policies loaded from
    /// files or the environment go through this before reaching the filter.
    pub fn normalized(self) -> Self {
        Self::new(self.banned_words, self.allowed_domains)
    }
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BANNED_WORDS, DEFAULT_ALLOWED_DOMAINS)
    }
}

fn clean_entries<I>(entries: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| entry.as_ref().trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Why a piece of content was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlagReason {
    /// Normalized text contained a banned word
    BannedWord { word: String },
    /// A link pointed at a host outside the allow-list
    UnlistedDomain { host: String },
    /// Something that looked like a link did not parse
    MalformedUrl { url: String },
}

impl std::fmt::Display for FlagReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagReason::BannedWord { word } => write!(f, "banned word \"{}\"", word),
            FlagReason::UnlistedDomain { host } => write!(f, "unlisted domain {}", host),
            FlagReason::MalformedUrl { url } => write!(f, "malformed link {}", url),
        }
    }
}

/// Result of running the content filter over a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationVerdict {
    /// Whether the content needs human review
    pub flagged: bool,
    /// Every rule that fired, in field order
    pub reasons: Vec<FlagReason>,
}

impl ModerationVerdict {
    /// Create a "clean" verdict
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reason: FlagReason) {
        self.flagged = true;
        self.reasons.push(reason);
    }

    pub fn merge(&mut self, other: ModerationVerdict) {
        self.flagged |= other.flagged;
        self.reasons.extend(other.reasons);
    }
}
