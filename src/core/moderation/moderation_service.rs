// Content filter - core business logic for flagging submitted content.
//
// This filter handles:
// - Banned words (after punctuation-stripping normalization)
// - Links to hosts outside the allow-list
// - Links that do not parse (fail-closed)
//
// NO storage or network dependencies here - just pure domain logic.

use super::moderation_models::{FlagReason, ModerationPolicy, ModerationVerdict};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Anything that starts like a web link, up to the next whitespace.
fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("link pattern is a valid regex"))
}

/// Lowercase the text and drop everything except ASCII letters, digits,
/// whitespace, `.`, `:` and `/`.
///
/// Spacing is kept, so "p o r n" is not collapsed, while "p-o-r-n" is.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ':' | '/'))
        .collect()
}

/// Decides whether submitted text and links need human review.
///
/// The policy is fixed at construction. The filter never fails: anything it
/// cannot make sense of is flagged instead.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    policy: ModerationPolicy,
}

impl ContentFilter {
    /// Create a filter over the given policy.
    pub fn new(policy: ModerationPolicy) -> Self {
        Self {
            policy: policy.normalized(),
        }
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    /// `true` if any text or link field needs review.
    pub fn moderate<T, U>(&self, texts: T, urls: U) -> bool
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        self.inspect(texts, urls).flagged
    }

    /// Check a single free-text string.
    pub fn check_text(&self, text: &str) -> bool {
        self.inspect_text(text).flagged
    }

    /// Run every rule and collect the reasons that fired.
    ///
    /// # Arguments
    /// * `texts` - free-text fields; banned words plus any links embedded in them
    /// * `urls` - link fields; each one must be an allow-listed http(s) link
    pub fn inspect<T, U>(&self, texts: T, urls: U) -> ModerationVerdict
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        let mut verdict = ModerationVerdict::clean();
        for text in texts {
            verdict.merge(self.inspect_text(text.as_ref()));
        }
        for url in urls {
            if let Some(reason) = self.inspect_url_field(url.as_ref()) {
                verdict.push(reason);
            }
        }
        verdict
    }

    /// Banned words first, then every embedded link independently.
    pub fn inspect_text(&self, text: &str) -> ModerationVerdict {
        let mut verdict = ModerationVerdict::clean();
        if text.is_empty() {
            return verdict;
        }

        let normalized = normalize(text);
        for word in &self.policy.banned_words {
            if normalized.contains(word.as_str()) {
                verdict.push(FlagReason::BannedWord { word: word.clone() });
            }
        }

        for link in link_pattern().find_iter(text) {
            if let Some(reason) = self.check_link(link.as_str()) {
                verdict.push(reason);
            }
        }

        verdict
    }

    /// A link field holds exactly one link. Blank fields are skipped.
    fn inspect_url_field(&self, value: &str) -> Option<FlagReason> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        match Url::parse(value) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                self.check_host(&parsed, value)
            }
            _ => Some(FlagReason::MalformedUrl {
                url: value.to_string(),
            }),
        }
    }

    fn check_link(&self, link: &str) -> Option<FlagReason> {
        match Url::parse(link) {
            Ok(parsed) => self.check_host(&parsed, link),
            Err(_) => Some(FlagReason::MalformedUrl {
                url: link.to_string(),
            }),
        }
    }

    fn check_host(&self, parsed: &Url, raw: &str) -> Option<FlagReason> {
        match parsed.host_str() {
            Some(host) if self.is_allowed_host(host) => None,
            Some(host) => Some(FlagReason::UnlistedDomain {
                host: host.to_string(),
            }),
            None => Some(FlagReason::MalformedUrl {
                url: raw.to_string(),
            }),
        }
    }

    /// Exact match or a dot-separated subdomain of an allow-listed entry.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.policy.allowed_domains.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(ModerationPolicy::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
