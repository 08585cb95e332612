// Portal configuration, read from the environment (and `.env` via dotenv).

use crate::core::identity::{AdminAllowlist, Viewer};
use crate::core::moderation::ModerationPolicy;
use crate::core::workflow::EditPolicy;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/portal.db";
const DEFAULT_SAMPLE_PUBLISHER: &str = "EPSUPPORT1234";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Failed to read moderation policy file {path}: {source}")]
    PolicyFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid moderation policy file {path}: {source}")]
    PolicyFormat {
        path: String,
        source: serde_json::Error,
    },
}

/// Where records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Sqlite(String),
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub store: StoreBackend,
    /// `ADMIN_EMAILS` plus the sample publisher account
    pub admins: AdminAllowlist,
    pub policy: ModerationPolicy,
    pub edit_policy: EditPolicy,
    pub seed_sample_missions: bool,
    /// Account that publishes the sample missions
    pub sample_publisher: String,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source. Unset and blank variables
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let store = match var("DATABASE_URL") {
            Some(url) if url.trim().eq_ignore_ascii_case("memory") => StoreBackend::InMemory,
            Some(url) => StoreBackend::Sqlite(url.trim().to_string()),
            None => StoreBackend::Sqlite(DEFAULT_DATABASE_URL.to_string()),
        };

        let mut policy = match var("MODERATION_POLICY_FILE") {
            Some(path) => load_policy_file(&path)?,
            None => ModerationPolicy::default(),
        };
        if let Some(words) = var("BANNED_WORDS") {
            policy.banned_words = split_list(&words);
        }
        if let Some(domains) = var("ALLOWED_DOMAINS") {
            policy.allowed_domains = split_list(&domains);
        }
        let policy = policy.normalized();

        let edit_policy = match var("EDIT_POLICY") {
            Some(value) => value
                .parse::<EditPolicy>()
                .map_err(|reason| ConfigError::InvalidValue {
                    name: "EDIT_POLICY",
                    reason,
                })?,
            None => EditPolicy::default(),
        };

        let seed_sample_missions = match var("SEED_SAMPLE_MISSIONS") {
            Some(value) => parse_bool("SEED_SAMPLE_MISSIONS", &value)?,
            None => true,
        };

        let sample_publisher = var("SAMPLE_PUBLISHER")
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SAMPLE_PUBLISHER.to_string());

        let mut admin_accounts = var("ADMIN_EMAILS")
            .as_deref()
            .map(split_list)
            .unwrap_or_default();
        admin_accounts.push(sample_publisher.clone());
        let admins = AdminAllowlist::new(admin_accounts);

        Ok(Self {
            store,
            admins,
            policy,
            edit_policy,
            seed_sample_missions,
            sample_publisher,
        })
    }

    /// The account that publishes sample missions, classified by the allow-list.
    pub fn publisher(&self) -> Viewer {
        self.admins
            .viewer(&self.sample_publisher, &self.sample_publisher, &self.sample_publisher)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn load_policy_file(path: &str) -> Result<ModerationPolicy, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyFile {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::PolicyFormat {
        path: path.to_string(),
        source,
    })
}
