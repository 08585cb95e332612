// Identity models - who is acting and with which role.
//
// Authentication happens outside this crate. By the time a request reaches the
// core we only need a stable id, a display name and a role.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role classification handed to the core per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Standard,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Administrator => write!(f, "admin"),
            Role::Standard => write!(f, "user"),
        }
    }
}

/// The authenticated user viewing or acting on content.
///
/// Records store the author's `user_id`, so ownership checks compare against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
    /// Avatar image attached to new community posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role,
            avatar_url: None,
        }
    }

    pub fn administrator(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self::new(user_id.clone(), user_id, Role::Administrator)
    }

    pub fn standard(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self::new(user_id.clone(), user_id, Role::Standard)
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Fixed list of privileged accounts, keyed by email or account name.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I>(emails: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn role_for(&self, email: &str) -> Role {
        if self.emails.contains(&email.trim().to_lowercase()) {
            Role::Administrator
        } else {
            Role::Standard
        }
    }

    /// Build the viewer for an authenticated session.
    pub fn viewer(&self, user_id: &str, display_name: &str, email: &str) -> Viewer {
        Viewer::new(user_id, display_name, self.role_for(email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
