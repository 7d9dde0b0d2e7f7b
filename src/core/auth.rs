//! Access control for every bot entry point

use std::collections::HashSet;

use crate::core::config;

/// Notice sent to callers outside the authorized set.
pub const UNAUTHORIZED_NOTICE: &str = "You are not authorized to use this bot.";

/// Static set of user ids allowed to use the bot.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    allowed: HashSet<i64>,
}

impl Authorizer {
    pub fn new(allowed: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Authorizer populated from AUTHORIZED_USERS
    pub fn from_config() -> Self {
        Self::new(config::access::AUTHORIZED_USERS.iter().copied())
    }

    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.allowed.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
