//! User lookups consumed while reconciling `assigned_to`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub display_name: String,
    pub user_login: String,
}

/// Synchronous, read-only user lookup.
pub trait UserLookup {
    fn lookup_user(&self, id: i64) -> Option<UserSummary>;
}

/// In-memory directory built from one batch lookup per request.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<i64, UserSummary>,
}

impl UserDirectory {
    #[must_use]
    pub fn from_users(users: impl IntoIterator<Item = UserSummary>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
        }
    }
}

impl UserLookup for UserDirectory {
    fn lookup_user(&self, id: i64) -> Option<UserSummary> {
        self.users.get(&id).cloned()
    }
}
