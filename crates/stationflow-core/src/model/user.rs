// ── Users and sessions ──

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A signed-in user plus the bearer token the backend issued.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: SecretString,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}
