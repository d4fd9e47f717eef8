//! Entity identifiers (wids).
//!
//! Wids identify users, groups and broadcast lists in the web client's
//! store. The remote side represents them as `{ user, server, _serialized }`
//! records; the serialized form is `user@server`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Known id servers in the web client.
pub mod servers {
    pub const USER: &str = "c.us";
    pub const GROUP: &str = "g.us";
    pub const BROADCAST: &str = "broadcast";
    pub const NEWSLETTER: &str = "newsletter";
}

/// WId represents an entity identity in the web client's store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WId {
    pub user: String,
    pub server: String,
    #[serde(rename = "_serialized")]
    pub serialized: String,
}

impl WId {
    /// Creates a new wid from user and server parts.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        let user = user.into();
        let server = server.into();
        let serialized = format!("{user}@{server}");
        Self {
            user,
            server,
            serialized,
        }
    }

    /// Creates a user wid from a phone number.
    pub fn user(number: impl Into<String>) -> Self {
        Self::new(number, servers::USER)
    }

    /// Creates a group wid.
    pub fn group(id: impl Into<String>) -> Self {
        Self::new(id, servers::GROUP)
    }

    pub fn is_user(&self) -> bool {
        self.server == servers::USER
    }

    pub fn is_group(&self) -> bool {
        self.server == servers::GROUP
    }

    /// True for broadcast lists, the status broadcast included.
    pub fn is_broadcast(&self) -> bool {
        self.server == servers::BROADCAST
    }

    /// True only for the status broadcast pseudo-chat.
    pub fn is_status_broadcast(&self) -> bool {
        self.is_broadcast() && self.user == "status"
    }

    pub fn is_empty(&self) -> bool {
        self.server.is_empty()
    }
}

impl fmt::Display for WId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.serialized.is_empty() {
            write!(f, "{}", self.serialized)
        } else {
            write!(f, "{}@{}", self.user, self.server)
        }
    }
}

/// Error type for wid parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWIdError(pub String);

impl fmt::Display for ParseWIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse wid: {}", self.0)
    }
}

impl std::error::Error for ParseWIdError {}

impl FromStr for WId {
    type Err = ParseWIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(ParseWIdError(format!(
                "expected user@server, got {s:?}"
            )));
        }
        Ok(WId::new(parts[0], parts[1]))
    }
}

// Common wids
lazy_static::lazy_static! {
    pub static ref STATUS_BROADCAST_ID: WId = WId::new("status", servers::BROADCAST);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_wid() {
        let wid: WId = "1234567890@c.us".parse().unwrap();
        assert_eq!(wid.user, "1234567890");
        assert_eq!(wid.server, servers::USER);
        assert_eq!(wid.serialized, "1234567890@c.us");
        assert!(wid.is_user());
        assert!(!wid.is_group());
    }

    #[test]
    fn test_parse_group_wid() {
        let wid: WId = "123456789-1234567890@g.us".parse().unwrap();
        assert_eq!(wid.user, "123456789-1234567890");
        assert!(wid.is_group());
    }

    #[test]
    fn test_wid_to_string() {
        let wid = WId::user("1234567890");
        assert_eq!(wid.to_string(), "1234567890@c.us");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("1234567890".parse::<WId>().is_err());
        assert!("@c.us".parse::<WId>().is_err());
        assert!("123@".parse::<WId>().is_err());
    }

    #[test]
    fn test_status_broadcast() {
        assert!(STATUS_BROADCAST_ID.is_status_broadcast());
        assert!(!WId::user("123").is_status_broadcast());
    }
}
