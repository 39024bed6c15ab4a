//! Identity keys for attempt tracking.
//!
//! Every tracked caller is identified by the username it tried to authenticate
//! as together with the network origin the request came from. Two requests for
//! the same username from different origins are tracked independently.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Origin recorded when the caller's address is not known.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// The tracking key for one distinguishable caller.
///
/// Equality and hashing use both components, so a username containing the
/// display separator can never collide with a different (username, origin) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    username: String,
    origin: String,
}

impl IdentityKey {
    /// Build a key from a username and an optional origin address.
    ///
    /// A missing or blank origin is recorded as [`UNKNOWN_ORIGIN`]. The
    /// username is taken verbatim; validating it is the caller's job.
    pub fn new(username: impl Into<String>, origin: Option<&str>) -> Self {
        let origin = origin
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(UNKNOWN_ORIGIN);

        Self {
            username: username.into(),
            origin: origin.to_string(),
        }
    }

    /// Build a key from a username and an optional peer IP address.
    pub fn from_ip(username: impl Into<String>, ip: Option<IpAddr>) -> Self {
        let origin = ip.map(|ip| ip.to_string());
        Self::new(username, origin.as_deref())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_display_matches_username_and_origin() {
        let key = IdentityKey::new("alice", Some("1.2.3.4"));
        assert_eq!(key.to_string(), "alice/1.2.3.4");
        assert_eq!(key.username(), "alice");
        assert_eq!(key.origin(), "1.2.3.4");
    }

    #[test]
    fn test_missing_origin_is_unknown() {
        assert_eq!(IdentityKey::new("bob", None).origin(), UNKNOWN_ORIGIN);
        assert_eq!(IdentityKey::new("bob", Some("  ")).origin(), UNKNOWN_ORIGIN);
        assert_eq!(
            IdentityKey::new("bob", None),
            IdentityKey::new("bob", Some(""))
        );
    }

    #[test]
    fn test_from_ip() {
        let ip = IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8));
        assert_eq!(
            IdentityKey::from_ip("bob", Some(ip)),
            IdentityKey::new("bob", Some("5.6.7.8"))
        );
        assert_eq!(IdentityKey::from_ip("bob", None).origin(), UNKNOWN_ORIGIN);
    }

    #[test]
    fn test_components_do_not_collide() {
        let a = IdentityKey::new("alice/1.2.3.4", Some("x"));
        let b = IdentityKey::new("alice", Some("1.2.3.4/x"));
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
    }
}
