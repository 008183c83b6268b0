use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner of batch searches and tasks, identified by login
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The single user of a non-server deployment
    pub fn local() -> Self {
        Self::new("local")
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl From<&str> for User {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_compare_by_id() {
        assert_eq!(User::new("foo"), User::from("foo"));
        assert_ne!(User::new("foo"), User::new("bar"));
    }

    #[test]
    fn test_user_serializes_as_plain_string() {
        let json = serde_json::to_string(&User::new("foo")).unwrap();
        assert_eq!(json, "\"foo\"");
    }

    #[test]
    fn test_local_user() {
        assert_eq!(User::local().to_string(), "local");
    }
}
