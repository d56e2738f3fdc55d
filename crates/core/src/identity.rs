//! Git author/committer identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Git author/committer identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl Identity {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    /// Whether this identity and `other` name the same author.
    ///
    /// Authorship is judged on the email address alone; display names vary
    /// across machines and locales.
    pub fn same_author(&self, other: &Identity) -> bool {
        self.email == other.email
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let id = Identity::new("Alan Smithee", "asmithee@example.com");
        assert_eq!(id.to_string(), "Alan Smithee <asmithee@example.com>");
    }

    #[test]
    fn test_same_author_ignores_name() {
        let a = Identity::new("Alan Smithee", "asmithee@example.com");
        let b = Identity::new("A. Smithee", "asmithee@example.com");
        let c = Identity::new("Alan Smithee", "other@example.com");

        assert!(a.same_author(&b), "same email should match");
        assert!(!a.same_author(&c), "different email should not match");
    }
}
