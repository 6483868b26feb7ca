//! Who is shopping.

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub uid: UserId,
    pub email: Option<Email>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthenticatedUser {
    /// A user with no profile fields.
    #[must_use]
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Current identity of the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(AuthenticatedUser),
}

impl Identity {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Whether two identities address the same cart storage.
    ///
    /// Profile edits (a new display name, say) keep the same storage.
    #[must_use]
    pub fn same_storage(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Anonymous, Self::Anonymous) => true,
            (Self::Authenticated(a), Self::Authenticated(b)) => a.uid == b.uid,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_storage_ignores_profile_fields() {
        let a = Identity::Authenticated(AuthenticatedUser::new("u1"));
        let b = Identity::Authenticated(AuthenticatedUser::new("u1").with_display_name("Asha"));
        let c = Identity::Authenticated(AuthenticatedUser::new("u2"));

        assert!(a.same_storage(&b));
        assert!(!a.same_storage(&c));
        assert!(!a.same_storage(&Identity::Anonymous));
        assert!(Identity::Anonymous.same_storage(&Identity::default()));
    }
}
