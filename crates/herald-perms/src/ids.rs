//! Identifier newtypes shared by every permission tier.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Raw identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a realm (a guild on the chat platform).
    RealmId
);
string_id!(
    /// Identifier of a platform user.
    UserId
);
string_id!(
    /// Identifier of a realm role.
    RoleId
);

/// Set of role identifiers held by one member.
pub type RoleSet = std::collections::BTreeSet<RoleId>;

/// Key addressing one member of one realm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    realm: RealmId,
    actor: UserId,
}

impl MemberKey {
    /// Builds a member key.
    #[must_use]
    pub fn new(realm: RealmId, actor: UserId) -> Self {
        Self { realm, actor }
    }

    /// Realm half of the key.
    #[must_use]
    pub fn realm(&self) -> &RealmId {
        &self.realm
    }

    /// Actor half of the key.
    #[must_use]
    pub fn actor(&self) -> &UserId {
        &self.actor
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.realm, self.actor)
    }
}
