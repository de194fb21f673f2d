//! Permission bitsets
//!
//! Capabilities are single bits. A set contains a requirement when every bit
//! of the requirement is present: `(set & required) == required`.

macro_rules! bitmask {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Default,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl $name {
            /// The empty set
            pub const NONE: Self = Self(0);

            /// Raw bits
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Whether every bit of `required` is set
            pub const fn contains(self, required: Self) -> bool {
                (self.0 & required.0) == required.0
            }

            /// Whether no bit is set
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Bits set in either operand
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Bits of `self` not set in `other`
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl ::std::ops::Not for $name {
            type Output = Self;

            fn not(self) -> Self {
                Self(!self.0)
            }
        }
    };
}

pub(crate) use bitmask;

bitmask! {
    /// Capabilities granted by roles
    RolePermission(u64)
}

impl RolePermission {
    /// Upload emotes
    pub const CREATE_EMOTE: Self = Self(1 << 0);
    /// Edit emotes the actor has rights over
    pub const EDIT_EMOTE: Self = Self(1 << 1);
    /// Create emote sets
    pub const CREATE_EMOTE_SET: Self = Self(1 << 2);
    /// Edit emote sets the actor has rights over
    pub const EDIT_EMOTE_SET: Self = Self(1 << 3);
    /// File reports
    pub const CREATE_REPORT: Self = Self(1 << 13);
    /// Send inbox messages
    pub const SEND_MESSAGES: Self = Self(1 << 14);
    /// Create and edit bans
    pub const MANAGE_BANS: Self = Self(1 << 30);
    /// Manage roles
    pub const MANAGE_ROLES: Self = Self(1 << 31);
    /// Handle reports
    pub const MANAGE_REPORTS: Self = Self(1 << 32);
    /// Manage users
    pub const MANAGE_USERS: Self = Self(1 << 33);
    /// Edit any emote regardless of ownership
    pub const EDIT_ANY_EMOTE: Self = Self(1 << 41);
    /// Edit any emote set regardless of ownership
    pub const EDIT_ANY_EMOTE_SET: Self = Self(1 << 42);
    /// Implies every capability
    pub const SUPER_ADMINISTRATOR: Self = Self(1 << 62);
}

bitmask! {
    /// Rights a user grants an editor over their own objects
    UserEditorPermission(u32)
}

impl UserEditorPermission {
    /// Modify the owner's emote sets
    pub const MODIFY_EMOTES: Self = Self(1 << 0);
    /// Use the owner's private emotes
    pub const USE_PRIVATE_EMOTES: Self = Self(1 << 1);
    /// Manage the owner's profile
    pub const MANAGE_PROFILE: Self = Self(1 << 2);
    /// Manage emotes owned by the owner
    pub const MANAGE_OWNED_EMOTES: Self = Self(1 << 3);
    /// Manage the owner's emote sets
    pub const MANAGE_EMOTE_SETS: Self = Self(1 << 4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_requires_every_bit() {
        let granted = RolePermission::EDIT_EMOTE | RolePermission::MANAGE_REPORTS;

        assert!(granted.contains(RolePermission::EDIT_EMOTE));
        assert!(!granted.contains(RolePermission::EDIT_EMOTE | RolePermission::EDIT_ANY_EMOTE));
        assert!(granted.contains(RolePermission::NONE));
    }

    #[test]
    fn test_difference() {
        let granted = RolePermission::EDIT_EMOTE | RolePermission::CREATE_EMOTE;
        let stripped = granted.difference(RolePermission::EDIT_EMOTE);

        assert_eq!(stripped, RolePermission::CREATE_EMOTE);
        assert!((!RolePermission::NONE).contains(RolePermission::SUPER_ADMINISTRATOR));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(UserEditorPermission::MANAGE_OWNED_EMOTES).unwrap();
        assert_eq!(json, serde_json::json!(8));
    }
}
