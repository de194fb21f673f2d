//! Users, roles and entitlements

use chrono::{DateTime, Utc};
use emotebase_core::ObjectId;
use serde::{Deserialize, Serialize};

use crate::ban::{Ban, BanEffect};
use crate::permissions::{RolePermission, UserEditorPermission};

/// A user account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Roles assigned directly
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_ids: Vec<ObjectId>,
    /// Users this user has granted rights over their objects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editors: Vec<UserEditor>,

    // Relational
    /// Resolved roles
    #[serde(skip)]
    pub roles: Vec<Role>,
    /// Bans where this user is the victim
    #[serde(skip)]
    pub bans: Vec<Ban>,
}

/// Rights granted by a user to an editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEditor {
    /// The editor's user id
    pub id: ObjectId,
    /// What the editor may do
    pub permissions: UserEditorPermission,
    /// Whether the editor is listed publicly
    #[serde(default)]
    pub visible: bool,
    /// When the grant was made
    pub added_at: DateTime<Utc>,
}

impl User {
    /// Union of role grants minus role denials
    ///
    /// An active ban carrying `NO_PERMISSIONS` empties the set.
    pub fn permissions(&self, now: DateTime<Utc>) -> RolePermission {
        if self
            .bans
            .iter()
            .any(|ban| ban.is_active(now) && ban.has_effect(BanEffect::NO_PERMISSIONS))
        {
            return RolePermission::NONE;
        }
        let (allowed, denied) = self
            .roles
            .iter()
            .fold((RolePermission::NONE, RolePermission::NONE), |(a, d), role| {
                (a | role.allowed, d | role.denied)
            });
        allowed.difference(denied)
    }

    /// Whether the user holds `required`, with `SUPER_ADMINISTRATOR` implying all
    pub fn has_permission(&self, required: RolePermission) -> bool {
        let granted = self.permissions(Utc::now());
        granted.contains(RolePermission::SUPER_ADMINISTRATOR) || granted.contains(required)
    }

    /// The editor entry for `user_id`, if this user granted one
    pub fn editor(&self, user_id: ObjectId) -> Option<&UserEditor> {
        self.editors.iter().find(|e| e.id == user_id)
    }

    /// Attach resolved roles, keeping `role_ids` in sync
    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        for role in &roles {
            if !self.role_ids.contains(&role.id) {
                self.role_ids.push(role.id);
            }
        }
        self.roles = roles;
        self
    }
}

/// A named permission grant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Identity
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Precedence; higher wins in display
    #[serde(default)]
    pub position: i32,
    /// Capabilities granted
    #[serde(default)]
    pub allowed: RolePermission,
    /// Capabilities explicitly withheld
    #[serde(default)]
    pub denied: RolePermission,
}

/// Kinds of entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementKind {
    /// Grants a role
    Role,
    /// Grants a badge
    Badge,
    /// Grants a paint
    Paint,
    /// Grants an emote set
    EmoteSet,
}

impl EntitlementKind {
    /// Stable wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Role => "ROLE",
            Self::Badge => "BADGE",
            Self::Paint => "PAINT",
            Self::EmoteSet => "EMOTE_SET",
        }
    }
}

/// Reference carried by an entitlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementData {
    /// The granted object
    #[serde(rename = "ref")]
    pub reference: ObjectId,
}

/// Something granted to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Identity
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// What is granted
    pub kind: EntitlementKind,
    /// Recipient
    pub user_id: ObjectId,
    /// The granted object
    pub data: EntitlementData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn role(allowed: RolePermission, denied: RolePermission) -> Role {
        Role {
            id: ObjectId::new(),
            allowed,
            denied,
            ..Role::default()
        }
    }

    #[test]
    fn test_denials_override_grants() {
        let user = User::default().with_roles(vec![
            role(RolePermission::EDIT_EMOTE | RolePermission::EDIT_ANY_EMOTE, RolePermission::NONE),
            role(RolePermission::NONE, RolePermission::EDIT_ANY_EMOTE),
        ]);

        assert!(user.has_permission(RolePermission::EDIT_EMOTE));
        assert!(!user.has_permission(RolePermission::EDIT_ANY_EMOTE));
        assert_eq!(user.role_ids.len(), 2);
    }

    #[test]
    fn test_super_administrator_implies_all() {
        let admin = role(RolePermission::SUPER_ADMINISTRATOR, RolePermission::NONE);
        let user = User::default().with_roles(vec![admin]);

        assert!(user.has_permission(RolePermission::MANAGE_BANS));
        assert!(user.has_permission(RolePermission::EDIT_ANY_EMOTE_SET));
    }

    #[test]
    fn test_active_ban_strips_permissions() {
        let now = Utc::now();
        let editor = role(RolePermission::EDIT_EMOTE, RolePermission::NONE);
        let mut user = User::default().with_roles(vec![editor]);
        user.bans.push(Ban {
            victim_id: user.id,
            expire_at: now + Duration::hours(1),
            effects: BanEffect::NO_PERMISSIONS,
            ..Ban::default()
        });
        assert!(!user.has_permission(RolePermission::EDIT_EMOTE));

        user.bans[0].expire_at = now - Duration::hours(1);
        assert!(user.has_permission(RolePermission::EDIT_EMOTE));
    }

    #[test]
    fn test_relational_fields_not_serialized() {
        let editor = role(RolePermission::EDIT_EMOTE, RolePermission::NONE);
        let user = User::default().with_roles(vec![editor]);
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("roles").is_none());
        assert!(json.get("role_ids").is_some());
    }
}
