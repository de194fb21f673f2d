//! Bans and their effects

use chrono::{DateTime, Utc};
use emotebase_core::ObjectId;
use serde::{Deserialize, Serialize};

use crate::permissions::bitmask;
use crate::user::User;

bitmask! {
    /// Effects applied to a banned user; composable and checked independently
    BanEffect(u32)
}

impl BanEffect {
    /// Strip the banned user of all permissions
    pub const NO_PERMISSIONS: Self = Self(1 << 0);
    /// Prevent the banned user from authenticating
    pub const NO_AUTH: Self = Self(1 << 1);
    /// Objects owned by the banned user are no longer returned
    pub const NO_OWNERSHIP: Self = Self(1 << 2);
    /// The banned user is hidden from non-privileged users
    pub const MEMORY_HOLE: Self = Self(1 << 3);
    /// The banned user's IP is blocked from every service
    pub const IP_BLOCKED: Self = Self(1 << 4);

    const NAMES: [(&'static str, Self); 5] = [
        ("NO_PERMISSIONS", Self::NO_PERMISSIONS),
        ("NO_AUTH", Self::NO_AUTH),
        ("NO_OWNERSHIP", Self::NO_OWNERSHIP),
        ("MEMORY_HOLE", Self::MEMORY_HOLE),
        ("IP_BLOCKED", Self::IP_BLOCKED),
    ];

    /// Look up a single effect by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, effect)| *effect)
    }

    /// Combine named effects, failing on the first unknown name
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        names
            .into_iter()
            .try_fold(Self::NONE, |acc, name| Self::from_name(name).map(|e| acc | e))
    }

    /// Wire names of every effect set
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(_, effect)| self.contains(*effect))
            .map(|(name, _)| *name)
            .collect()
    }
}

/// A ban placed on a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ban {
    /// Identity
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// The banned user
    pub victim_id: ObjectId,
    /// The user who created the ban
    pub actor_id: ObjectId,
    /// Why
    #[serde(default)]
    pub reason: String,
    /// When the ban stops applying
    pub expire_at: DateTime<Utc>,
    /// What the ban does
    #[serde(default)]
    pub effects: BanEffect,

    // Relational
    /// Resolved victim
    #[serde(skip)]
    pub victim: Option<Box<User>>,
    /// Resolved actor
    #[serde(skip)]
    pub actor: Option<Box<User>>,
}

impl Ban {
    /// Whether every bit of `effect` applies
    pub fn has_effect(&self, effect: BanEffect) -> bool {
        self.effects.contains(effect)
    }

    /// Whether the ban is still in force at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expire_at > now
    }
}
