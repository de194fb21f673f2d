//! Ownership rights as an ordered rule list
//!
//! Rules run in order and the first `Allow` or `Deny` wins. A rule that has no
//! opinion returns `Continue`. If every rule continues, access is denied.

use emotebase_core::ObjectId;
use emotebase_structures::{RolePermission, User, UserEditorPermission};

use crate::decision::AccessDecision;
use crate::policy::allows;

/// What one rule concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Grant access and stop
    Allow,
    /// Refuse access and stop
    Deny(&'static str),
    /// No opinion; try the next rule
    Continue,
}

/// Result of resolving a target's owner
#[derive(Debug, Clone, Copy)]
pub enum OwnerLookup<'a> {
    /// The target has no owner
    Unowned,
    /// The owner was loaded
    Loaded(&'a User),
    /// The target names an owner that does not exist
    NotFound,
}

/// Ownership facts for a target object
#[derive(Debug, Clone, Copy)]
pub struct TargetRights<'a> {
    /// Declared owner id
    pub owner_id: Option<ObjectId>,
    /// Resolved owner
    pub owner: OwnerLookup<'a>,
    /// Editor grant that confers rights over the owner's objects
    pub editor_permission: UserEditorPermission,
    /// Capability that confers rights regardless of ownership
    pub any_capability: RolePermission,
}

impl<'a> TargetRights<'a> {
    /// Rights over an emote
    pub fn emote(owner_id: Option<ObjectId>, owner: OwnerLookup<'a>) -> Self {
        Self {
            owner_id,
            owner,
            editor_permission: UserEditorPermission::MANAGE_OWNED_EMOTES,
            any_capability: RolePermission::EDIT_ANY_EMOTE,
        }
    }
}

/// Inputs every rule sees
#[derive(Debug, Clone, Copy)]
pub struct RightsContext<'a> {
    /// Acting user
    pub actor: &'a User,
    /// Target ownership facts
    pub target: &'a TargetRights<'a>,
}

/// A single ownership rule
pub type RightsRule = fn(&RightsContext<'_>) -> RuleOutcome;

/// Rules for editing an owned object, in evaluation order
pub const OWNED_OBJECT_RULES: &[RightsRule] = &[
    unowned_requires_capability,
    actor_is_owner,
    actor_is_editor,
    holds_any_capability,
];

fn unowned_requires_capability(ctx: &RightsContext<'_>) -> RuleOutcome {
    if ctx.target.owner_id.is_some() {
        return RuleOutcome::Continue;
    }
    if allows(Some(ctx.actor), ctx.target.any_capability) {
        RuleOutcome::Allow
    } else {
        RuleOutcome::Deny("unowned object requires the any-object capability")
    }
}

fn actor_is_owner(ctx: &RightsContext<'_>) -> RuleOutcome {
    match ctx.target.owner_id {
        Some(owner_id) if owner_id == ctx.actor.id => RuleOutcome::Allow,
        _ => RuleOutcome::Continue,
    }
}

fn actor_is_editor(ctx: &RightsContext<'_>) -> RuleOutcome {
    let OwnerLookup::Loaded(owner) = ctx.target.owner else {
        return RuleOutcome::Continue;
    };
    match owner.editor(ctx.actor.id) {
        Some(editor) if editor.permissions.contains(ctx.target.editor_permission) => {
            RuleOutcome::Allow
        }
        _ => RuleOutcome::Continue,
    }
}

fn holds_any_capability(ctx: &RightsContext<'_>) -> RuleOutcome {
    if allows(Some(ctx.actor), ctx.target.any_capability) {
        RuleOutcome::Allow
    } else {
        RuleOutcome::Continue
    }
}

/// Run `rules` in order, stopping at the first conclusive outcome
pub fn evaluate_rules(rules: &[RightsRule], ctx: &RightsContext<'_>) -> AccessDecision {
    for rule in rules {
        match rule(ctx) {
            RuleOutcome::Allow => return AccessDecision::Allow,
            RuleOutcome::Deny(reason) => return AccessDecision::deny(reason),
            RuleOutcome::Continue => {}
        }
    }
    AccessDecision::deny("actor has no rights over the target")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_conclusive_rule_wins() {
        fn deny(_: &RightsContext<'_>) -> RuleOutcome {
            RuleOutcome::Deny("first")
        }
        fn allow(_: &RightsContext<'_>) -> RuleOutcome {
            RuleOutcome::Allow
        }
        fn pass(_: &RightsContext<'_>) -> RuleOutcome {
            RuleOutcome::Continue
        }

        let actor = User::default();
        let target = TargetRights::emote(None, OwnerLookup::Unowned);
        let ctx = RightsContext {
            actor: &actor,
            target: &target,
        };

        assert_eq!(evaluate_rules(&[pass, deny, allow], &ctx), AccessDecision::deny("first"));
        assert!(evaluate_rules(&[pass, allow, deny], &ctx).is_allowed());
        assert!(!evaluate_rules(&[pass], &ctx).is_allowed());
    }
}
