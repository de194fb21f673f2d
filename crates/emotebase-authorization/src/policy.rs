//! Capability checks

use emotebase_structures::{RolePermission, User};

use crate::decision::AccessDecision;
use crate::rights::{evaluate_rules, RightsContext, TargetRights, OWNED_OBJECT_RULES};

/// Whether `actor` holds `capability`; anonymous actors hold nothing
pub fn allows(actor: Option<&User>, capability: RolePermission) -> bool {
    actor.is_some_and(|user| user.has_permission(capability))
}

/// Require `capability`, naming it in the denial
pub fn require(actor: Option<&User>, capability: RolePermission, what: &str) -> AccessDecision {
    if allows(actor, capability) {
        AccessDecision::Allow
    } else {
        AccessDecision::deny(format!("missing permission: {what}"))
    }
}

/// Whether `actor` holds `capability` and has rights over `target`
pub fn allows_on_target(
    actor: Option<&User>,
    capability: RolePermission,
    target: &TargetRights<'_>,
) -> AccessDecision {
    let Some(actor) = actor else {
        return AccessDecision::deny("authentication required");
    };
    if !actor.has_permission(capability) {
        return AccessDecision::deny("missing permission");
    }
    evaluate_rules(OWNED_OBJECT_RULES, &RightsContext { actor, target })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_denied() {
        assert!(!allows(None, RolePermission::NONE));
        assert!(!require(None, RolePermission::EDIT_EMOTE, "edit emote").is_allowed());
    }
}
