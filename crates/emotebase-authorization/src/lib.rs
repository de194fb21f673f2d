//! Emotebase Authorization - Permission Model
//!
//! Pure evaluation with no I/O. Callers resolve a target's owner first and pass
//! the result in as an [`OwnerLookup`].
//!
//! An owned object may be edited by its owner, by an editor the owner listed
//! with the relevant editor permission, or by anyone holding the any-object
//! capability. Unowned objects require the any-object capability.

#![forbid(unsafe_code)]

pub mod decision;
pub mod policy;
pub mod rights;

pub use decision::AccessDecision;
pub use policy::{allows, allows_on_target, require};
pub use rights::{evaluate_rules, OwnerLookup, RightsContext, RightsRule, RuleOutcome, TargetRights};
