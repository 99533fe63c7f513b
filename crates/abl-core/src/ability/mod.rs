//! Ability definitions
//!
//! Cost shapes, the failure model and the immutable catalog.

pub mod catalog;
pub mod cost;
pub mod failure;

pub use catalog::{
    AbilityDef, AbilityFlags, AbilityId, ResolvedAbility, ability_by_name, ability_def,
    ability_name, catalog, string_matches_ability_name, try_ability_def,
};
pub use cost::{GenericCost, ScalingCost};
pub use failure::{
    FailBasis, FailureModel, PIETY_BREAKPOINTS, failure_chance, piety_breakpoint, roll_failure,
};
