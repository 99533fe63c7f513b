//! abl-core: ability resolution and slot management
//!
//! Decides for every special action an actor may take whether it is legal
//! right now, what it costs, how likely it is to fail, where it lands and
//! what it does, and keeps a stable hotkey letter for it across a session.
//!
//! The engine does no I/O beyond option and description loading. The map and
//! player input are reached through the [`World`] and [`Prompt`] traits so the
//! whole pipeline runs against [`SandboxWorld`] and [`ScriptedPrompt`] in
//! tests.

pub mod ability;
pub mod activate;
pub mod actor;
pub mod effects;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod options;
pub mod precondition;
pub mod prompt;
pub mod rng;
pub mod slots;
pub mod talent;
pub mod targeting;
pub mod world;

pub use ability::{
    AbilityDef, AbilityFlags, AbilityId, GenericCost, ResolvedAbility, ScalingCost, ability_by_name,
    ability_def, ability_name, failure_chance,
};
pub use activate::{ActivationResult, activate_ability, activate_talent};
pub use actor::{ActorContext, God, Species, StatusFlags};
pub use effects::Outcome;
pub use eligibility::{eligible_ids, set_god_ability_slots};
pub use error::{AbilityError, Result};
pub use ledger::CostReceipt;
pub use options::{AbilityOptions, OptionsError};
pub use prompt::{Prompt, ScriptedPrompt};
pub use rng::GameRng;
pub use slots::SlotTable;
pub use talent::{
    DescriptionSource, DescriptionTable, Talent, ability_description, describe_talent,
    talent_for_letter, your_talents,
};
pub use world::{Position, SandboxWorld, World};
