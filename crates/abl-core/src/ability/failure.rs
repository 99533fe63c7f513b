//! Failure chance model
//!
//! `chance = base - statistic * variable - piety / piety_divisor`, with the
//! piety term only present for the invocation family. A few abilities adjust
//! the raw value by hand; the result shown to the player and fed to the roll
//! is clamped to 0..=100.

use serde::{Deserialize, Serialize};

use super::catalog::{AbilityDef, AbilityId};
use crate::actor::{ActorContext, Form, Mutation, Skill, Species};
use crate::rng::GameRng;

/// Piety thresholds for the five ranks of divine favor.
pub const PIETY_BREAKPOINTS: [i32; 5] = [30, 50, 75, 100, 120];

/// Piety needed for rank `i`, or an unreachable value past the last rank.
pub fn piety_breakpoint(i: usize) -> i32 {
    PIETY_BREAKPOINTS.get(i).copied().unwrap_or(255)
}

/// Statistic governing an ability's failure chance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailBasis {
    ExperienceLevel,
    Evocations,
    /// Invocation family: a skill term plus a piety term.
    Invocation(Skill),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureModel {
    pub basis: FailBasis,
    pub base_chance: i32,
    pub variable: i32,
    pub piety_divisor: i32,
}

impl FailureModel {
    /// Never fails.
    pub const fn none() -> Self {
        Self::level(0, 0)
    }

    pub const fn level(base_chance: i32, variable: i32) -> Self {
        Self {
            basis: FailBasis::ExperienceLevel,
            base_chance,
            variable,
            piety_divisor: 0,
        }
    }

    pub const fn evocation(base_chance: i32, variable: i32) -> Self {
        Self {
            basis: FailBasis::Evocations,
            base_chance,
            variable,
            piety_divisor: 0,
        }
    }

    pub const fn invocation(base_chance: i32, piety_divisor: i32, variable: i32) -> Self {
        Self::invocation_with(Skill::Invocations, base_chance, piety_divisor, variable)
    }

    pub const fn invocation_with(
        skill: Skill,
        base_chance: i32,
        piety_divisor: i32,
        variable: i32,
    ) -> Self {
        Self {
            basis: FailBasis::Invocation(skill),
            base_chance,
            variable,
            piety_divisor,
        }
    }

    pub const fn is_invocation(&self) -> bool {
        matches!(self.basis, FailBasis::Invocation(_))
    }

    /// Unclamped chance from the three tunables.
    pub fn raw_chance(&self, actor: &ActorContext) -> i32 {
        let statistic = match self.basis {
            FailBasis::ExperienceLevel => actor.experience_level,
            FailBasis::Evocations => actor.skill(Skill::Evocations),
            FailBasis::Invocation(skill) => actor.skill(skill),
        };
        let piety_term = match self.basis {
            FailBasis::Invocation(_) if self.piety_divisor > 0 => actor.piety / self.piety_divisor,
            _ => 0,
        };
        self.base_chance - statistic * self.variable - piety_term
    }
}

/// Hand-coded corrections applied after the generic formula.
fn adjust(id: AbilityId, actor: &ActorContext, raw: i32) -> i32 {
    let dragon_bonus = if actor.form == Form::Dragon { 20 } else { 0 };
    match id {
        AbilityId::SpitPoison => {
            let naga_bonus = if actor.species == Species::Naga { 20 } else { 0 };
            raw - naga_bonus - 10 * actor.mutation_level(Mutation::SpitPoison)
        }
        AbilityId::BreatheFire => {
            let red_bonus = if actor.species == Species::RedDraconian { 20 } else { 0 };
            raw - red_bonus - 10 * actor.mutation_level(Mutation::BreatheFlames) - dragon_bonus
        }
        AbilityId::BreatheFrost
        | AbilityId::BreathePoison
        | AbilityId::BreatheMephitic
        | AbilityId::BreatheLightning
        | AbilityId::BreathePower
        | AbilityId::BreatheStickyFlame
        | AbilityId::BreatheSteam
        | AbilityId::SpitAcid => raw - dragon_bonus,
        AbilityId::Blink => {
            48 - 12 * actor.mutation_level(Mutation::Blink) - actor.experience_level / 2
        }
        AbilityId::SifMunaChannelEnergy => raw - actor.stats.intelligence,
        AbilityId::TrogsHand => piety_breakpoint(2) - actor.piety,
        AbilityId::TrogBrothersInArms => piety_breakpoint(5) - actor.piety,
        AbilityId::NemelexDealFour => {
            70 - actor.piety * 2 / 45 - actor.skill(Skill::Evocations) * 9 / 2
        }
        _ => raw,
    }
}

/// Failure percentage shown to the player, clamped to 0..=100.
pub fn failure_chance(def: &AbilityDef, actor: &ActorContext) -> i32 {
    let raw = def.failure.raw_chance(actor);
    adjust(def.id, actor, raw).clamp(0, 100)
}

/// Execution-time roll: the mean of three draws against the displayed chance.
///
/// The averaged draw clusters near 50, so low chances fail less often and
/// high chances more often than their face value.
pub fn roll_failure(fail_pct: i32, rng: &mut GameRng) -> bool {
    (rng.random2avg(100, 3) as i32) < fail_pct
}
