//! Ability legality checks
//!
//! Checks run in a fixed order and stop at the first refusal. A refusal
//! never consumes a turn. In quiet mode (used to grey out menu entries)
//! reasons are dropped, sacrificial units are only counted, and no
//! confirmation is asked.

use tracing::debug;

use crate::ability::{AbilityFlags, AbilityId, ResolvedAbility};
use crate::actor::{ActorContext, DurationKind, Form, God, StatusFlags};
use crate::ledger::{effective_hp_cost, effective_mp_cost, gold_cost};
use crate::options::AbilityOptions;
use crate::prompt::Prompt;
use crate::world::{LOS_RADIUS, RecitalAudience, World};

/// Why an ability cannot be used right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Refusal {
    /// Message for the player; `None` in quiet mode or for a silent decline
    pub reason: Option<String>,
}

impl Refusal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    pub fn silent() -> Self {
        Self { reason: None }
    }
}

type Check = Result<(), Refusal>;

fn refuse(reason: impl Into<String>) -> Check {
    Err(Refusal::new(reason))
}

/// Run the full pipeline for an activation attempt.
///
/// Sacrificial units needed by the ability are reserved here; the
/// reservation is released again if a later check refuses.
pub fn check_ability_possible(
    resolved: &ResolvedAbility,
    actor: &ActorContext,
    world: &mut dyn World,
    options: &AbilityOptions,
    prompt: &mut dyn Prompt,
) -> Check {
    let def = resolved.def();
    let result = gate_checks(resolved, actor, &*world)
        .and_then(|()| reserve_souls(resolved, actor, world))
        .and_then(|()| confirm_by_pattern(resolved, options, prompt))
        .and_then(|()| affordability(resolved, actor))
        .and_then(|()| special_checks(resolved, actor, &*world));

    if let Err(refusal) = &result {
        if def.has(AbilityFlags::SOULS) {
            world.release_reservation();
        }
        debug!(ability = def.name, reason = ?refusal.reason, "ability refused");
    }
    result
}

/// Probe used to grey out menu entries; never prompts, reserves or reports.
pub fn check_ability_quietly(
    resolved: &ResolvedAbility,
    actor: &ActorContext,
    world: &dyn World,
) -> bool {
    gate_checks(resolved, actor, world)
        .and_then(|()| count_souls(resolved, actor, world))
        .and_then(|()| affordability(resolved, actor))
        .and_then(|()| special_checks(resolved, actor, world))
        .is_ok()
}

// ============================================================================
// Global gates
// ============================================================================

fn gate_checks(resolved: &ResolvedAbility, actor: &ActorContext, world: &dyn World) -> Check {
    let def = resolved.def();
    let id = resolved.id();

    if def.has(AbilityFlags::WIZARD) && !actor.wizard {
        return refuse("You need to be in wizard mode to do that.");
    }

    if actor.berserk() && !def.has(AbilityFlags::BERSERK_OK) {
        return refuse("You are too berserk!");
    }

    fatal_checks(id, actor, world)?;

    if actor.confused() && !def.has(AbilityFlags::CONF_OK) {
        return refuse("You are too confused!");
    }

    if actor.silenced() {
        if id == AbilityId::ZinRecite {
            return refuse("You cannot recite while unable to speak.");
        }
        let god_hears_anyway = matches!(actor.god, God::Nemelex | God::Ru);
        if def.is_invocation() && id != AbilityId::RenounceReligion && !god_hears_anyway {
            return refuse(format!(
                "You cannot call out to {} while silenced.",
                actor.god.name()
            ));
        }
    }

    if def.is_invocation()
        && id != AbilityId::RenounceReligion
        && world.penance(actor.god) > 0
    {
        return refuse(format!(
            "You sense that {} is not listening.",
            actor.god.name()
        ));
    }

    if def.has(AbilityFlags::CARD) && actor.deck_cards <= 0 {
        return refuse("You don't have any cards to draw.");
    }

    Ok(())
}

/// Checks for abilities that would kill the actor outright.
fn fatal_checks(id: AbilityId, actor: &ActorContext, world: &dyn World) -> Check {
    let feature = world.feature_at(actor.position);
    match id {
        AbilityId::StopFlying
            if feature.is_hazardous()
                && !actor.form.flies()
                && !actor.has(StatusFlags::PERM_FLIGHT) =>
        {
            refuse("Stopping flight right now would be fatal!")
        }
        AbilityId::EndTransformation
            if feature.is_hazardous()
                && actor.form.flies()
                && !actor
                    .status
                    .intersects(StatusFlags::FLYING | StatusFlags::PERM_FLIGHT) =>
        {
            let fate = if feature == crate::world::Feature::Lava {
                "burn"
            } else {
                "drown"
            };
            refuse(format!("Turning back right now would cause you to {fate}!"))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Sacrificial units and confirmation
// ============================================================================

fn count_souls(resolved: &ResolvedAbility, actor: &ActorContext, world: &dyn World) -> Check {
    let needed = resolved.def().soul_cost() as usize;
    if needed > 0 && world.count_sacrificial_units(actor.position) < needed {
        return refuse("There aren't enough souls nearby.");
    }
    Ok(())
}

fn reserve_souls(
    resolved: &ResolvedAbility,
    actor: &ActorContext,
    world: &mut dyn World,
) -> Check {
    let needed = resolved.def().soul_cost() as usize;
    if needed > 0 && !world.reserve_sacrificial_units(actor.position, needed) {
        return refuse("There aren't enough souls nearby.");
    }
    Ok(())
}

fn confirm_by_pattern(
    resolved: &ResolvedAbility,
    options: &AbilityOptions,
    prompt: &mut dyn Prompt,
) -> Check {
    let name = resolved.name();
    if options.needs_confirmation(name) && !prompt.confirm(&format!("Really use {name}?")) {
        return refuse("Okay, then.");
    }
    Ok(())
}

// ============================================================================
// Affordability
// ============================================================================

fn affordability(resolved: &ResolvedAbility, actor: &ActorContext) -> Check {
    let def = resolved.def();

    let mp = effective_mp_cost(def, actor);
    if mp > 0 && actor.mp < mp {
        return refuse("You don't have enough magic to use that ability.");
    }

    let hp = effective_hp_cost(def, actor);
    if hp > 0 && actor.hp <= hp {
        return refuse("You don't have enough health to use that ability.");
    }

    Ok(())
}

// ============================================================================
// Per-ability checks
// ============================================================================

fn special_checks(resolved: &ResolvedAbility, actor: &ActorContext, world: &dyn World) -> Check {
    let def = resolved.def();
    let id = resolved.id();

    if def.has(AbilityFlags::BREATH) && actor.duration(DurationKind::BreathWeapon) > 0 {
        return refuse("You can't do that yet.");
    }
    if def.has(AbilityFlags::EXHAUSTION) && actor.has(StatusFlags::EXHAUSTED) {
        return refuse("You're too exhausted.");
    }
    if def.has(AbilityFlags::GOLD) && actor.gold < gold_cost(id, actor) {
        return refuse("You don't have enough gold.");
    }

    let pos = actor.position;
    match id {
        AbilityId::SpitPoison
        | AbilityId::BreatheFire
        | AbilityId::BreatheFrost
        | AbilityId::BreathePoison
        | AbilityId::BreatheMephitic
        | AbilityId::BreatheLightning
        | AbilityId::BreathePower
        | AbilityId::BreatheStickyFlame
        | AbilityId::BreatheSteam
        | AbilityId::SpitAcid => Ok(()),

        AbilityId::Blink | AbilityId::EvokeBlink | AbilityId::EvokeTeleportation => {
            if actor.has(StatusFlags::STASIS) {
                refuse("You cannot teleport right now.")
            } else {
                Ok(())
            }
        }

        AbilityId::TranBat => {
            if actor.form == Form::Bat {
                refuse("You are already a bat.")
            } else if actor.has(StatusFlags::TRANSFORM_LOCKED) {
                refuse("You cannot transform right now.")
            } else {
                Ok(())
            }
        }

        AbilityId::Fly | AbilityId::EvokeFlight => {
            if actor.is_flying() {
                refuse("You're already flying!")
            } else {
                Ok(())
            }
        }

        AbilityId::StopFlying => {
            if actor.has(StatusFlags::FLYING) {
                Ok(())
            } else {
                refuse("You aren't flying.")
            }
        }

        AbilityId::Hellfire => Ok(()),

        AbilityId::DelayedFireball => {
            if actor.has(StatusFlags::DELAYED_FIREBALL) {
                Ok(())
            } else {
                refuse("You have no fireball ready.")
            }
        }

        AbilityId::StopSinging => {
            if actor.has(StatusFlags::SINGING) {
                Ok(())
            } else {
                refuse("You aren't singing.")
            }
        }

        AbilityId::Dig => {
            if pos
                .adjacent()
                .any(|p| world.in_bounds(p) && world.feature_at(p).is_diggable())
            {
                Ok(())
            } else {
                refuse("There's nothing here to dig through.")
            }
        }

        AbilityId::ShaftSelf => {
            if world.in_abyss() {
                refuse("You can't shaft yourself here.")
            } else if world.feature_at(pos) != crate::world::Feature::Floor {
                refuse("You can't dig a shaft on this terrain.")
            } else {
                Ok(())
            }
        }

        AbilityId::EvokeBerserk | AbilityId::TrogBerserk => {
            if actor.has(StatusFlags::EXHAUSTED) {
                refuse("You're too exhausted to go berserk.")
            } else {
                Ok(())
            }
        }

        AbilityId::EvokeTurnInvisible => {
            if actor.has(StatusFlags::INVISIBLE) {
                refuse("You are already invisible.")
            } else {
                Ok(())
            }
        }

        AbilityId::EvokeTurnVisible => {
            if actor.has(StatusFlags::INVISIBLE) {
                Ok(())
            } else {
                refuse("You aren't invisible.")
            }
        }

        AbilityId::EvokeFog => {
            if world.cloud_at(pos).is_some() {
                refuse("It's too cloudy to do that here.")
            } else {
                Ok(())
            }
        }

        AbilityId::EndTransformation => {
            if actor.form == Form::None {
                refuse("You aren't transformed.")
            } else {
                Ok(())
            }
        }

        AbilityId::ZinRecite => match world.recital_audience(pos) {
            RecitalAudience::Listeners(_) => Ok(()),
            RecitalAudience::Unreceptive => refuse("There's no appreciative audience!"),
            RecitalAudience::NoOne => refuse("There's no-one here to preach to!"),
        },

        AbilityId::ZinVitalisation | AbilityId::ZinImprison => Ok(()),

        AbilityId::ZinSanctuary => {
            if world.sanctuary_active() {
                refuse("There's already a sanctuary in place on this level.")
            } else {
                Ok(())
            }
        }

        AbilityId::ZinCureAllMutations => {
            if actor.mutations.values().any(|&level| level > 0) {
                Ok(())
            } else {
                refuse("You have no mutations to cure.")
            }
        }

        AbilityId::TsoDivineShield => {
            if actor.duration(DurationKind::DivineShield) > 0 {
                refuse("You are already shielded.")
            } else {
                Ok(())
            }
        }

        AbilityId::TsoCleansingFlame | AbilityId::TsoSummonDivineWarrior => Ok(()),

        AbilityId::YredInjuryMirror => {
            if actor.duration(DurationKind::InjuryMirror) > 0 {
                refuse("Your injuries are already being mirrored.")
            } else {
                Ok(())
            }
        }

        AbilityId::YredAnimateRemains | AbilityId::YredAnimateDead => {
            if world.corpses_near(pos, LOS_RADIUS) == 0 {
                refuse("There are no remains here to animate.")
            } else {
                Ok(())
            }
        }

        AbilityId::YredRecallUndeadSlaves
        | AbilityId::YredDrainLife
        | AbilityId::YredEnslaveSoul
        | AbilityId::YredDarkBargain => Ok(()),

        // Redirected before any check runs
        AbilityId::YredAnimateRemainsOrDead | AbilityId::None => Ok(()),

        AbilityId::OkawaruHeroism => Ok(()),

        AbilityId::OkawaruFinesse => {
            if actor.has(StatusFlags::STASIS) {
                refuse("Your stasis makes your neck tingle.")
            } else {
                Ok(())
            }
        }

        AbilityId::MakhlebMinorDestruction
        | AbilityId::MakhlebLesserServant
        | AbilityId::MakhlebMajorDestruction
        | AbilityId::MakhlebGreaterServant => Ok(()),

        AbilityId::SifMunaChannelEnergy => {
            if actor.mp >= actor.mp_max {
                refuse("Your magic is already full.")
            } else {
                Ok(())
            }
        }

        AbilityId::SifMunaForgetSpell => {
            if actor.spells_known == 0 {
                refuse("You don't know any spells.")
            } else {
                Ok(())
            }
        }

        AbilityId::TrogBurnSpellbooks | AbilityId::TrogsHand | AbilityId::TrogBrothersInArms => {
            Ok(())
        }

        AbilityId::ElyvilonLifesaving => {
            if actor.duration(DurationKind::Lifesaving) > 0 {
                refuse("You are already under divine protection.")
            } else {
                Ok(())
            }
        }

        AbilityId::ElyvilonLesserHealing | AbilityId::ElyvilonGreaterHealing => {
            if actor.hp >= actor.effective_hp_max() {
                refuse("Your health is already full.")
            } else {
                Ok(())
            }
        }

        AbilityId::ElyvilonPurification => {
            if actor.is_ailing() {
                Ok(())
            } else {
                refuse("Nothing ails you!")
            }
        }

        AbilityId::ElyvilonDivineVigour => {
            if actor.duration(DurationKind::DivineVigour) > 0 {
                refuse("You are already imbued with divine vigour.")
            } else {
                Ok(())
            }
        }

        AbilityId::LugonuAbyssExit => {
            if world.in_abyss() {
                Ok(())
            } else {
                refuse("You aren't in the Abyss!")
            }
        }

        AbilityId::LugonuBendSpace | AbilityId::LugonuBanish => Ok(()),

        AbilityId::LugonuCorrupt => {
            if world.level_corruptible() {
                Ok(())
            } else {
                refuse("This place is already infused with evil and corruption.")
            }
        }

        AbilityId::LugonuAbyssEnter => {
            if world.in_abyss() || !world.abyss_reachable() {
                refuse("You're already here!")
            } else {
                Ok(())
            }
        }

        AbilityId::NemelexTripleDraw | AbilityId::NemelexDealFour | AbilityId::NemelexStackFive => {
            Ok(())
        }

        AbilityId::BeoghSmiting | AbilityId::BeoghRecallOrcishFollowers => Ok(()),

        AbilityId::CheibriadosTimeBend
        | AbilityId::CheibriadosDistortion
        | AbilityId::CheibriadosSlouch => Ok(()),

        AbilityId::CheibriadosTimeStep => {
            if actor.duration(DurationKind::TimeStep) > 0 {
                refuse("You are already outside of time.")
            } else {
                Ok(())
            }
        }

        AbilityId::AshenzariScrying => {
            if actor.duration(DurationKind::Scrying) > 0 {
                refuse("You are already scrying.")
            } else {
                Ok(())
            }
        }

        AbilityId::AshenzariTransferKnowledge => {
            if actor.skills_maxed {
                refuse("You have nothing more to learn.")
            } else if actor.has(StatusFlags::TRANSFERRING) {
                refuse("You are already transferring knowledge.")
            } else {
                Ok(())
            }
        }

        AbilityId::AshenzariEndTransfer => {
            if actor.has(StatusFlags::TRANSFERRING) {
                Ok(())
            } else {
                refuse("You aren't transferring knowledge.")
            }
        }

        AbilityId::RuDrawOutPower => {
            if actor.hp >= actor.effective_hp_max() && actor.mp >= actor.mp_max {
                refuse("You have no need to draw out power.")
            } else {
                Ok(())
            }
        }

        AbilityId::RuPowerLeap | AbilityId::RuApocalypse => Ok(()),

        AbilityId::RuSacrificePurity
        | AbilityId::RuSacrificeWords
        | AbilityId::RuSacrificeDrink
        | AbilityId::RuSacrificeEssence
        | AbilityId::RuSacrificeHealth => {
            if actor.available_sacrifices.contains(&id) {
                Ok(())
            } else {
                refuse("Ru is not asking for that sacrifice.")
            }
        }

        AbilityId::RuRejectSacrifices => {
            if actor.available_sacrifices.is_empty() {
                refuse("There are no sacrifices to reject.")
            } else {
                Ok(())
            }
        }

        AbilityId::GozagPotionPetition
        | AbilityId::GozagCallMerchant
        | AbilityId::GozagBribeBranch => Ok(()),

        AbilityId::QazlalUpheaval
        | AbilityId::QazlalElementalForce
        | AbilityId::QazlalDisasterArea => Ok(()),

        AbilityId::DithmenosShadowStep => {
            if world.visible_monsters(pos).is_empty() {
                refuse("There are no shadows to step into.")
            } else {
                Ok(())
            }
        }

        AbilityId::DithmenosShadowForm => {
            if actor.form == Form::Shadow {
                refuse("You are already a shadow.")
            } else if actor.has(StatusFlags::TRANSFORM_LOCKED) {
                refuse("You cannot transform right now.")
            } else {
                Ok(())
            }
        }

        AbilityId::StopRecall => {
            if actor.recall_list.is_empty() {
                refuse("You aren't recalling anyone.")
            } else {
                Ok(())
            }
        }

        AbilityId::RenounceReligion => {
            if actor.god == God::NoGod {
                refuse("You don't worship anyone.")
            } else {
                Ok(())
            }
        }

        AbilityId::ConvertToBeogh => {
            if actor.has(StatusFlags::BEOGH_OFFERED) {
                Ok(())
            } else {
                refuse("No one has offered you conversion.")
            }
        }

        AbilityId::WizardRestoration => Ok(()),
    }
}

/// Usable but risky: changing form would drop strength or dexterity to zero.
///
/// Never blocks; the caller colours the entry and asks before activation.
pub fn is_dangerous(resolved: &ResolvedAbility, actor: &ActorContext) -> bool {
    let new_form = match resolved.id() {
        AbilityId::TranBat => Form::Bat,
        AbilityId::EndTransformation => Form::None,
        _ => return false,
    };
    let (strength, dexterity) = actor.stats_in_form(new_form);
    strength <= 0 || dexterity <= 0
}
