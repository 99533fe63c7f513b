//! Which abilities the actor currently possesses
//!
//! Possession is recomputed from actor state on every query. Deity powers
//! come from a per-god table gated by piety rank.

use tracing::debug;

use crate::ability::{AbilityId, piety_breakpoint};
use crate::actor::{ActorContext, DurationKind, Form, God, Mutation, Species, StatusFlags};
use crate::world::World;

/// A god power and the piety rank that unlocks it; `None` means always granted.
type GodPower = (AbilityId, Option<usize>);

/// Powers granted by `god`, in invocation-slot order.
pub fn god_abilities(god: God) -> &'static [GodPower] {
    use AbilityId as A;
    match god {
        God::NoGod => &[],
        God::Zin => &[
            (A::ZinRecite, Some(0)),
            (A::ZinVitalisation, Some(1)),
            (A::ZinImprison, Some(2)),
            (A::ZinSanctuary, Some(4)),
        ],
        God::ShiningOne => &[
            (A::TsoDivineShield, Some(1)),
            (A::TsoCleansingFlame, Some(3)),
            (A::TsoSummonDivineWarrior, Some(4)),
        ],
        God::Yredelemnul => &[
            (A::YredAnimateRemainsOrDead, Some(0)),
            (A::YredInjuryMirror, Some(0)),
            (A::YredRecallUndeadSlaves, Some(1)),
            (A::YredDrainLife, Some(2)),
            (A::YredDarkBargain, Some(3)),
            (A::YredEnslaveSoul, Some(4)),
        ],
        God::Okawaru => &[(A::OkawaruHeroism, Some(0)), (A::OkawaruFinesse, Some(4))],
        God::Makhleb => &[
            (A::MakhlebMinorDestruction, Some(1)),
            (A::MakhlebLesserServant, Some(2)),
            (A::MakhlebMajorDestruction, Some(3)),
            (A::MakhlebGreaterServant, Some(4)),
        ],
        God::SifMuna => &[
            (A::SifMunaChannelEnergy, Some(0)),
            (A::SifMunaForgetSpell, Some(1)),
        ],
        God::Trog => &[
            (A::TrogBurnSpellbooks, None),
            (A::TrogBerserk, Some(0)),
            (A::TrogsHand, Some(1)),
            (A::TrogBrothersInArms, Some(3)),
        ],
        God::Elyvilon => &[
            (A::ElyvilonLifesaving, None),
            (A::ElyvilonLesserHealing, Some(0)),
            (A::ElyvilonPurification, Some(1)),
            (A::ElyvilonGreaterHealing, Some(2)),
            (A::ElyvilonDivineVigour, Some(4)),
        ],
        God::Lugonu => &[
            (A::LugonuAbyssExit, Some(0)),
            (A::LugonuBendSpace, Some(1)),
            (A::LugonuBanish, Some(2)),
            (A::LugonuCorrupt, Some(3)),
            (A::LugonuAbyssEnter, Some(4)),
        ],
        God::Nemelex => &[
            (A::NemelexTripleDraw, Some(1)),
            (A::NemelexDealFour, Some(2)),
            (A::NemelexStackFive, Some(4)),
        ],
        God::Beogh => &[
            (A::BeoghSmiting, Some(1)),
            (A::BeoghRecallOrcishFollowers, Some(3)),
        ],
        God::Cheibriados => &[
            (A::CheibriadosTimeBend, Some(0)),
            (A::CheibriadosDistortion, Some(2)),
            (A::CheibriadosSlouch, Some(3)),
            (A::CheibriadosTimeStep, Some(4)),
        ],
        God::Ashenzari => &[
            (A::AshenzariScrying, Some(1)),
            (A::AshenzariTransferKnowledge, Some(2)),
        ],
        God::Ru => &[
            (A::RuDrawOutPower, Some(2)),
            (A::RuPowerLeap, Some(3)),
            (A::RuApocalypse, Some(4)),
        ],
        God::Gozag => &[
            (A::GozagPotionPetition, None),
            (A::GozagCallMerchant, None),
            (A::GozagBribeBranch, None),
        ],
        God::Qazlal => &[
            (A::QazlalUpheaval, Some(0)),
            (A::QazlalElementalForce, Some(2)),
            (A::QazlalDisasterArea, Some(4)),
        ],
        God::Dithmenos => &[
            (A::DithmenosShadowStep, Some(1)),
            (A::DithmenosShadowForm, Some(4)),
        ],
    }
}

/// God whose power table lists `id`.
pub fn granting_god(id: AbilityId) -> Option<God> {
    use strum::IntoEnumIterator;
    let id = match id {
        AbilityId::YredAnimateRemains | AbilityId::YredAnimateDead => {
            AbilityId::YredAnimateRemainsOrDead
        }
        AbilityId::AshenzariEndTransfer => AbilityId::AshenzariTransferKnowledge,
        AbilityId::ZinCureAllMutations => AbilityId::ZinRecite,
        AbilityId::RuSacrificePurity
        | AbilityId::RuSacrificeWords
        | AbilityId::RuSacrificeDrink
        | AbilityId::RuSacrificeEssence
        | AbilityId::RuSacrificeHealth
        | AbilityId::RuRejectSacrifices => AbilityId::RuDrawOutPower,
        other => other,
    };
    God::iter().find(|&god| god_abilities(god).iter().any(|&(power, _)| power == id))
}

fn draconian_breath(species: Species) -> Option<AbilityId> {
    match species {
        Species::RedDraconian => Some(AbilityId::BreatheFire),
        Species::WhiteDraconian => Some(AbilityId::BreatheFrost),
        Species::GreenDraconian => Some(AbilityId::BreatheMephitic),
        Species::YellowDraconian => Some(AbilityId::SpitAcid),
        Species::BlackDraconian => Some(AbilityId::BreatheLightning),
        Species::PurpleDraconian => Some(AbilityId::BreathePower),
        Species::PaleDraconian => Some(AbilityId::BreatheSteam),
        Species::MottledDraconian => Some(AbilityId::BreatheStickyFlame),
        _ => None,
    }
}

/// Every ability id the actor currently possesses, before fixup, without duplicates.
pub fn eligible_ids(actor: &ActorContext, world: &dyn World) -> Vec<AbilityId> {
    let mut ids = Vec::new();
    let mut add = |id: AbilityId| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };

    // Species and mutations
    if actor.species == Species::Naga {
        if actor.mutation_level(Mutation::BreathePoison) > 0 {
            add(AbilityId::BreathePoison);
        } else {
            add(AbilityId::SpitPoison);
        }
    } else if actor.mutation_level(Mutation::SpitPoison) > 0 {
        add(AbilityId::SpitPoison);
    }
    if actor.species.is_draconian()
        && actor.experience_level >= 7
        && let Some(breath) = draconian_breath(actor.species)
    {
        add(breath);
    }
    if actor.species == Species::Vampire && actor.experience_level >= 3 && actor.form != Form::Bat {
        add(AbilityId::TranBat);
    }
    if !actor.is_flying() {
        if actor.species == Species::Tengu && actor.experience_level >= 5 {
            add(AbilityId::Fly);
        } else if actor.species.is_draconian() && actor.mutation_level(Mutation::BigWings) > 0 {
            add(AbilityId::Fly);
        }
    } else if actor.has(StatusFlags::FLYING) {
        add(AbilityId::StopFlying);
    }
    if actor.mutation_level(Mutation::HurlHellfire) > 0 {
        add(AbilityId::Hellfire);
    }
    if actor.form != Form::None || actor.duration(DurationKind::Transformation) > 0 {
        add(AbilityId::EndTransformation);
    }
    if actor.mutation_level(Mutation::Blink) > 0 {
        add(AbilityId::Blink);
    }
    if actor.form == Form::Dragon || actor.mutation_level(Mutation::BreatheFlames) > 0 {
        add(AbilityId::BreatheFire);
    }
    if actor.species == Species::Formicid {
        add(AbilityId::Dig);
        add(AbilityId::ShaftSelf);
    }
    if actor.has(StatusFlags::DELAYED_FIREBALL) {
        add(AbilityId::DelayedFireball);
    }
    if actor.has(StatusFlags::SINGING) {
        add(AbilityId::StopSinging);
    }

    // Items
    if actor.mutation_level(Mutation::NoArtifice) == 0 {
        for &id in &actor.item_abilities {
            match id {
                AbilityId::EvokeTurnInvisible | AbilityId::EvokeTurnVisible => {
                    if actor.has(StatusFlags::INVISIBLE) {
                        add(AbilityId::EvokeTurnVisible);
                    } else {
                        add(AbilityId::EvokeTurnInvisible);
                    }
                }
                AbilityId::EvokeFlight if actor.is_flying() => {}
                other => add(other),
            }
        }
    }

    // Deity
    let god = actor.god;
    let silenced = actor.silenced();
    let speaks_silently = matches!(god, God::Nemelex | God::Ru);
    if god != God::NoGod && world.penance(god) == 0 && (!silenced || speaks_silently) {
        for &(power, rank) in god_abilities(god) {
            if rank.is_none_or(|r| actor.piety >= piety_breakpoint(r)) {
                let power = match power {
                    AbilityId::AshenzariTransferKnowledge
                        if actor.has(StatusFlags::TRANSFERRING) =>
                    {
                        AbilityId::AshenzariEndTransfer
                    }
                    other => other,
                };
                add(power);
            }
        }
        if god == God::Zin && actor.mutations.values().any(|&level| level > 0) {
            add(AbilityId::ZinCureAllMutations);
        }
        if god == God::Ru {
            for &sacrifice in &actor.available_sacrifices {
                add(sacrifice);
            }
            if !actor.available_sacrifices.is_empty() {
                add(AbilityId::RuRejectSacrifices);
            }
        }
    }
    if god != God::NoGod && !silenced {
        add(AbilityId::RenounceReligion);
    }
    if god != God::Beogh && actor.has(StatusFlags::BEOGH_OFFERED) {
        add(AbilityId::ConvertToBeogh);
    }
    if actor.wizard {
        add(AbilityId::WizardRestoration);
    }

    ids
}

/// Rebind the traditional invocation slots after a change of god.
///
/// Renounce Religion goes to `X`, other gods' powers leave the table and the
/// current god's powers take `a`, `b`, ... wherever those letters are free.
pub fn set_god_ability_slots(actor: &mut ActorContext) {
    let god = actor.god;
    let table = &mut actor.ability_letters;

    if god == God::NoGod {
        table.clear(AbilityId::RenounceReligion);
    } else {
        table.place_if_free(AbilityId::RenounceReligion, 'X');
    }
    table.retain(|id| granting_god(id).is_none_or(|owner| owner == god));

    let letters = ('a'..='z').take(god_abilities(god).len());
    for (&(power, _), letter) in god_abilities(god).iter().zip(letters) {
        table.place_if_free(power, letter);
    }
    debug!(?god, slots = table.len(), "god ability slots set");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::SandboxWorld;

    #[test]
    fn test_no_abilities_by_default() {
        let actor = ActorContext::default();
        let world = SandboxWorld::open(3, 3);
        assert!(eligible_ids(&actor, &world).is_empty());
    }

    #[test]
    fn test_draconian_breath_at_level_seven() {
        let mut actor = ActorContext::default();
        actor.species = Species::PaleDraconian;
        actor.experience_level = 6;
        let world = SandboxWorld::open(3, 3);
        assert!(!eligible_ids(&actor, &world).contains(&AbilityId::BreatheSteam));
        actor.experience_level = 7;
        assert!(eligible_ids(&actor, &world).contains(&AbilityId::BreatheSteam));
    }

    #[test]
    fn test_god_powers_gated_by_piety() {
        let mut actor = ActorContext::default();
        actor.god = God::Trog;
        actor.piety = 40;
        let world = SandboxWorld::open(3, 3);
        let ids = eligible_ids(&actor, &world);
        assert!(ids.contains(&AbilityId::TrogBurnSpellbooks));
        assert!(ids.contains(&AbilityId::TrogBerserk));
        assert!(!ids.contains(&AbilityId::TrogsHand));
        assert!(ids.contains(&AbilityId::RenounceReligion));

        actor.piety = 110;
        let ids = eligible_ids(&actor, &world);
        assert!(ids.contains(&AbilityId::TrogsHand));
        assert!(ids.contains(&AbilityId::TrogBrothersInArms));
    }

    #[test]
    fn test_penance_and_silence_withhold_powers() {
        let mut actor = ActorContext::default();
        actor.god = God::Okawaru;
        actor.piety = 150;
        let mut world = SandboxWorld::open(3, 3);
        world.penance.insert(God::Okawaru, 10);
        let ids = eligible_ids(&actor, &world);
        assert!(!ids.contains(&AbilityId::OkawaruHeroism));
        assert!(ids.contains(&AbilityId::RenounceReligion));

        world.penance.clear();
        actor.status.insert(StatusFlags::SILENCED);
        assert!(eligible_ids(&actor, &world).is_empty());

        actor.god = God::Nemelex;
        assert!(eligible_ids(&actor, &world).contains(&AbilityId::NemelexTripleDraw));
    }

    #[test]
    fn test_mute_withholds_like_silence() {
        let mut actor = ActorContext::default();
        actor.god = God::Okawaru;
        actor.piety = 150;
        actor.status.insert(StatusFlags::MUTE);
        let world = SandboxWorld::open(3, 3);
        assert!(eligible_ids(&actor, &world).is_empty());

        // Ru takes the voice as a sacrifice and still listens
        actor.god = God::Ru;
        actor.available_sacrifices = vec![AbilityId::RuSacrificeHealth];
        let ids = eligible_ids(&actor, &world);
        assert!(ids.contains(&AbilityId::RuSacrificeHealth));
        assert!(!ids.contains(&AbilityId::RenounceReligion));
    }

    #[test]
    fn test_invisibility_toggle() {
        let mut actor = ActorContext::default();
        actor.item_abilities = vec![AbilityId::EvokeTurnInvisible];
        let world = SandboxWorld::open(3, 3);
        assert_eq!(eligible_ids(&actor, &world), vec![AbilityId::EvokeTurnInvisible]);
        actor.status.insert(StatusFlags::INVISIBLE);
        assert_eq!(eligible_ids(&actor, &world), vec![AbilityId::EvokeTurnVisible]);
    }

    #[test]
    fn test_granting_god() {
        assert_eq!(granting_god(AbilityId::TrogsHand), Some(God::Trog));
        assert_eq!(granting_god(AbilityId::YredAnimateDead), Some(God::Yredelemnul));
        assert_eq!(granting_god(AbilityId::RuSacrificeWords), Some(God::Ru));
        assert_eq!(granting_god(AbilityId::Fly), None);
        assert_eq!(granting_god(AbilityId::RenounceReligion), None);
    }

    #[test]
    fn test_set_god_ability_slots() {
        let mut actor = ActorContext::default();
        actor.ability_letters.place_if_free(AbilityId::TrogBerserk, 'a');
        actor.ability_letters.place_if_free(AbilityId::Fly, 'b');
        actor.god = God::Okawaru;
        set_god_ability_slots(&mut actor);

        let table = &actor.ability_letters;
        assert_eq!(table.get('X'), Some(AbilityId::RenounceReligion));
        assert_eq!(table.lookup(AbilityId::TrogBerserk), None);
        assert_eq!(table.get('a'), Some(AbilityId::OkawaruHeroism));
        // A non-god binding keeps its letter
        assert_eq!(table.get('b'), Some(AbilityId::Fly));
        assert_eq!(table.lookup(AbilityId::OkawaruFinesse), None);
    }

    #[test]
    fn test_renounce_clears_slots() {
        let mut actor = ActorContext::default();
        actor.god = God::Zin;
        set_god_ability_slots(&mut actor);
        assert_eq!(actor.ability_letters.get('a'), Some(AbilityId::ZinRecite));
        actor.god = God::NoGod;
        set_god_ability_slots(&mut actor);
        assert!(actor.ability_letters.is_empty());
    }
}
