//! Ability catalog
//!
//! One immutable definition per ability id, built on first use and never
//! mutated afterwards. The no-op entry is always first.

use std::sync::LazyLock;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use tracing::debug;

use super::cost::{GenericCost, ScalingCost};
use super::failure::{FailureModel, piety_breakpoint};
use crate::actor::{ActorContext, Skill, Species};
use crate::error::AbilityError;
use crate::world::LOS_RADIUS;

/// Every ability the engine knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
    EnumIter,
)]
pub enum AbilityId {
    #[default]
    None,

    // Species and mutation abilities
    SpitPoison,
    Blink,
    BreatheFire,
    BreatheFrost,
    BreathePoison,
    BreatheMephitic,
    BreatheLightning,
    BreathePower,
    BreatheStickyFlame,
    BreatheSteam,
    SpitAcid,
    TranBat,
    Fly,
    StopFlying,
    Hellfire,
    DelayedFireball,
    StopSinging,
    Dig,
    ShaftSelf,

    // Evocations
    EvokeTeleportation,
    EvokeBlink,
    EvokeBerserk,
    EvokeTurnInvisible,
    EvokeTurnVisible,
    EvokeFlight,
    EvokeFog,
    EndTransformation,

    // Zin
    ZinRecite,
    ZinVitalisation,
    ZinImprison,
    ZinSanctuary,
    ZinCureAllMutations,

    // The Shining One
    TsoDivineShield,
    TsoCleansingFlame,
    TsoSummonDivineWarrior,

    // Yredelemnul
    YredInjuryMirror,
    YredAnimateRemains,
    YredRecallUndeadSlaves,
    YredAnimateDead,
    YredDrainLife,
    YredEnslaveSoul,
    YredDarkBargain,
    YredAnimateRemainsOrDead,

    // Okawaru
    OkawaruHeroism,
    OkawaruFinesse,

    // Makhleb
    MakhlebMinorDestruction,
    MakhlebLesserServant,
    MakhlebMajorDestruction,
    MakhlebGreaterServant,

    // Sif Muna
    SifMunaChannelEnergy,
    SifMunaForgetSpell,

    // Trog
    TrogBurnSpellbooks,
    TrogBerserk,
    TrogsHand,
    TrogBrothersInArms,

    // Elyvilon
    ElyvilonLifesaving,
    ElyvilonLesserHealing,
    ElyvilonPurification,
    ElyvilonGreaterHealing,
    ElyvilonDivineVigour,

    // Lugonu
    LugonuAbyssExit,
    LugonuBendSpace,
    LugonuBanish,
    LugonuCorrupt,
    LugonuAbyssEnter,

    // Nemelex Xobeh
    NemelexTripleDraw,
    NemelexDealFour,
    NemelexStackFive,

    // Beogh
    BeoghSmiting,
    BeoghRecallOrcishFollowers,

    // Cheibriados
    CheibriadosTimeBend,
    CheibriadosDistortion,
    CheibriadosSlouch,
    CheibriadosTimeStep,

    // Ashenzari
    AshenzariScrying,
    AshenzariTransferKnowledge,
    AshenzariEndTransfer,

    // Ru
    RuDrawOutPower,
    RuPowerLeap,
    RuApocalypse,
    RuSacrificePurity,
    RuSacrificeWords,
    RuSacrificeDrink,
    RuSacrificeEssence,
    RuSacrificeHealth,
    RuRejectSacrifices,

    // Gozag
    GozagPotionPetition,
    GozagCallMerchant,
    GozagBribeBranch,

    // Qazlal
    QazlalUpheaval,
    QazlalElementalForce,
    QazlalDisasterArea,

    // Dithmenos
    DithmenosShadowStep,
    DithmenosShadowForm,

    // Religion-wide
    StopRecall,
    RenounceReligion,
    ConvertToBeogh,

    // Debug
    WizardRestoration,
}

bitflags! {
    /// Orthogonal ability traits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AbilityFlags: u32 {
        /// Needs a target cell chosen by the player
        const TARGET = 0x0001;
        /// Accepts a direction or a target
        const DIR_OR_TARGET = 0x0002;
        /// The actor's own cell is not a legal target
        const NOT_SELF = 0x0004;
        /// Draws from the card deck
        const CARD = 0x0008;
        /// Consumes nearby sacrificial units instead of magic
        const SOULS = 0x0010;
        const GOLD = 0x0020;
        /// HP cost also lowers maximum HP temporarily
        const DRAIN_MAX_HP = 0x0040;
        /// Takes no time
        const INSTANT = 0x0080;
        const CONF_OK = 0x0100;
        const BERSERK_OK = 0x0200;
        const SACRIFICE = 0x0400;
        /// Effect prints its own failure message
        const SILENT_FAIL = 0x0800;
        const WIZARD = 0x1000;
        /// Needs the breath cooldown to be clear, and starts it
        const BREATH = 0x2000;
        /// Unusable while exhausted, and exhausts
        const EXHAUSTION = 0x4000;
    }
}

impl Serialize for AbilityFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AbilityFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(AbilityFlags::from_bits_truncate(bits))
    }
}

/// Static definition of one ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityDef {
    pub id: AbilityId,
    pub name: &'static str,
    pub mp_cost: i32,
    pub hp_cost: ScalingCost,
    pub piety_cost: GenericCost,
    /// Tile range; `None` for self-centred or unbounded abilities
    pub range: Option<i32>,
    pub failure: FailureModel,
    pub flags: AbilityFlags,
}

impl AbilityDef {
    const fn new(id: AbilityId, name: &'static str) -> Self {
        Self {
            id,
            name,
            mp_cost: 0,
            hp_cost: ScalingCost { value: 0 },
            piety_cost: GenericCost::fixed(0),
            range: None,
            failure: FailureModel::none(),
            flags: AbilityFlags::empty(),
        }
    }

    const fn mp(mut self, mp: i32) -> Self {
        self.mp_cost = mp;
        self
    }

    const fn hp(mut self, hp: ScalingCost) -> Self {
        self.hp_cost = hp;
        self
    }

    const fn piety(mut self, piety: GenericCost) -> Self {
        self.piety_cost = piety;
        self
    }

    const fn range(mut self, range: i32) -> Self {
        self.range = Some(range);
        self
    }

    const fn fail(mut self, failure: FailureModel) -> Self {
        self.failure = failure;
        self
    }

    fn flags(mut self, flags: AbilityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn has(&self, flag: AbilityFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_invocation(&self) -> bool {
        self.failure.is_invocation()
    }

    /// Sacrificial units consumed in place of the magic cost.
    pub fn soul_cost(&self) -> i32 {
        if self.has(AbilityFlags::SOULS) {
            (self.mp_cost / 2).max(1)
        } else {
            0
        }
    }
}

fn build_catalog() -> Vec<AbilityDef> {
    use AbilityFlags as F;
    use AbilityId as A;
    use FailureModel as Fm;
    use GenericCost as G;
    use ScalingCost as S;

    let los = LOS_RADIUS;
    let breath = F::BREATH | F::DIR_OR_TARGET;
    let evo_pl = Skill::Evocations;

    let catalog = vec![
        // The no-op entry always comes first
        AbilityDef::new(A::None, "No ability"),
        AbilityDef::new(A::SpitPoison, "Spit Poison")
            .range(6)
            .fail(Fm::level(40, 1))
            .flags(breath),
        AbilityDef::new(A::Blink, "Blink")
            .hp(S::per_mille(50))
            .fail(Fm::level(48, 0)),
        AbilityDef::new(A::BreatheFire, "Breathe Fire")
            .range(6)
            .fail(Fm::level(50, 1))
            .flags(breath),
        AbilityDef::new(A::BreatheFrost, "Breathe Frost")
            .range(6)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::BreathePoison, "Breathe Poison Gas")
            .range(7)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::BreatheMephitic, "Breathe Noxious Fumes")
            .range(7)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::BreatheLightning, "Breathe Lightning")
            .range(8)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::BreathePower, "Breathe Dispelling Energy")
            .range(8)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::BreatheStickyFlame, "Breathe Sticky Flame")
            .range(1)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::BreatheSteam, "Breathe Steam")
            .range(7)
            .fail(Fm::level(20, 1))
            .flags(breath),
        AbilityDef::new(A::SpitAcid, "Spit Acid")
            .range(8)
            .fail(Fm::level(30, 1))
            .flags(breath),
        AbilityDef::new(A::TranBat, "Bat Form")
            .mp(2)
            .fail(Fm::level(45, 2)),
        AbilityDef::new(A::Fly, "Fly").mp(3).fail(Fm::level(42, 3)),
        AbilityDef::new(A::StopFlying, "Stop Flying"),
        AbilityDef::new(A::Hellfire, "Hellfire")
            .hp(S::per_mille(150))
            .range(los)
            .fail(Fm::level(50, 1))
            .flags(F::TARGET | F::NOT_SELF | F::DRAIN_MAX_HP),
        AbilityDef::new(A::DelayedFireball, "Release Delayed Fireball").flags(F::INSTANT),
        AbilityDef::new(A::StopSinging, "Stop Singing"),
        AbilityDef::new(A::Dig, "Dig")
            .range(1)
            .flags(F::DIR_OR_TARGET | F::NOT_SELF | F::INSTANT),
        AbilityDef::new(A::ShaftSelf, "Shaft Self"),
        // Evocations
        AbilityDef::new(A::EvokeTeleportation, "Evoke Teleportation")
            .mp(3)
            .fail(Fm::evocation(60, 2)),
        AbilityDef::new(A::EvokeBlink, "Evoke Blink")
            .mp(1)
            .fail(Fm::evocation(40, 2)),
        AbilityDef::new(A::EvokeBerserk, "Evoke Berserk Rage").fail(Fm::evocation(50, 2)),
        AbilityDef::new(A::EvokeTurnInvisible, "Evoke Invisibility")
            .mp(2)
            .fail(Fm::evocation(60, 2)),
        AbilityDef::new(A::EvokeTurnVisible, "Turn Visible"),
        AbilityDef::new(A::EvokeFlight, "Evoke Flight")
            .mp(1)
            .fail(Fm::evocation(40, 2)),
        AbilityDef::new(A::EvokeFog, "Evoke Fog")
            .mp(2)
            .fail(Fm::evocation(50, 2)),
        AbilityDef::new(A::EndTransformation, "End Transformation"),
        // Zin
        AbilityDef::new(A::ZinRecite, "Recite")
            .range(los)
            .fail(Fm::invocation(30, 20, 6))
            .flags(F::BREATH | F::SILENT_FAIL),
        AbilityDef::new(A::ZinVitalisation, "Vitalisation")
            .piety(G::new(1))
            .fail(Fm::invocation(40, 20, 5)),
        AbilityDef::new(A::ZinImprison, "Imprison")
            .mp(5)
            .piety(G::new(4))
            .range(los)
            .fail(Fm::invocation(60, 20, 5))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::ZinSanctuary, "Sanctuary")
            .mp(7)
            .piety(G::new(15))
            .fail(Fm::invocation(80, 25, 4)),
        AbilityDef::new(A::ZinCureAllMutations, "Cure All Mutations")
            .fail(Fm::invocation(0, 0, 0)),
        // The Shining One
        AbilityDef::new(A::TsoDivineShield, "Divine Shield")
            .mp(3)
            .piety(G::new(2))
            .fail(Fm::invocation(40, 20, 5)),
        AbilityDef::new(A::TsoCleansingFlame, "Cleansing Flame")
            .mp(5)
            .piety(G::new(2))
            .fail(Fm::invocation(70, 25, 4)),
        AbilityDef::new(A::TsoSummonDivineWarrior, "Summon Divine Warrior")
            .mp(8)
            .piety(G::new(6))
            .fail(Fm::invocation(80, 25, 4)),
        // Yredelemnul
        AbilityDef::new(A::YredInjuryMirror, "Injury Mirror").fail(Fm::invocation(40, 20, 4)),
        AbilityDef::new(A::YredAnimateRemains, "Animate Remains")
            .mp(2)
            .fail(Fm::invocation(40, 20, 4)),
        AbilityDef::new(A::YredRecallUndeadSlaves, "Recall Undead Slaves")
            .mp(2)
            .fail(Fm::invocation(50, 20, 4)),
        AbilityDef::new(A::YredAnimateDead, "Animate Dead")
            .mp(2)
            .fail(Fm::invocation(40, 20, 4)),
        AbilityDef::new(A::YredDrainLife, "Drain Life")
            .mp(6)
            .piety(G::new(2))
            .range(los)
            .fail(Fm::invocation(60, 25, 4)),
        AbilityDef::new(A::YredEnslaveSoul, "Enslave Soul")
            .mp(8)
            .piety(G::new(4))
            .range(los)
            .fail(Fm::invocation(80, 25, 4))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::YredDarkBargain, "Dark Bargain")
            .mp(4)
            .fail(Fm::invocation(50, 20, 4))
            .flags(F::SOULS),
        AbilityDef::new(A::YredAnimateRemainsOrDead, "Animate Remains or Dead")
            .mp(2)
            .fail(Fm::invocation(40, 20, 4)),
        // Okawaru
        AbilityDef::new(A::OkawaruHeroism, "Heroism")
            .mp(2)
            .piety(G::new(2))
            .fail(Fm::invocation(30, 20, 6)),
        AbilityDef::new(A::OkawaruFinesse, "Finesse")
            .mp(5)
            .piety(G::new(4))
            .fail(Fm::invocation(60, 25, 4)),
        // Makhleb
        AbilityDef::new(A::MakhlebMinorDestruction, "Minor Destruction")
            .hp(S::fixed(1))
            .range(los)
            .fail(Fm::invocation(40, 20, 5))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::MakhlebLesserServant, "Lesser Servant of Makhleb")
            .hp(S::fixed(4))
            .piety(G::new(2))
            .fail(Fm::invocation(40, 20, 5)),
        AbilityDef::new(A::MakhlebMajorDestruction, "Major Destruction")
            .hp(S::fixed(6))
            .piety(G::range(0, 1))
            .range(los)
            .fail(Fm::invocation(60, 25, 4))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::MakhlebGreaterServant, "Greater Servant of Makhleb")
            .hp(S::fixed(10))
            .piety(G::new(5))
            .fail(Fm::invocation(70, 25, 4)),
        // Sif Muna
        AbilityDef::new(A::SifMunaChannelEnergy, "Channel Energy")
            .fail(Fm::invocation(40, 0, 1)),
        AbilityDef::new(A::SifMunaForgetSpell, "Forget Spell")
            .mp(5)
            .piety(G::new(8))
            .fail(Fm::invocation(40, 20, 5)),
        // Trog
        AbilityDef::new(A::TrogBurnSpellbooks, "Burn Spellbooks").fail(Fm::invocation(0, 0, 0)),
        AbilityDef::new(A::TrogBerserk, "Berserk").fail(Fm::invocation(0, 0, 0)),
        AbilityDef::new(A::TrogsHand, "Trog's Hand")
            .piety(G::range(2, 3))
            .fail(Fm::invocation(piety_breakpoint(2), 0, 0)),
        AbilityDef::new(A::TrogBrothersInArms, "Brothers in Arms")
            .piety(G::range(5, 6))
            .fail(Fm::invocation(piety_breakpoint(5), 0, 0)),
        // Elyvilon
        AbilityDef::new(A::ElyvilonLifesaving, "Divine Protection").fail(Fm::invocation(0, 0, 0)),
        AbilityDef::new(A::ElyvilonLesserHealing, "Lesser Self-Healing")
            .mp(1)
            .piety(G::range(0, 1))
            .fail(Fm::invocation(30, 20, 6))
            .flags(F::CONF_OK),
        AbilityDef::new(A::ElyvilonPurification, "Purification")
            .mp(3)
            .piety(G::new(3))
            .fail(Fm::invocation(20, 20, 5))
            .flags(F::CONF_OK),
        AbilityDef::new(A::ElyvilonGreaterHealing, "Greater Self-Healing")
            .mp(2)
            .piety(G::new(3))
            .fail(Fm::invocation(40, 20, 5))
            .flags(F::CONF_OK),
        AbilityDef::new(A::ElyvilonDivineVigour, "Divine Vigour")
            .piety(G::new(6))
            .fail(Fm::invocation(80, 25, 4))
            .flags(F::CONF_OK),
        // Lugonu
        AbilityDef::new(A::LugonuAbyssExit, "Depart the Abyss")
            .mp(1)
            .piety(G::new(10))
            .fail(Fm::invocation(30, 20, 6)),
        AbilityDef::new(A::LugonuBendSpace, "Bend Space")
            .mp(1)
            .fail(Fm::invocation(40, 20, 5)),
        AbilityDef::new(A::LugonuBanish, "Banish")
            .mp(4)
            .piety(G::range(3, 4))
            .range(los)
            .fail(Fm::invocation(60, 20, 5))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::LugonuCorrupt, "Corrupt")
            .mp(7)
            .hp(S::fixed(5))
            .piety(G::range(10, 14))
            .fail(Fm::invocation(70, 25, 4)),
        AbilityDef::new(A::LugonuAbyssEnter, "Enter the Abyss")
            .mp(9)
            .piety(G::fixed(35))
            .fail(Fm::invocation(80, 25, 4)),
        // Nemelex Xobeh
        AbilityDef::new(A::NemelexTripleDraw, "Triple Draw")
            .mp(2)
            .piety(G::new(2))
            .fail(Fm::invocation_with(evo_pl, 60, 20, 5))
            .flags(F::CARD),
        AbilityDef::new(A::NemelexDealFour, "Deal Four")
            .mp(8)
            .piety(G::new(8))
            .fail(Fm::invocation_with(evo_pl, 70, 0, 0))
            .flags(F::CARD),
        AbilityDef::new(A::NemelexStackFive, "Stack Five")
            .mp(5)
            .piety(G::new(10))
            .fail(Fm::invocation_with(evo_pl, 80, 25, 4))
            .flags(F::CARD),
        // Beogh
        AbilityDef::new(A::BeoghSmiting, "Smiting")
            .mp(3)
            .piety(G::fixed(3))
            .range(los)
            .fail(Fm::invocation(40, 20, 5))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::BeoghRecallOrcishFollowers, "Recall Orcish Followers")
            .mp(2)
            .fail(Fm::invocation(30, 20, 6)),
        // Cheibriados
        AbilityDef::new(A::CheibriadosTimeBend, "Bend Time")
            .mp(3)
            .piety(G::new(1))
            .fail(Fm::invocation(40, 20, 4)),
        AbilityDef::new(A::CheibriadosDistortion, "Temporal Distortion")
            .mp(4)
            .piety(G::new(3))
            .fail(Fm::invocation(60, 20, 5))
            .flags(F::INSTANT),
        AbilityDef::new(A::CheibriadosSlouch, "Slouch")
            .mp(5)
            .piety(G::new(8))
            .fail(Fm::invocation(60, 25, 4)),
        AbilityDef::new(A::CheibriadosTimeStep, "Step From Time")
            .mp(10)
            .piety(G::new(10))
            .fail(Fm::invocation(80, 25, 4)),
        // Ashenzari
        AbilityDef::new(A::AshenzariScrying, "Scrying")
            .mp(4)
            .piety(G::range(2, 3))
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::INSTANT),
        AbilityDef::new(A::AshenzariTransferKnowledge, "Transfer Knowledge")
            .piety(G::new(20))
            .fail(Fm::invocation(0, 0, 0)),
        AbilityDef::new(A::AshenzariEndTransfer, "End Transfer Knowledge")
            .fail(Fm::invocation(0, 0, 0)),
        // Ru
        AbilityDef::new(A::RuDrawOutPower, "Draw Out Power")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::EXHAUSTION | F::CONF_OK | F::BERSERK_OK),
        AbilityDef::new(A::RuPowerLeap, "Power Leap")
            .mp(5)
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::EXHAUSTION | F::TARGET | F::NOT_SELF | F::SILENT_FAIL),
        AbilityDef::new(A::RuApocalypse, "Apocalypse")
            .mp(8)
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::EXHAUSTION),
        AbilityDef::new(A::RuSacrificePurity, "Sacrifice Purity")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::SACRIFICE),
        AbilityDef::new(A::RuSacrificeWords, "Sacrifice Words")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::SACRIFICE),
        AbilityDef::new(A::RuSacrificeDrink, "Sacrifice Drink")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::SACRIFICE),
        AbilityDef::new(A::RuSacrificeEssence, "Sacrifice Essence")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::SACRIFICE),
        AbilityDef::new(A::RuSacrificeHealth, "Sacrifice Health")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::SACRIFICE),
        AbilityDef::new(A::RuRejectSacrifices, "Reject Sacrifices")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::SACRIFICE),
        // Gozag
        AbilityDef::new(A::GozagPotionPetition, "Potion Petition")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::GOLD),
        AbilityDef::new(A::GozagCallMerchant, "Call Merchant")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::GOLD),
        AbilityDef::new(A::GozagBribeBranch, "Bribe Branch")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::GOLD),
        // Qazlal
        AbilityDef::new(A::QazlalUpheaval, "Upheaval")
            .mp(4)
            .piety(G::new(3))
            .range(los)
            .fail(Fm::invocation(40, 20, 5))
            .flags(F::TARGET),
        AbilityDef::new(A::QazlalElementalForce, "Elemental Force")
            .mp(6)
            .piety(G::new(6))
            .fail(Fm::invocation(60, 20, 5)),
        AbilityDef::new(A::QazlalDisasterArea, "Disaster Area")
            .mp(7)
            .piety(G::range(10, 14))
            .fail(Fm::invocation(70, 25, 4)),
        // Dithmenos
        AbilityDef::new(A::DithmenosShadowStep, "Shadow Step")
            .mp(4)
            .piety(G::new(4))
            .range(los)
            .fail(Fm::invocation(30, 20, 6))
            .flags(F::TARGET | F::NOT_SELF),
        AbilityDef::new(A::DithmenosShadowForm, "Shadow Form")
            .mp(9)
            .piety(G::new(10))
            .fail(Fm::invocation(80, 25, 4)),
        // Religion-wide
        AbilityDef::new(A::StopRecall, "Stop Recall")
            .fail(Fm::invocation(0, 0, 0))
            .flags(F::BERSERK_OK),
        AbilityDef::new(A::RenounceReligion, "Renounce Religion").fail(Fm::invocation(0, 0, 0)),
        AbilityDef::new(A::ConvertToBeogh, "Convert to Beogh").fail(Fm::invocation(0, 0, 0)),
        // Debug
        AbilityDef::new(A::WizardRestoration, "Wizard Restoration")
            .flags(F::WIZARD | F::INSTANT | F::CONF_OK | F::BERSERK_OK),
    ];
    debug!(entries = catalog.len(), "ability catalog built");
    catalog
}

static CATALOG: LazyLock<Vec<AbilityDef>> = LazyLock::new(build_catalog);

/// The full catalog in declaration order.
pub fn catalog() -> &'static [AbilityDef] {
    &CATALOG
}

/// Definition for `id`.
///
/// Every id has an entry, so the no-op fallback is never taken in practice.
pub fn ability_def(id: AbilityId) -> &'static AbilityDef {
    try_ability_def(id).unwrap_or(&CATALOG[0])
}

pub fn try_ability_def(id: AbilityId) -> Result<&'static AbilityDef, AbilityError> {
    CATALOG
        .iter()
        .find(|def| def.id == id)
        .ok_or(AbilityError::MissingDefinition(id))
}

pub fn ability_name(id: AbilityId) -> &'static str {
    ability_def(id).name
}

/// Case-insensitive exact match on the display name.
pub fn ability_by_name(name: &str) -> Option<AbilityId> {
    CATALOG
        .iter()
        .skip(1)
        .find(|def| def.name.eq_ignore_ascii_case(name.trim()))
        .map(|def| def.id)
}

/// Whether `key` occurs anywhere in the ability's name, ignoring case.
pub fn string_matches_ability_name(key: &str, id: AbilityId) -> bool {
    let key = key.trim().to_lowercase();
    !key.is_empty() && ability_name(id).to_lowercase().contains(&key)
}

/// Redirect placeholder and context-dependent ids.
fn fixup(id: AbilityId, actor: &ActorContext) -> AbilityId {
    match id {
        AbilityId::YredAnimateRemainsOrDead => {
            if actor.piety >= piety_breakpoint(2) {
                AbilityId::YredAnimateDead
            } else {
                AbilityId::YredAnimateRemains
            }
        }
        AbilityId::YredRecallUndeadSlaves | AbilityId::BeoghRecallOrcishFollowers
            if !actor.recall_list.is_empty() =>
        {
            AbilityId::StopRecall
        }
        AbilityId::EvokeBerserk | AbilityId::TrogBerserk if actor.species.cannot_berserk() => {
            AbilityId::None
        }
        AbilityId::OkawaruFinesse | AbilityId::Blink | AbilityId::EvokeBlink
            if actor.species == Species::Formicid =>
        {
            AbilityId::None
        }
        other => other,
    }
}

/// An ability id after contextual redirection, paired with its definition.
///
/// The only constructor applies the redirection, so every holder of a
/// `ResolvedAbility` sees the post-fixup id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAbility {
    requested: AbilityId,
    def: &'static AbilityDef,
}

impl ResolvedAbility {
    /// Resolve `id` for `actor`; `None` when it redirects to the no-op id.
    pub fn resolve(id: AbilityId, actor: &ActorContext) -> Option<Self> {
        let fixed = fixup(id, actor);
        if fixed != id {
            debug!(?id, ?fixed, "ability redirected");
        }
        if fixed == AbilityId::None {
            return None;
        }
        Some(Self {
            requested: id,
            def: ability_def(fixed),
        })
    }

    pub fn id(&self) -> AbilityId {
        self.def.id
    }

    /// Id as originally requested, before redirection.
    pub fn requested(&self) -> AbilityId {
        self.requested
    }

    pub fn def(&self) -> &'static AbilityDef {
        self.def
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_none_is_first_and_unique() {
        assert_eq!(catalog()[0].id, AbilityId::None);
        assert_eq!(
            catalog().iter().filter(|d| d.id == AbilityId::None).count(),
            1
        );
    }

    #[test]
    fn test_every_id_has_one_entry() {
        for id in AbilityId::iter() {
            assert_eq!(
                catalog().iter().filter(|d| d.id == id).count(),
                1,
                "{id:?}"
            );
            assert!(try_ability_def(id).is_ok());
        }
        assert_eq!(catalog().len(), AbilityId::iter().count());
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<&str> = catalog().iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog().len());
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(ability_by_name("breathe FIRE"), Some(AbilityId::BreatheFire));
        assert_eq!(ability_by_name("  Trog's Hand "), Some(AbilityId::TrogsHand));
        assert_eq!(ability_by_name("breathe"), None);
        assert_eq!(ability_by_name("No ability"), None);
    }

    #[test]
    fn test_substring_match() {
        assert!(string_matches_ability_name("breathe", AbilityId::BreatheSteam));
        assert!(!string_matches_ability_name("", AbilityId::BreatheSteam));
        assert!(!string_matches_ability_name("spit", AbilityId::BreatheSteam));
    }

    #[test]
    fn test_fixup_animate() {
        let mut actor = ActorContext::default();
        actor.piety = 10;
        let r = ResolvedAbility::resolve(AbilityId::YredAnimateRemainsOrDead, &actor).unwrap();
        assert_eq!(r.id(), AbilityId::YredAnimateRemains);
        assert_eq!(r.requested(), AbilityId::YredAnimateRemainsOrDead);
        actor.piety = 80;
        let r = ResolvedAbility::resolve(AbilityId::YredAnimateRemainsOrDead, &actor).unwrap();
        assert_eq!(r.id(), AbilityId::YredAnimateDead);
    }

    #[test]
    fn test_fixup_recall_and_species() {
        let mut actor = ActorContext::default();
        actor.recall_list.push(3);
        let r = ResolvedAbility::resolve(AbilityId::BeoghRecallOrcishFollowers, &actor).unwrap();
        assert_eq!(r.id(), AbilityId::StopRecall);

        actor.species = Species::Formicid;
        assert!(ResolvedAbility::resolve(AbilityId::Blink, &actor).is_none());
        assert!(ResolvedAbility::resolve(AbilityId::TrogBerserk, &actor).is_none());
        assert!(ResolvedAbility::resolve(AbilityId::Dig, &actor).is_some());
    }

    #[test]
    fn test_soul_cost() {
        assert_eq!(ability_def(AbilityId::YredDarkBargain).soul_cost(), 2);
        assert_eq!(ability_def(AbilityId::Fly).soul_cost(), 0);
    }

    #[test]
    fn test_flags_serde() {
        let flags = AbilityFlags::TARGET | AbilityFlags::NOT_SELF;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "5");
        let back: AbilityFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
