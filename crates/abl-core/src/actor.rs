//! Actor state threaded through ability resolution
//!
//! `ActorContext` bundles the resource pools, status flags, position and slot
//! table of the acting character. Every check, effect and cost payment takes
//! it explicitly by reference.

use bitflags::bitflags;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::ability::AbilityId;
use crate::slots::SlotTable;
use crate::world::Position;

/// Deities whose favor gates the invocation family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum God {
    #[default]
    NoGod,
    Zin,
    ShiningOne,
    Yredelemnul,
    Okawaru,
    Makhleb,
    SifMuna,
    Trog,
    Elyvilon,
    Lugonu,
    Nemelex,
    Beogh,
    Cheibriados,
    Ashenzari,
    Ru,
    Gozag,
    Qazlal,
    Dithmenos,
}

impl God {
    pub const fn name(&self) -> &'static str {
        match self {
            God::NoGod => "No God",
            God::Zin => "Zin",
            God::ShiningOne => "the Shining One",
            God::Yredelemnul => "Yredelemnul",
            God::Okawaru => "Okawaru",
            God::Makhleb => "Makhleb",
            God::SifMuna => "Sif Muna",
            God::Trog => "Trog",
            God::Elyvilon => "Elyvilon",
            God::Lugonu => "Lugonu",
            God::Nemelex => "Nemelex Xobeh",
            God::Beogh => "Beogh",
            God::Cheibriados => "Cheibriados",
            God::Ashenzari => "Ashenzari",
            God::Ru => "Ru",
            God::Gozag => "Gozag Ym Sagoz",
            God::Qazlal => "Qazlal",
            God::Dithmenos => "Dithmenos",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Species {
    #[default]
    Human,
    Naga,
    RedDraconian,
    WhiteDraconian,
    GreenDraconian,
    YellowDraconian,
    BlackDraconian,
    PurpleDraconian,
    PaleDraconian,
    MottledDraconian,
    Vampire,
    Tengu,
    Formicid,
    Ghoul,
    Mummy,
}

impl Species {
    pub const fn is_draconian(&self) -> bool {
        matches!(
            self,
            Species::RedDraconian
                | Species::WhiteDraconian
                | Species::GreenDraconian
                | Species::YellowDraconian
                | Species::BlackDraconian
                | Species::PurpleDraconian
                | Species::PaleDraconian
                | Species::MottledDraconian
        )
    }

    /// Species that cannot enter a berserk rage.
    pub const fn cannot_berserk(&self) -> bool {
        matches!(self, Species::Ghoul | Species::Mummy | Species::Formicid)
    }
}

/// Transformation currently applied to the actor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Form {
    #[default]
    None,
    Bat,
    Dragon,
    Statue,
    Spider,
    Shadow,
}

impl Form {
    /// Strength and dexterity change while in this form.
    pub const fn stat_delta(&self) -> (i32, i32) {
        match self {
            Form::None | Form::Shadow => (0, 0),
            Form::Bat => (-5, 5),
            Form::Dragon => (10, 0),
            Form::Statue => (2, -2),
            Form::Spider => (0, 5),
        }
    }

    pub const fn flies(&self) -> bool {
        matches!(self, Form::Bat | Form::Dragon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Skill {
    Evocations,
    Invocations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Mutation {
    SpitPoison,
    BreatheFlames,
    BreathePoison,
    Blink,
    BigWings,
    HurlHellfire,
    /// Magic is paid from health instead of mana.
    HpCasting,
    NoArtifice,
}

/// Timed effects tracked in turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum DurationKind {
    BreathWeapon,
    Exhilaration,
    Transformation,
    Flight,
    Berserk,
    Invisibility,
    DivineShield,
    Heroism,
    Finesse,
    Regeneration,
    InjuryMirror,
    Lifesaving,
    DivineVigour,
    TimeStep,
    Scrying,
    Poison,
    Slow,
    Weak,
}

bitflags! {
    /// Status conditions that gate or redirect abilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u32 {
        const CONFUSED = 0x0001;
        const BERSERK = 0x0002;
        const SILENCED = 0x0004;
        const MUTE = 0x0008;
        /// Temporary flight not granted by the current form
        const FLYING = 0x0010;
        const PERM_FLIGHT = 0x0020;
        const INVISIBLE = 0x0040;
        const EXHAUSTED = 0x0080;
        const TRANSFERRING = 0x0100;
        const DELAYED_FIREBALL = 0x0200;
        const SINGING = 0x0400;
        const TRANSFORM_LOCKED = 0x0800;
        const BEOGH_OFFERED = 0x1000;
        const STASIS = 0x2000;
    }
}

impl Serialize for StatusFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatusFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(StatusFlags::from_bits_truncate(bits))
    }
}

/// Primary attributes with their undrained maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: i32,
    pub intelligence: i32,
    pub dexterity: i32,
    pub max_strength: i32,
    pub max_intelligence: i32,
    pub max_dexterity: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            strength: 10,
            intelligence: 10,
            dexterity: 10,
            max_strength: 10,
            max_intelligence: 10,
            max_dexterity: 10,
        }
    }
}

impl Stats {
    pub fn is_drained(&self) -> bool {
        self.strength < self.max_strength
            || self.intelligence < self.max_intelligence
            || self.dexterity < self.max_dexterity
    }

    pub fn restore(&mut self) {
        self.strength = self.max_strength;
        self.intelligence = self.max_intelligence;
        self.dexterity = self.max_dexterity;
    }
}

/// Acting character as seen by the ability engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorContext {
    pub name: String,
    pub species: Species,
    pub experience_level: i32,

    pub hp: i32,
    pub hp_max: i32,
    /// Temporary reduction of `hp_max`, recovered over time
    pub hp_max_drain: i32,
    pub mp: i32,
    pub mp_max: i32,

    pub god: God,
    pub piety: i32,
    pub gold: i32,
    pub deck_cards: i32,

    pub stats: Stats,
    pub skills: HashMap<Skill, i32>,
    pub mutations: HashMap<Mutation, u8>,
    pub form: Form,
    pub status: StatusFlags,
    pub durations: HashMap<DurationKind, i32>,

    pub position: Position,
    pub recall_list: Vec<u32>,
    pub spells_known: u32,
    pub skills_maxed: bool,
    pub available_sacrifices: Vec<AbilityId>,
    /// Evocations granted by worn or wielded items
    pub item_abilities: Vec<AbilityId>,
    pub gozag_potions_petitioned: i32,
    pub gozag_shops_called: i32,

    pub turn_is_over: bool,
    pub elapsed_time: u64,
    pub elapsed_time_at_last_input: u64,

    pub wizard: bool,
    pub ability_letters: SlotTable,
    pub ability_uses: HashMap<AbilityId, u32>,
}

impl Default for ActorContext {
    fn default() -> Self {
        Self::new("Adventurer")
    }
}

impl ActorContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            species: Species::Human,
            experience_level: 1,
            hp: 20,
            hp_max: 20,
            hp_max_drain: 0,
            mp: 5,
            mp_max: 5,
            god: God::NoGod,
            piety: 0,
            gold: 0,
            deck_cards: 0,
            stats: Stats::default(),
            skills: HashMap::new(),
            mutations: HashMap::new(),
            form: Form::None,
            status: StatusFlags::empty(),
            durations: HashMap::new(),
            position: Position::new(0, 0),
            recall_list: Vec::new(),
            spells_known: 0,
            skills_maxed: false,
            available_sacrifices: Vec::new(),
            item_abilities: Vec::new(),
            gozag_potions_petitioned: 0,
            gozag_shops_called: 0,
            turn_is_over: false,
            elapsed_time: 0,
            elapsed_time_at_last_input: 0,
            wizard: false,
            ability_letters: SlotTable::new(),
            ability_uses: HashMap::new(),
        }
    }

    pub fn skill(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    pub fn mutation_level(&self, mutation: Mutation) -> i32 {
        self.mutations.get(&mutation).copied().map_or(0, i32::from)
    }

    pub fn duration(&self, kind: DurationKind) -> i32 {
        self.durations.get(&kind).copied().unwrap_or(0)
    }

    pub fn set_duration(&mut self, kind: DurationKind, turns: i32) {
        if turns > 0 {
            self.durations.insert(kind, turns);
        } else {
            self.durations.remove(&kind);
        }
    }

    /// Extend a duration, never shortening it.
    pub fn extend_duration(&mut self, kind: DurationKind, turns: i32) {
        let current = self.duration(kind);
        self.set_duration(kind, current.max(turns));
    }

    pub fn has(&self, flag: StatusFlags) -> bool {
        self.status.contains(flag)
    }

    pub fn worships(&self, god: God) -> bool {
        self.god == god
    }

    pub fn confused(&self) -> bool {
        self.has(StatusFlags::CONFUSED)
    }

    /// Unable to speak, whether from an aura of silence or a lost voice.
    pub fn silenced(&self) -> bool {
        self.status.intersects(StatusFlags::SILENCED | StatusFlags::MUTE)
    }

    pub fn berserk(&self) -> bool {
        self.has(StatusFlags::BERSERK)
    }

    pub fn is_flying(&self) -> bool {
        self.status
            .intersects(StatusFlags::FLYING | StatusFlags::PERM_FLIGHT)
            || self.form.flies()
    }

    /// Whether mana costs are redirected onto health.
    pub fn hp_casting(&self) -> bool {
        self.mutation_level(Mutation::HpCasting) > 0
    }

    /// Maximum HP after temporary drain.
    pub fn effective_hp_max(&self) -> i32 {
        (self.hp_max - self.hp_max_drain).max(1)
    }

    /// Strength and dexterity the actor would have in `form`.
    pub fn stats_in_form(&self, form: Form) -> (i32, i32) {
        let (cur_str, cur_dex) = self.form.stat_delta();
        let (new_str, new_dex) = form.stat_delta();
        (
            self.stats.strength - cur_str + new_str,
            self.stats.dexterity - cur_dex + new_dex,
        )
    }

    pub fn is_ailing(&self) -> bool {
        self.confused()
            || self.duration(DurationKind::Poison) > 0
            || self.duration(DurationKind::Slow) > 0
            || self.duration(DurationKind::Weak) > 0
            || self.stats.is_drained()
    }

    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount).min(self.effective_hp_max());
    }

    pub fn restore_mp(&mut self, amount: i32) {
        self.mp = (self.mp + amount).min(self.mp_max);
    }

    pub fn gain_piety(&mut self, amount: i32) {
        self.piety = (self.piety + amount).clamp(0, 200);
    }

    pub fn record_use(&mut self, ability: AbilityId) {
        *self.ability_uses.entry(ability).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        let actor = ActorContext::default();
        assert_eq!(actor.hp, actor.hp_max);
        assert_eq!(actor.god, God::NoGod);
        assert!(!actor.hp_casting());
        assert_eq!(actor.skill(Skill::Invocations), 0);
    }

    #[test]
    fn test_durations() {
        let mut actor = ActorContext::default();
        actor.set_duration(DurationKind::BreathWeapon, 5);
        assert_eq!(actor.duration(DurationKind::BreathWeapon), 5);
        actor.extend_duration(DurationKind::BreathWeapon, 3);
        assert_eq!(actor.duration(DurationKind::BreathWeapon), 5);
        actor.set_duration(DurationKind::BreathWeapon, 0);
        assert!(!actor.durations.contains_key(&DurationKind::BreathWeapon));
    }

    #[test]
    fn test_stats_in_form() {
        let mut actor = ActorContext::default();
        actor.stats.strength = 4;
        assert_eq!(actor.stats_in_form(Form::Bat).0, -1);
        actor.form = Form::Dragon;
        actor.stats.strength = 14;
        assert_eq!(actor.stats_in_form(Form::None).0, 4);
    }

    #[test]
    fn test_heal_respects_drain() {
        let mut actor = ActorContext::default();
        actor.hp = 5;
        actor.hp_max_drain = 5;
        actor.heal(100);
        assert_eq!(actor.hp, 15);
    }

    #[test]
    fn test_status_flags_serde() {
        let flags = StatusFlags::CONFUSED | StatusFlags::SILENCED;
        let json = serde_json::to_string(&flags).unwrap();
        let back: StatusFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, back);
    }
}
