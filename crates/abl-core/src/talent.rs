//! Presentation-ready talents
//!
//! A [`Talent`] is rebuilt on every query from the eligibility list: the
//! ability after fixup, its hotkey and its current failure chance.

use std::fmt::Write as _;
use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ability::{AbilityFlags, AbilityId, ResolvedAbility, ability_def, failure_chance};
use crate::actor::ActorContext;
use crate::eligibility::eligible_ids;
use crate::ledger::{effective_hp_cost, effective_mp_cost, gold_cost};
use crate::options::AbilityOptions;
use crate::precondition::check_ability_quietly;
use crate::slots::preferred_start;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talent {
    pub which: AbilityId,
    pub hotkey: Option<char>,
    /// Failure chance in percent, 0-100
    pub fail: i32,
    pub is_invocation: bool,
    /// Passes every legality check right now; menus grey out the rest
    pub usable: bool,
}

impl Talent {
    fn new(
        resolved: &ResolvedAbility,
        hotkey: Option<char>,
        actor: &ActorContext,
        world: &dyn World,
    ) -> Self {
        let def = resolved.def();
        Self {
            which: resolved.id(),
            hotkey,
            fail: failure_chance(def, actor),
            is_invocation: def.is_invocation(),
            usable: check_ability_quietly(resolved, actor, world),
        }
    }
}

/// Talents the actor can currently use, ordered by hotkey.
///
/// Each newly seen ability is given a slot. With `check_confused`, talents
/// that cannot be used while confused are left out.
pub fn your_talents(
    actor: &mut ActorContext,
    world: &dyn World,
    options: &AbilityOptions,
    check_confused: bool,
) -> Vec<Talent> {
    let mut listed = Vec::new();
    for requested in eligible_ids(actor, world) {
        let Some(resolved) = ResolvedAbility::resolve(requested, actor) else {
            continue;
        };
        if check_confused && actor.confused() && !resolved.def().has(AbilityFlags::CONF_OK) {
            continue;
        }
        if bound_letter(actor, requested, &resolved).is_none() {
            let start = preferred_start(requested, actor.god, options.first_letter);
            actor.ability_letters.assign(requested, start, options);
        }
        listed.push((requested, resolved));
    }

    // Read hotkeys only once every assignment is done, since a later
    // assignment may evict an ability listed earlier.
    let mut talents: Vec<Talent> = listed
        .iter()
        .map(|(requested, resolved)| {
            let hotkey = bound_letter(actor, *requested, resolved);
            Talent::new(resolved, hotkey, actor, world)
        })
        .collect();
    talents.sort_by_key(|t| t.hotkey.and_then(crate::slots::letter_to_index));
    talents
}

fn bound_letter(
    actor: &ActorContext,
    requested: AbilityId,
    resolved: &ResolvedAbility,
) -> Option<char> {
    actor
        .ability_letters
        .position(|slot| slot == requested || slot == resolved.id())
}

/// Talent bound to `letter`, if the actor can currently use it.
pub fn talent_for_letter(
    actor: &mut ActorContext,
    world: &dyn World,
    options: &AbilityOptions,
    letter: char,
) -> Option<Talent> {
    your_talents(actor, world, options, false)
        .into_iter()
        .find(|t| t.hotkey == Some(letter))
}

// ============================================================================
// Cost text
// ============================================================================

/// One-line cost summary such as `"3 MP, Piety"`, or `"None"`.
pub fn make_cost_description(id: AbilityId, actor: &ActorContext) -> String {
    let def = ability_def(id);
    let mut parts: Vec<String> = Vec::new();

    let mp = effective_mp_cost(def, actor);
    if mp > 0 {
        parts.push(format!("{mp} MP"));
    }
    let hp = effective_hp_cost(def, actor);
    if hp > 0 {
        parts.push(format!("{hp} HP"));
    }
    if def.piety_cost.is_nonzero() {
        parts.push("Piety".into());
    }
    if def.has(AbilityFlags::BREATH) {
        parts.push("Breath".into());
    }
    if def.has(AbilityFlags::EXHAUSTION) {
        parts.push("Exhaustion".into());
    }
    if def.has(AbilityFlags::INSTANT) {
        parts.push("Instant".into());
    }
    if def.has(AbilityFlags::GOLD) {
        parts.push(format!("{} Gold", gold_cost(id, actor)));
    }
    if def.has(AbilityFlags::SOULS) {
        parts.push("Souls".into());
    }
    if def.has(AbilityFlags::CARD) {
        parts.push("Card".into());
    }
    if def.has(AbilityFlags::DRAIN_MAX_HP) {
        parts.push("Max HP drain".into());
    }

    if parts.is_empty() {
        "None".into()
    } else {
        parts.join(", ")
    }
}

/// Coarse band for an average piety cost.
pub fn piety_amount_str(value: i32) -> &'static str {
    match value {
        v if v > 15 => "extremely large",
        v if v > 10 => "large",
        v if v > 5 => "moderate",
        _ => "small",
    }
}

/// Multi-line cost breakdown for the description screen.
pub fn detailed_cost_description(id: AbilityId, actor: &ActorContext) -> String {
    let def = ability_def(id);
    let mut out = String::from("This ability costs: ");
    let mut have_cost = false;

    let mp = effective_mp_cost(def, actor);
    if mp > 0 {
        have_cost = true;
        let _ = write!(out, "\nMP     : {mp}");
    }
    let hp = effective_hp_cost(def, actor);
    if hp > 0 {
        have_cost = true;
        let label = if def.has(AbilityFlags::DRAIN_MAX_HP) {
            "Max HP"
        } else {
            "HP    "
        };
        let _ = write!(out, "\n{label} : {hp}");
    }
    if def.piety_cost.is_nonzero() {
        have_cost = true;
        let average = def.piety_cost.base + def.piety_cost.add / 2;
        let _ = write!(out, "\nPiety  : {}", piety_amount_str(average));
    }
    if def.has(AbilityFlags::GOLD) {
        have_cost = true;
        let _ = write!(out, "\nGold   : {}", gold_cost(id, actor));
    }
    if def.has(AbilityFlags::SOULS) {
        have_cost = true;
        let _ = write!(out, "\nSouls  : {}", def.soul_cost());
    }
    if !have_cost {
        out.push_str("nothing.");
    }

    if def.has(AbilityFlags::BREATH) {
        out.push_str("\nYou must catch your breath between uses of this ability.");
    }
    if def.has(AbilityFlags::EXHAUSTION) {
        out.push_str("\nIt cannot be used when exhausted.");
    }
    if def.has(AbilityFlags::INSTANT) {
        out.push_str("\nIt is instantaneous.");
    }
    if def.has(AbilityFlags::CONF_OK) {
        out.push_str("\nYou can use it even if confused.");
    }
    out
}

/// Truncate or pad `text` to exactly `width` characters.
fn chop(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{truncated:<width$}")
}

/// Menu line: hotkey, then name, cost and failure in fixed columns.
pub fn describe_talent(talent: &Talent, actor: &ActorContext) -> String {
    format!(
        "{} - {}{}{}",
        talent.hotkey.unwrap_or(' '),
        chop(ability_def(talent.which).name, 32),
        chop(&make_cost_description(talent.which, actor), 30),
        chop(&format!("{}%", talent.fail), 7),
    )
}

// ============================================================================
// Long descriptions
// ============================================================================

pub const NO_DESCRIPTION: &str = "No description found.";

/// Flavor text keyed by `"<display name> ability"`.
pub trait DescriptionSource {
    fn long_description(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory description table, loadable from a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptionTable {
    entries: HashMap<String, String>,
}

impl DescriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    pub fn from_json(json: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, DescriptionError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

impl DescriptionSource for DescriptionTable {
    fn long_description(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// Full description screen: name, flavor text and detailed costs.
pub fn ability_description(
    id: AbilityId,
    actor: &ActorContext,
    source: &dyn DescriptionSource,
) -> String {
    let name = ability_def(id).name;
    let lookup = source
        .long_description(&format!("{name} ability"))
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    format!(
        "{name}\n\n{}\n\n{}",
        lookup.trim_end(),
        detailed_cost_description(id, actor)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{God, Mutation, Species, StatusFlags};
    use crate::world::SandboxWorld;

    #[test]
    fn test_cost_descriptions() {
        let actor = ActorContext::default();
        assert_eq!(make_cost_description(AbilityId::EndTransformation, &actor), "None");
        assert_eq!(make_cost_description(AbilityId::Fly, &actor), "3 MP");
        assert!(make_cost_description(AbilityId::BreatheFire, &actor).contains("Breath"));
        assert!(make_cost_description(AbilityId::GozagBribeBranch, &actor).contains("3000 Gold"));
        assert!(make_cost_description(AbilityId::YredDarkBargain, &actor).contains("Souls"));
        assert!(make_cost_description(AbilityId::Hellfire, &actor).ends_with("Max HP drain"));
    }

    #[test]
    fn test_piety_bands() {
        assert_eq!(piety_amount_str(3), "small");
        assert_eq!(piety_amount_str(5), "small");
        assert_eq!(piety_amount_str(6), "moderate");
        assert_eq!(piety_amount_str(11), "large");
        assert_eq!(piety_amount_str(16), "extremely large");
    }

    #[test]
    fn test_detailed_cost_nothing() {
        let actor = ActorContext::default();
        let text = detailed_cost_description(AbilityId::EndTransformation, &actor);
        assert_eq!(text, "This ability costs: nothing.");
        let text = detailed_cost_description(AbilityId::Fly, &actor);
        assert!(text.starts_with("This ability costs: \nMP     : 3"));
    }

    #[test]
    fn test_describe_talent_columns() {
        let actor = ActorContext::default();
        let talent = Talent {
            which: AbilityId::Fly,
            hotkey: Some('f'),
            fail: 42,
            is_invocation: false,
            usable: true,
        };
        let line = describe_talent(&talent, &actor);
        assert!(line.starts_with("f - Fly"));
        assert_eq!(line.chars().count(), 4 + 32 + 30 + 7);
        assert_eq!(&line[4 + 32..4 + 32 + 4], "3 MP");
        assert_eq!(line[4 + 62..].trim_end(), "42%");
    }

    #[test]
    fn test_your_talents_assigns_slots() {
        let mut actor = ActorContext::default();
        actor.species = Species::Tengu;
        actor.experience_level = 5;
        actor.god = God::Okawaru;
        actor.piety = 40;
        let world = SandboxWorld::open(3, 3);
        let options = AbilityOptions::default();

        let talents = your_talents(&mut actor, &world, &options, false);
        let ids: Vec<AbilityId> = talents.iter().map(|t| t.which).collect();
        assert!(ids.contains(&AbilityId::Fly));
        assert!(ids.contains(&AbilityId::OkawaruHeroism));
        assert!(talents.iter().all(|t| t.hotkey.is_some()));
        assert_eq!(actor.ability_letters.lookup(AbilityId::Fly), Some('f'));

        // Hotkeys are stable across queries
        let again = your_talents(&mut actor, &world, &options, false);
        assert_eq!(talents, again);
    }

    #[test]
    fn test_hotkeys_follow_eviction_of_earlier_talent() {
        let mut actor = ActorContext::default();
        actor.species = Species::Tengu;
        actor.experience_level = 5;
        actor.mutations.insert(Mutation::BreatheFlames, 1);
        let world = SandboxWorld::open(3, 3);
        let options = AbilityOptions::parse_config("ABILITY_SLOT=^breathe:+f").unwrap();

        let talents = your_talents(&mut actor, &world, &options, false);
        assert_eq!(talents.len(), 2);
        for talent in &talents {
            assert_eq!(talent.hotkey, actor.ability_letters.lookup(talent.which));
        }
        let hotkey = |id| talents.iter().find(|t| t.which == id).and_then(|t| t.hotkey);
        assert_eq!(hotkey(AbilityId::BreatheFire), Some('f'));
        assert_eq!(hotkey(AbilityId::Fly), Some('g'));
        assert_eq!(
            talent_for_letter(&mut actor, &world, &options, 'f').map(|t| t.which),
            Some(AbilityId::BreatheFire)
        );
    }

    #[test]
    fn test_confusion_filter() {
        let mut actor = ActorContext::default();
        actor.species = Species::Tengu;
        actor.experience_level = 5;
        actor.status.insert(StatusFlags::CONFUSED);
        let world = SandboxWorld::open(3, 3);
        let options = AbilityOptions::default();
        assert!(your_talents(&mut actor, &world, &options, true).is_empty());
        assert_eq!(your_talents(&mut actor, &world, &options, false).len(), 1);
    }

    #[test]
    fn test_description_lookup() {
        let actor = ActorContext::default();
        let mut table = DescriptionTable::new();
        table.insert("Fly ability", "You take to the air.\n");
        let text = ability_description(AbilityId::Fly, &actor, &table);
        assert!(text.starts_with("Fly\n\nYou take to the air.\n\nThis ability costs:"));

        let text = ability_description(AbilityId::Blink, &actor, &table);
        assert!(text.contains(NO_DESCRIPTION));
    }

    #[test]
    fn test_description_table_json() {
        let table = DescriptionTable::from_json(r#"{"Blink ability": "Short hop."}"#).unwrap();
        assert_eq!(table.long_description("Blink ability").as_deref(), Some("Short hop."));
        assert!(DescriptionTable::from_json("[1, 2]").is_err());
    }
}
