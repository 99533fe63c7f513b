//! Ability slot allocation
//!
//! Each ability the actor has ever been offered keeps a stable letter in a
//! 52-entry table (`a`-`z` then `A`-`Z`). New abilities take the first free
//! slot scanning forward from a start letter, then backward; configured
//! [`SlotRule`]s may move them afterwards, evicting occupants when a rule is
//! in overwrite mode.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ability::{AbilityId, ability_name};
use crate::actor::God;
use crate::error::AbilityError;
use crate::options::{AbilityOptions, SlotRule};

pub const SLOT_COUNT: usize = 52;

/// Default start of the allocation scan; `a`-`e` are left for god powers.
pub const DEFAULT_FIRST_LETTER: char = 'f';

/// Letter for slot `index`.
pub fn index_to_letter(index: usize) -> Option<char> {
    match index {
        0..=25 => Some((b'a' + index as u8) as char),
        26..=51 => Some((b'A' + (index - 26) as u8) as char),
        _ => None,
    }
}

/// Slot index for `letter`.
pub fn letter_to_index(letter: char) -> Option<usize> {
    match letter {
        'a'..='z' => Some(letter as usize - 'a' as usize),
        'A'..='Z' => Some(letter as usize - 'A' as usize + 26),
        _ => None,
    }
}

/// Start letter for a newly seen ability.
///
/// Related families cluster together: Ru's sacrifices from `P`, the
/// conversion offer at `Y`, Zin's cure at `W`. Elyvilon worshippers keep
/// `a`-`g` for their larger power set.
pub fn preferred_start(id: AbilityId, god: God, first_letter: char) -> char {
    match id {
        AbilityId::ZinCureAllMutations => 'W',
        AbilityId::ConvertToBeogh => 'Y',
        AbilityId::RuSacrificePurity
        | AbilityId::RuSacrificeWords
        | AbilityId::RuSacrificeDrink
        | AbilityId::RuSacrificeEssence
        | AbilityId::RuSacrificeHealth
        | AbilityId::RuRejectSacrifices => 'P',
        _ if god == God::Elyvilon => 'h',
        _ => first_letter,
    }
}

/// Fixed-size hotkey table, persisted with the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<AbilityId>>", into = "Vec<Option<AbilityId>>")]
pub struct SlotTable {
    slots: [Option<AbilityId>; SLOT_COUNT],
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Option<AbilityId>>> for SlotTable {
    type Error = String;

    fn try_from(entries: Vec<Option<AbilityId>>) -> Result<Self, Self::Error> {
        let len = entries.len();
        let slots: [Option<AbilityId>; SLOT_COUNT] = entries
            .try_into()
            .map_err(|_| format!("expected {SLOT_COUNT} slots, found {len}"))?;
        let mut table = Self { slots };
        // Drop later duplicates so the table stays one-to-one
        for i in 0..SLOT_COUNT {
            if let Some(id) = table.slots[i]
                && table.slots[..i].contains(&Some(id))
            {
                table.slots[i] = None;
            }
        }
        Ok(table)
    }
}

impl From<SlotTable> for Vec<Option<AbilityId>> {
    fn from(table: SlotTable) -> Self {
        table.slots.to_vec()
    }
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            slots: [None; SLOT_COUNT],
        }
    }

    /// Ability bound to `letter`, if any.
    pub fn get(&self, letter: char) -> Option<AbilityId> {
        letter_to_index(letter).and_then(|i| self.slots[i])
    }

    /// Current letter of `id`.
    pub fn lookup(&self, id: AbilityId) -> Option<char> {
        self.position(|entry| entry == id)
    }

    /// First letter whose entry satisfies `pred`.
    ///
    /// Lets callers match stored placeholder ids against their redirected form.
    pub fn position(&self, pred: impl Fn(AbilityId) -> bool) -> Option<char> {
        self.slots
            .iter()
            .position(|entry| entry.is_some_and(&pred))
            .and_then(index_to_letter)
    }

    /// Occupied slots in letter order.
    pub fn iter(&self) -> impl Iterator<Item = (char, AbilityId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| Some((index_to_letter(i)?, (*entry)?)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove `id` from the table.
    pub fn clear(&mut self, id: AbilityId) {
        for entry in self.slots.iter_mut() {
            if *entry == Some(id) {
                *entry = None;
            }
        }
    }

    /// Clear every entry for which `pred` holds.
    pub fn retain(&mut self, pred: impl Fn(AbilityId) -> bool) {
        for entry in self.slots.iter_mut() {
            if entry.is_some_and(|id| !pred(id)) {
                *entry = None;
            }
        }
    }

    /// Put `id` at `letter` unless it already has a slot or the letter is taken.
    pub fn place_if_free(&mut self, id: AbilityId, letter: char) -> bool {
        let Some(index) = letter_to_index(letter) else {
            return false;
        };
        if id == AbilityId::None || self.lookup(id).is_some() || self.slots[index].is_some() {
            return false;
        }
        self.slots[index] = Some(id);
        true
    }

    /// Find or allocate a slot for `id`, then apply the configured rules.
    ///
    /// An ability that already has a slot keeps it untouched. Returns `None`
    /// when every slot is taken.
    pub fn assign(
        &mut self,
        id: AbilityId,
        start: char,
        options: &AbilityOptions,
    ) -> Option<char> {
        if id == AbilityId::None {
            return None;
        }
        if let Some(letter) = self.lookup(id) {
            return Some(letter);
        }
        self.assign_new(id, start, options, options.eviction_depth)
    }

    fn assign_new(
        &mut self,
        id: AbilityId,
        start: char,
        options: &AbilityOptions,
        depth: usize,
    ) -> Option<char> {
        let Some(index) = self.scan_free(start) else {
            warn!(?id, "no free ability slot");
            return None;
        };
        self.slots[index] = Some(id);
        debug!(?id, slot = ?index_to_letter(index), "ability slot assigned");

        self.apply_rules(id, index, start, options, depth);
        // A chain of evictions can push `id` out of the slot it claimed
        self.lookup(id)
    }

    /// Forward from `start` to the end, then backward toward `a`.
    fn scan_free(&self, start: char) -> Option<usize> {
        let first = letter_to_index(start).unwrap_or(0);
        (first..SLOT_COUNT)
            .chain((0..first).rev())
            .find(|&i| self.slots[i].is_none())
    }

    /// Move `id` (currently at `current`) according to the first rule letter it can claim.
    fn apply_rules(
        &mut self,
        id: AbilityId,
        current: usize,
        start: char,
        options: &AbilityOptions,
        depth: usize,
    ) {
        let name = ability_name(id);
        for rule in options.slot_rules.iter().filter(|r| r.pattern.matches(name)) {
            if self
                .claim_from_rule(id, current, rule, start, options, depth)
                .is_some()
            {
                return;
            }
        }
    }

    fn claim_from_rule(
        &mut self,
        id: AbilityId,
        current: usize,
        rule: &SlotRule,
        start: char,
        options: &AbilityOptions,
        depth: usize,
    ) -> Option<usize> {
        let mut overwrite = false;
        for c in rule.letters.chars() {
            match c {
                '+' => overwrite = true,
                '-' => overwrite = false,
                _ => {
                    let Some(target) = letter_to_index(c) else {
                        continue;
                    };
                    match self.slots[target] {
                        None => {
                            self.move_slot(current, target);
                            return Some(target);
                        }
                        Some(occupant) if occupant == id => return Some(target),
                        Some(occupant)
                            if overwrite && !rule.pattern.matches(ability_name(occupant)) =>
                        {
                            self.slots[current] = None;
                            self.slots[target] = Some(id);
                            debug!(?id, ?occupant, slot = %c, "ability slot evicted");
                            self.rehome(occupant, start, options, depth);
                            return Some(target);
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        None
    }

    /// Find a new home for an evicted ability.
    ///
    /// Rules are re-run with one less level of recursion; at zero the
    /// evicted ability only gets a plain scan.
    fn rehome(&mut self, id: AbilityId, start: char, options: &AbilityOptions, depth: usize) {
        let placed = if depth == 0 {
            warn!(?id, "slot eviction depth exhausted");
            self.scan_free(start).map(|index| {
                self.slots[index] = Some(id);
                index
            })
        } else {
            self.assign_new(id, start, options, depth - 1)
                .and_then(letter_to_index)
        };
        if placed.is_none() {
            warn!(?id, "evicted ability lost its slot");
        }
    }

    fn move_slot(&mut self, from: usize, to: usize) {
        if from != to {
            self.slots[to] = self.slots[from].take();
        }
    }

    /// Exchange the contents of two slots.
    ///
    /// Returns a `"<letter> - <name>"` line per occupied slot unless `silent`.
    pub fn swap(&mut self, a: char, b: char, silent: bool) -> Result<Vec<String>, AbilityError> {
        let ia = letter_to_index(a).ok_or(AbilityError::InvalidSlot(a))?;
        let ib = letter_to_index(b).ok_or(AbilityError::InvalidSlot(b))?;
        self.slots.swap(ia, ib);

        let mut messages = Vec::new();
        if !silent {
            for (letter, index) in [(a, ia), (b, ib)] {
                if let Some(id) = self.slots[index] {
                    messages.push(format!("{} - {}", letter, ability_name(id)));
                }
            }
        }
        Ok(messages)
    }
}
