use abl_core::slots::SLOT_COUNT;
use abl_core::{
    AbilityId, AbilityOptions, ActorContext, God, SandboxWorld, SlotTable, set_god_ability_slots,
    your_talents,
};
use strum::IntoEnumIterator;

fn one_to_one(table: &SlotTable) -> bool {
    let ids: Vec<AbilityId> = table.iter().map(|(_, id)| id).collect();
    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    ids.len() == deduped.len()
}

#[test]
fn test_backward_scan_from_f_when_tail_is_full() {
    let options = AbilityOptions::default();
    let mut table = SlotTable::new();
    let fillers: Vec<AbilityId> = AbilityId::iter()
        .filter(|&id| id != AbilityId::None && id != AbilityId::WizardRestoration)
        .take(SLOT_COUNT - 5)
        .collect();
    for id in fillers {
        assert!(table.assign(id, 'f', &options).is_some());
    }
    assert_eq!(table.len(), SLOT_COUNT - 5);
    assert!(('a'..='e').all(|c| table.get(c).is_none()));

    assert_eq!(table.assign(AbilityId::WizardRestoration, 'f', &options), Some('e'));
}

#[test]
fn test_rule_siblings_never_evict_each_other() {
    let options = AbilityOptions::parse_config("ABILITY_SLOT=^(Breathe|Spit):+abc").unwrap();
    let family = [
        AbilityId::BreatheFire,
        AbilityId::BreatheFrost,
        AbilityId::SpitPoison,
        AbilityId::BreatheSteam,
    ];

    for reversed in [false, true] {
        let mut table = SlotTable::new();
        let order: Vec<AbilityId> = if reversed {
            family.iter().rev().copied().collect()
        } else {
            family.to_vec()
        };
        let mut letters = Vec::new();
        for &id in &order {
            letters.push(table.assign(id, 'f', &options));
        }
        assert_eq!(letters, vec![Some('a'), Some('b'), Some('c'), Some('f')]);
        for (&id, letter) in order.iter().zip(&letters) {
            assert_eq!(table.lookup(id), *letter);
        }
        assert!(one_to_one(&table));
    }
}

#[test]
fn test_slots_survive_god_change() {
    let options = AbilityOptions::default();
    let world = SandboxWorld::open(5, 5);
    let mut actor = ActorContext::new("Tester");
    actor.god = God::Okawaru;
    actor.piety = 160;
    set_god_ability_slots(&mut actor);

    let talents = your_talents(&mut actor, &world, &options, false);
    let heroism = talents
        .iter()
        .find(|t| t.which == AbilityId::OkawaruHeroism)
        .and_then(|t| t.hotkey);
    assert_eq!(heroism, Some('a'));
    assert_eq!(actor.ability_letters.lookup(AbilityId::RenounceReligion), Some('X'));

    actor.god = God::Trog;
    set_god_ability_slots(&mut actor);
    assert_eq!(actor.ability_letters.lookup(AbilityId::OkawaruHeroism), None);
    assert_eq!(actor.ability_letters.get('a'), Some(AbilityId::TrogBurnSpellbooks));
    assert_eq!(actor.ability_letters.get('b'), Some(AbilityId::TrogBerserk));
    assert!(one_to_one(&actor.ability_letters));
}

#[test]
fn test_swap_round_trip_through_talents() {
    let options = AbilityOptions::default();
    let world = SandboxWorld::open(5, 5);
    let mut actor = ActorContext::new("Tester");
    actor.god = God::Okawaru;
    actor.piety = 160;
    set_god_ability_slots(&mut actor);
    your_talents(&mut actor, &world, &options, false);

    let before = actor.ability_letters.clone();
    actor.ability_letters.swap('a', 'X', true).unwrap();
    assert_eq!(actor.ability_letters.get('X'), Some(AbilityId::OkawaruHeroism));
    actor.ability_letters.swap('a', 'X', true).unwrap();
    assert_eq!(actor.ability_letters, before);
}
