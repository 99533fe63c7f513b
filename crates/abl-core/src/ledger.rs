//! Ability cost payment
//!
//! Costs are only charged after an attempt succeeds, in one fixed sequence:
//! turn bookkeeping, piety, magic, health, gold, cards, then sacrificial
//! units reserved during the checks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ability::{AbilityDef, AbilityFlags, AbilityId};
use crate::actor::ActorContext;
use crate::options::AbilityOptions;
use crate::rng::GameRng;
use crate::world::World;

/// Base price of a Gozag potion petition, multiplied by petitions so far.
pub const GOZAG_POTION_BASE_PRICE: i32 = 400;
/// Base price of calling a merchant, raised 25% per shop already called.
pub const GOZAG_SHOP_BASE_PRICE: i32 = 800;
pub const GOZAG_BRIBE_AMOUNT: i32 = 3000;

/// Magic actually charged, after the alternate-resource redirection.
///
/// Abilities paid in sacrificial units and actors casting from health
/// pay no magic.
pub fn effective_mp_cost(def: &AbilityDef, actor: &ActorContext) -> i32 {
    if def.has(AbilityFlags::SOULS) || actor.hp_casting() {
        0
    } else {
        def.mp_cost
    }
}

/// Health actually charged, including magic redirected onto health.
pub fn effective_hp_cost(def: &AbilityDef, actor: &ActorContext) -> i32 {
    let redirected = if actor.hp_casting() && !def.has(AbilityFlags::SOULS) {
        def.mp_cost
    } else {
        0
    };
    def.hp_cost.cost(actor.hp_max) + redirected
}

pub fn gold_cost(id: AbilityId, actor: &ActorContext) -> i32 {
    match id {
        AbilityId::GozagPotionPetition => {
            GOZAG_POTION_BASE_PRICE * (1 + actor.gozag_potions_petitioned)
        }
        AbilityId::GozagCallMerchant => {
            GOZAG_SHOP_BASE_PRICE * (100 + 25 * actor.gozag_shops_called) / 100
        }
        AbilityId::GozagBribeBranch => GOZAG_BRIBE_AMOUNT,
        _ => 0,
    }
}

/// Cards drawn from the deck.
pub fn card_cost(id: AbilityId) -> i32 {
    match id {
        AbilityId::NemelexTripleDraw => 3,
        AbilityId::NemelexDealFour => 4,
        AbilityId::NemelexStackFive => 5,
        _ => 0,
    }
}

/// Piety after the difficulty hook: in sprint, two named abilities cost 5/2 as much.
pub fn scale_piety_cost(id: AbilityId, cost: i32, options: &AbilityOptions, rng: &mut GameRng) -> i32 {
    if options.sprint
        && matches!(
            id,
            AbilityId::TrogBrothersInArms | AbilityId::MakhlebGreaterServant
        )
    {
        rng.div_rand_round(cost * 5, 2)
    } else {
        cost
    }
}

/// What a successful attempt was charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostReceipt {
    pub piety: i32,
    pub mp: i32,
    pub hp: i32,
    pub max_hp_drain: i32,
    pub gold: i32,
    pub cards: i32,
    pub souls: usize,
    pub instant: bool,
}

/// Charge every cost of `def`. Never fails; affordability was checked earlier.
pub fn pay_ability_costs(
    def: &AbilityDef,
    actor: &mut ActorContext,
    world: &mut dyn World,
    options: &AbilityOptions,
    rng: &mut GameRng,
) -> CostReceipt {
    let mut receipt = CostReceipt::default();

    if def.has(AbilityFlags::INSTANT) {
        actor.turn_is_over = false;
        actor.elapsed_time_at_last_input = actor.elapsed_time;
        receipt.instant = true;
    } else {
        actor.turn_is_over = true;
    }

    receipt.piety = scale_piety_cost(def.id, def.piety_cost.cost(rng), options, rng);
    receipt.mp = effective_mp_cost(def, actor);
    receipt.hp = effective_hp_cost(def, actor);
    receipt.gold = gold_cost(def.id, actor);
    receipt.cards = card_cost(def.id).min(actor.deck_cards);

    if receipt.piety > 0 {
        actor.gain_piety(-receipt.piety);
    }
    if receipt.mp > 0 {
        actor.mp -= receipt.mp;
    }
    if receipt.hp > 0 {
        actor.hp -= receipt.hp;
        if def.has(AbilityFlags::DRAIN_MAX_HP) {
            receipt.max_hp_drain = receipt.hp;
            actor.hp_max_drain += receipt.hp;
            actor.hp = actor.hp.min(actor.effective_hp_max());
        }
    }
    if receipt.gold > 0 {
        actor.gold -= receipt.gold;
        match def.id {
            AbilityId::GozagPotionPetition => actor.gozag_potions_petitioned += 1,
            AbilityId::GozagCallMerchant => actor.gozag_shops_called += 1,
            _ => {}
        }
    }
    if receipt.cards > 0 {
        actor.deck_cards -= receipt.cards;
    }
    if def.has(AbilityFlags::SOULS) {
        receipt.souls = world.consume_reservation();
    }

    debug!(
        ability = def.name,
        piety = receipt.piety,
        mp = receipt.mp,
        hp = receipt.hp,
        gold = receipt.gold,
        cards = receipt.cards,
        souls = receipt.souls,
        "ability costs paid"
    );
    receipt
}
