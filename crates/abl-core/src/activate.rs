//! Activation pipeline
//!
//! Danger confirmation, legality checks, targeting, the failure roll, effect
//! dispatch and finally cost payment, in that order. Only a successful
//! effect is charged.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ability::{AbilityFlags, AbilityId, ResolvedAbility, failure_chance, roll_failure};
use crate::actor::ActorContext;
use crate::effects::{Outcome, do_ability};
use crate::error::{AbilityError, Result};
use crate::ledger::{CostReceipt, pay_ability_costs};
use crate::options::AbilityOptions;
use crate::precondition::{check_ability_possible, is_dangerous};
use crate::prompt::Prompt;
use crate::rng::GameRng;
use crate::talent::Talent;
use crate::targeting::{find_targeter, target_request};
use crate::world::{Position, World};

pub const GENERIC_FAILURE: &str = "You fail to use your ability.";

/// What an activation attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationResult {
    pub outcome: Outcome,
    pub messages: Vec<String>,
    /// Whether the outer loop should advance the world
    pub turn_consumed: bool,
    /// Costs charged; present only on success
    pub receipt: Option<CostReceipt>,
}

impl ActivationResult {
    fn abort(messages: Vec<String>) -> Self {
        Self {
            outcome: Outcome::Abort,
            messages,
            turn_consumed: false,
            receipt: None,
        }
    }
}

/// Activate the ability behind a listed talent.
pub fn activate_talent(
    talent: &Talent,
    actor: &mut ActorContext,
    world: &mut dyn World,
    options: &AbilityOptions,
    rng: &mut GameRng,
    prompt: &mut dyn Prompt,
) -> Result<ActivationResult> {
    activate_ability(talent.which, actor, world, options, rng, prompt)
}

/// Run the full pipeline for `id`.
///
/// Refusals, cancellations and failures are ordinary results. An `Err` means
/// the catalog and the targeting table disagree, which is a programming error.
pub fn activate_ability(
    id: AbilityId,
    actor: &mut ActorContext,
    world: &mut dyn World,
    options: &AbilityOptions,
    rng: &mut GameRng,
    prompt: &mut dyn Prompt,
) -> Result<ActivationResult> {
    let Some(resolved) = ResolvedAbility::resolve(id, actor) else {
        return Ok(ActivationResult::abort(vec![
            "You don't have that ability.".to_string(),
        ]));
    };
    let def = resolved.def();

    if is_dangerous(&resolved, actor) && !prompt.confirm("This might be dangerous. Continue?") {
        return Ok(ActivationResult::abort(vec!["Okay, then.".to_string()]));
    }

    if let Err(refusal) = check_ability_possible(&resolved, actor, world, options, prompt) {
        actor.turn_is_over = false;
        return Ok(ActivationResult::abort(refusal.reason.into_iter().collect()));
    }

    let target = match choose_target(&resolved, actor, &*world, prompt)? {
        Aim::Untargeted => None,
        Aim::At(pos) => Some(pos),
        Aim::Cancelled(message) => {
            world.release_reservation();
            actor.turn_is_over = false;
            return Ok(ActivationResult::abort(message.into_iter().collect()));
        }
    };

    let fail_pct = failure_chance(def, actor);
    let fail = roll_failure(fail_pct, rng);
    let effect = do_ability(&resolved, target, fail, actor, world, rng, prompt);
    let mut messages = effect.messages;

    let result = match effect.outcome {
        Outcome::Success => {
            let receipt = pay_ability_costs(def, actor, world, options, rng);
            actor.record_use(resolved.id());
            info!(ability = def.name, "ability used");
            ActivationResult {
                outcome: Outcome::Success,
                messages,
                turn_consumed: actor.turn_is_over,
                receipt: Some(receipt),
            }
        }
        Outcome::Fail => {
            world.release_reservation();
            actor.turn_is_over = true;
            if !def.has(AbilityFlags::SILENT_FAIL) && !options.quiet_failures {
                messages.push(GENERIC_FAILURE.to_string());
            }
            ActivationResult {
                outcome: Outcome::Fail,
                messages,
                turn_consumed: true,
                receipt: None,
            }
        }
        Outcome::Abort => {
            world.release_reservation();
            actor.turn_is_over = false;
            ActivationResult::abort(messages)
        }
    };
    debug!(ability = def.name, fail_pct, outcome = ?result.outcome, "activation finished");
    Ok(result)
}

enum Aim {
    Untargeted,
    At(Position),
    /// Player cancelled or picked an unusable cell
    Cancelled(Option<String>),
}

/// Collect an aim for abilities that need one.
///
/// Fails only when an aimed ability has no targeter.
fn choose_target(
    resolved: &ResolvedAbility,
    actor: &ActorContext,
    world: &dyn World,
    prompt: &mut dyn Prompt,
) -> Result<Aim> {
    let Some(request) = target_request(resolved, actor) else {
        return Ok(Aim::Untargeted);
    };
    let targeter =
        find_targeter(resolved, actor, world).ok_or(AbilityError::MissingTargeter(resolved.id()))?;

    let Some(aim) = prompt.choose_target(&request, Some(&targeter)) else {
        return Ok(Aim::Cancelled(None));
    };
    if request.not_self && aim == actor.position {
        return Ok(Aim::Cancelled(Some(
            "You can't target yourself with that.".to_string(),
        )));
    }
    if !targeter.is_valid_aim(aim) {
        return Ok(Aim::Cancelled(Some("That is not a valid target.".to_string())));
    }
    Ok(Aim::At(aim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{God, Mutation, StatusFlags};
    use crate::prompt::ScriptedPrompt;
    use crate::world::SandboxWorld;

    fn hellfire_actor() -> ActorContext {
        let mut actor = ActorContext::default();
        actor.position = Position::new(2, 2);
        actor.hp = 40;
        actor.hp_max = 40;
        actor.experience_level = 27;
        actor.mutations.insert(Mutation::HurlHellfire, 1);
        actor
    }

    #[test]
    fn test_self_aim_aborts_without_cost() {
        let mut actor = hellfire_actor();
        let mut world = SandboxWorld::open(6, 6);
        let mut rng = GameRng::new(5);
        let mut prompt = ScriptedPrompt::new().with_target(Position::new(2, 2));
        let result = activate_ability(
            AbilityId::Hellfire,
            &mut actor,
            &mut world,
            &AbilityOptions::default(),
            &mut rng,
            &mut prompt,
        )
        .unwrap();
        assert_eq!(result.outcome, Outcome::Abort);
        assert!(!result.turn_consumed);
        assert_eq!(actor.hp, 40);
        assert_eq!(actor.hp_max_drain, 0);
    }

    #[test]
    fn test_cancel_aborts() {
        let mut actor = hellfire_actor();
        let mut world = SandboxWorld::open(6, 6);
        let mut rng = GameRng::new(5);
        let mut prompt = ScriptedPrompt::new().with_cancel();
        let result = activate_ability(
            AbilityId::Hellfire,
            &mut actor,
            &mut world,
            &AbilityOptions::default(),
            &mut rng,
            &mut prompt,
        )
        .unwrap();
        assert_eq!(result.outcome, Outcome::Abort);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_refusal_reports_reason() {
        let mut actor = ActorContext::default();
        actor.god = God::Elyvilon;
        actor.piety = 100;
        let mut world = SandboxWorld::open(3, 3);
        let mut rng = GameRng::new(5);
        let mut prompt = ScriptedPrompt::new();
        let result = activate_ability(
            AbilityId::ElyvilonPurification,
            &mut actor,
            &mut world,
            &AbilityOptions::default(),
            &mut rng,
            &mut prompt,
        )
        .unwrap();
        assert_eq!(result.outcome, Outcome::Abort);
        assert_eq!(result.messages, vec!["Nothing ails you!".to_string()]);
    }

    #[test]
    fn test_success_charges_and_counts() {
        let mut actor = ActorContext::default();
        actor.mp = 5;
        actor.position = Position::new(1, 1);
        let mut world = SandboxWorld::open(3, 3);
        let mut rng = GameRng::new(5);
        let mut prompt = ScriptedPrompt::new();
        let result = activate_ability(
            AbilityId::StopFlying,
            &mut actor,
            &mut world,
            &AbilityOptions::default(),
            &mut rng,
            &mut prompt,
        )
        .unwrap();
        // Not flying, so refused
        assert_eq!(result.outcome, Outcome::Abort);

        actor.status.insert(StatusFlags::FLYING);
        let result = activate_ability(
            AbilityId::StopFlying,
            &mut actor,
            &mut world,
            &AbilityOptions::default(),
            &mut rng,
            &mut prompt,
        )
        .unwrap();
        assert_eq!(result.outcome, Outcome::Success);
        assert!(result.turn_consumed);
        assert_eq!(actor.ability_uses.get(&AbilityId::StopFlying), Some(&1));
        assert!(!actor.has(StatusFlags::FLYING));
    }

    #[test]
    fn test_dangerous_declined() {
        let mut actor = ActorContext::default();
        actor.species = crate::actor::Species::Vampire;
        actor.experience_level = 10;
        actor.mp = 5;
        actor.stats.strength = 3;
        let mut world = SandboxWorld::open(3, 3);
        let mut rng = GameRng::new(5);
        let mut prompt = ScriptedPrompt::new().with_answer(false);
        let result = activate_ability(
            AbilityId::TranBat,
            &mut actor,
            &mut world,
            &AbilityOptions::default(),
            &mut rng,
            &mut prompt,
        )
        .unwrap();
        assert_eq!(result.outcome, Outcome::Abort);
        assert_eq!(prompt.asked, vec!["This might be dangerous. Continue?".to_string()]);
        assert_eq!(actor.mp, 5);
    }
}
