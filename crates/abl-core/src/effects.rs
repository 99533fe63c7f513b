//! Ability effects
//!
//! [`do_ability`] hands a resolved ability to its effect. The failure roll is
//! made before dispatch; each effect either honours it through the shared
//! short-circuit or returns [`Outcome::Abort`] before touching any state.
//! Costs are never charged here.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ability::{AbilityFlags, AbilityId, ResolvedAbility, piety_breakpoint};
use crate::actor::{ActorContext, DurationKind, Form, Skill, StatusFlags};
use crate::eligibility::set_god_ability_slots;
use crate::ledger::card_cost;
use crate::prompt::Prompt;
use crate::rng::GameRng;
use crate::targeting::{
    beam_path, beam_power, effective_range, find_targeter, upheaval_outer_chance,
};
use crate::world::{CloudKind, Feature, LOS_RADIUS, Position, World};

/// Result class of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The effect happened; costs are due.
    Success,
    /// The failure roll came up; the turn is spent but nothing is charged.
    Fail,
    /// Nothing happened and no time passes.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectResult {
    pub outcome: Outcome,
    pub messages: Vec<String>,
}

/// Returns [`Outcome::Fail`] from the enclosing effect when the roll failed.
macro_rules! fail_check {
    ($ctx:expr) => {
        if $ctx.fail {
            return Outcome::Fail;
        }
    };
}

/// Perform the effect of `resolved`.
///
/// `target` is the aim chosen during targeting, if the ability has one.
/// `fail` is the precomputed failure roll.
pub fn do_ability(
    resolved: &ResolvedAbility,
    target: Option<Position>,
    fail: bool,
    actor: &mut ActorContext,
    world: &mut dyn World,
    rng: &mut GameRng,
    prompt: &mut dyn Prompt,
) -> EffectResult {
    let mut ctx = EffectContext {
        resolved: *resolved,
        fail,
        actor,
        world,
        rng,
        prompt,
        messages: Vec::new(),
    };
    let outcome = ctx.dispatch(target);
    if outcome == Outcome::Success {
        ctx.after_success();
    }
    debug!(ability = resolved.name(), fail, ?outcome, "ability effect");
    EffectResult {
        outcome,
        messages: ctx.messages,
    }
}

struct EffectContext<'a> {
    resolved: ResolvedAbility,
    fail: bool,
    actor: &'a mut ActorContext,
    world: &'a mut dyn World,
    rng: &'a mut GameRng,
    prompt: &'a mut dyn Prompt,
    messages: Vec<String>,
}

impl EffectContext<'_> {
    // ========================================================================
    // Dispatch
    // ========================================================================

    fn dispatch(&mut self, target: Option<Position>) -> Outcome {
        use AbilityId as A;

        match self.resolved.id() {
            A::None => Outcome::Abort,

            A::SpitPoison => self.breathe(target, "You spit poison.", Some(CloudKind::Poison)),
            A::BreatheFire => self.breathe(target, "You breathe a blast of fire.", Some(CloudKind::Fire)),
            A::BreatheFrost => self.breathe(target, "You exhale a wave of freezing cold.", None),
            A::BreathePoison => {
                self.breathe(target, "You exhale a blast of poison gas.", Some(CloudKind::Poison))
            }
            A::BreatheMephitic => {
                self.breathe(target, "You exhale a blast of noxious fumes.", Some(CloudKind::Mephitic))
            }
            A::BreatheLightning => self.breathe(target, "You breathe a bolt of lightning.", None),
            A::BreathePower => self.breathe(target, "You breathe a bolt of dispelling energy.", None),
            A::BreatheStickyFlame => {
                self.breathe(target, "You spit a glob of burning liquid.", Some(CloudKind::Fire))
            }
            A::BreatheSteam => self.breathe(target, "You exhale a blast of scalding steam.", Some(CloudKind::Steam)),
            A::SpitAcid => self.breathe(target, "You spit acid.", None),

            A::Blink | A::EvokeBlink => self.translocate(2, "You blink."),
            A::EvokeTeleportation => self.translocate(LOS_RADIUS / 2 + 1, "You teleport!"),
            A::LugonuBendSpace => self.translocate(1, "Space warps around you."),

            A::TranBat => {
                fail_check!(self);
                let turns = 10 + self.rng.rn2(10 + self.actor.experience_level as u32) as i32;
                self.actor.form = Form::Bat;
                self.actor.set_duration(DurationKind::Transformation, turns);
                self.say("Your body shrinks and sprouts leathery wings.");
                Outcome::Success
            }

            A::Fly => {
                let turns = 25 + self.actor.experience_level;
                self.take_flight(turns)
            }
            A::EvokeFlight => {
                let turns = 25 + 5 * self.actor.skill(Skill::Evocations);
                self.take_flight(turns)
            }
            A::StopFlying => {
                fail_check!(self);
                self.actor.status.remove(StatusFlags::FLYING);
                self.actor.set_duration(DurationKind::Flight, 0);
                self.say("You float gracefully downwards.");
                Outcome::Success
            }

            A::Hellfire => self.hellfire(target),

            A::DelayedFireball => {
                fail_check!(self);
                self.actor.status.remove(StatusFlags::DELAYED_FIREBALL);
                let nearest = self
                    .hostiles_in_view()
                    .into_iter()
                    .min_by_key(|p| p.distance(self.actor.position));
                match nearest {
                    Some(center) => {
                        self.say("You release the fireball.");
                        let power = 2 + self.actor.experience_level as u32 / 2;
                        for cell in center.within(1).collect::<Vec<_>>() {
                            let dmg = self.rng.dice(3, power) as i32;
                            self.hit(cell, dmg);
                        }
                    }
                    None => self.say("Your fireball flickers out harmlessly."),
                }
                Outcome::Success
            }

            A::StopSinging => {
                fail_check!(self);
                self.actor.status.remove(StatusFlags::SINGING);
                self.say("You stop singing.");
                Outcome::Success
            }

            A::Dig => {
                let Some(aim) = target else {
                    return Outcome::Abort;
                };
                if !self.world.feature_at(aim).is_diggable() {
                    return Outcome::Abort;
                }
                fail_check!(self);
                self.world.set_feature(aim, Feature::Floor);
                self.say("You dig through the rock.");
                Outcome::Success
            }

            A::ShaftSelf => {
                fail_check!(self);
                self.world.set_feature(self.actor.position, Feature::Shaft);
                self.say("You dig a shaft beneath your feet.");
                Outcome::Success
            }

            A::EvokeBerserk | A::TrogBerserk => {
                fail_check!(self);
                let turns = 10 + self.rng.rn2(10) as i32;
                self.actor.status.insert(StatusFlags::BERSERK);
                self.actor.set_duration(DurationKind::Berserk, turns);
                self.say("You feel yourself moving faster!");
                self.say("You feel mighty!");
                Outcome::Success
            }

            A::EvokeTurnInvisible => {
                fail_check!(self);
                let turns = 15 + self.rng.rn2(10 + 2 * self.actor.skill(Skill::Evocations) as u32) as i32;
                self.actor.status.insert(StatusFlags::INVISIBLE);
                self.actor.set_duration(DurationKind::Invisibility, turns);
                self.say("You fade into invisibility!");
                Outcome::Success
            }

            A::EvokeTurnVisible => {
                fail_check!(self);
                self.actor.status.remove(StatusFlags::INVISIBLE);
                self.actor.set_duration(DurationKind::Invisibility, 0);
                self.say("You feel less transparent.");
                Outcome::Success
            }

            A::EvokeFog => {
                fail_check!(self);
                let cells: Vec<Position> = self
                    .actor
                    .position
                    .within(1)
                    .filter(|&p| self.world.in_bounds(p) && !self.world.feature_at(p).is_solid())
                    .collect();
                for cell in cells {
                    self.world.place_cloud(cell, CloudKind::Fog);
                }
                self.say("Fog billows out around you.");
                Outcome::Success
            }

            A::EndTransformation => {
                fail_check!(self);
                self.actor.form = Form::None;
                self.actor.set_duration(DurationKind::Transformation, 0);
                self.say("Your transformation has ended.");
                Outcome::Success
            }

            A::ZinRecite => self.recite(),

            A::ZinVitalisation => {
                fail_check!(self);
                let skill = self.actor.skill(Skill::Invocations);
                let hp = 5 + self.rng.rn2(skill as u32 + 5) as i32;
                self.actor.heal(hp);
                self.actor.restore_mp(1 + skill / 4);
                self.actor.stats.restore();
                self.say("You feel invigorated.");
                Outcome::Success
            }

            A::ZinImprison => {
                let Some(aim) = target else {
                    return Outcome::Abort;
                };
                let Some(name) = self.monster_name(aim) else {
                    return Outcome::Abort;
                };
                fail_check!(self);
                let actor_pos = self.actor.position;
                let walls: Vec<Position> = aim
                    .adjacent()
                    .filter(|&p| p != actor_pos && self.world.is_free(p))
                    .collect();
                for cell in walls {
                    self.world.set_feature(cell, Feature::Wall);
                }
                self.say(format!("The {name} is imprisoned!"));
                Outcome::Success
            }

            A::ZinSanctuary => {
                fail_check!(self);
                self.world.create_sanctuary(self.actor.position, 4);
                self.say("You are suddenly bathed in radiance!");
                Outcome::Success
            }

            A::ZinCureAllMutations => {
                fail_check!(self);
                self.actor.mutations.clear();
                self.say("You feel transformed as your mutations fall away.");
                Outcome::Success
            }

            A::TsoDivineShield => {
                fail_check!(self);
                let turns = 15 + self.actor.skill(Skill::Invocations) / 2;
                self.actor.set_duration(DurationKind::DivineShield, turns);
                self.say("A divine shield forms around you!");
                Outcome::Success
            }

            A::TsoCleansingFlame => {
                fail_check!(self);
                self.say("You are surrounded by a blast of cleansing flame!");
                let sides = 4 + self.actor.skill(Skill::Invocations) as u32;
                let origin = self.actor.position;
                for cell in self.hostiles_in_view() {
                    if cell.distance(origin) <= 2 {
                        let dmg = self.rng.dice(2, sides) as i32;
                        self.hit(cell, dmg);
                    }
                }
                Outcome::Success
            }

            A::TsoSummonDivineWarrior => self.summon_allies("daeva", 1, "You are joined by a divine warrior!"),

            A::YredInjuryMirror => {
                fail_check!(self);
                let turns = 9 + self.rng.rn2(self.actor.piety as u32 / 25 + 1) as i32;
                self.actor.set_duration(DurationKind::InjuryMirror, turns);
                self.say("You beseech Yredelemnul to protect your life.");
                Outcome::Success
            }

            A::YredAnimateRemains => self.animate(false),
            A::YredAnimateDead => self.animate(true),
            A::YredAnimateRemainsOrDead => {
                let dead = self.actor.piety >= piety_breakpoint(2);
                self.animate(dead)
            }

            A::YredRecallUndeadSlaves => self.recall(|_| true),
            A::BeoghRecallOrcishFollowers => self.recall(|name| name.contains("orc")),

            A::YredDrainLife => {
                fail_check!(self);
                self.say("You draw life from your surroundings.");
                let sides = 4 + self.actor.skill(Skill::Invocations) as u32;
                let mut drained = 0;
                for cell in self.hostiles_in_view() {
                    let dmg = self.rng.dice(1, sides) as i32;
                    self.hit(cell, dmg);
                    drained += dmg;
                }
                self.actor.heal(drained / 2);
                Outcome::Success
            }

            A::YredEnslaveSoul => {
                let Some(aim) = target else {
                    return Outcome::Abort;
                };
                let Some(name) = self.monster_name(aim) else {
                    return Outcome::Abort;
                };
                fail_check!(self);
                self.world.befriend_monster(aim);
                self.say(format!("The {name}'s soul is now yours."));
                Outcome::Success
            }

            A::YredDarkBargain => self.summon_allies("dark servant", 1, "A dark servant answers your bargain."),

            A::OkawaruHeroism => {
                fail_check!(self);
                let turns = 10 + self.rng.rn2(self.actor.skill(Skill::Invocations) as u32 + 10) as i32;
                self.actor.extend_duration(DurationKind::Heroism, turns);
                self.say("You feel more confident with your battle prowess.");
                Outcome::Success
            }

            A::OkawaruFinesse => {
                fail_check!(self);
                let turns = 10 + self.rng.rn2(self.actor.skill(Skill::Invocations) as u32 + 10) as i32;
                self.actor.extend_duration(DurationKind::Finesse, turns);
                self.say("Your hands get new energy.");
                Outcome::Success
            }

            A::MakhlebMinorDestruction => self.destruction(target, 1),
            A::MakhlebMajorDestruction => self.destruction(target, 3),
            A::MakhlebLesserServant => self.summon_allies("lesser servant of Makhleb", 1, "A servant of Makhleb appears!"),
            A::MakhlebGreaterServant => self.summon_allies("greater servant of Makhleb", 1, "A greater servant of Makhleb appears!"),

            A::SifMunaChannelEnergy => {
                fail_check!(self);
                let gain = 1 + self.rng.rn2(self.actor.skill(Skill::Invocations) as u32 / 4 + 3) as i32;
                self.actor.restore_mp(gain);
                self.say("You channel some magical energy.");
                Outcome::Success
            }

            A::SifMunaForgetSpell => {
                fail_check!(self);
                self.actor.spells_known = self.actor.spells_known.saturating_sub(1);
                self.say("You forget a spell.");
                Outcome::Success
            }

            A::TrogBurnSpellbooks => {
                if self.world.spellbooks_in_view(self.actor.position).is_empty() {
                    self.say("You cannot see any spellbooks within your line of sight.");
                    return Outcome::Abort;
                }
                fail_check!(self);
                for cell in self.world.burn_spellbooks(self.actor.position) {
                    self.world.place_cloud(cell, CloudKind::Fire);
                }
                self.say("The spellbooks burst into flames!");
                Outcome::Success
            }

            A::TrogsHand => {
                fail_check!(self);
                let turns = 10 + self.rng.rn2(10) as i32;
                self.actor.extend_duration(DurationKind::Regeneration, turns);
                self.say("You feel the hand of Trog upon you.");
                Outcome::Success
            }

            A::TrogBrothersInArms => self.summon_allies("berserker", 1, "A berserker joins you in battle!"),

            A::ElyvilonLifesaving => {
                fail_check!(self);
                let turns = 9 + self.rng.rn2(self.actor.piety as u32 / 20 + 1) as i32;
                self.actor.set_duration(DurationKind::Lifesaving, turns);
                self.say("You beseech Elyvilon to protect your life.");
                Outcome::Success
            }

            A::ElyvilonLesserHealing => {
                fail_check!(self);
                let amount = 3 + self.rng.rn2(self.actor.skill(Skill::Invocations) as u32 + 4) as i32;
                self.actor.heal(amount);
                self.say("You feel better.");
                Outcome::Success
            }

            A::ElyvilonGreaterHealing => {
                fail_check!(self);
                let skill = self.actor.skill(Skill::Invocations) as u32;
                let amount = 10 + self.rng.dice(2, skill + 5) as i32;
                self.actor.heal(amount);
                self.say("You feel much better.");
                Outcome::Success
            }

            A::ElyvilonPurification => {
                fail_check!(self);
                for kind in [DurationKind::Poison, DurationKind::Slow, DurationKind::Weak] {
                    self.actor.set_duration(kind, 0);
                }
                self.actor.status.remove(StatusFlags::CONFUSED);
                self.actor.stats.restore();
                self.say("You feel purified!");
                Outcome::Success
            }

            A::ElyvilonDivineVigour => {
                fail_check!(self);
                let turns = 20 + self.actor.skill(Skill::Invocations);
                self.actor.set_duration(DurationKind::DivineVigour, turns);
                self.actor.heal(self.actor.hp_max / 5);
                self.actor.restore_mp(self.actor.mp_max / 5);
                self.say("Elyvilon grants you divine vigour.");
                Outcome::Success
            }

            A::LugonuAbyssExit => {
                fail_check!(self);
                self.world.set_in_abyss(false);
                self.say("You pull yourself out of the Abyss.");
                Outcome::Success
            }

            A::LugonuBanish => {
                let Some(path) = self.aimed_path(target) else {
                    return Outcome::Abort;
                };
                fail_check!(self);
                match self.first_monster(&path) {
                    Some((cell, name)) => {
                        self.world.banish_monster(cell);
                        self.say(format!("The {name} is sucked into the Abyss!"));
                    }
                    None => self.say("The bolt of banishment dissipates harmlessly."),
                }
                Outcome::Success
            }

            A::LugonuCorrupt => {
                fail_check!(self);
                self.world.corrupt_level();
                self.say("The world around you begins to warp!");
                Outcome::Success
            }

            A::LugonuAbyssEnter => {
                fail_check!(self);
                self.world.set_in_abyss(true);
                self.say("You enter the Abyss!");
                Outcome::Success
            }

            A::NemelexTripleDraw => self.deal_cards("You draw three cards and pick one."),
            A::NemelexDealFour => self.deal_cards("You deal four cards around you."),
            A::NemelexStackFive => self.deal_cards("You stack five cards on your deck."),

            A::BeoghSmiting => {
                let Some(aim) = target else {
                    return Outcome::Abort;
                };
                let Some(name) = self.monster_name(aim) else {
                    return Outcome::Abort;
                };
                fail_check!(self);
                self.say(format!("You smite the {name}!"));
                let sides = 4 + self.actor.skill(Skill::Invocations) as u32;
                let dmg = self.rng.dice(2, sides) as i32;
                self.hit(aim, dmg);
                Outcome::Success
            }

            A::CheibriadosTimeBend => {
                fail_check!(self);
                self.say("The flow of time bends around you.");
                Outcome::Success
            }

            A::CheibriadosDistortion => {
                fail_check!(self);
                self.say("You warp the flow of time around you!");
                Outcome::Success
            }

            A::CheibriadosSlouch => {
                fail_check!(self);
                self.say("You can feel time thicken for a moment.");
                let sides = 2 + self.actor.skill(Skill::Invocations) as u32 / 2;
                for cell in self.hostiles_in_view() {
                    let dmg = self.rng.dice(1, sides) as i32;
                    self.hit(cell, dmg);
                }
                Outcome::Success
            }

            A::CheibriadosTimeStep => {
                fail_check!(self);
                let turns = 3 + self.actor.piety / 50;
                self.actor.set_duration(DurationKind::TimeStep, turns);
                self.say("You step out of the flow of time.");
                Outcome::Success
            }

            A::AshenzariScrying => {
                fail_check!(self);
                let turns = 100 + self.actor.piety;
                self.actor.set_duration(DurationKind::Scrying, turns);
                self.say("You allow your mind to wander beyond the walls.");
                Outcome::Success
            }

            A::AshenzariTransferKnowledge => {
                fail_check!(self);
                self.actor.status.insert(StatusFlags::TRANSFERRING);
                self.say("You begin to transfer your knowledge.");
                Outcome::Success
            }

            A::AshenzariEndTransfer => {
                fail_check!(self);
                self.actor.status.remove(StatusFlags::TRANSFERRING);
                self.say("You end the transfer of knowledge.");
                Outcome::Success
            }

            A::RuDrawOutPower => {
                fail_check!(self);
                self.actor.hp = self.actor.effective_hp_max();
                self.actor.mp = self.actor.mp_max;
                self.say("You feel power flowing into your body.");
                Outcome::Success
            }

            A::RuPowerLeap => self.power_leap(target),

            A::RuApocalypse => {
                fail_check!(self);
                self.say("You reveal the great annihilating truth to your foes!");
                let sides = 6 + self.actor.skill(Skill::Invocations) as u32;
                for cell in self.hostiles_in_view() {
                    let dmg = self.rng.dice(2, sides) as i32;
                    self.hit(cell, dmg);
                }
                Outcome::Success
            }

            A::RuSacrificePurity => self.sacrifice(20, "You offer up the purity of your body."),
            A::RuSacrificeWords => {
                let outcome = self.sacrifice(15, "You offer up your voice.");
                if outcome == Outcome::Success {
                    self.actor.status.insert(StatusFlags::MUTE);
                }
                outcome
            }
            A::RuSacrificeDrink => self.sacrifice(10, "You offer up your ability to drink."),
            A::RuSacrificeEssence => self.sacrifice(25, "You offer up your magical essence."),
            A::RuSacrificeHealth => {
                let outcome = self.sacrifice(30, "You offer up your vitality.");
                if outcome == Outcome::Success {
                    self.actor.hp_max -= self.actor.hp_max / 10;
                    self.actor.hp = self.actor.hp.min(self.actor.effective_hp_max());
                }
                outcome
            }

            A::RuRejectSacrifices => {
                fail_check!(self);
                self.actor.available_sacrifices.clear();
                self.say("You reject Ru's offer. Ru will ask again later.");
                Outcome::Success
            }

            A::GozagPotionPetition => {
                fail_check!(self);
                let amount = self.actor.effective_hp_max() / 4;
                self.actor.heal(amount);
                self.say("Gozag's merchants deliver a fine potion.");
                Outcome::Success
            }

            A::GozagCallMerchant => {
                fail_check!(self);
                self.say("A merchant sets up shop nearby.");
                Outcome::Success
            }

            A::GozagBribeBranch => {
                fail_check!(self);
                self.say("You bribe the inhabitants of this branch.");
                Outcome::Success
            }

            A::QazlalUpheaval => self.upheaval(target),

            A::QazlalElementalForce => self.summon_allies("elemental", 2, "The elements answer your call!"),

            A::QazlalDisasterArea => {
                fail_check!(self);
                self.say("Nature churns violently around you!");
                let sides = 5 + self.actor.skill(Skill::Invocations) as u32;
                for cell in self.hostiles_in_view() {
                    let dmg = self.rng.dice(2, sides) as i32;
                    self.hit(cell, dmg);
                    self.world.place_cloud(cell, CloudKind::Steam);
                }
                Outcome::Success
            }

            A::DithmenosShadowStep => self.shadow_step(target),

            A::DithmenosShadowForm => {
                fail_check!(self);
                let turns = 10 + self.actor.skill(Skill::Invocations);
                self.actor.form = Form::Shadow;
                self.actor.set_duration(DurationKind::Transformation, turns);
                self.say("You feel less conspicuous.");
                Outcome::Success
            }

            A::StopRecall => {
                fail_check!(self);
                self.actor.recall_list.clear();
                self.say("You stop recalling your allies.");
                Outcome::Success
            }

            A::RenounceReligion => {
                let question = format!(
                    "Are you sure you want to abandon {}?",
                    self.actor.god.name()
                );
                if !self.prompt.confirm(&question) {
                    self.say("Okay, then.");
                    return Outcome::Abort;
                }
                fail_check!(self);
                let old = self.actor.god;
                self.actor.god = crate::actor::God::NoGod;
                self.actor.piety = 0;
                set_god_ability_slots(self.actor);
                self.say(format!("You have lost your religion! {} is displeased.", old.name()));
                Outcome::Success
            }

            A::ConvertToBeogh => {
                if !self.prompt.confirm("Really convert to the worship of Beogh?") {
                    self.say("Okay, then.");
                    return Outcome::Abort;
                }
                fail_check!(self);
                self.actor.god = crate::actor::God::Beogh;
                self.actor.piety = 15;
                self.actor.status.remove(StatusFlags::BEOGH_OFFERED);
                set_god_ability_slots(self.actor);
                self.say("You are now a follower of Beogh.");
                Outcome::Success
            }

            A::WizardRestoration => {
                fail_check!(self);
                self.actor.hp_max_drain = 0;
                self.actor.hp = self.actor.hp_max;
                self.actor.mp = self.actor.mp_max;
                self.actor.stats.restore();
                for kind in [DurationKind::Poison, DurationKind::Slow, DurationKind::Weak] {
                    self.actor.set_duration(kind, 0);
                }
                self.actor.status.remove(StatusFlags::CONFUSED | StatusFlags::EXHAUSTED);
                self.say("Restored.");
                Outcome::Success
            }
        }
    }

    /// Cooldowns and exhaustion shared by every successful use of a flagged ability.
    fn after_success(&mut self) {
        let def = self.resolved.def();
        if def.has(AbilityFlags::BREATH) {
            let level = self.actor.experience_level;
            let turns = 3
                + self.rng.rn2(10) as i32
                + self.rng.rn2((30 - level).max(1) as u32) as i32;
            self.actor.extend_duration(DurationKind::BreathWeapon, turns);
        }
        if def.has(AbilityFlags::EXHAUSTION) {
            self.actor.status.insert(StatusFlags::EXHAUSTED);
        }
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn monster_name(&self, pos: Position) -> Option<String> {
        self.world.monster_at(pos).map(|m| m.name.clone())
    }

    fn hostiles_in_view(&self) -> Vec<Position> {
        self.world
            .visible_monsters(self.actor.position)
            .into_iter()
            .filter(|&p| self.world.monster_at(p).is_some_and(|m| !m.friendly))
            .collect()
    }

    /// Damage whatever stands at `pos`, reporting a kill.
    fn hit(&mut self, pos: Position, amount: i32) {
        let Some(name) = self.monster_name(pos) else {
            return;
        };
        trace!(%name, amount, "monster hit");
        if self.world.damage_monster(pos, amount) {
            self.say(format!("The {name} is killed!"));
        } else {
            self.say(format!("The {name} is hit."));
        }
    }

    /// Bolt path toward `target`, or `None` when there is nothing to aim at.
    fn aimed_path(&self, target: Option<Position>) -> Option<Vec<Position>> {
        let aim = target?;
        let range = effective_range(&self.resolved, self.actor).unwrap_or(LOS_RADIUS);
        let path = beam_path(&*self.world, self.actor.position, aim, range);
        (!path.is_empty()).then_some(path)
    }

    fn first_monster(&self, path: &[Position]) -> Option<(Position, String)> {
        path.iter()
            .find_map(|&p| self.monster_name(p).map(|name| (p, name)))
    }

    fn has_room(&self) -> bool {
        let here = self.actor.position;
        here.adjacent()
            .chain(here.within(2))
            .any(|p| p != here && self.world.is_free(p))
    }

    // ========================================================================
    // Effect families
    // ========================================================================

    fn breathe(&mut self, target: Option<Position>, message: &str, cloud: Option<CloudKind>) -> Outcome {
        let Some(path) = self.aimed_path(target) else {
            return Outcome::Abort;
        };
        fail_check!(self);
        self.say(message);
        let power = beam_power(self.resolved.id(), self.actor).max(1);
        for &cell in &path {
            let dmg = self.rng.dice(2, (4 + power / 2) as u32) as i32;
            self.hit(cell, dmg);
        }
        if let Some(kind) = cloud
            && let Some(&end) = path
                .iter()
                .rev()
                .find(|p| !self.world.feature_at(**p).is_solid())
        {
            self.world.place_cloud(end, kind);
        }
        Outcome::Success
    }

    fn hellfire(&mut self, target: Option<Position>) -> Outcome {
        let Some(path) = self.aimed_path(target) else {
            return Outcome::Abort;
        };
        fail_check!(self);
        self.say("You hurl a burst of hellfire!");
        let open: Vec<Position> = path
            .iter()
            .copied()
            .take_while(|p| !self.world.feature_at(*p).is_solid())
            .collect();
        let center = open
            .iter()
            .copied()
            .find(|p| self.world.monster_at(*p).is_some())
            .or_else(|| open.last().copied())
            .unwrap_or(self.actor.position);
        let sides = (3 + beam_power(AbilityId::Hellfire, self.actor) / 3) as u32;
        for cell in center.within(1).collect::<Vec<_>>() {
            let dmg = self.rng.dice(3, sides) as i32;
            self.hit(cell, dmg);
        }
        Outcome::Success
    }

    fn destruction(&mut self, target: Option<Position>, dice: u32) -> Outcome {
        let Some(path) = self.aimed_path(target) else {
            return Outcome::Abort;
        };
        fail_check!(self);
        let sides = (beam_power(self.resolved.id(), self.actor) / 4 + 2) as u32;
        match self.first_monster(&path) {
            Some((cell, _)) => {
                let dmg = self.rng.dice(dice, sides) as i32;
                self.hit(cell, dmg);
            }
            None => self.say("The destructive energy dissipates."),
        }
        Outcome::Success
    }

    fn translocate(&mut self, min_dist: i32, message: &str) -> Outcome {
        let here = self.actor.position;
        let Some(dest) = self.world.random_free_cell(here, LOS_RADIUS, min_dist, self.rng) else {
            self.say("There is nowhere to go.");
            return Outcome::Abort;
        };
        fail_check!(self);
        self.actor.position = dest;
        self.say(message);
        Outcome::Success
    }

    fn take_flight(&mut self, turns: i32) -> Outcome {
        fail_check!(self);
        self.actor.status.insert(StatusFlags::FLYING);
        self.actor.extend_duration(DurationKind::Flight, turns);
        self.say("You fly up into the air.");
        Outcome::Success
    }

    fn recite(&mut self) -> Outcome {
        if self.fail {
            self.say("You lose track of your recitation.");
            return Outcome::Fail;
        }
        self.say("You clear your throat and recite Zin's Axioms of Law.");
        for cell in self.hostiles_in_view() {
            let Some(monster) = self.world.monster_at(cell) else {
                continue;
            };
            if monster.mindless {
                continue;
            }
            let name = monster.name.clone();
            if self.rng.one_in(2) && self.world.befriend_monster(cell) {
                self.say(format!("The {name} is swayed by your words."));
            }
        }
        Outcome::Success
    }

    fn animate(&mut self, all: bool) -> Outcome {
        let limit = if all { usize::MAX } else { 1 };
        let here = self.actor.position;
        if self.world.corpses_near(here, LOS_RADIUS) == 0 {
            return Outcome::Abort;
        }
        fail_check!(self);
        let mut raised = 0;
        for corpse in self.world.take_corpses(here, LOS_RADIUS, limit) {
            if self.world.summon("zombie", corpse, true).is_some() {
                raised += 1;
            }
        }
        match raised {
            0 => self.say("The remains crumble to dust."),
            1 => self.say("The dead are doing your bidding."),
            n => self.say(format!("{n} corpses rise to do your bidding.")),
        }
        Outcome::Success
    }

    fn recall(&mut self, wanted: impl Fn(&str) -> bool) -> Outcome {
        fail_check!(self);
        let ids: Vec<u32> = self
            .world
            .monsters()
            .into_iter()
            .filter(|m| m.friendly && wanted(&m.name))
            .map(|m| m.id)
            .collect();
        if ids.is_empty() {
            self.say("Nothing appears to have answered your call.");
        } else {
            self.say("You recall your followers.");
        }
        self.actor.recall_list = ids;
        Outcome::Success
    }

    fn summon_allies(&mut self, name: &str, count: usize, message: &str) -> Outcome {
        if !self.has_room() {
            self.say("There is no room for anything to appear.");
            return Outcome::Abort;
        }
        fail_check!(self);
        let here = self.actor.position;
        for _ in 0..count {
            if self.world.summon(name, here, true).is_none() {
                break;
            }
        }
        self.say(message);
        Outcome::Success
    }

    fn deal_cards(&mut self, message: &str) -> Outcome {
        fail_check!(self);
        let dealt = card_cost(self.resolved.id()).min(self.actor.deck_cards);
        self.say(message);
        if dealt < card_cost(self.resolved.id()) {
            self.say(format!("Your deck only had {dealt} cards left."));
        }
        Outcome::Success
    }

    fn power_leap(&mut self, target: Option<Position>) -> Outcome {
        let Some(aim) = target else {
            return Outcome::Abort;
        };
        if !self.world.is_free(aim) {
            return Outcome::Abort;
        }
        if self.fail {
            self.say("You stumble on the take-off.");
            return Outcome::Fail;
        }
        self.actor.position = aim;
        self.say("You leap through the air and land with a crash!");
        let sides = (4 + self.actor.experience_level / 2) as u32;
        for cell in aim.adjacent().collect::<Vec<_>>() {
            if self.world.monster_at(cell).is_some_and(|m| !m.friendly) {
                let dmg = self.rng.dice(1, sides) as i32;
                self.hit(cell, dmg);
            }
        }
        Outcome::Success
    }

    fn sacrifice(&mut self, piety: i32, message: &str) -> Outcome {
        fail_check!(self);
        let id = self.resolved.id();
        self.actor.available_sacrifices.retain(|&s| s != id);
        self.actor.ability_letters.clear(id);
        self.actor.gain_piety(piety);
        self.say(message);
        Outcome::Success
    }

    fn upheaval(&mut self, target: Option<Position>) -> Outcome {
        let Some(aim) = target else {
            return Outcome::Abort;
        };
        let Some(targeter) = find_targeter(&self.resolved, self.actor, &*self.world) else {
            return Outcome::Abort;
        };
        if !targeter.is_valid_aim(aim) {
            return Outcome::Abort;
        }
        let cells = targeter.affected(&*self.world, aim);
        let certain = targeter.certainly_affected(&*self.world, aim);
        let outer_chance = upheaval_outer_chance(self.actor);
        fail_check!(self);
        self.say("The ground shakes violently!");
        let sides = 4 + self.actor.skill(Skill::Invocations) as u32;
        for cell in cells {
            if !certain.contains(&cell) && self.rng.rn2(100) as i32 >= outer_chance {
                continue;
            }
            if self.world.monster_at(cell).is_some() {
                let dmg = self.rng.dice(2, sides) as i32;
                self.hit(cell, dmg);
            }
        }
        Outcome::Success
    }

    fn shadow_step(&mut self, target: Option<Position>) -> Outcome {
        let Some(aim) = target else {
            return Outcome::Abort;
        };
        let Some(name) = self.monster_name(aim) else {
            return Outcome::Abort;
        };
        let here = self.actor.position;
        let landing = aim
            .adjacent()
            .filter(|&p| p == here || self.world.is_free(p))
            .min_by_key(|p| p.distance(here));
        let Some(landing) = landing else {
            return Outcome::Abort;
        };
        fail_check!(self);
        self.actor.position = landing;
        self.say(format!("You step into the shadow of the {name}."));
        Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::God;
    use crate::prompt::ScriptedPrompt;
    use crate::world::SandboxWorld;

    fn run(
        id: AbilityId,
        target: Option<Position>,
        fail: bool,
        actor: &mut ActorContext,
        world: &mut SandboxWorld,
    ) -> EffectResult {
        let resolved = ResolvedAbility::resolve(id, actor).unwrap();
        let mut rng = GameRng::new(17);
        let mut prompt = ScriptedPrompt::new();
        do_ability(&resolved, target, fail, actor, world, &mut rng, &mut prompt)
    }

    fn actor_at(x: i32, y: i32) -> ActorContext {
        let mut actor = ActorContext::default();
        actor.position = Position::new(x, y);
        actor.experience_level = 10;
        actor
    }

    #[test]
    fn test_fail_short_circuit_leaves_state() {
        let mut actor = actor_at(2, 2);
        let mut world = SandboxWorld::open(5, 5);
        let result = run(AbilityId::Fly, None, true, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Fail);
        assert!(!actor.is_flying());
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_fly_sets_flight() {
        let mut actor = actor_at(2, 2);
        let mut world = SandboxWorld::open(5, 5);
        let result = run(AbilityId::Fly, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert!(actor.has(StatusFlags::FLYING));
        assert_eq!(actor.duration(DurationKind::Flight), 35);
    }

    #[test]
    fn test_breath_sets_cooldown_and_hits() {
        let mut actor = actor_at(0, 2);
        actor.species = crate::actor::Species::RedDraconian;
        let mut world = SandboxWorld::open(8, 5);
        world.add_monster("goblin", Position::new(3, 2), 1);
        let result = run(AbilityId::BreatheFire, Some(Position::new(5, 2)), false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert!(world.monsters.is_empty());
        assert!(result.messages.iter().any(|m| m == "The goblin is killed!"));
        assert!(actor.duration(DurationKind::BreathWeapon) >= 3);
        assert_eq!(world.cloud_at(Position::new(5, 2)), Some(CloudKind::Fire));
    }

    #[test]
    fn test_aimed_without_target_aborts() {
        let mut actor = actor_at(0, 0);
        let mut world = SandboxWorld::open(5, 5);
        let result = run(AbilityId::BreatheFrost, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Abort);
        assert_eq!(actor.duration(DurationKind::BreathWeapon), 0);
    }

    #[test]
    fn test_recite_fails_with_own_message() {
        let mut actor = actor_at(0, 0);
        actor.god = God::Zin;
        let mut world = SandboxWorld::open(5, 5);
        world.add_monster("orc", Position::new(2, 2), 5);
        let result = run(AbilityId::ZinRecite, None, true, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.messages, vec!["You lose track of your recitation.".to_string()]);
    }

    #[test]
    fn test_dig_opens_wall() {
        let mut actor = actor_at(0, 0);
        let mut world = SandboxWorld::from_rows(&[".#", ".."]);
        let result = run(AbilityId::Dig, Some(Position::new(1, 0)), false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(world.feature_at(Position::new(1, 0)), Feature::Floor);

        let result = run(AbilityId::Dig, Some(Position::new(1, 1)), false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Abort);
    }

    #[test]
    fn test_animate_remains_or_dead_by_piety() {
        let mut actor = actor_at(3, 3);
        actor.god = God::Yredelemnul;
        actor.piety = 30;
        let mut world = SandboxWorld::open(7, 7);
        world.corpses = vec![Position::new(1, 1), Position::new(5, 5)];
        let result = run(AbilityId::YredAnimateRemainsOrDead, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(world.monsters.len(), 1);
        assert_eq!(world.corpses.len(), 1);

        actor.piety = 100;
        world.corpses.push(Position::new(0, 6));
        run(AbilityId::YredAnimateRemainsOrDead, None, false, &mut actor, &mut world);
        assert_eq!(world.monsters.len(), 3);
        assert!(world.corpses.is_empty());
        assert!(world.monsters.iter().all(|m| m.friendly));
    }

    #[test]
    fn test_summon_without_room_aborts() {
        let mut actor = actor_at(1, 1);
        actor.god = God::Trog;
        let mut world = SandboxWorld::from_rows(&["###", "#.#", "###"]);
        let result = run(AbilityId::TrogBrothersInArms, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Abort);
        assert!(world.monsters.is_empty());
    }

    #[test]
    fn test_burn_spellbooks() {
        let mut actor = actor_at(0, 0);
        actor.god = God::Trog;
        let mut world = SandboxWorld::open(4, 4);
        let result = run(AbilityId::TrogBurnSpellbooks, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Abort);

        world.spellbooks = vec![Position::new(2, 2)];
        let result = run(AbilityId::TrogBurnSpellbooks, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert!(world.spellbooks.is_empty());
        assert_eq!(world.cloud_at(Position::new(2, 2)), Some(CloudKind::Fire));
    }

    #[test]
    fn test_power_leap_exhausts() {
        let mut actor = actor_at(0, 0);
        actor.god = God::Ru;
        let mut world = SandboxWorld::open(6, 6);
        let result = run(AbilityId::RuPowerLeap, Some(Position::new(2, 2)), false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(actor.position, Position::new(2, 2));
        assert!(actor.has(StatusFlags::EXHAUSTED));

        let mut actor = actor_at(0, 0);
        let result = run(AbilityId::RuPowerLeap, Some(Position::new(2, 2)), true, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.messages, vec!["You stumble on the take-off.".to_string()]);
        assert!(!actor.has(StatusFlags::EXHAUSTED));
    }

    #[test]
    fn test_sacrifice_removes_offer() {
        let mut actor = actor_at(0, 0);
        actor.god = God::Ru;
        actor.piety = 10;
        actor.available_sacrifices = vec![AbilityId::RuSacrificeWords, AbilityId::RuSacrificeDrink];
        let mut world = SandboxWorld::open(3, 3);
        let result = run(AbilityId::RuSacrificeWords, None, false, &mut actor, &mut world);
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(actor.available_sacrifices, vec![AbilityId::RuSacrificeDrink]);
        assert_eq!(actor.piety, 25);
        assert!(actor.has(StatusFlags::MUTE));
    }

    #[test]
    fn test_renounce_needs_confirmation() {
        let mut actor = actor_at(0, 0);
        actor.god = God::Okawaru;
        actor.piety = 80;
        let mut world = SandboxWorld::open(3, 3);
        let resolved = ResolvedAbility::resolve(AbilityId::RenounceReligion, &actor).unwrap();
        let mut rng = GameRng::new(1);

        let mut prompt = ScriptedPrompt::new().with_answer(false);
        let result = do_ability(&resolved, None, false, &mut actor, &mut world, &mut rng, &mut prompt);
        assert_eq!(result.outcome, Outcome::Abort);
        assert_eq!(actor.god, God::Okawaru);

        let mut prompt = ScriptedPrompt::new().with_answer(true);
        let result = do_ability(&resolved, None, false, &mut actor, &mut world, &mut rng, &mut prompt);
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(actor.god, God::NoGod);
        assert_eq!(actor.piety, 0);
    }

    #[test]
    fn test_recall_collects_allies() {
        let mut actor = actor_at(0, 0);
        actor.god = God::Beogh;
        let mut world = SandboxWorld::open(5, 5);
        world.add_monster("orc warrior", Position::new(1, 1), 10);
        world.add_monster("goblin", Position::new(2, 1), 10);
        world.monsters[0].friendly = true;
        world.monsters[1].friendly = true;
        run(AbilityId::BeoghRecallOrcishFollowers, None, false, &mut actor, &mut world);
        assert_eq!(actor.recall_list, vec![world.monsters[0].id]);
    }
}
