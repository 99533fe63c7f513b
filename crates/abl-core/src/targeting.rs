//! Ability targeting
//!
//! A [`Targeter`] describes the cells an ability may be aimed at and the
//! cells it would affect. The same value drives the preview shown to the
//! player and the validation of the aim actually chosen, so the two cannot
//! disagree.

use serde::{Deserialize, Serialize};

use crate::ability::{AbilityFlags, AbilityId, ResolvedAbility};
use crate::actor::{ActorContext, DurationKind, Form, Mutation, Skill};
use crate::world::{LOS_RADIUS, Position, World, line_between};

// ============================================================================
// Targeter shapes
// ============================================================================

/// Spatial footprint of an ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargeterShape {
    /// Everything within `radius` of the actor
    Radius { radius: i32 },
    /// An aimed point within `range`. Cells within `sub_radius` of it are
    /// always affected, the rest of `radius` only by chance
    MaybeRadius {
        range: i32,
        radius: i32,
        sub_radius: i32,
    },
    /// Everything the actor can see
    LineOfSight,
    /// An explicit list of legal aim points
    MultiPosition,
    /// A bolt from the actor, stopped by solid terrain
    Beam { range: i32, power: i32 },
    /// Adjacent diggable walls
    WallSet,
}

impl TargeterShape {
    /// Whether the shape needs an aim point.
    pub const fn is_aimed(&self) -> bool {
        match self {
            TargeterShape::Radius { .. } | TargeterShape::LineOfSight => false,
            TargeterShape::MaybeRadius { .. }
            | TargeterShape::MultiPosition
            | TargeterShape::Beam { .. }
            | TargeterShape::WallSet => true,
        }
    }
}

/// A resolved targeter for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targeter {
    pub origin: Position,
    pub shape: TargeterShape,
    /// Legal aim points for aimed shapes, the affected area otherwise
    cells: Vec<Position>,
}

impl Targeter {
    pub fn cells(&self) -> &[Position] {
        &self.cells
    }

    /// Whether `aim` may be chosen.
    pub fn is_valid_aim(&self, aim: Position) -> bool {
        if self.shape.is_aimed() {
            self.cells.contains(&aim)
        } else {
            aim == self.origin
        }
    }

    /// Cells that may be affected when aimed at `aim`.
    pub fn affected(&self, world: &dyn World, aim: Position) -> Vec<Position> {
        if !self.is_valid_aim(aim) {
            return Vec::new();
        }
        match self.shape {
            TargeterShape::Radius { .. } | TargeterShape::LineOfSight => self.cells.clone(),
            TargeterShape::MaybeRadius { radius, .. } => aim
                .within(radius)
                .filter(|&p| world.in_bounds(p) && world.see_cell(aim, p))
                .collect(),
            TargeterShape::Beam { range, .. } => beam_path(world, self.origin, aim, range),
            TargeterShape::MultiPosition | TargeterShape::WallSet => vec![aim],
        }
    }

    /// The part of [`Targeter::affected`] that is never left to chance.
    pub fn certainly_affected(&self, world: &dyn World, aim: Position) -> Vec<Position> {
        let cells = self.affected(world, aim);
        match self.shape {
            TargeterShape::MaybeRadius { sub_radius, .. } => cells
                .into_iter()
                .filter(|&p| aim.distance(p) <= sub_radius)
                .collect(),
            _ => cells,
        }
    }
}

/// Upheaval strength, six per level of Invocations.
pub(crate) fn upheaval_power(actor: &ActorContext) -> i32 {
    actor.skill(Skill::Invocations) * 6
}

/// Upheaval reach: one cell, plus one per full 100 power.
pub(crate) fn upheaval_radius(actor: &ActorContext) -> i32 {
    upheaval_power(actor) / 100 + 1
}

/// Percent chance that a cell beyond the sub-radius is struck.
pub(crate) fn upheaval_outer_chance(actor: &ActorContext) -> i32 {
    let power = upheaval_power(actor);
    if upheaval_radius(actor) > 1 {
        power - 100
    } else {
        power
    }
}

/// Cells a bolt passes through, up to and including the first solid cell.
pub fn beam_path(world: &dyn World, from: Position, to: Position, range: i32) -> Vec<Position> {
    let mut path = Vec::new();
    for cell in line_between(from, to) {
        if from.distance(cell) > range || !world.in_bounds(cell) {
            break;
        }
        path.push(cell);
        if world.feature_at(cell).is_solid() {
            break;
        }
    }
    path
}

// ============================================================================
// Per-ability targeter table
// ============================================================================

/// How an ability's targeter is built; positions are filled in per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargeterKind {
    Radius(i32),
    /// Radius grows with power
    MaybeRadius,
    LineOfSight,
    Beam,
    /// Visible monsters within range
    Monsters,
    /// Visible monsters with a free cell beside them
    ShadowStep,
    /// Free visible cells within range
    FreeCells,
    WallSet,
}

const fn targeter_kind(id: AbilityId) -> Option<TargeterKind> {
    use TargeterKind as K;
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
        | AbilityId::SpitAcid
        | AbilityId::Hellfire
        | AbilityId::MakhlebMinorDestruction
        | AbilityId::MakhlebMajorDestruction
        | AbilityId::LugonuBanish => Some(K::Beam),

        AbilityId::Dig => Some(K::WallSet),

        AbilityId::ZinImprison | AbilityId::YredEnslaveSoul | AbilityId::BeoghSmiting => {
            Some(K::Monsters)
        }
        AbilityId::DithmenosShadowStep => Some(K::ShadowStep),
        AbilityId::RuPowerLeap => Some(K::FreeCells),
        AbilityId::QazlalUpheaval => Some(K::MaybeRadius),

        AbilityId::ZinSanctuary => Some(K::Radius(4)),
        AbilityId::TsoCleansingFlame => Some(K::Radius(2)),
        AbilityId::EvokeFog => Some(K::Radius(1)),

        AbilityId::ZinRecite
        | AbilityId::YredDrainLife
        | AbilityId::CheibriadosSlouch
        | AbilityId::QazlalElementalForce
        | AbilityId::QazlalDisasterArea
        | AbilityId::RuApocalypse => Some(K::LineOfSight),

        AbilityId::None
        | AbilityId::Blink
        | AbilityId::TranBat
        | AbilityId::Fly
        | AbilityId::StopFlying
        | AbilityId::DelayedFireball
        | AbilityId::StopSinging
        | AbilityId::ShaftSelf
        | AbilityId::EvokeTeleportation
        | AbilityId::EvokeBlink
        | AbilityId::EvokeBerserk
        | AbilityId::EvokeTurnInvisible
        | AbilityId::EvokeTurnVisible
        | AbilityId::EvokeFlight
        | AbilityId::EndTransformation
        | AbilityId::ZinVitalisation
        | AbilityId::ZinCureAllMutations
        | AbilityId::TsoDivineShield
        | AbilityId::TsoSummonDivineWarrior
        | AbilityId::YredInjuryMirror
        | AbilityId::YredAnimateRemains
        | AbilityId::YredRecallUndeadSlaves
        | AbilityId::YredAnimateDead
        | AbilityId::YredDarkBargain
        | AbilityId::YredAnimateRemainsOrDead
        | AbilityId::OkawaruHeroism
        | AbilityId::OkawaruFinesse
        | AbilityId::MakhlebLesserServant
        | AbilityId::MakhlebGreaterServant
        | AbilityId::SifMunaChannelEnergy
        | AbilityId::SifMunaForgetSpell
        | AbilityId::TrogBurnSpellbooks
        | AbilityId::TrogBerserk
        | AbilityId::TrogsHand
        | AbilityId::TrogBrothersInArms
        | AbilityId::ElyvilonLifesaving
        | AbilityId::ElyvilonLesserHealing
        | AbilityId::ElyvilonPurification
        | AbilityId::ElyvilonGreaterHealing
        | AbilityId::ElyvilonDivineVigour
        | AbilityId::LugonuAbyssExit
        | AbilityId::LugonuBendSpace
        | AbilityId::LugonuCorrupt
        | AbilityId::LugonuAbyssEnter
        | AbilityId::NemelexTripleDraw
        | AbilityId::NemelexDealFour
        | AbilityId::NemelexStackFive
        | AbilityId::BeoghRecallOrcishFollowers
        | AbilityId::CheibriadosTimeBend
        | AbilityId::CheibriadosDistortion
        | AbilityId::CheibriadosTimeStep
        | AbilityId::AshenzariScrying
        | AbilityId::AshenzariTransferKnowledge
        | AbilityId::AshenzariEndTransfer
        | AbilityId::RuDrawOutPower
        | AbilityId::RuSacrificePurity
        | AbilityId::RuSacrificeWords
        | AbilityId::RuSacrificeDrink
        | AbilityId::RuSacrificeEssence
        | AbilityId::RuSacrificeHealth
        | AbilityId::RuRejectSacrifices
        | AbilityId::GozagPotionPetition
        | AbilityId::GozagCallMerchant
        | AbilityId::GozagBribeBranch
        | AbilityId::DithmenosShadowForm
        | AbilityId::StopRecall
        | AbilityId::RenounceReligion
        | AbilityId::ConvertToBeogh
        | AbilityId::WizardRestoration => None,
    }
}

/// Whether `id` has a spatial targeter.
pub const fn has_targeter(id: AbilityId) -> bool {
    targeter_kind(id).is_some()
}

/// Range the ability reaches for this actor.
///
/// Power Leap grows with exhilaration; everything else uses its catalog range.
pub fn effective_range(resolved: &ResolvedAbility, actor: &ActorContext) -> Option<i32> {
    match resolved.id() {
        AbilityId::RuPowerLeap => Some(
            LOS_RADIUS.min(2 + actor.duration(DurationKind::Exhilaration) / 10),
        ),
        _ => resolved.def().range,
    }
}

/// Bolt strength for beam abilities.
pub(crate) fn beam_power(id: AbilityId, actor: &ActorContext) -> i32 {
    let level = actor.experience_level;
    let dragon = if actor.form == Form::Dragon { 12 } else { 0 };
    match id {
        AbilityId::SpitPoison => level + 5 * actor.mutation_level(Mutation::SpitPoison),
        AbilityId::BreatheFire => level + 4 * actor.mutation_level(Mutation::BreatheFlames) + dragon,
        AbilityId::Hellfire => level * 3,
        AbilityId::MakhlebMinorDestruction
        | AbilityId::MakhlebMajorDestruction
        | AbilityId::LugonuBanish => 3 + actor.skill(Skill::Invocations) * 6,
        _ => level + dragon,
    }
}

/// Build the targeter for an attempt, or `None` for self-only abilities.
pub fn find_targeter(
    resolved: &ResolvedAbility,
    actor: &ActorContext,
    world: &dyn World,
) -> Option<Targeter> {
    let origin = actor.position;
    let range = effective_range(resolved, actor).unwrap_or(LOS_RADIUS);
    let visible_in_range = |p: Position| {
        p != origin && origin.distance(p) <= range && world.see_cell(origin, p)
    };

    let (shape, cells) = match targeter_kind(resolved.id())? {
        TargeterKind::Radius(radius) => (
            TargeterShape::Radius { radius },
            origin
                .within(radius)
                .filter(|&p| world.in_bounds(p) && world.see_cell(origin, p))
                .collect(),
        ),
        TargeterKind::LineOfSight => (
            TargeterShape::LineOfSight,
            origin
                .within(LOS_RADIUS)
                .filter(|&p| world.see_cell(origin, p))
                .collect(),
        ),
        TargeterKind::MaybeRadius => {
            let radius = upheaval_radius(actor);
            (
                TargeterShape::MaybeRadius {
                    range,
                    radius,
                    sub_radius: radius - 1,
                },
                origin.within(range).filter(|&p| visible_in_range(p)).collect(),
            )
        }
        TargeterKind::Beam => (
            TargeterShape::Beam {
                range,
                power: beam_power(resolved.id(), actor),
            },
            origin.within(range).filter(|&p| visible_in_range(p)).collect(),
        ),
        TargeterKind::Monsters => (
            TargeterShape::MultiPosition,
            world
                .visible_monsters(origin)
                .into_iter()
                .filter(|&p| visible_in_range(p))
                .collect(),
        ),
        TargeterKind::ShadowStep => (
            TargeterShape::MultiPosition,
            world
                .visible_monsters(origin)
                .into_iter()
                .filter(|&p| visible_in_range(p))
                .filter(|p| p.adjacent().any(|q| world.is_free(q)))
                .collect(),
        ),
        TargeterKind::FreeCells => (
            TargeterShape::MultiPosition,
            origin
                .within(range)
                .filter(|&p| visible_in_range(p) && world.is_free(p))
                .collect(),
        ),
        TargeterKind::WallSet => (
            TargeterShape::WallSet,
            origin
                .adjacent()
                .filter(|&p| world.in_bounds(p) && world.feature_at(p).is_diggable())
                .collect(),
        ),
    };

    Some(Targeter {
        origin,
        shape,
        cells,
    })
}

// ============================================================================
// Input request
// ============================================================================

/// Whether the player must give a direction or may pick any cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMode {
    Direction,
    Any,
}

/// What the input collector needs to ask the player for an aim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequest {
    pub range: i32,
    pub mode: TargetMode,
    /// A walkable path is required, not just line of sight
    pub needs_path: bool,
    pub not_self: bool,
}

/// Input request for abilities that are aimed, `None` otherwise.
pub fn target_request(resolved: &ResolvedAbility, actor: &ActorContext) -> Option<TargetRequest> {
    let def = resolved.def();
    let mode = if def.has(AbilityFlags::DIR_OR_TARGET) {
        TargetMode::Direction
    } else if def.has(AbilityFlags::TARGET) {
        TargetMode::Any
    } else {
        return None;
    };
    let needs_path = matches!(
        resolved.id(),
        AbilityId::RuPowerLeap | AbilityId::DithmenosShadowStep
    );
    Some(TargetRequest {
        range: effective_range(resolved, actor).unwrap_or(LOS_RADIUS),
        mode,
        needs_path,
        not_self: def.has(AbilityFlags::NOT_SELF),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Feature, SandboxWorld};
    use strum::IntoEnumIterator;

    fn resolve(id: AbilityId, actor: &ActorContext) -> ResolvedAbility {
        ResolvedAbility::resolve(id, actor).unwrap()
    }

    #[test]
    fn test_aimed_abilities_have_targeters() {
        for id in AbilityId::iter() {
            let def = crate::ability::ability_def(id);
            if def.has(AbilityFlags::TARGET) || def.has(AbilityFlags::DIR_OR_TARGET) {
                assert!(has_targeter(id), "{id:?}");
            }
        }
        assert!(!has_targeter(AbilityId::Fly));
    }

    #[test]
    fn test_breath_beam() {
        let mut world = SandboxWorld::open(15, 15);
        world.set_feature(Position::new(7, 3), Feature::Wall);
        let mut actor = ActorContext::default();
        actor.position = Position::new(7, 7);

        let targeter = find_targeter(&resolve(AbilityId::BreatheFire, &actor), &actor, &world)
            .unwrap();
        assert!(matches!(targeter.shape, TargeterShape::Beam { range: 6, .. }));
        assert!(targeter.is_valid_aim(Position::new(7, 3)));
        // Hidden behind the wall
        assert!(!targeter.is_valid_aim(Position::new(7, 2)));
        // Out of range
        assert!(!targeter.is_valid_aim(Position::new(13, 7)));
        assert!(targeter.is_valid_aim(Position::new(12, 7)));
        assert!(!targeter.is_valid_aim(actor.position));

        let path = targeter.affected(&world, Position::new(7, 3));
        assert_eq!(
            path,
            vec![
                Position::new(7, 6),
                Position::new(7, 5),
                Position::new(7, 4),
                Position::new(7, 3)
            ]
        );
    }

    #[test]
    fn test_sticky_flame_reaches_one_cell() {
        let world = SandboxWorld::open(9, 9);
        let mut actor = ActorContext::default();
        actor.position = Position::new(4, 4);
        let targeter =
            find_targeter(&resolve(AbilityId::BreatheStickyFlame, &actor), &actor, &world).unwrap();
        assert_eq!(targeter.cells().len(), 8);
    }

    #[test]
    fn test_power_leap_range_grows() {
        let mut actor = ActorContext::default();
        let leap = resolve(AbilityId::RuPowerLeap, &actor);
        assert_eq!(effective_range(&leap, &actor), Some(2));
        actor.set_duration(DurationKind::Exhilaration, 35);
        assert_eq!(effective_range(&leap, &actor), Some(5));
        actor.set_duration(DurationKind::Exhilaration, 500);
        assert_eq!(effective_range(&leap, &actor), Some(LOS_RADIUS));
    }

    #[test]
    fn test_dig_wall_set() {
        let mut world = SandboxWorld::from_rows(&["#X#", "#..", "..."]);
        let mut actor = ActorContext::default();
        actor.position = Position::new(1, 1);
        let targeter = find_targeter(&resolve(AbilityId::Dig, &actor), &actor, &world).unwrap();
        assert_eq!(targeter.shape, TargeterShape::WallSet);
        assert!(targeter.is_valid_aim(Position::new(0, 0)));
        assert!(!targeter.is_valid_aim(Position::new(1, 0)));
        world.set_feature(Position::new(0, 0), Feature::Floor);
        let targeter = find_targeter(&resolve(AbilityId::Dig, &actor), &actor, &world).unwrap();
        assert!(!targeter.is_valid_aim(Position::new(0, 0)));
    }

    #[test]
    fn test_monster_targets() {
        let mut world = SandboxWorld::open(15, 15);
        let mut actor = ActorContext::default();
        actor.position = Position::new(2, 2);
        world.add_monster("orc", Position::new(4, 4), 10);
        world.add_monster("far orc", Position::new(14, 14), 10);

        let targeter =
            find_targeter(&resolve(AbilityId::BeoghSmiting, &actor), &actor, &world).unwrap();
        assert_eq!(targeter.cells(), &[Position::new(4, 4)]);
        assert_eq!(
            targeter.affected(&world, Position::new(4, 4)),
            vec![Position::new(4, 4)]
        );
        assert!(targeter.affected(&world, Position::new(14, 14)).is_empty());
    }

    #[test]
    fn test_self_centred_aim() {
        let world = SandboxWorld::open(15, 15);
        let mut actor = ActorContext::default();
        actor.position = Position::new(7, 7);
        let targeter =
            find_targeter(&resolve(AbilityId::ZinSanctuary, &actor), &actor, &world).unwrap();
        assert!(targeter.is_valid_aim(actor.position));
        assert!(!targeter.is_valid_aim(Position::new(7, 8)));
        assert_eq!(targeter.cells().len(), 81);
    }

    #[test]
    fn test_upheaval_rings() {
        let world = SandboxWorld::open(15, 15);
        let mut actor = ActorContext::default();
        actor.position = Position::new(2, 2);
        let aim = Position::new(7, 7);

        let targeter =
            find_targeter(&resolve(AbilityId::QazlalUpheaval, &actor), &actor, &world).unwrap();
        assert!(matches!(
            targeter.shape,
            TargeterShape::MaybeRadius { radius: 1, sub_radius: 0, .. }
        ));
        assert_eq!(targeter.affected(&world, aim).len(), 9);
        assert_eq!(targeter.certainly_affected(&world, aim), vec![aim]);
        assert_eq!(upheaval_outer_chance(&actor), 0);

        actor.skills.insert(Skill::Invocations, 20);
        let targeter =
            find_targeter(&resolve(AbilityId::QazlalUpheaval, &actor), &actor, &world).unwrap();
        assert!(matches!(
            targeter.shape,
            TargeterShape::MaybeRadius { radius: 2, sub_radius: 1, .. }
        ));
        assert_eq!(targeter.affected(&world, aim).len(), 25);
        let certain = targeter.certainly_affected(&world, aim);
        assert_eq!(certain.len(), 9);
        assert!(certain.iter().all(|p| p.distance(aim) <= 1));
        assert_eq!(upheaval_outer_chance(&actor), 20);
    }

    #[test]
    fn test_target_request() {
        let actor = ActorContext::default();
        let breath = target_request(&resolve(AbilityId::BreatheFrost, &actor), &actor).unwrap();
        assert_eq!(breath.mode, TargetMode::Direction);
        assert_eq!(breath.range, 6);
        assert!(!breath.not_self);

        let leap = target_request(&resolve(AbilityId::RuPowerLeap, &actor), &actor).unwrap();
        assert_eq!(leap.mode, TargetMode::Any);
        assert!(leap.needs_path);
        assert!(leap.not_self);

        assert!(target_request(&resolve(AbilityId::Fly, &actor), &actor).is_none());
    }
}
