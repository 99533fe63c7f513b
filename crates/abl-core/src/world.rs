//! World collaborator
//!
//! Abilities read and mutate the surrounding map through the [`World`] trait.
//! [`SandboxWorld`] is a small ASCII-grid implementation used by tests and
//! the command-line frontend.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::actor::God;
use crate::rng::GameRng;

/// Radius of the actor's field of view.
pub const LOS_RADIUS: i32 = 7;

/// Map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance; diagonal steps cost one.
    pub fn distance(&self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }

    pub fn adjacent(&self) -> impl Iterator<Item = Position> + '_ {
        (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .map(|(dx, dy)| self.offset(dx, dy))
    }

    /// Every cell within `radius` of this one, including itself.
    pub fn within(&self, radius: i32) -> impl Iterator<Item = Position> + '_ {
        (-radius..=radius)
            .flat_map(move |dy| (-radius..=radius).map(move |dx| self.offset(dx, dy)))
    }
}

/// Cells on the straight line from `from` to `to`, excluding `from`.
pub fn line_between(from: Position, to: Position) -> Vec<Position> {
    let mut cells = Vec::new();
    let (dx, dy) = ((to.x - from.x).abs(), -(to.y - from.y).abs());
    let (sx, sy) = ((to.x - from.x).signum(), (to.y - from.y).signum());
    let (mut x, mut y) = (from.x, from.y);
    let mut err = dx + dy;
    while (x, y) != (to.x, to.y) {
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        cells.push(Position::new(x, y));
    }
    cells
}

/// Terrain features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Floor,
    Wall,
    PermaRock,
    ShallowWater,
    DeepWater,
    Lava,
    Shaft,
}

impl Feature {
    pub const fn from_char(c: char) -> Feature {
        match c {
            '#' => Feature::Wall,
            'X' => Feature::PermaRock,
            '=' => Feature::ShallowWater,
            'w' => Feature::DeepWater,
            'l' => Feature::Lava,
            '>' => Feature::Shaft,
            _ => Feature::Floor,
        }
    }

    pub const fn to_char(self) -> char {
        match self {
            Feature::Floor => '.',
            Feature::Wall => '#',
            Feature::PermaRock => 'X',
            Feature::ShallowWater => '=',
            Feature::DeepWater => 'w',
            Feature::Lava => 'l',
            Feature::Shaft => '>',
        }
    }

    pub const fn is_solid(self) -> bool {
        matches!(self, Feature::Wall | Feature::PermaRock)
    }

    /// Kills an actor standing on it without flight.
    pub const fn is_hazardous(self) -> bool {
        matches!(self, Feature::DeepWater | Feature::Lava)
    }

    pub const fn is_diggable(self) -> bool {
        matches!(self, Feature::Wall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudKind {
    Fog,
    Fire,
    Poison,
    Mephitic,
    Steam,
}

/// Inhabitant of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub id: u32,
    pub name: String,
    pub pos: Position,
    pub hp: i32,
    #[serde(default)]
    pub friendly: bool,
    #[serde(default)]
    pub mindless: bool,
    #[serde(default)]
    pub summoned_by_actor: bool,
}

/// Response to a recitation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecitalAudience {
    NoOne,
    Unreceptive,
    Listeners(usize),
}

/// Map and inhabitants as seen by ability checks and effects.
pub trait World {
    fn in_bounds(&self, pos: Position) -> bool;
    fn feature_at(&self, pos: Position) -> Feature;
    fn monster_at(&self, pos: Position) -> Option<&Monster>;
    fn monsters(&self) -> Vec<&Monster>;
    fn cloud_at(&self, pos: Position) -> Option<CloudKind>;

    fn sanctuary_active(&self) -> bool;
    fn in_abyss(&self) -> bool;
    fn abyss_reachable(&self) -> bool;
    fn level_corruptible(&self) -> bool;
    /// Outstanding penance owed to `god`; zero means no disfavor.
    fn penance(&self, god: God) -> i32;
    fn corpses_near(&self, pos: Position, radius: i32) -> usize;
    /// Remove up to `limit` corpses near `pos`, nearest first, returning where they lay.
    fn take_corpses(&mut self, pos: Position, radius: i32, limit: usize) -> Vec<Position>;
    fn spellbooks_in_view(&self, pos: Position) -> Vec<Position>;
    /// Destroy every spellbook in view of `pos`; returns where they burned.
    fn burn_spellbooks(&mut self, pos: Position) -> Vec<Position>;

    fn count_sacrificial_units(&self, pos: Position) -> usize;
    /// Set aside `count` units for an attempt; false if not enough are nearby.
    fn reserve_sacrificial_units(&mut self, pos: Position, count: usize) -> bool;
    fn release_reservation(&mut self);
    /// Spend the reserved units and return how many were taken.
    fn consume_reservation(&mut self) -> usize;

    /// Damage a monster; returns true if it died.
    fn damage_monster(&mut self, pos: Position, amount: i32) -> bool;
    fn befriend_monster(&mut self, pos: Position) -> bool;
    fn banish_monster(&mut self, pos: Position) -> bool;
    fn set_feature(&mut self, pos: Position, feature: Feature);
    fn place_cloud(&mut self, pos: Position, kind: CloudKind);
    fn summon(&mut self, name: &str, near: Position, friendly: bool) -> Option<Position>;
    fn create_sanctuary(&mut self, center: Position, radius: i32);
    fn set_in_abyss(&mut self, in_abyss: bool);
    fn corrupt_level(&mut self);

    /// Whether `to` is visible from `from`: in range and not blocked by solid terrain.
    fn see_cell(&self, from: Position, to: Position) -> bool {
        if !self.in_bounds(to) || from.distance(to) > LOS_RADIUS {
            return false;
        }
        let line = line_between(from, to);
        let blockers = line.len().saturating_sub(1);
        line.iter()
            .take(blockers)
            .all(|&cell| !self.feature_at(cell).is_solid())
    }

    /// Open, unoccupied cell.
    fn is_free(&self, pos: Position) -> bool {
        self.in_bounds(pos)
            && !self.feature_at(pos).is_solid()
            && !self.feature_at(pos).is_hazardous()
            && self.monster_at(pos).is_none()
    }

    fn visible_monsters(&self, from: Position) -> Vec<Position> {
        self.monsters()
            .into_iter()
            .filter(|m| self.see_cell(from, m.pos))
            .map(|m| m.pos)
            .collect()
    }

    fn recital_audience(&self, from: Position) -> RecitalAudience {
        let visible: Vec<&Monster> = self
            .monsters()
            .into_iter()
            .filter(|m| self.see_cell(from, m.pos) && !m.friendly)
            .collect();
        if visible.is_empty() {
            return RecitalAudience::NoOne;
        }
        let listeners = visible.iter().filter(|m| !m.mindless).count();
        if listeners == 0 {
            RecitalAudience::Unreceptive
        } else {
            RecitalAudience::Listeners(listeners)
        }
    }

    /// Random free cell in view of `center`, no closer than `min_dist`.
    fn random_free_cell(
        &self,
        center: Position,
        radius: i32,
        min_dist: i32,
        rng: &mut GameRng,
    ) -> Option<Position> {
        let cells: Vec<Position> = center
            .within(radius)
            .filter(|&p| p.distance(center) >= min_dist)
            .filter(|&p| self.is_free(p) && self.see_cell(center, p))
            .collect();
        rng.choose(&cells).copied()
    }
}

/// ASCII-grid world
///
/// `map` rows use `.` floor, `#` wall, `X` permanent rock, `=` shallow water,
/// `w` deep water, `l` lava and `>` a shaft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxWorld {
    pub map: Vec<String>,
    #[serde(default)]
    pub monsters: Vec<Monster>,
    #[serde(default)]
    pub clouds: Vec<(Position, CloudKind)>,
    #[serde(default)]
    pub corpses: Vec<Position>,
    #[serde(default)]
    pub sacrificial_units: Vec<Position>,
    #[serde(default)]
    pub spellbooks: Vec<Position>,
    #[serde(skip)]
    reserved: Vec<Position>,
    #[serde(default)]
    pub penance: HashMap<God, i32>,
    #[serde(default)]
    pub sanctuary: Option<(Position, i32)>,
    #[serde(default)]
    pub in_abyss: bool,
    #[serde(default = "default_true")]
    pub abyss_reachable: bool,
    #[serde(default = "default_true")]
    pub corruptible: bool,
    #[serde(default)]
    next_monster_id: u32,
}

fn default_true() -> bool {
    true
}

impl SandboxWorld {
    pub fn from_rows(rows: &[&str]) -> Self {
        Self {
            map: rows.iter().map(|r| r.to_string()).collect(),
            abyss_reachable: true,
            corruptible: true,
            ..Self::default()
        }
    }

    /// Open room of the given size.
    pub fn open(width: usize, height: usize) -> Self {
        let rows: Vec<String> = (0..height).map(|_| ".".repeat(width)).collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        Self::from_rows(&refs)
    }

    pub fn add_monster(&mut self, name: &str, pos: Position, hp: i32) -> u32 {
        let id = self.monsters.iter().map(|m| m.id + 1).max().unwrap_or(0).max(self.next_monster_id);
        self.next_monster_id = id + 1;
        self.monsters.push(Monster {
            id,
            name: name.to_string(),
            pos,
            hp,
            friendly: false,
            mindless: false,
            summoned_by_actor: false,
        });
        id
    }

    pub fn width(&self) -> i32 {
        self.map.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32
    }

    pub fn height(&self) -> i32 {
        self.map.len() as i32
    }
}

impl World for SandboxWorld {
    fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.y < self.height() && pos.x < self.width()
    }

    fn feature_at(&self, pos: Position) -> Feature {
        if pos.x < 0 || pos.y < 0 {
            return Feature::PermaRock;
        }
        self.map
            .get(pos.y as usize)
            .and_then(|row| row.chars().nth(pos.x as usize))
            .map_or(Feature::PermaRock, Feature::from_char)
    }

    fn monster_at(&self, pos: Position) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.pos == pos)
    }

    fn monsters(&self) -> Vec<&Monster> {
        self.monsters.iter().collect()
    }

    fn cloud_at(&self, pos: Position) -> Option<CloudKind> {
        self.clouds
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, kind)| *kind)
    }

    fn sanctuary_active(&self) -> bool {
        self.sanctuary.is_some()
    }

    fn in_abyss(&self) -> bool {
        self.in_abyss
    }

    fn abyss_reachable(&self) -> bool {
        self.abyss_reachable
    }

    fn level_corruptible(&self) -> bool {
        self.corruptible && !self.in_abyss
    }

    fn penance(&self, god: God) -> i32 {
        self.penance.get(&god).copied().unwrap_or(0)
    }

    fn corpses_near(&self, pos: Position, radius: i32) -> usize {
        self.corpses
            .iter()
            .filter(|c| c.distance(pos) <= radius)
            .count()
    }

    fn take_corpses(&mut self, pos: Position, radius: i32, limit: usize) -> Vec<Position> {
        let mut near: Vec<Position> = self
            .corpses
            .iter()
            .copied()
            .filter(|c| c.distance(pos) <= radius)
            .collect();
        near.sort_by_key(|c| c.distance(pos));
        near.truncate(limit);
        for taken in &near {
            if let Some(idx) = self.corpses.iter().position(|c| c == taken) {
                self.corpses.remove(idx);
            }
        }
        near
    }

    fn spellbooks_in_view(&self, pos: Position) -> Vec<Position> {
        self.spellbooks
            .iter()
            .copied()
            .filter(|b| self.see_cell(pos, *b))
            .collect()
    }

    fn burn_spellbooks(&mut self, pos: Position) -> Vec<Position> {
        let (burned, kept): (Vec<Position>, Vec<Position>) = self
            .spellbooks
            .iter()
            .copied()
            .partition(|b| self.see_cell(pos, *b));
        self.spellbooks = kept;
        burned
    }

    fn count_sacrificial_units(&self, pos: Position) -> usize {
        self.sacrificial_units
            .iter()
            .filter(|u| self.see_cell(pos, **u))
            .count()
    }

    fn reserve_sacrificial_units(&mut self, pos: Position, count: usize) -> bool {
        self.release_reservation();
        let nearby: Vec<Position> = self
            .sacrificial_units
            .iter()
            .copied()
            .filter(|u| self.see_cell(pos, *u))
            .take(count)
            .collect();
        if nearby.len() < count {
            return false;
        }
        self.reserved = nearby;
        true
    }

    fn release_reservation(&mut self) {
        self.reserved.clear();
    }

    fn consume_reservation(&mut self) -> usize {
        let taken = std::mem::take(&mut self.reserved);
        self.sacrificial_units.retain(|u| !taken.contains(u));
        taken.len()
    }

    fn damage_monster(&mut self, pos: Position, amount: i32) -> bool {
        let Some(idx) = self.monsters.iter().position(|m| m.pos == pos) else {
            return false;
        };
        self.monsters[idx].hp -= amount;
        if self.monsters[idx].hp <= 0 {
            let dead = self.monsters.remove(idx);
            self.corpses.push(dead.pos);
            return true;
        }
        false
    }

    fn befriend_monster(&mut self, pos: Position) -> bool {
        match self.monsters.iter_mut().find(|m| m.pos == pos) {
            Some(m) if !m.friendly => {
                m.friendly = true;
                true
            }
            _ => false,
        }
    }

    fn banish_monster(&mut self, pos: Position) -> bool {
        let before = self.monsters.len();
        self.monsters.retain(|m| m.pos != pos);
        self.monsters.len() != before
    }

    fn set_feature(&mut self, pos: Position, feature: Feature) {
        if !self.in_bounds(pos) {
            return;
        }
        if let Some(row) = self.map.get_mut(pos.y as usize) {
            *row = row
                .chars()
                .enumerate()
                .map(|(x, c)| if x as i32 == pos.x { feature.to_char() } else { c })
                .collect();
        }
    }

    fn place_cloud(&mut self, pos: Position, kind: CloudKind) {
        self.clouds.retain(|(p, _)| *p != pos);
        self.clouds.push((pos, kind));
    }

    fn summon(&mut self, name: &str, near: Position, friendly: bool) -> Option<Position> {
        let spot = near
            .adjacent()
            .chain(near.within(2))
            .find(|&p| p != near && self.is_free(p))?;
        self.add_monster(name, spot, 10);
        if let Some(m) = self.monsters.last_mut() {
            m.friendly = friendly;
            m.summoned_by_actor = friendly;
        }
        Some(spot)
    }

    fn create_sanctuary(&mut self, center: Position, radius: i32) {
        self.sanctuary = Some((center, radius));
    }

    fn set_in_abyss(&mut self, in_abyss: bool) {
        self.in_abyss = in_abyss;
    }

    fn corrupt_level(&mut self) {
        self.corruptible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_between() {
        let line = line_between(Position::new(0, 0), Position::new(3, 0));
        assert_eq!(
            line,
            vec![Position::new(1, 0), Position::new(2, 0), Position::new(3, 0)]
        );
        assert!(line_between(Position::new(2, 2), Position::new(2, 2)).is_empty());
    }

    #[test]
    fn test_see_cell_blocked_by_wall() {
        let world = SandboxWorld::from_rows(&["..#..", ".....", "....."]);
        assert!(!world.see_cell(Position::new(0, 0), Position::new(4, 0)));
        assert!(world.see_cell(Position::new(0, 0), Position::new(2, 0)));
        assert!(world.see_cell(Position::new(0, 2), Position::new(4, 2)));
    }

    #[test]
    fn test_out_of_bounds_is_rock() {
        let world = SandboxWorld::open(3, 3);
        assert_eq!(world.feature_at(Position::new(-1, 0)), Feature::PermaRock);
        assert_eq!(world.feature_at(Position::new(5, 0)), Feature::PermaRock);
    }

    #[test]
    fn test_set_feature() {
        let mut world = SandboxWorld::from_rows(&["...", ".#.", "..."]);
        world.set_feature(Position::new(1, 1), Feature::Floor);
        assert_eq!(world.feature_at(Position::new(1, 1)), Feature::Floor);
    }

    #[test]
    fn test_reserve_and_consume_units() {
        let mut world = SandboxWorld::open(5, 5);
        world.sacrificial_units = vec![Position::new(1, 1), Position::new(3, 3)];
        let here = Position::new(2, 2);
        assert_eq!(world.count_sacrificial_units(here), 2);
        assert!(!world.reserve_sacrificial_units(here, 3));
        assert!(world.reserve_sacrificial_units(here, 2));
        world.release_reservation();
        assert_eq!(world.consume_reservation(), 0);
        assert!(world.reserve_sacrificial_units(here, 1));
        assert_eq!(world.consume_reservation(), 1);
        assert_eq!(world.count_sacrificial_units(here), 1);
    }

    #[test]
    fn test_recital_audience() {
        let mut world = SandboxWorld::open(6, 6);
        let here = Position::new(0, 0);
        assert_eq!(world.recital_audience(here), RecitalAudience::NoOne);
        world.add_monster("zombie", Position::new(2, 2), 5);
        world.monsters[0].mindless = true;
        assert_eq!(world.recital_audience(here), RecitalAudience::Unreceptive);
        world.add_monster("orc", Position::new(3, 2), 5);
        assert_eq!(world.recital_audience(here), RecitalAudience::Listeners(1));
    }

    #[test]
    fn test_damage_leaves_corpse() {
        let mut world = SandboxWorld::open(4, 4);
        world.add_monster("rat", Position::new(1, 1), 3);
        assert!(!world.damage_monster(Position::new(1, 1), 2));
        assert!(world.damage_monster(Position::new(1, 1), 2));
        assert!(world.monsters.is_empty());
        assert_eq!(world.corpses_near(Position::new(0, 0), 2), 1);
    }

    #[test]
    fn test_take_corpses_nearest_first() {
        let mut world = SandboxWorld::open(9, 9);
        world.corpses = vec![Position::new(6, 6), Position::new(1, 1), Position::new(2, 2)];
        let taken = world.take_corpses(Position::new(0, 0), 3, 1);
        assert_eq!(taken, vec![Position::new(1, 1)]);
        assert_eq!(world.corpses.len(), 2);
        assert_eq!(world.take_corpses(Position::new(0, 0), 3, 5), vec![Position::new(2, 2)]);
    }

    #[test]
    fn test_burn_spellbooks_in_view() {
        let mut world = SandboxWorld::from_rows(&["...#..", "......"]);
        world.spellbooks = vec![Position::new(1, 0), Position::new(5, 0)];
        let burned = world.burn_spellbooks(Position::new(0, 0));
        assert_eq!(burned, vec![Position::new(1, 0)]);
        assert_eq!(world.spellbooks, vec![Position::new(5, 0)]);
    }

    #[test]
    fn test_world_serde() {
        let mut world = SandboxWorld::open(3, 2);
        world.add_monster("orc", Position::new(1, 1), 4);
        let json = serde_json::to_string(&world).unwrap();
        let back: SandboxWorld = serde_json::from_str(&json).unwrap();
        assert_eq!(back.map, world.map);
        assert_eq!(back.monsters, world.monsters);
    }
}
