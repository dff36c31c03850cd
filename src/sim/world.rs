/// World: the complete state of a running game.
///
/// One explicit object owns every entity, the mode, the message line, the
/// session clock and the RNG. The turn engine (`sim::turn`) mutates it
/// through `apply`; the renderer only reads it via `snapshot()`.
///
/// ## Modes
///
///   Exploring ──InitiateShoot──▶ Aiming ──Shoot──▶ Exploring | Won
///       │                          │
///       │                          └──CancelShoot──▶ Exploring
///       └──pit / dragon──▶ Over(Death)
///
/// `NewGame` leaves any mode for a fresh `Exploring`.

use std::time::Duration;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Rules;
use crate::domain::entity::{Arrow, Dragon, Player, Rope};
use crate::domain::rules::HazardView;
use crate::domain::topology::Cell;
use crate::sim::generator::{self, GenError, Layout};
use crate::sim::session::Session;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Death {
    /// Walked into a pit without a rope.
    Pit,
    /// Walked onto the live dragon.
    Devoured,
    /// A bat dropped the player into a pit without a rope.
    DroppedInPit,
    /// A bat dropped the player onto the live dragon.
    DroppedOnDragon,
}

impl Death {
    pub fn message(self) -> &'static str {
        match self {
            Death::Pit => "You fell into a pit and died! Game Over!",
            Death::Devoured => "The dragon devoured you! Game Over!",
            Death::DroppedInPit => "Bat dropped you into a pit! You died! Game Over!",
            Death::DroppedOnDragon => "Bat dropped you on the dragon! You were devoured! Game Over!",
        }
    }

    pub fn by_pit(self) -> bool {
        matches!(self, Death::Pit | Death::DroppedInPit)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Exploring,
    Aiming,
    Over(Death),
    Won,
}

impl Mode {
    pub fn is_over(self) -> bool {
        matches!(self, Mode::Over(_) | Mode::Won)
    }
}

/// Read-only copy of everything the presentation layer draws.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub player: Player,
    pub dragon: Dragon,
    pub arrow: Arrow,
    pub rope: Rope,
    pub pits: Vec<Cell>,
    pub bats: Vec<Cell>,
    pub mode: Mode,
    pub score: u64,
    pub elapsed: Duration,
}

impl Snapshot {
    pub fn active(&self) -> bool {
        !self.mode.is_over()
    }

    pub fn aiming(&self) -> bool {
        self.mode == Mode::Aiming
    }
}

pub struct World {
    // ── Entities ──
    pub player: Player,
    pub dragon: Dragon,
    pub arrow: Arrow,
    pub rope: Rope,
    /// Fixed for the whole game.
    pub pits: Vec<Cell>,
    /// Shrinks by one per bat encounter.
    pub bats: Vec<Cell>,

    // ── Meta ──
    pub mode: Mode,
    pub message: String,
    pub score: u64,
    pub session: Session,

    pub rules: Rules,
    pub(crate) rng: StdRng,
}

// ── Construction ──

impl World {
    /// Generate a dungeon and start the first game.
    pub fn new(rules: Rules, mut rng: StdRng) -> Result<Self, GenError> {
        let generated = generator::generate(&mut rng, &rules)?;
        info!(
            "New game after {} generation attempt(s), winnable: {}",
            generated.attempts, generated.winnable,
        );
        Ok(Self::from_layout(generated.layout, rules, rng))
    }

    /// Seed from `rules.seed` if set, entropy otherwise.
    pub fn seeded(rules: Rules) -> Result<Self, GenError> {
        let rng = match rules.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rules, rng)
    }

    /// Start a game on a fixed layout. No validation.
    pub fn from_layout(layout: Layout, rules: Rules, rng: StdRng) -> Self {
        let mut world = World {
            player: Player::new(),
            dragon: Dragon::new(layout.dragon),
            arrow: Arrow::new(layout.arrow),
            rope: Rope::new(layout.rope),
            pits: layout.pits,
            bats: layout.bats,
            mode: Mode::Exploring,
            message: String::new(),
            score: 0,
            session: Session::start(),
            rules,
            rng,
        };
        world.announce_start(&mut Vec::new());
        world
    }

    /// Swap in a fresh layout and reset the player, mode and clock.
    pub(crate) fn reset(&mut self, layout: Layout) {
        self.player = Player::new();
        self.dragon = Dragon::new(layout.dragon);
        self.arrow = Arrow::new(layout.arrow);
        self.rope = Rope::new(layout.rope);
        self.pits = layout.pits;
        self.bats = layout.bats;
        self.mode = Mode::Exploring;
        self.score = 0;
        self.session = Session::start();
    }
}

// ── Queries ──

impl World {
    pub fn hazards(&self) -> HazardView<'_> {
        HazardView { pits: &self.pits, bats: &self.bats, dragon: &self.dragon }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_over(&self) -> bool {
        self.mode.is_over()
    }

    pub fn is_aiming(&self) -> bool {
        self.mode == Mode::Aiming
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            player: self.player.clone(),
            dragon: self.dragon.clone(),
            arrow: self.arrow.clone(),
            rope: self.rope.clone(),
            pits: self.pits.clone(),
            bats: self.bats.clone(),
            mode: self.mode,
            score: self.score,
            elapsed: self.session.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ArrowState;
    use crate::domain::topology::Direction;

    #[test]
    fn new_game_starts_clean() {
        let world = World::new(Rules::default(), StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(world.player.pos, Cell::START);
        assert_eq!(world.player.facing, Direction::North);
        assert!(!world.player.has_arrow && !world.player.has_rope);
        assert!(world.dragon.alive);
        assert_eq!(world.arrow.state, ArrowState::Unfound);
        assert!(!world.rope.collected);
        assert_eq!(world.pits.len(), 12);
        assert_eq!(world.bats.len(), 3);
        assert_eq!(world.mode, Mode::Exploring);
        assert!(world.message().starts_with("Find the magical arrow, then slay the dragon!"));
    }

    #[test]
    fn same_seed_same_dungeon() {
        let rules = Rules { seed: Some(1234), ..Rules::default() };
        let a = World::seeded(rules.clone()).unwrap();
        let b = World::seeded(rules).unwrap();
        assert_eq!(a.dragon.pos, b.dragon.pos);
        assert_eq!(a.arrow.pos, b.arrow.pos);
        assert_eq!(a.pits, b.pits);
        assert_eq!(a.bats, b.bats);
    }

    #[test]
    fn snapshot_reflects_mode() {
        let mut world = World::new(Rules::default(), StdRng::seed_from_u64(3)).unwrap();
        let snap = world.snapshot();
        assert!(snap.active() && !snap.aiming());
        assert_eq!(snap.score, 0);

        world.mode = Mode::Over(Death::Pit);
        let snap = world.snapshot();
        assert!(!snap.active());
    }

    #[test]
    fn death_kinds() {
        assert!(Death::Pit.by_pit() && Death::DroppedInPit.by_pit());
        assert!(!Death::Devoured.by_pit() && !Death::DroppedOnDragon.by_pit());
        assert!(Mode::Won.is_over() && Mode::Over(Death::Devoured).is_over());
        assert!(!Mode::Aiming.is_over());
    }
}
