/// Turn engine: one intent in, state changes and events out.
///
/// ## Intent gating
///
/// ┌───────────────┬───────────┬──────────┬───────────┐
/// │ Intent         │ Exploring │ Aiming   │ Over/Won  │
/// ├───────────────┼───────────┼──────────┼───────────┤
/// │ Move           │ walk      │ ignored  │ ignored   │
/// │ InitiateShoot  │ aim       │ ignored  │ ignored   │
/// │ Shoot          │ ignored   │ fire     │ ignored   │
/// │ CancelShoot    │ ignored   │ explore  │ ignored   │
/// │ NewGame        │ restart   │ restart  │ restart   │
/// │ ToggleMute     │ (audio side channel only)         │
/// └───────────────┴───────────┴──────────┴───────────┘
///
/// ## Position resolution (strict priority)
///
///   1. bat        → bat encounter, stop
///   2. pit        → rope saves (consumed) or death, stop on death
///   3. arrow      → pick up (first find)
///   4. arrow      → retrieve (after a miss)
///   5. rope       → pick up
///   6. dragon     → devoured, stop
///   7. proximity  → warnings joined with " | "
///
/// Each of 2–5 that fires replaces the lead message of the earlier ones.

use log::{debug, error, info, warn};

use crate::domain::entity::ArrowState;
use crate::domain::rules::compose_message;
use crate::domain::topology::{arrow_path, step, Cell, Direction, GRID_SIZE};
use crate::sim::event::GameEvent;
use crate::sim::generator::{self, sample_cell};
use crate::sim::session::score_for;
use crate::sim::world::{Death, Mode, World};

pub const OPENING: &str = "Find the magical arrow, then slay the dragon!";
const MOVING: &str = "Moving through the dungeon...";
const NO_ARROW: &str = "You need to find the magical arrow first!";
const AIM_PROMPT: &str = "Select a direction to shoot! (or ESC to cancel)";
const AIM_CANCELLED: &str = "Shooting cancelled.";
const ROPE_SAVED: &str = "You fell in a pit! Your rope saved you! (Rope consumed)";
const ROPE_SAVED_AFTER_FLIGHT: &str = "Landed in a pit! Your rope saved you! (Rope consumed)";
const ARROW_FOUND: &str = "You found the magical arrow!";
const ARROW_RETRIEVED: &str = "You retrieved your arrow!";
const ROPE_FOUND: &str = "You found a rope! It will save you from pits!";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Intent {
    NewGame,
    Move(Direction),
    InitiateShoot,
    CancelShoot,
    Shoot(Direction),
    ToggleMute,
}

// ── Dispatch ──

impl World {
    /// A bare direction key: fire while aiming, walk otherwise.
    pub fn direction_intent(&self, dir: Direction) -> Intent {
        if self.is_aiming() {
            Intent::Shoot(dir)
        } else {
            Intent::Move(dir)
        }
    }

    /// Resolve one intent to completion.
    pub fn apply(&mut self, intent: Intent) -> Vec<GameEvent> {
        let mut events = Vec::new();

        match (intent, self.mode) {
            (Intent::NewGame, _) => self.new_game(&mut events),
            (Intent::ToggleMute, _) => {}
            (_, Mode::Over(_) | Mode::Won) => {}

            (Intent::Move(dir), Mode::Exploring) => self.walk(dir, &mut events),
            (Intent::InitiateShoot, Mode::Exploring) => self.take_aim(),
            (Intent::Shoot(dir), Mode::Aiming) => self.shoot(dir, &mut events),
            (Intent::CancelShoot, Mode::Aiming) => {
                self.mode = Mode::Exploring;
                self.message = AIM_CANCELLED.to_string();
            }

            _ => debug!("Ignored {intent:?} while {:?}", self.mode),
        }

        events
    }

    fn new_game(&mut self, events: &mut Vec<GameEvent>) {
        match generator::generate(&mut self.rng, &self.rules) {
            Ok(generated) => {
                info!(
                    "New game after {} generation attempt(s), winnable: {}",
                    generated.attempts, generated.winnable,
                );
                self.reset(generated.layout);
                self.announce_start(events);
            }
            Err(e) => error!("Could not generate a new dungeon: {e}"),
        }
    }

    /// Opening message for a fresh dungeon.
    pub(crate) fn announce_start(&mut self, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::GameStarted);
        self.look_around(Some(OPENING), events);
    }
}

// ── Movement ──

impl World {
    fn walk(&mut self, dir: Direction, events: &mut Vec<GameEvent>) {
        self.player.facing = dir;
        self.player.pos = step(self.player.pos, dir);
        events.push(GameEvent::Moved { to: self.player.pos });
        self.resolve_position(events);
    }

    fn resolve_position(&mut self, events: &mut Vec<GameEvent>) {
        let here = self.player.pos;

        if self.hazards().is_bat(here) {
            self.bat_encounter(events);
            return;
        }

        let mut lead = None;

        if self.hazards().is_pit(here) {
            if !self.player.has_rope {
                self.die(Death::Pit, events);
                return;
            }
            self.player.has_rope = false;
            events.push(GameEvent::PitSurvived);
            lead = Some(ROPE_SAVED);
        }

        if self.arrow.pos == here {
            match self.arrow.state {
                ArrowState::Unfound => {
                    self.arrow.state = ArrowState::Held;
                    self.player.has_arrow = true;
                    events.push(GameEvent::ArrowFound);
                    lead = Some(ARROW_FOUND);
                }
                ArrowState::Landed => {
                    self.arrow.state = ArrowState::Held;
                    self.player.has_arrow = true;
                    events.push(GameEvent::ArrowRetrieved);
                    lead = Some(ARROW_RETRIEVED);
                }
                ArrowState::Held => {}
            }
        }

        if self.rope.lies_at(here) {
            self.rope.collected = true;
            self.player.has_rope = true;
            events.push(GameEvent::RopeFound);
            lead = Some(ROPE_FOUND);
        }

        if self.dragon.is_at(here) {
            self.die(Death::Devoured, events);
            return;
        }

        self.look_around(lead, events);
    }

    /// Proximity scan around the player. Sets the message line.
    fn look_around(&mut self, lead: Option<&str>, events: &mut Vec<GameEvent>) {
        let prox = self.hazards().proximity(self.player.pos);
        if prox.dragon { events.push(GameEvent::DragonNearby); }
        if prox.pit { events.push(GameEvent::PitNearby); }
        if prox.bat { events.push(GameEvent::BatNearby); }

        self.message = compose_message(lead, prox).unwrap_or_else(|| MOVING.to_string());
    }

    fn die(&mut self, death: Death, events: &mut Vec<GameEvent>) {
        self.mode = Mode::Over(death);
        let elapsed = self.session.stop();
        self.message = death.message().to_string();
        events.push(if death.by_pit() { GameEvent::PitDeath } else { GameEvent::Devoured });
        info!("Game over at {} ({death:?}) after {}s", self.player.pos, elapsed.as_secs());
    }
}

// ── Bats ──

impl World {
    fn bat_encounter(&mut self, events: &mut Vec<GameEvent>) {
        let from = self.player.pos;
        self.bats.retain(|&b| b != from);

        let bats = &self.bats;
        let Some(to) = sample_cell(&mut self.rng, |c| c == from || bats.contains(&c)) else {
            warn!("Bat at {from} found nowhere to drop the player");
            self.look_around(None, events);
            return;
        };

        self.player.pos = to;
        events.push(GameEvent::BatEncounter { from, to });
        debug!("Bat carried player {from} -> {to}, {} bat(s) remaining", self.bats.len());

        let mut flight = format!("A bat grabbed you and flew you from {from} to {to}!");

        if self.hazards().is_pit(to) {
            if !self.player.has_rope {
                self.die(Death::DroppedInPit, events);
                return;
            }
            self.player.has_rope = false;
            events.push(GameEvent::PitSurvived);
            flight.push_str(" | ");
            flight.push_str(ROPE_SAVED_AFTER_FLIGHT);
        }

        if self.dragon.is_at(to) {
            self.die(Death::DroppedOnDragon, events);
            return;
        }

        self.look_around(Some(flight.as_str()), events);
    }
}

// ── Shooting ──

impl World {
    fn take_aim(&mut self) {
        if !self.player.has_arrow {
            self.message = NO_ARROW.to_string();
            return;
        }
        self.mode = Mode::Aiming;
        self.message = AIM_PROMPT.to_string();
    }

    fn shoot(&mut self, dir: Direction, events: &mut Vec<GameEvent>) {
        self.player.facing = dir;
        self.mode = Mode::Exploring;
        self.player.has_arrow = false;
        events.push(GameEvent::ArrowLoosed);
        debug!("Arrow loosed {} from {}", dir.name(), self.player.pos);

        let path = arrow_path(self.player.pos, dir);

        if path.iter().any(|&c| self.dragon.is_at(c)) {
            self.dragon.alive = false;
            let elapsed = self.session.stop();
            self.score = score_for(elapsed);
            self.mode = Mode::Won;
            self.message = format!("VICTORY! You slayed the dragon! Score: {}", self.score);
            events.push(GameEvent::DragonSlain { score: self.score });
            info!("Dragon slain at {} after {}s, score {}", self.dragon.pos, elapsed.as_secs(), self.score);
            return;
        }

        let landed = path[GRID_SIZE - 1];
        self.arrow.land(landed);
        self.relocate_dragon();
        self.message = format!("Your arrow missed! It landed at {landed}. Go retrieve it!");
        events.push(GameEvent::ArrowMissed { landed });
    }

    /// The dragon wakes and moves: anywhere but the player, the arrow or a pit.
    fn relocate_dragon(&mut self) {
        let player = self.player.pos;
        let arrow = self.arrow.pos;
        let pits = &self.pits;
        let excluded = |c: Cell| c == player || c == arrow || pits.contains(&c);

        match sample_cell(&mut self.rng, excluded) {
            Some(cell) => {
                self.dragon.pos = cell;
                debug!("Dragon repositioned to {cell}");
            }
            None => warn!("No free cell for the dragon, it stays at {}", self.dragon.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rules;
    use crate::sim::generator::Layout;
    use crate::sim::session::Session;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::{Duration, Instant};

    fn c(x: i32, y: i32) -> Cell {
        Cell::new(x, y)
    }

    /// Quiet dungeon: nothing near the start or its eastern neighbour.
    fn layout(dragon: Cell) -> Layout {
        Layout { dragon, arrow: c(8, 8), rope: c(7, 7), pits: vec![], bats: vec![] }
    }

    fn world(layout: Layout) -> World {
        world_seeded(layout, 42)
    }

    fn world_seeded(layout: Layout, seed: u64) -> World {
        World::from_layout(layout, Rules::default(), StdRng::seed_from_u64(seed))
    }

    fn arm(w: &mut World) {
        w.player.has_arrow = true;
        w.arrow.state = ArrowState::Held;
    }

    #[test]
    fn quiet_move() {
        let mut w = world(layout(c(5, 5)));
        assert_eq!(w.message(), OPENING);

        let events = w.apply(Intent::Move(Direction::East));
        assert_eq!(w.player.pos, c(1, 0));
        assert_eq!(w.player.facing, Direction::East);
        assert_eq!(events, vec![GameEvent::Moved { to: c(1, 0) }]);
        assert_eq!(w.message(), MOVING);
    }

    #[test]
    fn moves_wrap_around_the_torus() {
        let mut w = world(layout(c(5, 5)));
        w.apply(Intent::Move(Direction::North));
        assert_eq!(w.player.pos, c(0, 9));
        w.apply(Intent::Move(Direction::West));
        assert_eq!(w.player.pos, c(9, 9));
    }

    #[test]
    fn devoured_moving_east() {
        let mut w = world(layout(c(1, 0)));
        assert!(w.message().contains("DRAGON roars nearby!"));

        let events = w.apply(Intent::Move(Direction::East));
        assert_eq!(w.mode, Mode::Over(Death::Devoured));
        assert_eq!(w.message(), "The dragon devoured you! Game Over!");
        assert!(events.contains(&GameEvent::Devoured));
        assert!(!w.session.is_running());

        // Nothing but NewGame works now.
        w.apply(Intent::Move(Direction::West));
        assert_eq!(w.player.pos, c(1, 0));
        w.apply(Intent::InitiateShoot);
        assert_eq!(w.mode, Mode::Over(Death::Devoured));
    }

    #[test]
    fn shot_hits_due_east() {
        let mut w = world(layout(c(5, 0)));
        arm(&mut w);

        w.apply(Intent::InitiateShoot);
        assert!(w.is_aiming());
        assert_eq!(w.message(), AIM_PROMPT);
        assert_eq!(w.direction_intent(Direction::East), Intent::Shoot(Direction::East));

        let events = w.apply(Intent::Shoot(Direction::East));
        assert_eq!(w.mode, Mode::Won);
        assert!(!w.dragon.alive);
        assert!(!w.player.has_arrow);
        assert_eq!(w.player.facing, Direction::East);
        assert_eq!(events, vec![GameEvent::ArrowLoosed, GameEvent::DragonSlain { score: 0 }]);
        assert_eq!(w.message(), "VICTORY! You slayed the dragon! Score: 0");
    }

    #[test]
    fn shot_wraps_to_hit_behind() {
        // Dragon directly west; shooting east travels round the row.
        let mut w = world(layout(c(9, 0)));
        arm(&mut w);
        w.apply(Intent::InitiateShoot);
        w.apply(Intent::Shoot(Direction::East));
        assert_eq!(w.mode, Mode::Won);
    }

    #[test]
    fn win_score_uses_elapsed_time() {
        let mut w = world(layout(c(0, 4)));
        arm(&mut w);
        w.session = Session::started_at(Instant::now() - Duration::from_secs(62));
        w.apply(Intent::InitiateShoot);
        w.apply(Intent::Shoot(Direction::South));
        assert_eq!(w.score, 12);
        assert_eq!(w.snapshot().score, 12);
        assert_eq!(w.message(), "VICTORY! You slayed the dragon! Score: 12");
    }

    #[test]
    fn miss_lands_arrow_and_moves_dragon() {
        // Pits everywhere in the lower right block: dragon must avoid them.
        let pits: Vec<Cell> = Cell::all().filter(|c| c.x >= 3 && c.y >= 3).collect();
        for seed in 0..30 {
            let mut w = world_seeded(Layout { pits: pits.clone(), ..layout(c(2, 2)) }, seed);
            arm(&mut w);
            w.apply(Intent::InitiateShoot);
            let events = w.apply(Intent::Shoot(Direction::East));

            assert_eq!(w.mode, Mode::Exploring);
            assert!(w.dragon.alive);
            assert!(!w.player.has_arrow);
            assert!(w.arrow.in_flight() && !w.arrow.collected());
            assert_eq!(w.arrow.pos, Cell::START);
            assert_eq!(events, vec![GameEvent::ArrowLoosed, GameEvent::ArrowMissed { landed: Cell::START }]);
            assert_eq!(w.message(), "Your arrow missed! It landed at A0. Go retrieve it!");

            assert_ne!(w.dragon.pos, w.player.pos);
            assert_ne!(w.dragon.pos, w.arrow.pos);
            assert!(!w.pits.contains(&w.dragon.pos), "seed {seed}");
        }
    }

    #[test]
    fn landed_arrow_is_retrieved() {
        let mut w = world(layout(c(5, 5)));
        arm(&mut w);
        w.apply(Intent::InitiateShoot);
        w.apply(Intent::Shoot(Direction::North));
        // Dragon may have moved next to the start; keep it away.
        w.dragon.pos = c(5, 5);

        assert_eq!(w.direction_intent(Direction::East), Intent::Move(Direction::East));
        w.apply(Intent::Move(Direction::East));
        let events = w.apply(Intent::Move(Direction::West));
        assert!(events.contains(&GameEvent::ArrowRetrieved));
        assert!(w.player.has_arrow && w.arrow.collected());
        assert_eq!(w.message(), ARROW_RETRIEVED);
    }

    #[test]
    fn shooting_needs_the_arrow() {
        let mut w = world(layout(c(5, 5)));
        let events = w.apply(Intent::InitiateShoot);
        assert!(events.is_empty());
        assert_eq!(w.mode, Mode::Exploring);
        assert_eq!(w.message(), NO_ARROW);

        // Shoot outside aiming is ignored.
        w.apply(Intent::Shoot(Direction::East));
        assert!(w.dragon.alive);
        assert_eq!(w.player.facing, Direction::North);
    }

    #[test]
    fn cancel_returns_to_exploring() {
        let mut w = world(layout(c(5, 5)));
        arm(&mut w);
        w.apply(Intent::InitiateShoot);

        // Move is not accepted while aiming.
        w.apply(Intent::Move(Direction::South));
        assert_eq!(w.player.pos, Cell::START);

        w.apply(Intent::CancelShoot);
        assert_eq!(w.mode, Mode::Exploring);
        assert_eq!(w.message(), AIM_CANCELLED);
        assert!(w.player.has_arrow);

        // Cancel with nothing to cancel is a no-op.
        w.apply(Intent::CancelShoot);
        assert_eq!(w.mode, Mode::Exploring);
    }

    #[test]
    fn pickup_combines_with_warnings() {
        let l = Layout { arrow: c(1, 0), pits: vec![c(2, 0)], ..layout(c(5, 5)) };
        let mut w = world(l);
        let events = w.apply(Intent::Move(Direction::East));
        assert!(w.player.has_arrow);
        assert!(events.contains(&GameEvent::ArrowFound));
        assert!(events.contains(&GameEvent::PitNearby));
        assert_eq!(w.message(), "You found the magical arrow! | You feel a breeze... pit nearby!");
    }

    #[test]
    fn rope_pickup() {
        let l = Layout { rope: c(0, 1), ..layout(c(5, 5)) };
        let mut w = world(l);
        let events = w.apply(Intent::Move(Direction::South));
        assert!(w.player.has_rope && w.rope.collected);
        assert_eq!(events, vec![GameEvent::Moved { to: c(0, 1) }, GameEvent::RopeFound]);
        assert_eq!(w.message(), ROPE_FOUND);
    }

    #[test]
    fn warnings_come_in_fixed_order() {
        // From (1,0): dragon east, pit south, bat north.
        let l = Layout { pits: vec![c(1, 1)], bats: vec![c(1, 9)], ..layout(c(2, 0)) };
        let mut w = world(l);
        let events = w.apply(Intent::Move(Direction::East));
        assert_eq!(
            w.message(),
            "DRAGON roars nearby! | You feel a breeze... pit nearby! | You hear flapping wings...",
        );
        assert_eq!(&events[1..], &[GameEvent::DragonNearby, GameEvent::PitNearby, GameEvent::BatNearby]);
    }

    #[test]
    fn pit_with_rope_is_survived_once() {
        let l = Layout { pits: vec![c(1, 0)], ..layout(c(5, 5)) };
        let mut w = world(l);
        w.player.has_rope = true;
        w.rope.collected = true;

        let events = w.apply(Intent::Move(Direction::East));
        assert!(events.contains(&GameEvent::PitSurvived));
        assert!(!w.player.has_rope);
        assert!(w.rope.collected);
        assert_eq!(w.mode, Mode::Exploring);
        assert_eq!(w.message(), ROPE_SAVED);

        // Second fall, no rope left.
        w.apply(Intent::Move(Direction::West));
        let events = w.apply(Intent::Move(Direction::East));
        assert!(events.contains(&GameEvent::PitDeath));
        assert_eq!(w.mode, Mode::Over(Death::Pit));
        assert_eq!(w.message(), "You fell into a pit and died! Game Over!");
    }

    #[test]
    fn bat_carries_player_and_disappears() {
        for seed in 0..30 {
            let l = Layout { bats: vec![c(1, 0), c(6, 6)], ..layout(c(5, 5)) };
            let mut w = world_seeded(l, seed);
            let events = w.apply(Intent::Move(Direction::East));

            let to = w.player.pos;
            assert_ne!(to, c(1, 0));
            assert_ne!(to, c(6, 6));
            assert_eq!(w.bats, vec![c(6, 6)]);
            assert!(events.contains(&GameEvent::BatEncounter { from: c(1, 0), to }));

            if to == w.dragon.pos {
                assert_eq!(w.mode, Mode::Over(Death::DroppedOnDragon));
                assert_eq!(w.message(), Death::DroppedOnDragon.message());
            } else {
                assert_eq!(w.mode, Mode::Exploring);
                assert!(w.message().starts_with(&format!("A bat grabbed you and flew you from A1 to {to}!")));
            }
        }
    }

    #[test]
    fn bat_drop_into_pit() {
        // Every cell but the bat's is a pit: the drop always lands in one.
        let pits: Vec<Cell> = Cell::all().filter(|&cell| cell != c(1, 0)).collect();
        let l = Layout { pits, bats: vec![c(1, 0)], ..layout(c(5, 5)) };

        let mut w = world(l.clone());
        w.player.has_rope = true;
        w.dragon.alive = false;
        let events = w.apply(Intent::Move(Direction::East));
        assert!(events.contains(&GameEvent::PitSurvived));
        assert!(!w.player.has_rope);
        assert!(w.bats.is_empty());
        assert!(w.message().contains("! | Landed in a pit! Your rope saved you! (Rope consumed)"));

        let mut w = world(l);
        let events = w.apply(Intent::Move(Direction::East));
        assert!(events.contains(&GameEvent::PitDeath));
        assert_eq!(w.mode, Mode::Over(Death::DroppedInPit));
    }

    #[test]
    fn bat_drop_onto_an_item_does_not_pick_it_up() {
        // Bats everywhere except the arrow and rope cells: the drop lands on one of them.
        let arrow = c(8, 8);
        let rope = c(7, 7);
        let bats: Vec<Cell> = Cell::all().filter(|&cell| cell != arrow && cell != rope).collect();

        for seed in 0..20 {
            let l = Layout { bats: bats.clone(), ..layout(c(5, 5)) };
            let mut w = world_seeded(l, seed);
            let events = w.apply(Intent::Move(Direction::East));

            let to = w.player.pos;
            assert!(to == arrow || to == rope, "seed {seed} landed on {to}");
            assert!(events.contains(&GameEvent::BatEncounter { from: c(1, 0), to }));
            assert!(!events.contains(&GameEvent::ArrowFound));
            assert!(!events.contains(&GameEvent::RopeFound));
            assert!(!w.player.has_arrow);
            assert!(!w.player.has_rope);
            assert_eq!(w.arrow.state, ArrowState::Unfound);
            assert!(!w.rope.collected);
            assert_eq!(w.mode, Mode::Exploring);
        }
    }

    #[test]
    fn spent_bat_cell_is_plain_floor() {
        let l = Layout { bats: vec![c(1, 0)], ..layout(c(5, 5)) };
        let mut w = world(l);
        w.dragon.alive = false;

        let events = w.apply(Intent::Move(Direction::East));
        assert!(matches!(events[1], GameEvent::BatEncounter { .. }));
        assert!(w.bats.is_empty());

        w.player.pos = Cell::START;
        let events = w.apply(Intent::Move(Direction::East));
        assert_eq!(events, vec![GameEvent::Moved { to: c(1, 0) }]);
        assert_eq!(w.player.pos, c(1, 0));
        assert_eq!(w.message(), MOVING);
    }

    #[test]
    fn new_game_from_any_mode() {
        let mut w = world(layout(c(1, 0)));
        w.apply(Intent::Move(Direction::East));
        assert!(w.is_over());

        let events = w.apply(Intent::NewGame);
        assert_eq!(events[0], GameEvent::GameStarted);
        assert_eq!(w.mode, Mode::Exploring);
        assert_eq!(w.player.pos, Cell::START);
        assert!(w.session.is_running());
        assert_eq!(w.bats.len(), 3);
        assert!(w.message().starts_with(OPENING));
    }

    #[test]
    fn mute_is_not_an_engine_concern() {
        let mut w = world(layout(c(5, 5)));
        let before = w.message().to_string();
        assert!(w.apply(Intent::ToggleMute).is_empty());
        assert_eq!(w.message(), before);
        assert_eq!(w.mode, Mode::Exploring);
    }
}
