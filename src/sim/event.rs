/// Events emitted while resolving an intent.
/// The presentation layer consumes these for sound and flashes; the
/// message string on the world carries the human-readable version.

use crate::domain::topology::Cell;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted,
    Moved { to: Cell },
    ArrowFound,
    RopeFound,
    ArrowRetrieved,
    PitSurvived,
    PitDeath,
    Devoured,
    /// Fired on every shot, hit or miss.
    ArrowLoosed,
    DragonSlain { score: u64 },
    ArrowMissed { landed: Cell },
    BatEncounter { from: Cell, to: Cell },
    DragonNearby,
    PitNearby,
    BatNearby,
}

impl GameEvent {
    /// Does this event end the game?
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::PitDeath | GameEvent::Devoured | GameEvent::DragonSlain { .. })
    }
}
