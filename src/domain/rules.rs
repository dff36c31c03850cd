/// Hazard queries and the proximity scan.
///
/// Pure functions over an immutable view of the dungeon, no side effects.
/// These answer "what is here" and "what is next to me" without changing
/// anything; the turn engine decides what happens as a result.
///
/// ## Proximity Truth Table
///
/// Each of the four neighbours (N, E, S, W) is tested against every hazard.
/// A hazard kind is reported at most once, however many neighbours match.
/// ┌──────────────────────────┬──────────────────────────────┐
/// │ Neighbour holds           │ Warning                      │
/// ├──────────────────────────┼──────────────────────────────┤
/// │ live dragon               │ DRAGON roars nearby!         │
/// │ any pit                   │ You feel a breeze...         │
/// │ any bat                   │ You hear flapping wings...   │
/// │ dead dragon               │ (nothing)                    │
/// └──────────────────────────┴──────────────────────────────┘
/// Warnings are always listed in the order dragon, pit, bat.

use super::entity::Dragon;
use super::topology::{is_adjacent, Cell, Direction};

pub const DRAGON_WARNING: &str = "DRAGON roars nearby!";
pub const PIT_WARNING: &str = "You feel a breeze... pit nearby!";
pub const BAT_WARNING: &str = "You hear flapping wings...";

/// Immutable view of the hazards for rule queries.
#[derive(Clone, Copy)]
pub struct HazardView<'a> {
    pub pits: &'a [Cell],
    pub bats: &'a [Cell],
    pub dragon: &'a Dragon,
}

impl<'a> HazardView<'a> {
    #[inline]
    pub fn is_pit(&self, cell: Cell) -> bool {
        self.pits.contains(&cell)
    }

    #[inline]
    pub fn is_bat(&self, cell: Cell) -> bool {
        self.bats.contains(&cell)
    }

    #[inline]
    pub fn is_live_dragon(&self, cell: Cell) -> bool {
        self.dragon.is_at(cell)
    }

    /// Scan the four neighbours of `cell`, N, E, S, W.
    pub fn proximity(&self, cell: Cell) -> Proximity {
        let mut prox = Proximity::default();
        for dir in Direction::ALL {
            let near = |target: Cell| is_adjacent(cell, dir, target);
            prox.dragon |= self.dragon.alive && near(self.dragon.pos);
            prox.pit |= self.pits.iter().any(|&p| near(p));
            prox.bat |= self.bats.iter().any(|&b| near(b));
        }
        prox
    }
}

/// Result of a proximity scan: which hazard kinds are adjacent.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Proximity {
    pub dragon: bool,
    pub pit: bool,
    pub bat: bool,
}

impl Proximity {
    pub fn is_quiet(&self) -> bool {
        !(self.dragon || self.pit || self.bat)
    }

    /// Warning strings in fixed order: dragon, pit, bat.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut out = Vec::with_capacity(3);
        if self.dragon { out.push(DRAGON_WARNING); }
        if self.pit { out.push(PIT_WARNING); }
        if self.bat { out.push(BAT_WARNING); }
        out
    }
}

/// Join an optional lead message with proximity warnings using `" | "`.
/// Returns `None` when there is nothing to say.
pub fn compose_message(lead: Option<&str>, prox: Proximity) -> Option<String> {
    if lead.is_none() && prox.is_quiet() {
        return None;
    }
    let mut parts: Vec<&str> = Vec::with_capacity(4);
    if let Some(l) = lead {
        parts.push(l);
    }
    parts.extend(prox.warnings());
    Some(parts.join(" | "))
}
