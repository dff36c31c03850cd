/// Dungeon generator.
///
/// ## Placement
///
/// A table of occupied cells is seeded with the start cell (0,0) and its
/// reserved neighbours (0,1) and (1,0). Entities are then drawn in a fixed
/// order (dragon, arrow, rope, pits, bats), each by rejection sampling
/// against everything placed so far.
///
/// ## Validation
///
/// A layout is accepted when the rope OR the arrow can be reached from the
/// start without crossing a pit, the dragon, or a bat. Otherwise the whole
/// layout is thrown away and redrawn, up to `Rules::max_attempts` times.
/// When every attempt fails, the last layout is used anyway and a warning
/// is logged.

use log::{debug, warn};
use rand::Rng;
use thiserror::Error;

use crate::config::Rules;
use crate::domain::entity::Dragon;
use crate::domain::reach::reachable;
use crate::domain::rules::HazardView;
use crate::domain::topology::{Cell, GRID_SIZE};

/// Cells no entity may be generated on.
pub const RESERVED: [Cell; 3] = [
    Cell::START,
    Cell { x: 0, y: 1 },
    Cell { x: 1, y: 0 },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenError {
    #[error("no free cell left to place the {0}")]
    GridFull(&'static str),
}

/// Where everything goes at the start of a game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub dragon: Cell,
    pub arrow: Cell,
    pub rope: Cell,
    pub pits: Vec<Cell>,
    pub bats: Vec<Cell>,
}

/// A layout plus how it was obtained.
#[derive(Clone, Debug)]
pub struct Generated {
    pub layout: Layout,
    pub attempts: u32,
    /// False when the attempt budget ran out and the last layout was kept.
    pub winnable: bool,
}

/// Draw a uniformly random cell for which `excluded` is false.
///
/// Returns `None` if every cell is excluded; otherwise redraws until a hit.
/// At least one admissible cell exists at that point, so each draw succeeds
/// with probability ≥ 1/100 and the loop terminates with probability 1.
pub fn sample_cell<R, F>(rng: &mut R, excluded: F) -> Option<Cell>
where
    R: Rng + ?Sized,
    F: Fn(Cell) -> bool,
{
    if Cell::all().all(&excluded) {
        return None;
    }
    loop {
        let cell = Cell {
            x: rng.gen_range(0..GRID_SIZE),
            y: rng.gen_range(0..GRID_SIZE),
        };
        if !excluded(cell) {
            return Some(cell);
        }
    }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, rules: &Rules) -> Result<Generated, GenError> {
    let budget = rules.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let layout = place_entities(rng, rules)?;
        let winnable = is_winnable(&layout);

        if winnable || attempts >= budget {
            if winnable {
                debug!("Generated winnable layout in {attempts} attempt(s)");
            } else {
                warn!("Could not generate winnable layout after {attempts} attempts, using last attempt");
            }
            log_layout(&layout);
            return Ok(Generated { layout, attempts, winnable });
        }
    }
}

/// One placement pass. No validation.
pub fn place_entities<R: Rng + ?Sized>(rng: &mut R, rules: &Rules) -> Result<Layout, GenError> {
    let mut occupied = [false; GRID_SIZE * GRID_SIZE];
    for cell in RESERVED {
        occupied[cell.index()] = true;
    }

    let dragon = take(rng, &mut occupied, "dragon")?;
    let arrow = take(rng, &mut occupied, "arrow")?;
    let rope = take(rng, &mut occupied, "rope")?;

    let mut pits = Vec::with_capacity(rules.pits);
    for _ in 0..rules.pits {
        pits.push(take(rng, &mut occupied, "pit")?);
    }

    let mut bats = Vec::with_capacity(rules.bats);
    for _ in 0..rules.bats {
        bats.push(take(rng, &mut occupied, "bat")?);
    }

    Ok(Layout { dragon, arrow, rope, pits, bats })
}

/// Can the rope or the arrow be reached on foot from the start?
/// Bats count as walls here even though they vanish after one use.
pub fn is_winnable(layout: &Layout) -> bool {
    let dragon = Dragon::new(layout.dragon);
    let view = HazardView { pits: &layout.pits, bats: &layout.bats, dragon: &dragon };

    reachable(&view, Cell::START, layout.rope, true, true)
        || reachable(&view, Cell::START, layout.arrow, true, true)
}

fn take<R: Rng + ?Sized>(
    rng: &mut R,
    occupied: &mut [bool; GRID_SIZE * GRID_SIZE],
    what: &'static str,
) -> Result<Cell, GenError> {
    let cell = sample_cell(rng, |c| occupied[c.index()]).ok_or(GenError::GridFull(what))?;
    occupied[cell.index()] = true;
    Ok(cell)
}

fn log_layout(layout: &Layout) {
    let list = |cells: &[Cell]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ");
    debug!(
        "Entities placed - Dragon: {}, Arrow: {}, Rope: {}",
        layout.dragon, layout.arrow, layout.rope,
    );
    debug!("Pits at: {}", list(&layout.pits));
    debug!("Bats at: {}", list(&layout.bats));
}
