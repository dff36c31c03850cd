/// Keyboard input.
///
/// The game is turn-based, so only fresh key presses matter: each press
/// becomes at most one `Command`, in the order the terminal delivered them.
/// Release events are ignored, and so are auto-repeats when the terminal
/// reports them separately (holding an arrow key must not sprint through
/// the dungeon).
///
/// Key map:
///   ←→↑↓ / WASD    direction (move, or fire while aiming)
///   Space / Enter  shoot (enter aiming)
///   Esc            cancel aiming, or close help
///   N              new game
///   M              mute
///   H / F1 / ?     help
///   Q / Ctrl-C     quit

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::topology::Direction;

/// A device-independent player command. Gamepad input produces these too.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Direction(Direction),
    Shoot,
    Cancel,
    NewGame,
    Mute,
    Help,
    Quit,
}

pub struct InputState {
    /// Commands decoded during the most recent `drain_events()` call.
    commands: Vec<Command>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { commands: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame, before applying commands.
    pub fn drain_events(&mut self) {
        self.commands.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if let Some(cmd) = command_for(&key) {
                    self.commands.push(cmd);
                }
            }
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

/// Decode one key event. `None` for releases, repeats and unbound keys.
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::Quit),
            _ => None,
        };
    }

    let cmd = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Direction(Direction::North),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Command::Direction(Direction::East),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Direction(Direction::South),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Command::Direction(Direction::West),
        KeyCode::Char(' ') | KeyCode::Enter => Command::Shoot,
        KeyCode::Esc => Command::Cancel,
        KeyCode::Char('n') | KeyCode::Char('N') => Command::NewGame,
        KeyCode::Char('m') | KeyCode::Char('M') => Command::Mute,
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') | KeyCode::F(1) => Command::Help,
        KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}
