/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Direction (move, or fire while aiming)
///   A                     →  Shoot
///   B                     →  Cancel aim / close help
///   Start                 →  New game
///   Select                →  Mute
///   Y                     →  Help
///
/// Only edge presses count: a held D-pad or stick fires one direction.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::topology::Direction;
use crate::ui::input::Command;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    shoot: Vec<Btn>,
    cancel: Vec<Btn>,
    new_game: Vec<Btn>,
    mute: Vec<Btn>,
    help: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            shoot:    vec![Btn::A],
            cancel:   vec![Btn::B],
            new_game: vec![Btn::Start],
            mute:     vec![Btn::Select],
            help:     vec![Btn::Y],
        }
    }
}

impl ActionMap {
    /// Empty or unknown lists keep the current buttons.
    fn apply_config(&mut self, cfg: &GamepadConfig) {
        fn assign(slot: &mut Vec<Btn>, names: &[String]) {
            let btns: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if !btns.is_empty() { *slot = btns; }
        }
        assign(&mut self.shoot, &cfg.shoot);
        assign(&mut self.cancel, &cfg.cancel);
        assign(&mut self.new_game, &cfg.new_game);
        assign(&mut self.mute, &cfg.mute);
        assign(&mut self.help, &cfg.help);
    }

    /// Commands for the buttons pressed this frame, in a fixed order.
    fn commands(&self, pressed: &[Btn]) -> Vec<Command> {
        let hit = |btns: &[Btn]| btns.iter().any(|b| pressed.contains(b));
        let mut out = Vec::new();
        if hit(&self.cancel) { out.push(Command::Cancel); }
        if hit(&self.shoot) { out.push(Command::Shoot); }
        if hit(&self.new_game) { out.push(Command::NewGame); }
        if hit(&self.mute) { out.push(Command::Mute); }
        if hit(&self.help) { out.push(Command::Help); }
        out
    }
}

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Buttons that went down since the last `update()`.
    pressed: Vec<Btn>,
    /// D-pad directions that went down since the last `update()`.
    dpad: Vec<Direction>,

    // Stick, reduced to one digital direction
    stick_x: f32,
    stick_y: f32,
    stick_dir: Option<Direction>,
    stick_fresh: bool,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::warn!("Gamepad support unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            pressed: Vec::with_capacity(4),
            dpad: Vec::with_capacity(4),
            stick_x: 0.0,
            stick_y: 0.0,
            stick_dir: None,
            stick_fresh: false,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map.apply_config(cfg);
    }

    pub fn update(&mut self) {
        self.pressed.clear();
        self.dpad.clear();
        self.stick_fresh = false;

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    /// Commands from this frame's presses: directions first, then buttons.
    pub fn commands(&self) -> Vec<Command> {
        let mut out: Vec<Command> = self.dpad.iter().map(|&d| Command::Direction(d)).collect();
        if self.stick_fresh {
            if let Some(d) = self.stick_dir {
                out.push(Command::Direction(d));
            }
        }
        out.extend(self.action_map.commands(&self.pressed));
        out
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.press_button(btn);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    self.connected = true;
                    log::info!("Gamepad connected");
                }
                EventType::Disconnected => {
                    self.connected = false;
                    self.stick_x = 0.0;
                    self.stick_y = 0.0;
                    log::info!("Gamepad disconnected");
                }
                _ => {}
            }
        }

        let dir = stick_direction(self.stick_x, self.stick_y);
        if dir != self.stick_dir {
            self.stick_fresh = dir.is_some();
            self.stick_dir = dir;
        }
    }

    #[cfg(feature = "gamepad")]
    fn press_button(&mut self, gilrs_btn: Button) {
        // D-pad handled separately (not in Btn enum)
        let dir = match gilrs_btn {
            Button::DPadUp    => Some(Direction::North),
            Button::DPadRight => Some(Direction::East),
            Button::DPadDown  => Some(Direction::South),
            Button::DPadLeft  => Some(Direction::West),
            _ => None,
        };
        if let Some(d) = dir {
            self.dpad.push(d);
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.pressed.push(btn);
        }
    }
}

/// Dominant stick axis past the deadzone. gilrs reports +Y as up.
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
fn stick_direction(x: f32, y: f32) -> Option<Direction> {
    if x.abs() < STICK_DEADZONE && y.abs() < STICK_DEADZONE {
        return None;
    }
    Some(if x.abs() >= y.abs() {
        if x > 0.0 { Direction::East } else { Direction::West }
    } else if y > 0.0 {
        Direction::North
    } else {
        Direction::South
    })
}
