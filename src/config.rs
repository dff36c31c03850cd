/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Missing keys fall back to sensible defaults; a missing file is not an
/// error. A broken file or impossible rules are reported as `ConfigError`
/// and the caller decides whether to fall back to `GameConfig::default()`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::topology::GRID_SIZE;

/// Cells the generator always keeps free: the start cell and two neighbours.
pub const RESERVED_CELLS: usize = 3;
/// Dragon, arrow, rope.
pub const UNIQUE_ENTITIES: usize = 3;

// ── Errors ──

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{pits} pits + {bats} bats do not fit on the grid (at most {capacity} hazards)")]
    TooCrowded { pits: usize, bats: usize, capacity: usize },

    #[error("max_attempts must be at least 1")]
    NoAttempts,
}

// ── Public Config Struct ──

#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub rules: Rules,
    pub audio: AudioConfig,
    pub gamepad: GamepadConfig,
    pub general: GeneralConfig,
}

/// Dungeon generation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rules {
    pub pits: usize,
    pub bats: usize,
    /// Layouts tried before settling for an unverified one.
    pub max_attempts: u32,
    /// Fixed RNG seed for reproducible dungeons; entropy when `None`.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct AudioConfig {
    pub muted: bool,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub shoot: Vec<String>,
    pub cancel: Vec<String>,
    pub new_game: Vec<String>,
    pub mute: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub tick_rate_ms: u64,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Rules {
    /// Most pits + bats the grid can hold after the reserved cells and
    /// the three unique entities are placed.
    pub fn hazard_capacity() -> usize {
        GRID_SIZE * GRID_SIZE - RESERVED_CELLS - UNIQUE_ENTITIES
    }

    /// Reject rules under which rejection sampling could run out of cells.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = Self::hazard_capacity();
        if self.pits + self.bats > capacity {
            return Err(ConfigError::TooCrowded { pits: self.pits, bats: self.bats, capacity });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            pits: default_pits(),
            bats: default_bats(),
            max_attempts: default_max_attempts(),
            seed: None,
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        let t = TomlGamepad::default();
        GamepadConfig {
            shoot: t.shoot,
            cancel: t.cancel,
            new_game: t.new_game,
            mute: t.mute,
            help: t.help,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            tick_rate_ms: default_tick_rate(),
            log_file: PathBuf::from(default_log_file()),
            log_level: default_log_level(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    game: TomlGame,
    #[serde(default)]
    audio: TomlAudio,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGame {
    #[serde(default = "default_pits")]
    pits: usize,
    #[serde(default = "default_bats")]
    bats: usize,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlAudio {
    #[serde(default)]
    muted: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_shoot")]
    shoot: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_new_game")]
    new_game: Vec<String>,
    #[serde(default = "default_mute")]
    mute: Vec<String>,
    #[serde(default = "default_help")]
    help: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_pits() -> usize { 12 }
fn default_bats() -> usize { 3 }
fn default_max_attempts() -> u32 { 100 }

fn default_shoot() -> Vec<String> { vec!["A".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into()] }
fn default_new_game() -> Vec<String> { vec!["Start".into()] }
fn default_mute() -> Vec<String> { vec!["Select".into()] }
fn default_help() -> Vec<String> { vec!["Y".into()] }

fn default_tick_rate() -> u64 { 100 }   // clock redraw + input poll cadence
fn default_log_file() -> String { "dragonhunt.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlGame {
    fn default() -> Self {
        TomlGame {
            pits: default_pits(),
            bats: default_bats(),
            max_attempts: default_max_attempts(),
            seed: None,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            shoot: default_shoot(),
            cancel: default_cancel(),
            new_game: default_new_game(),
            mute: default_mute(),
            help: default_help(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/dragonhunt`. No file at all means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;

        let rules = Rules {
            pits: toml_cfg.game.pits,
            bats: toml_cfg.game.bats,
            max_attempts: toml_cfg.game.max_attempts,
            seed: toml_cfg.game.seed,
        };
        rules.validate()?;

        Ok(GameConfig {
            rules,
            audio: AudioConfig { muted: toml_cfg.audio.muted },
            gamepad: GamepadConfig {
                shoot: toml_cfg.gamepad.shoot,
                cancel: toml_cfg.gamepad.cancel,
                new_game: toml_cfg.gamepad.new_game,
                mute: toml_cfg.gamepad.mute,
                help: toml_cfg.gamepad.help,
            },
            general: GeneralConfig {
                tick_rate_ms: toml_cfg.general.tick_rate_ms.max(10),
                log_file: PathBuf::from(toml_cfg.general.log_file),
                log_level: toml_cfg.general.log_level,
            },
        })
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/dragonhunt)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/dragonhunt");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.rules, Rules::default());
        assert_eq!(cfg.rules.pits, 12);
        assert_eq!(cfg.rules.bats, 3);
        assert_eq!(cfg.rules.max_attempts, 100);
        assert_eq!(cfg.rules.seed, None);
        assert!(!cfg.audio.muted);
        assert_eq!(cfg.gamepad.shoot, vec!["A".to_string()]);
        assert_eq!(cfg.general.log_file, PathBuf::from("dragonhunt.log"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[game]\npits = 5\nseed = 42\n\n[audio]\nmuted = true\n",
        ).unwrap();
        assert_eq!(cfg.rules.pits, 5);
        assert_eq!(cfg.rules.bats, 3);
        assert_eq!(cfg.rules.seed, Some(42));
        assert!(cfg.audio.muted);
        assert_eq!(cfg.general.tick_rate_ms, 100);
    }

    #[test]
    fn crowded_grid_is_rejected() {
        let err = GameConfig::from_toml_str("[game]\npits = 90\nbats = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::TooCrowded { pits: 90, bats: 10, capacity: 94 }));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = GameConfig::from_toml_str("[game]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoAttempts));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = GameConfig::from_toml_str("[game\npits = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\nlog_level = \"debug\"\ntick_rate_ms = 1").unwrap();
        let cfg = GameConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.general.log_level, "debug");
        // clamped so the loop never spins
        assert_eq!(cfg.general.tick_rate_ms, 10);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GameConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn default_rules_are_valid() {
        assert!(Rules::default().validate().is_ok());
        assert_eq!(Rules::hazard_capacity(), 94);
    }
}
