/// Logger setup.
///
/// The terminal is in raw alternate-screen mode while the game runs, so log
/// records go to a file instead of stderr. Level comes from `[general]
/// log_level` and can be overridden with `DRAGONHUNT_LOG` (env_logger filter
/// syntax). If the file can't be opened logging is switched off.

use std::fs::{File, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::config::GeneralConfig;

pub const ENV_VAR: &str = "DRAGONHUNT_LOG";

pub fn init(general: &GeneralConfig) {
    let mut builder = Builder::new();

    match open_log_file(&general.log_file) {
        Some(file) => {
            builder
                .filter_level(level_filter(&general.log_level))
                .parse_env(ENV_VAR)
                .format_timestamp_millis()
                .target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(LevelFilter::Off);
        }
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

/// Unknown names fall back to `info`.
pub fn level_filter(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}

fn open_log_file(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}
