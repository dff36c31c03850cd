/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use log::{info, warn};

use config::GameConfig;
use sim::turn::Intent;
use sim::world::{Mode, World};
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState};
use ui::renderer::{Frame, Renderer, SoundStatus};
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let (config, config_err) = match GameConfig::load() {
        Ok(cfg) => (cfg, None),
        Err(e) => (GameConfig::default(), Some(e)),
    };

    logging::init(&config.general);
    if let Some(e) = config_err {
        warn!("Config rejected, using defaults: {e}");
    }

    let mut world = match World::seeded(config.rules.clone()) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Could not build a dungeon: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut sound = SoundEngine::new(config.audio.muted);
    if let Some(s) = sound.as_mut() {
        s.start_music();
    }

    let result = game_loop(&mut world, &mut renderer, sound.as_mut(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    if world.is_over() {
        println!("{}", world.message());
    }
    println!("Thanks for playing Dragon Hunt!");
    if world.mode == Mode::Won {
        println!("Final Score: {}", world.score);
    }
    info!("Session ended");
}

/// What the loop does with one command.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Quit,
    ToggleHelp,
    CloseHelp,
    Mute,
    Play(Intent),
    Ignore,
}

/// Route a command. While the help overlay is open only help, mute and
/// quit get through.
fn route(cmd: Command, world: &World, help_open: bool) -> Action {
    match cmd {
        Command::Quit => Action::Quit,
        Command::Help => Action::ToggleHelp,
        Command::Mute => Action::Mute,
        Command::Cancel if help_open => Action::CloseHelp,
        _ if help_open => Action::Ignore,
        Command::Cancel => Action::Play(Intent::CancelShoot),
        Command::Shoot => Action::Play(Intent::InitiateShoot),
        Command::NewGame => Action::Play(Intent::NewGame),
        Command::Direction(d) => Action::Play(world.direction_intent(d)),
    }
}

fn game_loop(
    world: &mut World,
    renderer: &mut Renderer,
    mut sound: Option<&mut SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.general.tick_rate_ms);
    let mut last_draw: Option<Instant> = None;
    let mut help_open = false;

    loop {
        kb.drain_events();
        gp.update();

        let mut commands: Vec<Command> = kb.commands().to_vec();
        commands.extend(gp.commands());
        let dirty = !commands.is_empty();

        for cmd in commands {
            match route(cmd, world, help_open) {
                Action::Quit => return Ok(()),
                Action::ToggleHelp => help_open = !help_open,
                Action::CloseHelp => help_open = false,
                Action::Mute => {
                    world.apply(Intent::ToggleMute);
                    if let Some(s) = sound.as_deref_mut() {
                        let muted = s.toggle_mute();
                        info!("Sound {}", if muted { "muted" } else { "unmuted" });
                    }
                }
                Action::Play(intent) => {
                    let events = world.apply(intent);
                    if events.iter().any(|e| e.is_terminal()) {
                        info!("Game over: {}", world.message());
                    }
                    if let Some(s) = sound.as_deref_mut() {
                        s.play_events(&events);
                    }
                }
                Action::Ignore => {}
            }
        }

        // Redraw on input, and on the tick so the clock keeps moving.
        let due = last_draw.map_or(true, |t| t.elapsed() >= tick_rate);
        if dirty || due {
            let snap = world.snapshot();
            let status = match sound.as_deref() {
                Some(s) if s.is_muted() => SoundStatus::Muted,
                Some(_) => SoundStatus::On,
                None => SoundStatus::Unavailable,
            };
            let frame = Frame {
                snap: &snap,
                message: world.message(),
                sound: status,
                gamepad: gp.connected,
                help: help_open,
            };
            renderer.render(&frame)?;
            last_draw = Some(Instant::now());
        }

        std::thread::sleep(FRAME_SLEEP);
    }
}
