use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{error, info};

use voicestars::audio::{MicrophoneSource, SimulatedSource};
use voicestars::hud::{status_line, Viewport};
use voicestars::{AmplitudeSource, Config, SessionController, SettingsStore, TomlSettingsStore};

/// Lift the astronaut with your voice and collect the stars.
#[derive(Parser, Debug)]
#[command(name = "voicestars", version, about)]
struct Cli {
    /// Config file (defaults to ./voicestars.toml when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one game.
    Play {
        /// Difficulty to play (also saved as the new preference).
        #[arg(long)]
        difficulty: Option<String>,
        /// Use a random simulated voice instead of the microphone.
        #[arg(long)]
        simulate: bool,
        /// Give up after this many seconds.
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
    /// Inspect or change the difficulty preference.
    Difficulty {
        #[command(subcommand)]
        action: DifficultyAction,
    },
    /// List audio input devices.
    Devices,
}

#[derive(Subcommand, Debug)]
enum DifficultyAction {
    /// Show every available difficulty.
    List,
    /// Show the saved preference.
    Show,
    /// Save a new preference.
    Set { name: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Command::Play { difficulty, simulate, seconds } => {
            play(&config, difficulty.as_deref(), simulate, Duration::from_secs(seconds))
        }
        Command::Difficulty { action } => manage_difficulty(&config, action),
        Command::Devices => match MicrophoneSource::input_device_names() {
            Ok(names) => {
                for name in names {
                    println!("{name}");
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("{err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn play(config: &Config, difficulty: Option<&str>, simulate: bool, limit: Duration) -> ExitCode {
    let source: Box<dyn AmplitudeSource> = if simulate {
        Box::new(SimulatedSource::default())
    } else {
        Box::new(MicrophoneSource::new(config.input_device.clone(), config.amplitude_gain))
    };
    let settings = TomlSettingsStore::new(&config.settings_path);
    let mut session = SessionController::new(source, settings, config.registry());

    if let Some(name) = difficulty {
        if let Err(err) = session.set_difficulty_by_name(name) {
            error!("{err}; available: {}", session.registry().names().join(", "));
            return ExitCode::FAILURE;
        }
    }

    let view = Viewport::new(config.screen_width, config.screen_height);
    let updates = session.subscribe();

    if let Err(err) = session.start() {
        error!("{err}");
        eprintln!(
            "Microphone unavailable. Check the input device and permissions, then try again."
        );
        return ExitCode::FAILURE;
    }
    println!(
        "Difficulty '{}'. Make a sound to lift off!",
        session.state().difficulty.name
    );

    let tick = session.state().difficulty.check_interval() * 2;
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        session.wait_for_samples(tick);

        if let Some(state) = updates.latest() {
            println!(
                "{}  (x {:.0}, y {:.0})",
                status_line(&state),
                view.level_x(state.current_level_index),
                view.avatar_y(state.position_y)
            );
        }
        if session.consume_star_animation() {
            println!(
                "* star collected! ({}/{})",
                session.state().stars_collected(),
                session.state().level_count()
            );
        }
        if session.state().should_show_fireworks {
            println!("Fireworks! All stars collected.");
            break;
        }
        if !session.is_detecting() {
            if let Some(err) = session.last_audio_error() {
                error!("{err}");
                eprintln!("Lost the microphone. Reconnect it and start again.");
                return ExitCode::FAILURE;
            }
        }
    }

    session.stop();
    info!(
        "session over: {} of {} stars",
        session.state().stars_collected(),
        session.state().level_count()
    );
    ExitCode::SUCCESS
}

fn manage_difficulty(config: &Config, action: DifficultyAction) -> ExitCode {
    let registry = config.registry();
    let mut settings = TomlSettingsStore::new(&config.settings_path);

    match action {
        DifficultyAction::List => {
            let current = registry.resolve_or_default(settings.load().as_deref());
            for p in registry.profiles() {
                let marker = if p.name == current.name { '>' } else { ' ' };
                println!(
                    "{marker} {:<8} heights {:?}  threshold {:>5.1}  rise {:>6.2}  fall {:>6.2}",
                    p.name, p.level_heights, p.amplitude_threshold, p.rise_speed, p.fall_speed
                );
            }
            ExitCode::SUCCESS
        }
        DifficultyAction::Show => {
            println!("{}", registry.resolve_or_default(settings.load().as_deref()).name);
            ExitCode::SUCCESS
        }
        DifficultyAction::Set { name } => {
            let profile = match registry.resolve(&name) {
                Ok(profile) => profile,
                Err(err) => {
                    error!("{err}; available: {}", registry.names().join(", "));
                    return ExitCode::FAILURE;
                }
            };
            match settings.save(&profile.name) {
                Ok(()) => {
                    println!("difficulty set to {}", profile.name);
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    error!("{err}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
