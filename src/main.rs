//! # diseqc-ctl
//!
//! Drive DiSEqC switches, rotors and Unicable (SCR) routers from a Linux
//! DVB-S frontend.
//!
//! # Examples
//!
//! ```bash
//! diseqc-ctl switch --frequency 11494 --polarization h
//! diseqc-ctl rotate --position 1
//! diseqc-ctl rotor drive-east 10
//! diseqc-ctl scr-tune --frequency 12603 --polarization v
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use diseqc_ctl::config::{Config, LoggingConfig};
use diseqc_ctl::control::rotor::{self, DriveMode, RotorCommand, RotorState};
use diseqc_ctl::control::{scr, switch};
use diseqc_ctl::frontend::{FrontendIo, Sleeper, TokioSleeper};
use diseqc_ctl::lnb::{Polarization, Transponder};
use diseqc_ctl::transport::BusTransport;

/// Command line interface
#[derive(Debug, Parser)]
#[command(name = "diseqc-ctl", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Select the LNB for a transponder through the switch cascade
    Switch {
        /// Transponder frequency, MHz
        #[arg(long)]
        frequency: u32,
        #[arg(long, value_parser = parse_polarization)]
        polarization: Polarization,
    },
    /// Drive the dish to a stored rotor position
    Rotate {
        #[arg(long)]
        position: i32,
        /// Transponder to restore band and voltage for, MHz
        #[arg(long)]
        frequency: Option<u32>,
        #[arg(long, value_parser = parse_polarization, default_value = "v")]
        polarization: Polarization,
    },
    /// Send a single positioner command
    Rotor {
        #[command(subcommand)]
        action: RotorAction,
    },
    /// Read the positioner status (DiSEqC 2.2)
    Status,
    /// Program the Unicable user band for a transponder
    ScrTune {
        /// Transponder frequency, MHz
        #[arg(long)]
        frequency: u32,
        #[arg(long, value_parser = parse_polarization)]
        polarization: Polarization,
    },
    /// Release the Unicable user band
    ScrOff,
}

#[derive(Debug, Subcommand)]
enum RotorAction {
    Halt,
    LimitsOff,
    LimitsOn,
    LimitEast,
    LimitWest,
    /// Drive east, continuously without a step count
    DriveEast { steps: Option<u8> },
    /// Drive west, continuously without a step count
    DriveWest { steps: Option<u8> },
    Store { slot: u8 },
    Goto { slot: u8 },
    Recalculate { slot: u8 },
}

impl RotorAction {
    fn command(&self) -> RotorCommand {
        let drive = |steps: Option<u8>| steps.map_or(DriveMode::Continuous, DriveMode::Steps);
        match *self {
            RotorAction::Halt => RotorCommand::Halt,
            RotorAction::LimitsOff => RotorCommand::DisableLimits,
            RotorAction::LimitsOn => RotorCommand::EnableLimits,
            RotorAction::LimitEast => RotorCommand::SetEastLimit,
            RotorAction::LimitWest => RotorCommand::SetWestLimit,
            RotorAction::DriveEast { steps } => RotorCommand::DriveEast(drive(steps)),
            RotorAction::DriveWest { steps } => RotorCommand::DriveWest(drive(steps)),
            RotorAction::Store { slot } => RotorCommand::StorePosition(slot),
            RotorAction::Goto { slot } => RotorCommand::GotoPosition(slot),
            RotorAction::Recalculate { slot } => RotorCommand::Recalculate(slot),
        }
    }
}

fn parse_polarization(value: &str) -> std::result::Result<Polarization, String> {
    let mut chars = value.chars();
    match (chars.next().and_then(Polarization::from_letter), chars.next()) {
        (Some(polarization), None) => Ok(polarization),
        _ => Err(format!("expected one of h, v, l, r, got '{}'", value)),
    }
}

fn transponder_from_mhz(frequency_mhz: u32, polarization: Polarization) -> Result<Transponder> {
    Transponder::from_mhz(frequency_mhz, polarization)
        .with_context(|| format!("frequency {} MHz is out of range", frequency_mhz))
}

/// Set up console logging, plus a file writer when configured
///
/// `RUST_LOG` overrides the configured level. The returned guard must live
/// until exit so buffered file output is flushed.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let Some(path) = &logging.file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("log file path {} has no file name", path.display()))?;
    let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let config = if config_found {
        Config::load(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        Config::default()
    };

    let _guard = init_logging(&config.logging)?;
    info!("diseqc-ctl v{} starting...", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!("No configuration at {}, using defaults", cli.config.display());
    }

    #[cfg(target_os = "linux")]
    {
        let frontend = diseqc_ctl::frontend::linux::LinuxFrontend::open(config.frontend.adapter, config.frontend.frontend)?;
        let mut bus = BusTransport::new(frontend, TokioSleeper);
        run(&cli.command, &config, &mut bus).await
    }

    #[cfg(not(target_os = "linux"))]
    {
        bail!("DVB frontends are only supported on Linux")
    }
}

async fn run<F: FrontendIo, S: Sleeper>(command: &Command, config: &Config, bus: &mut BusTransport<F, S>) -> Result<()> {
    let lnb = config.lnb.params()?;

    match command {
        Command::Switch { frequency, polarization } => {
            let transponder = transponder_from_mhz(*frequency, *polarization)?;
            let hiband = lnb.tone_hiband(transponder.frequency_khz);

            switch::select_switch(
                bus,
                config.switch.committed,
                polarization.uses_18v(),
                hiband,
                config.switch.uncommitted,
            )
            .await?;

            info!(
                "Switched to {} MHz {:?}, tune to IF {} kHz",
                frequency,
                polarization,
                lnb.intermediate_frequency_khz(&transponder)
            );
        }

        Command::Rotate {
            position,
            frequency,
            polarization,
        } => {
            let catalog = config.satellite_table();
            if catalog.is_empty() {
                warn!("No [[satellites]] configured");
            }

            let hiband = match frequency {
                Some(f) => lnb.tone_hiband(transponder_from_mhz(*f, *polarization)?.frequency_khz),
                None => false,
            };
            let mut state = RotorState::new().with_reply_timeout(config.frontend.reply_timeout());

            let outcome = rotor::move_to(bus, &catalog, &mut state, *position, polarization.uses_18v(), hiband).await?;
            info!("Rotor: {:?}", outcome);
        }

        Command::Rotor { action } => {
            rotor::command_positioner(bus, action.command()).await?;
            info!("Rotor command {:?} sent", action);
        }

        Command::Status => {
            let status = rotor::read_positioner_status(bus, config.frontend.reply_timeout()).await?;
            info!(
                "Positioner status 0x{:02x}: complete={} running={} west={} soft_limits={} soft_limit={} hard_limit={} no_power={} no_reference={}",
                status.0,
                status.movement_complete(),
                status.motor_running(),
                status.moving_west(),
                status.soft_limits_enabled(),
                status.soft_limit_reached(),
                status.hard_limit_reached(),
                status.no_power(),
                status.no_reference_position()
            );
        }

        Command::ScrTune { frequency, polarization } => {
            let Some(section) = &config.scr else {
                bail!("scr-tune needs an [scr] section in the configuration");
            };
            let scr_config = section.scr_config()?;
            let transponder = transponder_from_mhz(*frequency, *polarization)?;

            let tuning = scr::tune(bus, &transponder, &lnb, &scr_config, section.repeat).await?;
            info!("Tune the receiver to {} MHz", tuning.tune_frequency_mhz());
        }

        Command::ScrOff => {
            let Some(section) = &config.scr else {
                bail!("scr-off needs an [scr] section in the configuration");
            };
            scr::power_off(bus, &section.scr_config()?).await?;
        }
    }

    Ok(())
}
