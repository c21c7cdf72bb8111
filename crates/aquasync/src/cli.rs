// ── CLI argument definitions ──

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "aquasync",
    about = "Watch and control a Tuya-cloud irrigation controller",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the config file (default: platform config dir).
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and print the reconciled device state once.
    Status,

    /// Run the sync engine and print every state change until Ctrl-C.
    Watch,

    /// Start watering.
    On,

    /// Stop watering.
    Off,

    /// Select the operating mode.
    Mode {
        /// Mode code, e.g. "auto" or "manual".
        mode: String,
    },

    /// Set the cooldown timer.
    Cooldown {
        /// Value in vendor units (usually seconds).
        value: f64,
    },

    /// Select the pump.
    Pump {
        /// Pump identifier.
        pump: String,
    },

    /// Print the cached device specification.
    Spec,

    /// Write a starter config file to stdout.
    ConfigInit,
}
