mod cli;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use aquasync_core::{Command as DeviceCommand, SessionConfig, SyncEngine};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("error: {err}");
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // No cloud connection needed.
        Command::ConfigInit => {
            let rendered = aquasync_config::to_toml(&aquasync_config::template())?;
            print!("{rendered}");
            Ok(())
        }

        // One-shot commands: single cloud call, errors surface.
        Command::On => oneshot(&cli.global, DeviceCommand::TurnOn).await,
        Command::Off => oneshot(&cli.global, DeviceCommand::TurnOff).await,
        Command::Mode { mode } => oneshot(&cli.global, DeviceCommand::SetMode(mode)).await,
        Command::Cooldown { value } => {
            oneshot(&cli.global, DeviceCommand::SetCooldown(value.round() as i64)).await
        }
        Command::Pump { pump } => oneshot(&cli.global, DeviceCommand::SetPump(pump)).await,

        // Engine-backed commands.
        Command::Status => status(&cli.global).await,
        Command::Spec => spec(&cli.global).await,
        Command::Watch => watch(&cli.global).await,
    }
}

fn load_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    Ok(aquasync_config::load(global.config.as_deref())?)
}

async fn oneshot(global: &GlobalOpts, command: DeviceCommand) -> Result<(), CliError> {
    let config = load_config(global)?;
    SyncEngine::oneshot(config, command).await?;
    println!("ok");
    Ok(())
}

/// Run one refresh cycle and print the reconciled snapshot.
async fn status(global: &GlobalOpts) -> Result<(), CliError> {
    let engine = SyncEngine::new(load_config(global)?)?;
    engine.start().await?;
    let state = engine.state();
    engine.stop().await;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn spec(global: &GlobalOpts) -> Result<(), CliError> {
    let engine = SyncEngine::new(load_config(global)?)?;
    engine.start().await?;
    let specification = engine.specification().await;
    engine.stop().await;

    match specification {
        Some(specification) => println!("{}", serde_json::to_string_pretty(&specification)?),
        None => eprintln!("specification unavailable"),
    }
    Ok(())
}

/// Run the engine and print every state change until Ctrl-C.
async fn watch(global: &GlobalOpts) -> Result<(), CliError> {
    let engine = SyncEngine::new(load_config(global)?)?;
    engine.start().await?;

    println!("{}", serde_json::to_string(&engine.state())?);

    let mut changes = engine.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&state)?);
            }
        }
    }

    engine.stop().await;
    Ok(())
}
