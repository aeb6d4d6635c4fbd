// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use neostrip::config::{self, Config};
use neostrip::controller::Controller;
use neostrip::dispatcher::Dispatcher;
use neostrip::effects::{Effect, EffectKind};
use neostrip::manager::EffectManager;
use neostrip::strip;
use neostrip::transport::{OscTransport, Transport};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=LED strip effect engine

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/neostrip
ExecStart=/usr/local/bin/neostrip start "$NEOSTRIP_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=neostrip.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An effect engine for addressable LED strips."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the effect engine and listens for commands.
    Start {
        /// The path to the configuration file.
        config_path: String,
    },
    /// Lists the effects that can be selected by name.
    Effects {},
    /// Sends a single command payload to a running engine over OSC.
    Send {
        /// The address of the running engine, e.g. 127.0.0.1:43770.
        addr: SocketAddr,
        /// The command topic, e.g. /home/neopixels/set.
        topic: String,
        /// The JSON command.
        payload: String,
    },
    /// Generate a systemd unit file for neostrip.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => start(&PathBuf::from(config_path)).await?,
        Commands::Effects {} => {
            println!("Effects:");
            for kind in EffectKind::SELECTABLE {
                let effect = Effect::from_kind(kind);
                match effect.group_size() {
                    Some(group_size) => println!(
                        "- {} (interval: {}ms, group size: {})",
                        kind,
                        effect.update_interval().as_millis(),
                        group_size
                    ),
                    None => println!(
                        "- {} (interval: {}ms)",
                        kind,
                        effect.update_interval().as_millis()
                    ),
                }
            }
        }
        Commands::Send {
            addr,
            topic,
            payload,
        } => OscTransport::send_once(addr, &topic, &payload).await?,
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}

/// Runs the engine until interrupted, then turns the strip off.
async fn start(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = Config::deserialize(config_path)?;
    let manager = Arc::new(EffectManager::new(strip::from_config(config.strip())?)?);
    let dispatcher = Arc::new(Dispatcher::new(manager.clone(), config.retain_effect()));
    let transport: Arc<dyn Transport> = match config.transport() {
        config::Transport::Osc(osc) => Arc::new(OscTransport::new(osc)?),
    };
    let mut controller = Controller::new(dispatcher, transport, config.topics());

    tokio::select! {
        result = controller.join() => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down.");
        }
    }

    manager.shutdown();
    Ok(())
}
