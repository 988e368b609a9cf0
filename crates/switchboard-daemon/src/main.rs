//! # switchboard-daemon
//!
//! switchboard hub binary. Loads settings, wires the local plugin runtime
//! into the hub, and serves the WebSocket gateway until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use switchboard_core::constants::BRIDGE_SERVICE_MODULE;
use switchboard_server::{Hub, LocalRuntime, PageStateModule, ServerConfig, SwitchboardServer};
use switchboard_settings::SwitchboardSettings;

/// switchboard connection hub.
#[derive(Parser, Debug)]
#[command(name = "switchboard", about = "switchboard connection hub", version)]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.switchboard/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `switchboard_server=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Layer command-line flags over loaded settings.
    fn apply(&self, settings: &mut SwitchboardSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

fn load(cli: &Cli) -> Result<SwitchboardSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(switchboard_settings::settings_path);
    let mut settings = switchboard_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    Ok(settings)
}

/// Wire the local runtime, hub, and server from settings.
fn build_server(settings: &SwitchboardSettings) -> SwitchboardServer {
    let runtime = Arc::new(LocalRuntime::new(settings.tools.clone()));
    runtime.register_module(BRIDGE_SERVICE_MODULE, Arc::new(PageStateModule::new()));
    let hub = Arc::new(Hub::new(runtime, settings.tools.internal.clone()));
    SwitchboardServer::new(ServerConfig::from(settings), hub)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    if settings.logging.json {
        switchboard_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        switchboard_core::logging::init_subscriber(&settings.logging.level);
    }

    if settings.auth.shared_secret.is_empty() {
        tracing::warn!(
            "no shared secret configured; every handshake will be refused \
             (set auth.sharedSecret or SWITCHBOARD_SECRET)"
        );
    }

    let mut server = build_server(&settings);
    match switchboard_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics recorder not installed"),
    }

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;
    tracing::info!(
        "switchboard {} listening on ws://{addr}",
        switchboard_core::constants::VERSION
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
