//! `beeweb serve` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bw_config::{CliSettings, Config, RunMode};
use bw_server::{run_server, server_config_from_config, site_config_from_config};
use bw_site::Site;
use bw_sync::Syncer;
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover beeweb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content root holding docs/, blog/ and products/ (overrides config).
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Re-read content on every request.
    #[arg(long)]
    dev: bool,

    /// Disable background content sync.
    #[arg(long)]
    no_sync: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            content_dir: self.content_dir,
            run_mode: self.dev.then_some(RunMode::Dev),
            sync_enabled: self.no_sync.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        ensure_project_dir(&config.content_resolved.project_dir)?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Content directory: {}",
            config.content_resolved.root_dir.display()
        ));
        output.info(&format!(
            "Locales: {}",
            config.content_resolved.locales.join(", ")
        ));
        if config.is_dev() {
            output.info("Mode: dev (content re-read per request)");
        }

        let syncer = if config.sync.enabled {
            output.info(&format!(
                "Content sync: every {}s",
                config.sync.interval_secs
            ));
            Some(Syncer::from_config(&config)?)
        } else {
            output.info("Content sync: disabled");
            None
        };

        let site = Arc::new(Site::load(site_config_from_config(&config)));
        let server_config = server_config_from_config(&config, version.to_owned());
        run_server(server_config, site, syncer)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Ensure the `.beeweb/` project directory exists with a `.gitignore`.
fn ensure_project_dir(project_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(project_dir)?;

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "# Automatically created by beeweb\n*\n")?;
    }

    Ok(())
}
