//! `hubdocs serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use hubdocs_config::{CliSettings, Config};
use hubdocs_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover hubdocs.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Post-processor output directory (overrides config).
    #[arg(short = 'd', long)]
    content_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Search index URL (overrides config).
    #[arg(long, env = "HUBDOCS_INDEX_URL")]
    index_url: Option<String>,

    /// Enable verbose output (sync progress and request logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Serve immediately and sync in the background.
    #[arg(long)]
    live_reload: Option<bool>,

    /// Sync in the foreground before serving.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let live_reload_enabled = self.resolve_live_reload_enabled();
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            content_dir: self.content_dir,
            index_url: self.index_url,
            live_reload_enabled,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Content directory: {}",
            config.content_resolved.dir.display()
        ));
        output.info(&format!(
            "Search index: {} (prefix {})",
            config.index.url, config.index.prefix
        ));

        if config.live_reload.enabled {
            output.info("Live reload: enabled (syncing in the background)");
        } else {
            output.info("Live reload: disabled (syncing before serving)");
        }

        run_server(server_config_from_config(&config))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Server stopped");
                CliError::Server(e.to_string())
            })?;

        Ok(())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        Harness::parse_from(std::iter::once("serve").chain(args.iter().copied())).args
    }

    #[test]
    fn test_live_reload_unset_defers_to_config() {
        assert_eq!(parse(&[]).resolve_live_reload_enabled(), None);
    }

    #[test]
    fn test_no_live_reload_flag() {
        assert_eq!(parse(&["--no-live-reload"]).resolve_live_reload_enabled(), Some(false));
    }

    #[test]
    fn test_live_reload_flag() {
        assert_eq!(
            parse(&["--live-reload", "true"]).resolve_live_reload_enabled(),
            Some(true)
        );
    }
}
