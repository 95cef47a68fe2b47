//! `hubdocs sync` command implementation.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use hubdocs_config::{CliSettings, Config};
use hubdocs_server::{create_repository, server_config_from_config, sync_retry_policy, sync_with_retry};
use hubdocs_site::SyncReport;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    /// Path to configuration file (default: auto-discover hubdocs.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Post-processor output directory (overrides config).
    #[arg(short = 'd', long)]
    content_dir: Option<PathBuf>,

    /// Search index URL (overrides config).
    #[arg(long, env = "HUBDOCS_INDEX_URL")]
    index_url: Option<String>,

    /// Enable verbose output (log every index write).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SyncArgs {
    /// Execute the sync command.
    ///
    /// Runs in the foreground under the configured outer retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or every sync attempt fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            content_dir: self.content_dir,
            index_url: self.index_url,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let server_config = server_config_from_config(&config);

        output.info(&format!(
            "Syncing {} into {} (prefix {})",
            server_config.content_dir.display(),
            server_config.index.url,
            server_config.index.prefix
        ));

        let repository = create_repository(&server_config);
        let start = Instant::now();
        let report = sync_with_retry(&repository, &sync_retry_policy(&server_config.sync))
            .inspect_err(|e| tracing::error!(error = %e, "Sync failed"))?;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis(), "Sync command finished");

        print_report(&output, &report);
        output.success(&format!(
            "Sync finished in {:.1}s",
            start.elapsed().as_secs_f64()
        ));
        Ok(())
    }
}

fn print_report(output: &Output, report: &SyncReport) {
    output.title("Sync report");
    output.field("added", report.added);
    output.field("updated", report.updated);
    output.field("deleted", report.deleted);
    if report.schema_recreated {
        output.warning("Index mappings changed: every page was reindexed");
    }
}

