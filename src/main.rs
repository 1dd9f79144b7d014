//! partner-import - load customers from a CSV file into Odoo.
//!
//! Each row becomes one `res.partner` created over XML-RPC. Rows the server
//! declines are reported and skipped; any other error stops the run.

mod config;
mod error;
mod models;
mod services;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::services::{ConsoleReporter, OdooClient, Reporter};

/// partner-import - CSV to Odoo partner importer
///
/// Importing the same file twice creates every partner twice: nothing on
/// either side deduplicates.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// CSV file with a header row (default: [import].csv_path)
    csv: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file path (default: ~/.config/partner-import/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Odoo base URL
    #[arg(long, env = "ODOO_URL")]
    url: Option<String>,

    /// Odoo database name
    #[arg(long, env = "ODOO_DB")]
    database: Option<String>,

    /// Odoo login
    #[arg(long, env = "ODOO_USERNAME")]
    username: Option<String>,

    /// Odoo password or API key
    #[arg(long, env = "ODOO_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Abort on the first row the server declines
    #[arg(long)]
    stop_on_rejection: bool,
}

impl Args {
    /// Layer flag and environment values over the file config.
    fn apply(self, config: &mut config::Config) {
        if let Some(url) = self.url {
            config.odoo.url = url;
        }
        if let Some(database) = self.database {
            config.odoo.database = database;
        }
        if let Some(username) = self.username {
            config.odoo.username = username;
        }
        if let Some(password) = self.password {
            config.odoo.password = password;
        }
        if let Some(csv) = self.csv {
            config.import.csv_path = csv;
        }
        if self.stop_on_rejection {
            config.import.stop_on_rejection = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let filter = if args.debug {
        "partner_import=debug,info"
    } else {
        "partner_import=info,warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut reporter = ConsoleReporter::stdout();
    if import(args, &mut reporter).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Resolve settings and run the import. A setup failure ends the run like
/// any other fault, with the same final status line.
async fn import(args: Args, reporter: &mut dyn Reporter) -> bool {
    match prepare(args) {
        Ok((config, client)) => services::run(&client, &config, reporter).await,
        Err(err) => {
            tracing::error!("setup failed: {:#}", err);
            reporter.error(&format!("{:#}", err));
            reporter.finished(false);
            false
        }
    }
}

/// Load configuration, layer flags over it and build the client.
fn prepare(args: Args) -> Result<(config::Config, OdooClient)> {
    let mut config = if let Some(path) = &args.config {
        config::Config::from_file(path)?
    } else {
        config::Config::load()?
    };
    args.apply(&mut config);
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");

    let client = OdooClient::new(&config.odoo.url, config.odoo.timeout())?;
    Ok((config, client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    // Only values without an `env` fallback are asserted when no flag sets
    // them, so exported ODOO_* variables cannot change the outcome.
    #[test]
    fn test_flags_override_file_config() {
        let args = Args::try_parse_from([
            "partner-import",
            "new.csv",
            "--url",
            "https://erp.example.com",
            "--database",
            "staging",
            "--username",
            "importer",
            "--stop-on-rejection",
        ])
        .unwrap();

        let mut config = config::Config::default();
        config.odoo.database = "prod".to_string();
        config.odoo.username = "admin".to_string();
        config.import.csv_path = "old.csv".to_string();
        args.apply(&mut config);

        assert_eq!(config.odoo.url, "https://erp.example.com");
        assert_eq!(config.odoo.database, "staging");
        assert_eq!(config.odoo.username, "importer");
        assert_eq!(config.import.csv_path, "new.csv");
        assert!(config.import.stop_on_rejection);
    }

    #[test]
    fn test_file_config_kept_without_flags() {
        let args = Args::try_parse_from(["partner-import"]).unwrap();

        let mut config = config::Config::default();
        config.import.csv_path = "old.csv".to_string();
        args.apply(&mut config);

        assert_eq!(config.import.csv_path, "old.csv");
        assert!(!config.import.stop_on_rejection);
    }

    #[tokio::test]
    async fn test_setup_failure_reports_failed_run() {
        let empty_config = NamedTempFile::new().unwrap();
        let config_path = empty_config.path().to_string_lossy().to_string();
        let args = Args::try_parse_from([
            "partner-import",
            "customers.csv",
            "--config",
            config_path.as_str(),
            "--url",
            "erp.example.com",
            "--database",
            "prod",
            "--username",
            "admin",
        ])
        .unwrap();

        let mut reporter = ConsoleReporter::new(Vec::new());
        let success = import(args, &mut reporter).await;
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(!success);
        assert_eq!(
            lines,
            vec![
                "Error importing customers: Odoo URL must start with http:// or https://, got 'erp.example.com'",
                "Failed to import customers.",
            ]
        );
    }
}
