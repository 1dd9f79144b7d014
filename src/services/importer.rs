//! Batch import: authenticate, read, create one partner per row, report.
//!
//! A row the remote declines (falsy id) is reported and skipped. Any error
//! from a remote call ends the run; partners created before it stay created.
//! Nothing deduplicates, so importing the same file twice creates duplicates.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ImportError;
use crate::models::{CustomerRecord, ImportResult, RunReport};
use crate::services::csv_source::read_customers;
use crate::services::partner_api::PartnerApi;
use crate::services::session::Session;

/// What to do when the remote declines a row without raising.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RejectionPolicy {
    /// Report the row and move on.
    #[default]
    Continue,
    /// Treat the rejection like any other fault.
    Abort,
}

impl RejectionPolicy {
    pub fn from_stop_flag(stop_on_rejection: bool) -> Self {
        if stop_on_rejection {
            RejectionPolicy::Abort
        } else {
            RejectionPolicy::Continue
        }
    }
}

/// Receives the user-facing status lines of a run.
pub trait Reporter {
    /// One row finished.
    fn row(&mut self, result: &ImportResult);

    /// The run aborted.
    fn error(&mut self, err: &dyn fmt::Display);

    /// Final status line.
    fn finished(&mut self, success: bool);
}

/// Writes status lines to any writer, stdout by default.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            warn!("failed to write status line: {}", e);
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn row(&mut self, result: &ImportResult) {
        self.line(&result.to_string());
    }

    fn error(&mut self, err: &dyn fmt::Display) {
        self.line(&format!("Error importing customers: {}", err));
    }

    fn finished(&mut self, success: bool) {
        if success {
            self.line("Customers imported successfully.");
        } else {
            self.line("Failed to import customers.");
        }
    }
}

/// Drives one `create` per record through an open session.
pub struct BatchImporter<'s, 'a> {
    session: &'s Session<'a>,
    fields: &'s BTreeMap<String, String>,
    policy: RejectionPolicy,
}

impl<'s, 'a> BatchImporter<'s, 'a> {
    /// `fields` maps CSV column -> partner field.
    pub fn new(
        session: &'s Session<'a>,
        fields: &'s BTreeMap<String, String>,
        policy: RejectionPolicy,
    ) -> Self {
        Self {
            session,
            fields,
            policy,
        }
    }

    /// Import `records` in order, one call at a time.
    ///
    /// Returns on the first error without attempting later rows.
    pub async fn import(
        &self,
        records: &[CustomerRecord],
        reporter: &mut dyn Reporter,
    ) -> Result<RunReport, ImportError> {
        let mut report = RunReport::default();

        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            let name = record.display_name().to_string();
            let fields = record.to_partner_fields(self.fields);
            debug!(row, name = %name, "creating partner");

            let result = match self.session.create_partner(&fields).await {
                Ok(Some(id)) => ImportResult::Created { name, id },
                Ok(None) => ImportResult::Rejected { name },
                Err(err) => {
                    error!(row, error = %err, "create failed, aborting");
                    return Err(err);
                }
            };

            reporter.row(&result);
            report.record(&result);

            if !result.is_created() {
                warn!(row, name = result.name(), "remote declined customer");
                if self.policy == RejectionPolicy::Abort {
                    return Err(ImportError::Rejected {
                        row,
                        name: result.name().to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Run a full import against `api` and report it. Returns overall success.
///
/// The session is released on every path out of the run.
pub async fn run(api: &dyn PartnerApi, config: &Config, reporter: &mut dyn Reporter) -> bool {
    let success = match execute(api, config, reporter).await {
        Ok(report) => {
            info!(
                attempted = report.attempted(),
                created = report.created,
                rejected = report.rejected,
                "import finished"
            );
            true
        }
        Err(err) => {
            error!(error = %err, "import aborted");
            reporter.error(&err);
            false
        }
    };
    reporter.finished(success);
    success
}

async fn execute(
    api: &dyn PartnerApi,
    config: &Config,
    reporter: &mut dyn Reporter,
) -> Result<RunReport, ImportError> {
    let session = Session::open(api, &config.odoo).await?;

    let records = read_customers(&config.csv_path(), &config.import.required_columns())?;
    info!(uid = %session.uid(), rows = records.len(), "importing customers");

    let policy = RejectionPolicy::from_stop_flag(config.import.stop_on_rejection);
    let result = BatchImporter::new(&session, &config.import.fields, policy)
        .import(&records, reporter)
        .await;

    session.close();
    result
}
