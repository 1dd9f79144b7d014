//! Per-row outcomes and the run summary.

use std::fmt;

/// Outcome of one `create` call that did not raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    /// The remote assigned an id.
    Created { name: String, id: i64 },
    /// The remote answered with a falsy id.
    Rejected { name: String },
}

impl ImportResult {
    pub fn name(&self) -> &str {
        match self {
            ImportResult::Created { name, .. } | ImportResult::Rejected { name } => name,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ImportResult::Created { .. })
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportResult::Created { name, id } => {
                write!(f, "Customer '{}' imported with ID: {}", name, id)
            }
            ImportResult::Rejected { name } => write!(f, "Failed to import customer '{}'", name),
        }
    }
}

/// Totals for a run that was not aborted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub created: usize,
    pub rejected: usize,
}

impl RunReport {
    /// Count one row outcome.
    pub fn record(&mut self, result: &ImportResult) {
        if result.is_created() {
            self.created += 1;
        } else {
            self.rejected += 1;
        }
    }

    pub fn attempted(&self) -> usize {
        self.created + self.rejected
    }
}
