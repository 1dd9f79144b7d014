//! Backend services.

pub mod csv_source;
pub mod importer;
pub mod odoo;
pub mod partner_api;
pub mod session;
pub mod xmlrpc;

pub use importer::{run, ConsoleReporter, Reporter};
pub use odoo::OdooClient;
