//! The remote capability the importer depends on.
//!
//! Only the two calls an import needs are exposed; the generic
//! `execute_kw` surface stays behind the implementation.

use async_trait::async_trait;
use std::fmt;

use crate::error::ImportError;
use crate::models::PartnerFields;
use crate::services::xmlrpc::Value;

/// Identity handed back by `authenticate`. Opaque to the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityToken(Value);

impl IdentityToken {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials attached to every call made inside a session.
#[derive(Clone, Copy)]
pub struct Authorization<'a> {
    pub database: &'a str,
    pub uid: &'a IdentityToken,
    pub password: &'a str,
}

/// Narrow, typed view of the remote business system.
#[async_trait]
pub trait PartnerApi: Send + Sync {
    /// Endpoint this API talks to, for messages.
    fn endpoint(&self) -> &str;

    /// Exchange credentials for an identity.
    ///
    /// `Ok(None)` means the remote rejected the credentials.
    async fn authenticate(
        &self,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<IdentityToken>, ImportError>;

    /// Create one partner.
    ///
    /// `Ok(None)` means the remote declined without raising.
    async fn create_partner(
        &self,
        auth: Authorization<'_>,
        fields: &PartnerFields,
    ) -> Result<Option<i64>, ImportError>;
}
