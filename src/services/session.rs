//! Authenticated session against the remote system.

use tracing::{debug, info};

use crate::config::OdooConfig;
use crate::error::ImportError;
use crate::models::PartnerFields;
use crate::services::partner_api::{Authorization, IdentityToken, PartnerApi};

/// An authenticated handle, held for the length of one run.
///
/// Released by [`Session::close`] or, on any other exit path, when dropped.
pub struct Session<'a> {
    api: &'a dyn PartnerApi,
    database: String,
    uid: IdentityToken,
    password: String,
}

impl<'a> Session<'a> {
    /// Authenticate against `api` with the configured credentials.
    pub async fn open(api: &'a dyn PartnerApi, settings: &OdooConfig) -> Result<Session<'a>, ImportError> {
        info!(
            endpoint = api.endpoint(),
            database = %settings.database,
            username = %settings.username,
            "authenticating"
        );

        let uid = api
            .authenticate(&settings.database, &settings.username, &settings.password)
            .await?
            .ok_or_else(|| ImportError::Authentication {
                database: settings.database.clone(),
                username: settings.username.clone(),
            })?;

        info!(uid = %uid, "session established");
        Ok(Self {
            api,
            database: settings.database.clone(),
            uid,
            password: settings.password.clone(),
        })
    }

    pub fn uid(&self) -> &IdentityToken {
        &self.uid
    }

    /// Create one partner under this session's identity.
    pub async fn create_partner(&self, fields: &PartnerFields) -> Result<Option<i64>, ImportError> {
        let auth = Authorization {
            database: &self.database,
            uid: &self.uid,
            password: &self.password,
        };
        self.api.create_partner(auth, fields).await
    }

    /// End the session.
    pub fn close(self) {
        info!(uid = %self.uid, "closing session");
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // The remote has no logout call; forget the credential.
        self.password.clear();
        debug!(uid = %self.uid, endpoint = self.api.endpoint(), "session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::xmlrpc::Value;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Accepts one password and records what `create_partner` receives.
    struct StubApi {
        password: &'static str,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl PartnerApi for StubApi {
        fn endpoint(&self) -> &str {
            "http://stub"
        }

        async fn authenticate(
            &self,
            _database: &str,
            _username: &str,
            password: &str,
        ) -> Result<Option<IdentityToken>, ImportError> {
            Ok((password == self.password).then(|| IdentityToken::new(Value::Int(7))))
        }

        async fn create_partner(
            &self,
            auth: Authorization<'_>,
            _fields: &PartnerFields,
        ) -> Result<Option<i64>, ImportError> {
            self.seen
                .lock()
                .unwrap()
                .push((auth.uid.to_string(), auth.password.to_string()));
            Ok(Some(1))
        }
    }

    fn settings(password: &str) -> OdooConfig {
        OdooConfig {
            url: "http://stub".to_string(),
            database: "prod".to_string(),
            username: "admin".to_string(),
            password: password.to_string(),
            timeout_secs: None,
        }
    }

    #[tokio::test]
    async fn test_open_carries_identity_into_calls() {
        let api = StubApi {
            password: "secret",
            seen: Mutex::new(Vec::new()),
        };

        let session = Session::open(&api, &settings("secret")).await.unwrap();
        assert_eq!(session.uid(), &IdentityToken::new(Value::Int(7)));

        session.create_partner(&PartnerFields::new()).await.unwrap();
        session.close();

        assert_eq!(
            api.seen.lock().unwrap().as_slice(),
            &[("7".to_string(), "secret".to_string())]
        );
    }

    #[tokio::test]
    async fn test_open_rejects_falsy_identity() {
        let api = StubApi {
            password: "secret",
            seen: Mutex::new(Vec::new()),
        };

        let result = Session::open(&api, &settings("wrong")).await;
        match result {
            Err(ImportError::Authentication { database, username }) => {
                assert_eq!(database, "prod");
                assert_eq!(username, "admin");
            }
            Err(other) => panic!("expected authentication error, got {:?}", other),
            Ok(_) => panic!("expected authentication error"),
        };
    }
}
