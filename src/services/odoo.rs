//! Odoo XML-RPC client.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::ImportError;
use crate::models::PartnerFields;
use crate::services::partner_api::{Authorization, IdentityToken, PartnerApi};
use crate::services::xmlrpc::{decode_response, encode_call, Value};

const PARTNER_MODEL: &str = "res.partner";

/// [`PartnerApi`] backed by Odoo's `/xmlrpc/2` endpoints.
#[derive(Clone)]
pub struct OdooClient {
    client: Client,
    base_url: String,
}

impl OdooClient {
    /// Create a client for `base_url`. No timeout is applied unless given.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ImportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ImportError::Connection {
            url: base_url.clone(),
            source,
        })?;
        Ok(Self { client, base_url })
    }

    /// POST one method call to `/xmlrpc/2/{service}` and decode the answer.
    async fn call(&self, service: &str, method: &str, params: &[Value]) -> Result<Value, ImportError> {
        let url = format!("{}/xmlrpc/2/{}", self.base_url, service);
        debug!(url = %url, method, "xml-rpc call");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "text/xml")
            .body(encode_call(method, params))
            .send()
            .await
            .map_err(|source| ImportError::Connection {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "xml-rpc response");
        if !status.is_success() {
            return Err(ImportError::Http {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ImportError::Connection {
                url: url.clone(),
                source,
            })?;
        decode_response(&body)
    }
}

#[async_trait]
impl PartnerApi for OdooClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn authenticate(
        &self,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<IdentityToken>, ImportError> {
        let uid = self
            .call(
                "common",
                "authenticate",
                &[
                    Value::from(database),
                    Value::from(username),
                    Value::from(password),
                    Value::Struct(Default::default()),
                ],
            )
            .await?;

        Ok(uid.is_truthy().then(|| IdentityToken::new(uid)))
    }

    async fn create_partner(
        &self,
        auth: Authorization<'_>,
        fields: &PartnerFields,
    ) -> Result<Option<i64>, ImportError> {
        let values = fields
            .iter()
            .map(|(field, value)| (field.clone(), Value::from(value.as_str())))
            .collect();

        let result = self
            .call(
                "object",
                "execute_kw",
                &[
                    Value::from(auth.database),
                    auth.uid.as_value().clone(),
                    Value::from(auth.password),
                    Value::from(PARTNER_MODEL),
                    Value::from("create"),
                    Value::Array(vec![Value::Struct(values)]),
                ],
            )
            .await?;

        partner_id(result)
    }
}

/// Interpret a `create` result: an id, a one-element id list, or falsy.
fn partner_id(result: Value) -> Result<Option<i64>, ImportError> {
    if !result.is_truthy() {
        return Ok(None);
    }
    match &result {
        Value::Int(id) => Ok(Some(*id)),
        Value::Array(ids) if ids.len() == 1 => match ids[0].as_i64() {
            Some(0) => Ok(None),
            Some(id) => Ok(Some(id)),
            None => Err(unexpected_create(&result)),
        },
        _ => Err(unexpected_create(&result)),
    }
}

fn unexpected_create(result: &Value) -> ImportError {
    ImportError::UnexpectedResponse {
        method: format!("{}.create", PARTNER_MODEL),
        value: result.to_string(),
    }
}
