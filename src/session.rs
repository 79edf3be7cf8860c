use async_trait::async_trait;

use crate::error::ErrorValue;

/// Supplies the endpoint, tenant and on-demand auth token for catalog calls.
///
/// `session_token` is called once per load and its value is never cached by
/// providers, so implementations may refresh or rotate tokens freely.
#[async_trait]
pub trait SessionContext: Send + Sync {
    fn base_url(&self) -> String;

    fn partner_id(&self) -> i64;

    async fn session_token(&self) -> Result<String, ErrorValue>;
}

/// Session with a fixed base URL, partner id and token.
#[derive(Debug, Clone)]
pub struct StaticSessionContext {
    base_url: String,
    partner_id: i64,
    token: String,
}

impl StaticSessionContext {
    pub fn new(base_url: impl Into<String>, partner_id: i64, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            partner_id,
            token: token.into(),
        }
    }
}

#[async_trait]
impl SessionContext for StaticSessionContext {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn partner_id(&self) -> i64 {
        self.partner_id
    }

    async fn session_token(&self) -> Result<String, ErrorValue> {
        Ok(self.token.clone())
    }
}
