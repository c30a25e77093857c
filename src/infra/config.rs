use std::env;

use dotenvy::dotenv;

use crate::error::PortalError;

pub const DEFAULT_GRAPHQL_URI: &str =
    "https://graphql.cryoetdataportal.cziscience.com/v1/graphql";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// GraphQL endpoint of the data portal.
    pub graphql_uri: String,
    pub http_timeout_ms: u64,
    pub user_agent: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, PortalError> {
        dotenv().ok();

        let graphql_uri =
            env::var("PORTAL_GRAPHQL_URI").unwrap_or_else(|_| DEFAULT_GRAPHQL_URI.to_string());

        let http_timeout_ms: u64 = env::var("PORTAL_HTTP_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|err| {
                PortalError::Validation(format!("invalid PORTAL_HTTP_TIMEOUT_MS: {err}"))
            })?;

        Ok(Self {
            graphql_uri,
            http_timeout_ms,
            user_agent: default_user_agent(),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graphql_uri: DEFAULT_GRAPHQL_URI.to_string(),
            http_timeout_ms: 30_000,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("cryoet-portal-browser/{}", env!("CARGO_PKG_VERSION"))
}
