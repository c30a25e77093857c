use std::sync::Arc;

use tracing::debug;

use crate::domain::traits::PortalGateway;
use crate::infra::{config::AppConfig, portal::PortalClient, progress::Work};

/// Single-shot work that connects to a portal endpoint and verifies it is
/// reachable before handing the client to the caller.
pub fn connect_work(uri: String, config: AppConfig) -> Work<(), Arc<PortalClient>> {
    Work::single(async move {
        debug!(%uri, "connecting to portal");
        let client = Arc::new(PortalClient::new(uri, &config)?);
        client.ping().await?;
        Ok(client)
    })
}
