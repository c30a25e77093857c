use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    error::{PortalError, PortalResult},
    infra::{
        config::AppConfig,
        portal::PortalClient,
        progress::{LoadState, ProgressController, TaskIdAllocator},
    },
    services::connection_service,
};

#[derive(Clone, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Arc<PortalClient>),
}

/// Connects to a data portal with a specific URI.
pub struct UriPanel {
    controller: ProgressController<(), Arc<PortalClient>>,
    config: AppConfig,
    state: Arc<Mutex<ConnectionState>>,
}

impl UriPanel {
    pub fn new(ids: Arc<TaskIdAllocator>, config: AppConfig) -> Self {
        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));
        let mut controller = ProgressController::new(ids);

        let connected = Arc::clone(&state);
        controller.on_return(move |client: Arc<PortalClient>| {
            debug!(uri = %client.graphql_uri(), "portal connected");
            *connected.lock() = ConnectionState::Connected(client);
        });

        let failed = Arc::clone(&state);
        controller.on_error(move |err| {
            error!(%err, "portal connection failed");
            *failed.lock() = ConnectionState::Disconnected;
        });

        Self {
            controller,
            config,
            state,
        }
    }

    /// Starts a connection check against `uri`, superseding any check that
    /// is still in flight. The URI itself is validated eagerly.
    pub fn connect(&mut self, uri: &str) -> PortalResult<()> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(PortalError::Validation("portal URI cannot be empty".into()));
        }
        debug!(%uri, "uri panel: connect");
        *self.state.lock() = ConnectionState::Connecting;
        self.controller.submit(connection_service::connect_work(
            uri.to_string(),
            self.config.clone(),
        ));
        Ok(())
    }

    pub fn disconnect(&mut self) {
        debug!("uri panel: disconnect");
        self.controller.cancel();
        *self.state.lock() = ConnectionState::Disconnected;
    }

    pub fn connection(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    /// The connected client, if any.
    pub fn client(&self) -> Option<Arc<PortalClient>> {
        match &*self.state.lock() {
            ConnectionState::Connected(client) => Some(Arc::clone(client)),
            _ => None,
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.controller.state()
    }

    pub fn pump_ready(&mut self) -> usize {
        self.controller.pump_ready()
    }

    pub async fn settled(&mut self) {
        self.controller.settled().await;
    }
}
