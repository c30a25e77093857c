use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, error};

use crate::{
    domain::{
        models::{LayerData, Resolution, Tomogram},
        traits::{LayerSink, PortalGateway, VolumeReader},
    },
    infra::progress::{LoadState, ProgressController, TaskIdAllocator},
    services::open_service,
};

/// Opens a tomogram and its annotations at a specific resolution, pushing
/// each layer into the host's sink as it is produced.
pub struct OpenPanel<S: LayerSink + 'static> {
    controller: ProgressController<LayerData, ()>,
    sink: Arc<Mutex<S>>,
    tomogram: Option<Tomogram>,
    resolution: Resolution,
    clear_existing: bool,
}

impl<S: LayerSink + 'static> OpenPanel<S> {
    pub fn new(ids: Arc<TaskIdAllocator>, sink: Arc<Mutex<S>>) -> Self {
        let mut controller = ProgressController::new(ids);

        let layers = Arc::clone(&sink);
        controller.on_step(move |layer| {
            layers.lock().add_layer(layer);
        });

        controller.on_error(|err| error!(%err, "tomogram load failed"));

        Self {
            controller,
            sink,
            tomogram: None,
            resolution: Resolution::default(),
            clear_existing: true,
        }
    }

    pub fn tomogram(&self) -> Option<&Tomogram> {
        self.tomogram.as_ref()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Takes effect on the next `load`.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn set_clear_existing(&mut self, clear: bool) {
        self.clear_existing = clear;
    }

    /// Selects a tomogram and starts loading it, superseding any load in
    /// flight. The resolution resets to Low so trying a higher resolution
    /// on one tomogram does not carry over to the next.
    pub fn set_tomogram(
        &mut self,
        gateway: Arc<dyn PortalGateway>,
        volumes: Arc<dyn VolumeReader>,
        http: Client,
        tomogram: Tomogram,
    ) {
        debug!(tomogram = %tomogram.id, "open panel: tomogram selected");
        self.cancel();
        self.resolution = Resolution::default();
        self.tomogram = Some(tomogram);
        self.load(gateway, volumes, http);
    }

    /// Loads the current tomogram at the current resolution.
    pub fn load(
        &mut self,
        gateway: Arc<dyn PortalGateway>,
        volumes: Arc<dyn VolumeReader>,
        http: Client,
    ) {
        let Some(tomogram) = self.tomogram.clone() else {
            return;
        };
        debug!(
            tomogram = %tomogram.id,
            resolution = self.resolution.label(),
            "open panel: load"
        );
        if self.clear_existing {
            self.sink.lock().clear();
        }
        self.controller.submit(open_service::load_tomogram_work(
            gateway,
            volumes,
            http,
            tomogram,
            self.resolution,
        ));
    }

    pub fn cancel(&mut self) {
        debug!("open panel: cancel");
        self.controller.cancel();
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
