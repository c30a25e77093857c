//! Volume reader implementations for the OME-Zarr collaborator boundary.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    domain::{
        models::{LayerAttrs, LayerData, LayerKind, LayerPayload, MultiscaleImage, Tomogram},
        traits::VolumeReader,
    },
    error::{PortalError, PortalResult},
};

/// Serves preconfigured multiscale images keyed by URI. Stands in for a
/// real OME-Zarr reader in tests and offline demos.
#[derive(Default)]
pub struct StaticVolumeReader {
    images: RwLock<Vec<(String, MultiscaleImage)>>,
}

impl StaticVolumeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: impl Into<String>, image: MultiscaleImage) {
        self.images.write().push((uri.into(), image));
    }

    fn lookup(&self, uri: &str) -> PortalResult<MultiscaleImage> {
        self.images
            .read()
            .iter()
            .find(|(key, _)| key == uri)
            .map(|(_, image)| image.clone())
            .ok_or_else(|| PortalError::NotFound(format!("no volume registered for {uri}")))
    }
}

#[async_trait]
impl VolumeReader for StaticVolumeReader {
    async fn read_tomogram(&self, tomogram: &Tomogram) -> PortalResult<LayerData> {
        let image = self.lookup(&tomogram.zarr_uri)?;
        let mut attrs = LayerAttrs::named(tomogram.name.clone());
        attrs.scale = [tomogram.voxel_spacing; 3];
        Ok(LayerData {
            payload: LayerPayload::Image(image),
            attrs,
            kind: LayerKind::Image,
        })
    }

    async fn read_segmentation(&self, uri: &str, object_name: &str) -> PortalResult<LayerData> {
        let image = self.lookup(uri)?;
        Ok(LayerData {
            payload: LayerPayload::Image(image),
            attrs: LayerAttrs::named(object_name.to_string()),
            kind: LayerKind::Labels,
        })
    }
}
