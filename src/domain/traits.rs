use async_trait::async_trait;

use crate::{
    domain::{
        models::{Annotation, Dataset, JsonMap, LayerData, Run, Tomogram, VoxelSpacing},
        value_objects::{DatasetId, RunId, TomogramId, VoxelSpacingId},
    },
    error::PortalResult,
};

/// Filtered queries against the remote data portal. An empty id slice
/// matches every entity of that kind.
#[async_trait]
pub trait PortalGateway: Send + Sync {
    async fn find_datasets(&self, ids: &[DatasetId]) -> PortalResult<Vec<Dataset>>;
    async fn find_runs(&self, ids: &[RunId]) -> PortalResult<Vec<Run>>;
    async fn find_voxel_spacings(&self, ids: &[VoxelSpacingId]) -> PortalResult<Vec<VoxelSpacing>>;
    async fn find_tomograms(&self, ids: &[TomogramId]) -> PortalResult<Vec<Tomogram>>;
    async fn tomograms_of_dataset(&self, dataset: DatasetId) -> PortalResult<Vec<Tomogram>>;
    async fn tomograms_of_voxel_spacing(
        &self,
        spacing: VoxelSpacingId,
    ) -> PortalResult<Vec<Tomogram>>;
    async fn annotations_of_voxel_spacing(
        &self,
        spacing: VoxelSpacingId,
    ) -> PortalResult<Vec<Annotation>>;
    /// Full dataset record as raw JSON, key order preserved.
    async fn dataset_metadata(&self, dataset: DatasetId) -> PortalResult<JsonMap>;
    /// Full tomogram record as raw JSON, key order preserved.
    async fn tomogram_metadata(&self, tomogram: TomogramId) -> PortalResult<JsonMap>;
    /// Cheap reachability check used when connecting.
    async fn ping(&self) -> PortalResult<()>;
}

/// Reads OME-Zarr multiscale volumes. Decoding the voxel data is the
/// implementation's concern; the crate only aligns and selects levels.
#[async_trait]
pub trait VolumeReader: Send + Sync {
    /// Image layer for a tomogram at full multiscale, scale set from the
    /// tomogram's voxel spacing.
    async fn read_tomogram(&self, tomogram: &Tomogram) -> PortalResult<LayerData>;
    /// Labels layer for a segmentation-mask annotation file.
    async fn read_segmentation(&self, uri: &str, object_name: &str) -> PortalResult<LayerData>;
}

/// The host viewer's layer-addition boundary.
pub trait LayerSink: Send {
    fn add_layer(&mut self, layer: LayerData);
    /// Removes every layer previously added.
    fn clear(&mut self);
}
