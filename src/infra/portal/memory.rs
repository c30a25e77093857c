//! In-memory gateway used by tests and offline demos.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    domain::{
        models::{Annotation, Dataset, JsonMap, Run, Tomogram, VoxelSpacing},
        traits::PortalGateway,
        value_objects::{DatasetId, RunId, TomogramId, VoxelSpacingId},
    },
    error::{PortalError, PortalResult},
};

#[derive(Default)]
struct State {
    datasets: Vec<Dataset>,
    runs: Vec<Run>,
    voxel_spacings: Vec<VoxelSpacing>,
    tomograms: Vec<Tomogram>,
    annotations: Vec<Annotation>,
    dataset_metadata: Vec<(DatasetId, JsonMap)>,
    tomogram_metadata: Vec<(TomogramId, JsonMap)>,
}

#[derive(Default)]
pub struct MemoryPortalGateway {
    state: RwLock<State>,
}

impl MemoryPortalGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dataset(&self, dataset: Dataset) {
        self.state.write().datasets.push(dataset);
    }

    pub fn insert_run(&self, run: Run) {
        self.state.write().runs.push(run);
    }

    pub fn insert_voxel_spacing(&self, spacing: VoxelSpacing) {
        self.state.write().voxel_spacings.push(spacing);
    }

    pub fn insert_tomogram(&self, tomogram: Tomogram) {
        self.state.write().tomograms.push(tomogram);
    }

    pub fn insert_annotation(&self, annotation: Annotation) {
        self.state.write().annotations.push(annotation);
    }

    pub fn insert_dataset_metadata(&self, dataset: DatasetId, metadata: JsonMap) {
        self.state.write().dataset_metadata.push((dataset, metadata));
    }

    pub fn insert_tomogram_metadata(&self, tomogram: TomogramId, metadata: JsonMap) {
        self.state
            .write()
            .tomogram_metadata
            .push((tomogram, metadata));
    }
}

#[async_trait]
impl PortalGateway for MemoryPortalGateway {
    async fn find_datasets(&self, ids: &[DatasetId]) -> PortalResult<Vec<Dataset>> {
        let state = self.state.read();
        Ok(state
            .datasets
            .iter()
            .filter(|d| ids.is_empty() || ids.contains(&d.id))
            .cloned()
            .collect())
    }

    async fn find_runs(&self, ids: &[RunId]) -> PortalResult<Vec<Run>> {
        let state = self.state.read();
        Ok(state
            .runs
            .iter()
            .filter(|r| ids.is_empty() || ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn find_voxel_spacings(&self, ids: &[VoxelSpacingId]) -> PortalResult<Vec<VoxelSpacing>> {
        let state = self.state.read();
        Ok(state
            .voxel_spacings
            .iter()
            .filter(|s| ids.is_empty() || ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn find_tomograms(&self, ids: &[TomogramId]) -> PortalResult<Vec<Tomogram>> {
        let state = self.state.read();
        Ok(state
            .tomograms
            .iter()
            .filter(|t| ids.is_empty() || ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn tomograms_of_dataset(&self, dataset: DatasetId) -> PortalResult<Vec<Tomogram>> {
        let state = self.state.read();
        Ok(state
            .tomograms
            .iter()
            .filter(|t| t.dataset_id == dataset)
            .cloned()
            .collect())
    }

    async fn tomograms_of_voxel_spacing(
        &self,
        spacing: VoxelSpacingId,
    ) -> PortalResult<Vec<Tomogram>> {
        let state = self.state.read();
        Ok(state
            .tomograms
            .iter()
            .filter(|t| t.voxel_spacing_id == spacing)
            .cloned()
            .collect())
    }

    async fn annotations_of_voxel_spacing(
        &self,
        spacing: VoxelSpacingId,
    ) -> PortalResult<Vec<Annotation>> {
        let state = self.state.read();
        Ok(state
            .annotations
            .iter()
            .filter(|a| a.voxel_spacing_id == spacing)
            .cloned()
            .collect())
    }

    async fn dataset_metadata(&self, dataset: DatasetId) -> PortalResult<JsonMap> {
        let state = self.state.read();
        state
            .dataset_metadata
            .iter()
            .find(|(id, _)| *id == dataset)
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| PortalError::NotFound(format!("dataset {dataset} not found")))
    }

    async fn tomogram_metadata(&self, tomogram: TomogramId) -> PortalResult<JsonMap> {
        let state = self.state.read();
        state
            .tomogram_metadata
            .iter()
            .find(|(id, _)| *id == tomogram)
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| PortalError::NotFound(format!("tomogram {tomogram} not found")))
    }

    async fn ping(&self) -> PortalResult<()> {
        Ok(())
    }
}
