use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    domain::{
        filter::{EntityKind, ListingFilter},
        models::{DatasetGroup, Tomogram},
        traits::PortalGateway,
        value_objects::{DatasetId, RunId, TomogramId, VoxelSpacingId},
    },
    error::PortalResult,
    infra::progress::{StepSink, Work},
};

/// Step-producing work yielding one `(dataset, tomograms)` group per
/// dataset reachable from the filter. Dataset and Run filters list whole
/// datasets; VoxelSpacing and Tomogram filters list only the matching
/// tomograms, grouped under their dataset.
pub fn load_listing_work(
    gateway: Arc<dyn PortalGateway>,
    filter: ListingFilter,
) -> Work<DatasetGroup, ()> {
    Work::steps(move |sink| async move {
        debug!(kind = ?filter.kind, ids = filter.ids.len(), "loading listing");
        if filter.is_empty() {
            return yield_datasets(gateway.as_ref(), &[], &sink).await;
        }
        match filter.kind {
            EntityKind::Dataset => {
                let ids: Vec<DatasetId> = filter.ids.iter().copied().map(DatasetId).collect();
                yield_datasets(gateway.as_ref(), &ids, &sink).await
            }
            EntityKind::Run => {
                let ids: Vec<RunId> = filter.ids.iter().copied().map(RunId).collect();
                let runs = gateway.find_runs(&ids).await?;
                let mut dataset_ids: Vec<DatasetId> = Vec::new();
                for run in runs {
                    if !dataset_ids.contains(&run.dataset_id) {
                        dataset_ids.push(run.dataset_id);
                    }
                }
                yield_datasets(gateway.as_ref(), &dataset_ids, &sink).await
            }
            EntityKind::VoxelSpacing => {
                let ids: Vec<VoxelSpacingId> =
                    filter.ids.iter().copied().map(VoxelSpacingId).collect();
                let mut tomograms = Vec::new();
                for spacing in gateway.find_voxel_spacings(&ids).await? {
                    tomograms.extend(gateway.tomograms_of_voxel_spacing(spacing.id).await?);
                }
                yield_grouped(gateway.as_ref(), tomograms, &sink).await
            }
            EntityKind::Tomogram => {
                let ids: Vec<TomogramId> = filter.ids.iter().copied().map(TomogramId).collect();
                let tomograms = gateway.find_tomograms(&ids).await?;
                yield_grouped(gateway.as_ref(), tomograms, &sink).await
            }
        }
    })
}

async fn yield_datasets(
    gateway: &dyn PortalGateway,
    ids: &[DatasetId],
    sink: &StepSink<DatasetGroup, ()>,
) -> PortalResult<()> {
    for dataset in gateway.find_datasets(ids).await? {
        let tomograms = gateway.tomograms_of_dataset(dataset.id).await?;
        if !sink.emit(DatasetGroup { dataset, tomograms }) {
            // Superseded; stop producing.
            return Ok(());
        }
    }
    Ok(())
}

async fn yield_grouped(
    gateway: &dyn PortalGateway,
    tomograms: Vec<Tomogram>,
    sink: &StepSink<DatasetGroup, ()>,
) -> PortalResult<()> {
    let mut groups: IndexMap<DatasetId, Vec<Tomogram>> = IndexMap::new();
    for tomogram in tomograms {
        groups.entry(tomogram.dataset_id).or_default().push(tomogram);
    }
    let ids: Vec<DatasetId> = groups.keys().copied().collect();
    let datasets = gateway.find_datasets(&ids).await?;
    for (id, tomograms) in groups {
        let Some(dataset) = datasets.iter().find(|d| d.id == id) else {
            debug!(dataset = %id, "tomogram references a dataset the portal did not return");
            continue;
        };
        let group = DatasetGroup {
            dataset: dataset.clone(),
            tomograms,
        };
        if !sink.emit(group) {
            return Ok(());
        }
    }
    Ok(())
}
