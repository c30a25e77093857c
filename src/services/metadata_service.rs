use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{
        models::{Dataset, JsonMap, Tomogram},
        traits::PortalGateway,
    },
    infra::progress::Work,
};

/// Listing selection whose metadata can be previewed.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataItem {
    Dataset(Dataset),
    Tomogram(Tomogram),
}

impl MetadataItem {
    /// Label used in the metadata panel title.
    pub fn label(&self) -> String {
        match self {
            MetadataItem::Dataset(dataset) => dataset.id.to_string(),
            MetadataItem::Tomogram(tomogram) => tomogram.name.clone(),
        }
    }
}

/// Single-shot work fetching the selected entity's full JSON record.
pub fn load_metadata_work(
    gateway: Arc<dyn PortalGateway>,
    item: MetadataItem,
) -> Work<(), JsonMap> {
    Work::single(async move {
        debug!(item = %item.label(), "loading metadata");
        match item {
            MetadataItem::Dataset(dataset) => gateway.dataset_metadata(dataset.id).await,
            MetadataItem::Tomogram(tomogram) => gateway.tomogram_metadata(tomogram.id).await,
        }
    })
}
