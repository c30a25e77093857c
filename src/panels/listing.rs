use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    domain::{
        filter::ListingFilter,
        models::{Dataset, DatasetGroup, Tomogram},
        traits::PortalGateway,
    },
    infra::progress::{LoadState, ProgressController, TaskIdAllocator},
    services::listing_service,
};

use super::tree::{SearchableTree, TreeNode};

/// Entity behind a listing tree row.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingItem {
    Dataset(Dataset),
    Tomogram(Tomogram),
}

/// Lists the datasets and tomograms of the portal in a searchable tree,
/// appending groups as the background load streams them in.
pub struct ListingPanel {
    controller: ProgressController<DatasetGroup, ()>,
    tree: Arc<Mutex<SearchableTree<ListingItem>>>,
}

impl ListingPanel {
    pub fn new(ids: Arc<TaskIdAllocator>) -> Self {
        let tree = Arc::new(Mutex::new(SearchableTree::new()));
        let mut controller = ProgressController::new(ids);

        let loaded = Arc::clone(&tree);
        controller.on_step(move |group: DatasetGroup| {
            debug!(dataset = %group.dataset.id, "listing: dataset loaded");
            let mut node = TreeNode::new(
                group.dataset.listing_label(group.tomograms.len()),
                ListingItem::Dataset(group.dataset.clone()),
            );
            node.children = group
                .tomograms
                .into_iter()
                .map(|tomogram| {
                    TreeNode::new(tomogram.name.clone(), ListingItem::Tomogram(tomogram))
                })
                .collect();
            loaded.lock().push_root(node);
        });

        controller.on_error(|err| error!(%err, "listing load failed"));

        Self { controller, tree }
    }

    /// Clears the tree and starts listing, superseding any load in flight.
    pub fn load(&mut self, gateway: Arc<dyn PortalGateway>, filter: ListingFilter) {
        debug!(kind = ?filter.kind, "listing panel: load");
        self.tree.lock().clear();
        self.controller
            .submit(listing_service::load_listing_work(gateway, filter));
    }

    pub fn cancel(&mut self) {
        debug!("listing panel: cancel");
        self.controller.cancel();
    }

    /// Search text over the loaded tree; also applied to rows that stream
    /// in afterwards.
    pub fn set_search(&self, text: &str) {
        self.tree.lock().set_filter(text);
    }

    pub fn tree(&self) -> Arc<Mutex<SearchableTree<ListingItem>>> {
        Arc::clone(&self.tree)
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
