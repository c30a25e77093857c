use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    domain::{models::JsonMap, traits::PortalGateway},
    infra::progress::{LoadState, ProgressController, TaskIdAllocator},
    services::metadata_service::{self, MetadataItem},
};

use super::tree::{SearchableTree, TreeNode};

/// What the host renders for the metadata panel.
#[derive(Debug, Default)]
pub struct MetadataView {
    pub title: String,
    pub tree: SearchableTree<()>,
    pub error: Option<String>,
}

/// Displays the JSON metadata of a dataset or tomogram in the portal.
pub struct MetadataPanel {
    controller: ProgressController<(), JsonMap>,
    view: Arc<Mutex<MetadataView>>,
}

impl MetadataPanel {
    pub fn new(ids: Arc<TaskIdAllocator>) -> Self {
        let view = Arc::new(Mutex::new(MetadataView::default()));
        let mut controller = ProgressController::new(ids);

        let loaded = Arc::clone(&view);
        controller.on_return(move |metadata: JsonMap| {
            let mut view = loaded.lock();
            view.error = None;
            view.tree.clear();
            for node in json_to_nodes(&metadata) {
                view.tree.push_root(node);
            }
        });

        let failed = Arc::clone(&view);
        controller.on_error(move |err| {
            error!(%err, "metadata load failed");
            failed.lock().error = Some(err.to_string());
        });

        Self { controller, view }
    }

    /// Fetches the metadata of the selected item, superseding any fetch
    /// still in flight.
    pub fn load(&mut self, gateway: Arc<dyn PortalGateway>, item: MetadataItem) {
        debug!(item = %item.label(), "metadata panel: load");
        {
            let mut view = self.view.lock();
            view.title = format!("Metadata: {}", item.label());
            view.tree.clear();
            view.error = None;
        }
        self.controller
            .submit(metadata_service::load_metadata_work(gateway, item));
    }

    pub fn cancel(&mut self) {
        debug!("metadata panel: cancel");
        self.controller.cancel();
    }

    pub fn set_search(&self, text: &str) {
        self.view.lock().tree.set_filter(text);
    }

    pub fn view(&self) -> Arc<Mutex<MetadataView>> {
        Arc::clone(&self.view)
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

/// Flattens a JSON object into labelled tree rows, preserving key order.
/// Composite values become subtrees; scalars render as `key: value`.
pub fn json_to_nodes(map: &JsonMap) -> Vec<TreeNode<()>> {
    map.iter()
        .map(|(key, value)| json_node(key, value))
        .collect()
}

fn json_node(key: &str, value: &Value) -> TreeNode<()> {
    match value {
        Value::Object(map) => {
            let mut node = TreeNode::new(key, ());
            node.children = json_to_nodes(map);
            node
        }
        Value::Array(items) => {
            let mut node = TreeNode::new(key, ());
            node.children = items
                .iter()
                .enumerate()
                .map(|(index, item)| json_node(&index.to_string(), item))
                .collect();
            node
        }
        Value::String(text) => TreeNode::new(format!("{key}: {text}"), ()),
        other => TreeNode::new(format!("{key}: {other}"), ()),
    }
}
