pub mod listing;
pub mod metadata;
pub mod open;
pub mod tree;
pub mod uri;

pub use listing::{ListingItem, ListingPanel};
pub use metadata::{MetadataPanel, MetadataView};
pub use open::OpenPanel;
pub use tree::{SearchableTree, TreeNode};
pub use uri::{ConnectionState, UriPanel};
