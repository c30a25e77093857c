//! Searchable tree model shared by the listing and metadata panels.

/// One tree row. `visible` reflects the current search filter.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<T> {
    pub label: String,
    pub payload: T,
    pub children: Vec<TreeNode<T>>,
    pub visible: bool,
}

impl<T> TreeNode<T> {
    pub fn new(label: impl Into<String>, payload: T) -> Self {
        Self {
            label: label.into(),
            payload,
            children: Vec::new(),
            visible: true,
        }
    }
}

/// Tree with a case-insensitive text filter. A node stays visible when its
/// label matches or any descendant's does; a matching node keeps its whole
/// subtree visible. The filter also applies to nodes pushed while a load
/// is still streaming results in.
#[derive(Debug, Default)]
pub struct SearchableTree<T> {
    roots: Vec<TreeNode<T>>,
    filter: String,
}

impl<T> SearchableTree<T> {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            filter: String::new(),
        }
    }

    pub fn roots(&self) -> &[TreeNode<T>] {
        &self.roots
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        let needle = self.filter.to_lowercase();
        for root in &mut self.roots {
            apply_filter(root, &needle);
        }
    }

    pub fn push_root(&mut self, mut node: TreeNode<T>) {
        let needle = self.filter.to_lowercase();
        apply_filter(&mut node, &needle);
        self.roots.push(node);
    }

    pub fn visible_roots(&self) -> impl Iterator<Item = &TreeNode<T>> {
        self.roots.iter().filter(|node| node.visible)
    }
}

fn apply_filter<T>(node: &mut TreeNode<T>, needle: &str) -> bool {
    if needle.is_empty() || node.label.to_lowercase().contains(needle) {
        set_subtree_visible(node);
        return true;
    }
    let mut any_child = false;
    for child in &mut node.children {
        any_child |= apply_filter(child, needle);
    }
    node.visible = any_child;
    any_child
}

fn set_subtree_visible<T>(node: &mut TreeNode<T>) {
    node.visible = true;
    for child in &mut node.children {
        set_subtree_visible(child);
    }
}
