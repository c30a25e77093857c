use crate::error::{PortalError, PortalResult};

/// Entity the id set of a [`ListingFilter`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Dataset,
    Run,
    VoxelSpacing,
    Tomogram,
}

/// Restricts the listing to the datasets reachable from a set of numeric
/// entity ids. An empty id set matches every dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    pub kind: EntityKind,
    pub ids: Vec<u64>,
}

impl ListingFilter {
    pub fn new(kind: EntityKind, ids: Vec<u64>) -> Self {
        Self { kind, ids }
    }

    /// Parses user-entered filter text ("10000, 10001") into a filter.
    /// Malformed input is a validation error; it never degrades to an
    /// unfiltered listing.
    pub fn parse(kind: EntityKind, text: &str) -> PortalResult<Self> {
        Ok(Self::new(kind, parse_ids(text)?))
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self::new(EntityKind::Dataset, Vec::new())
    }
}

/// Splits comma/whitespace separated id text into numeric ids.
pub fn parse_ids(text: &str) -> PortalResult<Vec<u64>> {
    let mut ids = Vec::new();
    for token in text.split(',').map(str::trim) {
        if token.is_empty() {
            continue;
        }
        let id: u64 = token
            .parse()
            .map_err(|_| PortalError::Validation(format!("invalid id: {token:?}")))?;
        ids.push(id);
    }
    Ok(ids)
}
