use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::value_objects::{AnnotationId, DatasetId, RunId, TomogramId, VoxelSpacingId};

/// Raw JSON object with the portal's key order preserved.
pub type JsonMap = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub id: DatasetId,
    pub title: String,
    pub organism_name: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub deposition_date: Option<NaiveDate>,
}

impl Dataset {
    /// Label shown for the dataset node in the listing tree.
    pub fn listing_label(&self, tomogram_count: usize) -> String {
        format!("{} ({})", self.id, tomogram_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub dataset_id: DatasetId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoxelSpacing {
    pub id: VoxelSpacingId,
    /// Voxel edge length in Angstroms.
    pub voxel_spacing: f64,
    pub run_id: RunId,
    pub dataset_id: DatasetId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tomogram {
    pub id: TomogramId,
    pub name: String,
    /// Voxel edge length in Angstroms at full resolution.
    pub voxel_spacing: f64,
    /// Extent in voxels, zyx order.
    pub size: [u64; 3],
    /// HTTPS URI of the OME-Zarr multiscale image directory.
    pub zarr_uri: String,
    pub voxel_spacing_id: VoxelSpacingId,
    pub dataset_id: DatasetId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Point,
    OrientedPoint,
    SegmentationMask,
    /// Shape kinds this browser does not visualize; their files are skipped.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationFile {
    pub shape_type: ShapeType,
    pub https_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub object_name: String,
    pub voxel_spacing_id: VoxelSpacingId,
    pub files: Vec<AnnotationFile>,
    /// Full annotation record as returned by the portal, attached to the
    /// produced layers so the host can surface provenance.
    pub metadata: JsonMap,
}

/// One dataset with the tomograms the active filter selected under it.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetGroup {
    pub dataset: Dataset,
    pub tomograms: Vec<Tomogram>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Image,
    Points,
    Labels,
}

/// Lazy handle to one resolution level of a multiscale volume. Decoding the
/// voxel data is the host reader's concern; this layer only carries enough
/// to index and align the level.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLevel {
    pub index: usize,
    /// Extent in voxels, zyx order.
    pub shape: [u64; 3],
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiscaleImage {
    /// Ordered from full resolution (level 0) downwards.
    pub levels: Vec<ImageLevel>,
}

impl MultiscaleImage {
    pub fn level(&self, index: usize) -> Option<&ImageLevel> {
        self.levels.get(index)
    }

    /// Restricts the image to a single level, keeping its original index.
    pub fn select_level(&self, index: usize) -> Option<MultiscaleImage> {
        self.level(index).map(|level| MultiscaleImage {
            levels: vec![level.clone()],
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerPayload {
    Image(MultiscaleImage),
    /// Spatial coordinates in zyx order, consistent with the image axes.
    Points(Vec<[f64; 3]>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerAttrs {
    pub name: String,
    /// Per-axis scale, zyx order.
    pub scale: [f64; 3],
    /// Per-axis translation, zyx order.
    pub translate: [f64; 3],
    pub point_size: Option<f64>,
    pub face_color: Option<String>,
    pub opacity: Option<f64>,
    pub metadata: JsonMap,
}

impl LayerAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: [1.0; 3],
            translate: [0.0; 3],
            point_size: None,
            face_color: None,
            opacity: None,
            metadata: JsonMap::new(),
        }
    }
}

/// The (data, attributes, kind) triple handed to the host viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerData {
    pub payload: LayerPayload,
    pub attrs: LayerAttrs,
    pub kind: LayerKind,
}

/// Named selection over multiscale levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// All levels, left to the host to page in lazily.
    Multi,
    High,
    Mid,
    Low,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Multi,
        Resolution::High,
        Resolution::Mid,
        Resolution::Low,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Multi => "Multi",
            Resolution::High => "High",
            Resolution::Mid => "Mid",
            Resolution::Low => "Low",
        }
    }

    /// Level selected by this resolution; `None` keeps every level.
    pub fn level(&self) -> Option<usize> {
        match self {
            Resolution::Multi => None,
            Resolution::High => Some(0),
            Resolution::Mid => Some(1),
            Resolution::Low => Some(2),
        }
    }

    /// Downscale factor of the selected level relative to full resolution.
    pub fn downscale(&self) -> f64 {
        match self {
            Resolution::Multi | Resolution::High => 1.0,
            Resolution::Mid => 2.0,
            Resolution::Low => 4.0,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Low
    }
}
