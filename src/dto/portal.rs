use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{
    models::{Annotation, AnnotationFile, Dataset, JsonMap, Run, ShapeType, Tomogram, VoxelSpacing},
    value_objects::{AnnotationId, DatasetId, RunId, TomogramId, VoxelSpacingId},
};

/// Parent reference selected alongside an entity so the listing can group
/// children under their dataset without extra round trips.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDto {
    pub id: u64,
    pub title: String,
    pub organism_name: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub deposition_date: Option<NaiveDate>,
}

impl From<DatasetDto> for Dataset {
    fn from(dto: DatasetDto) -> Self {
        Dataset {
            id: DatasetId(dto.id),
            title: dto.title,
            organism_name: dto.organism_name,
            release_date: dto.release_date,
            deposition_date: dto.deposition_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunDto {
    pub id: u64,
    pub name: String,
    pub dataset: IdRef,
}

impl From<RunDto> for Run {
    fn from(dto: RunDto) -> Self {
        Run {
            id: RunId(dto.id),
            name: dto.name,
            dataset_id: DatasetId(dto.dataset.id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunParentDto {
    pub id: u64,
    pub dataset: IdRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoxelSpacingDto {
    pub id: u64,
    pub voxel_spacing: f64,
    pub run: RunParentDto,
}

impl From<VoxelSpacingDto> for VoxelSpacing {
    fn from(dto: VoxelSpacingDto) -> Self {
        VoxelSpacing {
            id: VoxelSpacingId(dto.id),
            voxel_spacing: dto.voxel_spacing,
            run_id: RunId(dto.run.id),
            dataset_id: DatasetId(dto.run.dataset.id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpacingParentDto {
    pub id: u64,
    pub run: RunParentDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomogramDto {
    pub id: u64,
    pub name: String,
    pub voxel_spacing: f64,
    pub size_x: u64,
    pub size_y: u64,
    pub size_z: u64,
    pub https_omezarr_dir: String,
    pub tomogram_voxel_spacing: SpacingParentDto,
}

impl From<TomogramDto> for Tomogram {
    fn from(dto: TomogramDto) -> Self {
        Tomogram {
            id: TomogramId(dto.id),
            name: dto.name,
            voxel_spacing: dto.voxel_spacing,
            // zyx, consistent with the layer axes.
            size: [dto.size_z, dto.size_y, dto.size_x],
            zarr_uri: dto.https_omezarr_dir,
            voxel_spacing_id: VoxelSpacingId(dto.tomogram_voxel_spacing.id),
            dataset_id: DatasetId(dto.tomogram_voxel_spacing.run.dataset.id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationFileDto {
    pub shape_type: ShapeType,
    pub https_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationDto {
    pub id: u64,
    pub object_name: String,
    pub tomogram_voxel_spacing_id: u64,
    #[serde(default)]
    pub files: Vec<AnnotationFileDto>,
}

impl AnnotationDto {
    /// `metadata` is the raw record the DTO was parsed from; it rides along
    /// on produced layers.
    pub fn into_domain(self, metadata: JsonMap) -> Annotation {
        Annotation {
            id: AnnotationId(self.id),
            object_name: self.object_name,
            voxel_spacing_id: VoxelSpacingId(self.tomogram_voxel_spacing_id),
            files: self
                .files
                .into_iter()
                .map(|f| AnnotationFile {
                    shape_type: f.shape_type,
                    https_path: f.https_path,
                })
                .collect(),
            metadata,
        }
    }
}
