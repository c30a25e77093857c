//! Query builders for the portal's Hasura-style GraphQL schema.

const DATASET_FIELDS: &str = "id title organism_name release_date deposition_date";
const RUN_FIELDS: &str = "id name dataset { id }";
const SPACING_FIELDS: &str = "id voxel_spacing run { id dataset { id } }";
const TOMOGRAM_FIELDS: &str = "id name voxel_spacing size_x size_y size_z \
     https_omezarr_dir tomogram_voxel_spacing { id run { id dataset { id } } }";
const ANNOTATION_FIELDS: &str =
    "id object_name annotation_method tomogram_voxel_spacing_id files { shape_type https_path }";

const DATASET_METADATA_FIELDS: &str = "id title description organism_name organism_taxid \
     sample_type sample_preparation grid_preparation dataset_citations related_database_entries \
     release_date deposition_date last_modified_date";
const TOMOGRAM_METADATA_FIELDS: &str = "id name size_x size_y size_z voxel_spacing \
     fiducial_alignment_status reconstruction_method reconstruction_software processing \
     tomogram_version https_omezarr_dir";

/// `where` clause restricting `id` to a set; empty sets select everything.
fn id_in(ids: &[u64]) -> String {
    if ids.is_empty() {
        String::new()
    } else {
        let list = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("(where: {{id: {{_in: [{list}]}}}})")
    }
}

pub fn datasets(ids: &[u64]) -> String {
    format!("query {{ datasets{} {{ {DATASET_FIELDS} }} }}", id_in(ids))
}

pub fn runs(ids: &[u64]) -> String {
    format!("query {{ runs{} {{ {RUN_FIELDS} }} }}", id_in(ids))
}

pub fn voxel_spacings(ids: &[u64]) -> String {
    format!(
        "query {{ tomogram_voxel_spacings{} {{ {SPACING_FIELDS} }} }}",
        id_in(ids)
    )
}

pub fn tomograms(ids: &[u64]) -> String {
    format!("query {{ tomograms{} {{ {TOMOGRAM_FIELDS} }} }}", id_in(ids))
}

pub fn tomograms_of_dataset(dataset: u64) -> String {
    format!(
        "query {{ tomograms(where: {{tomogram_voxel_spacing: {{run: {{dataset_id: {{_eq: {dataset}}}}}}}}}) \
         {{ {TOMOGRAM_FIELDS} }} }}"
    )
}

pub fn tomograms_of_voxel_spacing(spacing: u64) -> String {
    format!(
        "query {{ tomograms(where: {{tomogram_voxel_spacing_id: {{_eq: {spacing}}}}}) \
         {{ {TOMOGRAM_FIELDS} }} }}"
    )
}

pub fn annotations_of_voxel_spacing(spacing: u64) -> String {
    format!(
        "query {{ annotations(where: {{tomogram_voxel_spacing_id: {{_eq: {spacing}}}}}) \
         {{ {ANNOTATION_FIELDS} }} }}"
    )
}

pub fn dataset_metadata(dataset: u64) -> String {
    format!(
        "query {{ datasets(where: {{id: {{_eq: {dataset}}}}}) {{ {DATASET_METADATA_FIELDS} }} }}"
    )
}

pub fn tomogram_metadata(tomogram: u64) -> String {
    format!(
        "query {{ tomograms(where: {{id: {{_eq: {tomogram}}}}}) {{ {TOMOGRAM_METADATA_FIELDS} }} }}"
    )
}

pub fn ping() -> String {
    "query { __typename }".to_string()
}
