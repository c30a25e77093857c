//! Panel flow over an in-memory portal: listing, metadata, and opening a
//! tomogram with its annotations.

use std::{io::Write, sync::Arc};

use parking_lot::Mutex;
use serde_json::json;
use tempfile::NamedTempFile;

use cryoet_portal_browser::{
    domain::{
        filter::{EntityKind, ListingFilter},
        models::{
            Annotation, AnnotationFile, Dataset, ImageLevel, JsonMap, LayerData, LayerKind,
            LayerPayload, MultiscaleImage, Resolution, Run, ShapeType, Tomogram, VoxelSpacing,
        },
        traits::LayerSink,
        value_objects::{AnnotationId, DatasetId, RunId, TomogramId, VoxelSpacingId},
    },
    error::PortalError,
    infra::{
        config::AppConfig,
        portal::MemoryPortalGateway,
        progress::{LoadState, TaskIdAllocator},
        volume::StaticVolumeReader,
    },
    panels::{ConnectionState, ListingItem, ListingPanel, MetadataPanel, OpenPanel, UriPanel},
    services::metadata_service::MetadataItem,
};

#[derive(Default)]
struct CollectingSink {
    layers: Vec<LayerData>,
    clears: usize,
}

impl LayerSink for CollectingSink {
    fn add_layer(&mut self, layer: LayerData) {
        self.layers.push(layer);
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.layers.clear();
    }
}

struct Fixture {
    gateway: Arc<MemoryPortalGateway>,
    volumes: Arc<StaticVolumeReader>,
    tomograms: Vec<Tomogram>,
    // Keeps the NDJSON annotation file alive for the test's duration.
    _points_file: NamedTempFile,
}

fn multiscale(uri: &str) -> MultiscaleImage {
    MultiscaleImage {
        levels: (0..3)
            .map(|index| ImageLevel {
                index,
                shape: [256 >> index, 512 >> index, 512 >> index],
                uri: format!("{uri}/{index}"),
            })
            .collect(),
    }
}

fn object_map(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

fn fixture() -> Fixture {
    let gateway = Arc::new(MemoryPortalGateway::new());
    let volumes = Arc::new(StaticVolumeReader::new());

    gateway.insert_dataset(Dataset {
        id: DatasetId(10000),
        title: "S. pombe cryo-FIB lamellae".into(),
        organism_name: Some("Schizosaccharomyces pombe".into()),
        release_date: None,
        deposition_date: None,
    });
    gateway.insert_dataset(Dataset {
        id: DatasetId(10001),
        title: "C. reinhardtii lamellae".into(),
        organism_name: Some("Chlamydomonas reinhardtii".into()),
        release_date: None,
        deposition_date: None,
    });

    let tomograms = vec![
        Tomogram {
            id: TomogramId(201),
            name: "TS_026".into(),
            voxel_spacing: 13.48,
            size: [256, 512, 512],
            zarr_uri: "https://files.test/10000/TS_026.zarr".into(),
            voxel_spacing_id: VoxelSpacingId(41),
            dataset_id: DatasetId(10000),
        },
        Tomogram {
            id: TomogramId(202),
            name: "TS_027".into(),
            voxel_spacing: 13.48,
            size: [256, 512, 512],
            zarr_uri: "https://files.test/10000/TS_027.zarr".into(),
            voxel_spacing_id: VoxelSpacingId(42),
            dataset_id: DatasetId(10000),
        },
        Tomogram {
            id: TomogramId(203),
            name: "Position_7".into(),
            voxel_spacing: 7.56,
            size: [200, 630, 630],
            zarr_uri: "https://files.test/10001/Position_7.zarr".into(),
            voxel_spacing_id: VoxelSpacingId(43),
            dataset_id: DatasetId(10001),
        },
    ];
    for tomogram in &tomograms {
        gateway.insert_tomogram(tomogram.clone());
        volumes.insert(tomogram.zarr_uri.clone(), multiscale(&tomogram.zarr_uri));
    }

    gateway.insert_run(Run {
        id: RunId(31),
        name: "TS_026".into(),
        dataset_id: DatasetId(10000),
    });
    gateway.insert_run(Run {
        id: RunId(32),
        name: "Position_7".into(),
        dataset_id: DatasetId(10001),
    });
    for (id, run_id, dataset_id, spacing) in [
        (41, 31, 10000, 13.48),
        (42, 31, 10000, 13.48),
        (43, 32, 10001, 7.56),
    ] {
        gateway.insert_voxel_spacing(VoxelSpacing {
            id: VoxelSpacingId(id),
            voxel_spacing: spacing,
            run_id: RunId(run_id),
            dataset_id: DatasetId(dataset_id),
        });
    }

    let mut points_file = NamedTempFile::new().expect("temp annotation file");
    writeln!(
        points_file,
        "{}",
        r#"{"type":"point","location":{"x":10.0,"y":20.0,"z":30.0}}"#
    )
    .unwrap();
    writeln!(
        points_file,
        "{}",
        r#"{"type":"point","location":{"x":11.0,"y":21.0,"z":31.0}}"#
    )
    .unwrap();

    let mask_uri = "https://files.test/10000/TS_026-ribosome-seg.zarr";
    volumes.insert(mask_uri, multiscale(mask_uri));

    gateway.insert_annotation(Annotation {
        id: AnnotationId(900),
        object_name: "ribosome".into(),
        voxel_spacing_id: VoxelSpacingId(41),
        files: vec![
            AnnotationFile {
                shape_type: ShapeType::Point,
                https_path: points_file.path().to_string_lossy().into_owned(),
            },
            AnnotationFile {
                shape_type: ShapeType::SegmentationMask,
                https_path: mask_uri.into(),
            },
        ],
        metadata: object_map(json!({"object_name": "ribosome", "annotation_method": "manual"})),
    });

    Fixture {
        gateway,
        volumes,
        tomograms,
        _points_file: points_file,
    }
}

#[tokio::test]
async fn listing_groups_tomograms_under_their_datasets() {
    let fixture = fixture();
    let mut panel = ListingPanel::new(TaskIdAllocator::new());

    panel.load(fixture.gateway.clone(), ListingFilter::default());
    panel.settled().await;
    assert_eq!(panel.load_state(), LoadState::Idle);

    let tree = panel.tree();
    let tree = tree.lock();
    let roots = tree.roots();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].label, "10000 (2)");
    assert_eq!(roots[1].label, "10001 (1)");
    let children: Vec<_> = roots[0].children.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(children, vec!["TS_026", "TS_027"]);
    match &roots[0].children[0].payload {
        ListingItem::Tomogram(tomogram) => assert_eq!(tomogram.id, TomogramId(201)),
        other => panic!("expected a tomogram row, got {other:?}"),
    }
}

#[tokio::test]
async fn tomogram_filter_lists_only_matching_tomograms() {
    let fixture = fixture();
    let mut panel = ListingPanel::new(TaskIdAllocator::new());

    panel.load(
        fixture.gateway.clone(),
        ListingFilter::new(EntityKind::Tomogram, vec![202]),
    );
    panel.settled().await;

    let tree = panel.tree();
    let tree = tree.lock();
    let roots = tree.roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].label, "10000 (1)");
    assert_eq!(roots[0].children[0].label, "TS_027");
}

#[tokio::test]
async fn run_filter_lists_the_whole_parent_dataset() {
    let fixture = fixture();
    let mut panel = ListingPanel::new(TaskIdAllocator::new());

    panel.load(
        fixture.gateway.clone(),
        ListingFilter::new(EntityKind::Run, vec![32]),
    );
    panel.settled().await;

    let tree = panel.tree();
    let tree = tree.lock();
    let roots = tree.roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].label, "10001 (1)");
    assert_eq!(roots[0].children[0].label, "Position_7");
}

#[tokio::test]
async fn voxel_spacing_filter_lists_only_its_tomograms() {
    let fixture = fixture();
    let mut panel = ListingPanel::new(TaskIdAllocator::new());

    panel.load(
        fixture.gateway.clone(),
        ListingFilter::new(EntityKind::VoxelSpacing, vec![42]),
    );
    panel.settled().await;

    let tree = panel.tree();
    let tree = tree.lock();
    let roots = tree.roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].label, "10000 (1)");
    assert_eq!(roots[0].children[0].label, "TS_027");
}

#[tokio::test]
async fn reloading_supersedes_the_previous_listing() {
    let fixture = fixture();
    let mut panel = ListingPanel::new(TaskIdAllocator::new());

    panel.load(fixture.gateway.clone(), ListingFilter::default());
    // Resubmit before the first load was pumped; only the filtered
    // listing may populate the tree.
    panel.load(
        fixture.gateway.clone(),
        ListingFilter::new(EntityKind::Dataset, vec![10001]),
    );
    panel.settled().await;

    let tree = panel.tree();
    let tree = tree.lock();
    assert_eq!(tree.roots().len(), 1);
    assert_eq!(tree.roots()[0].label, "10001 (1)");
}

#[tokio::test]
async fn search_filters_streamed_listing_rows() {
    let fixture = fixture();
    let mut panel = ListingPanel::new(TaskIdAllocator::new());

    panel.set_search("ts_027");
    panel.load(fixture.gateway.clone(), ListingFilter::default());
    panel.settled().await;

    let tree = panel.tree();
    let tree = tree.lock();
    let visible: Vec<_> = tree.visible_roots().map(|n| n.label.as_str()).collect();
    assert_eq!(visible, vec!["10000 (2)"]);
}

#[tokio::test]
async fn an_empty_uri_is_rejected_before_submission() {
    let mut panel = UriPanel::new(TaskIdAllocator::new(), AppConfig::default());
    assert!(matches!(
        panel.connect("   "),
        Err(PortalError::Validation(_))
    ));
    assert!(matches!(panel.connection(), ConnectionState::Disconnected));
    assert_eq!(panel.load_state(), LoadState::Idle);
}

#[tokio::test]
async fn a_failed_connection_returns_to_disconnected() {
    let mut panel = UriPanel::new(TaskIdAllocator::new(), AppConfig::default());
    // Nothing listens on port 1; the check fails fast.
    panel.connect("http://127.0.0.1:1/graphql").unwrap();
    assert!(matches!(panel.connection(), ConnectionState::Connecting));
    panel.settled().await;
    assert!(matches!(panel.connection(), ConnectionState::Disconnected));
    assert_eq!(panel.load_state(), LoadState::Idle);
}

#[tokio::test]
async fn disconnecting_cancels_the_check_in_flight() {
    let mut panel = UriPanel::new(TaskIdAllocator::new(), AppConfig::default());
    panel.connect("http://127.0.0.1:1/graphql").unwrap();
    panel.disconnect();
    assert!(matches!(panel.connection(), ConnectionState::Disconnected));
    panel.settled().await;
    assert!(matches!(panel.connection(), ConnectionState::Disconnected));
}

#[tokio::test]
async fn metadata_panel_shows_the_selected_entity() {
    let fixture = fixture();
    fixture.gateway.insert_dataset_metadata(
        DatasetId(10000),
        object_map(json!({
            "id": 10000,
            "title": "S. pombe cryo-FIB lamellae",
            "organism_name": "Schizosaccharomyces pombe",
        })),
    );
    let mut panel = MetadataPanel::new(TaskIdAllocator::new());

    let dataset = Dataset {
        id: DatasetId(10000),
        title: "S. pombe cryo-FIB lamellae".into(),
        organism_name: None,
        release_date: None,
        deposition_date: None,
    };
    panel.load(fixture.gateway.clone(), MetadataItem::Dataset(dataset));
    panel.settled().await;

    let view = panel.view();
    let view = view.lock();
    assert_eq!(view.title, "Metadata: 10000");
    assert!(view.error.is_none());
    let labels: Vec<_> = view.tree.roots().iter().map(|n| n.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "id: 10000",
            "title: S. pombe cryo-FIB lamellae",
            "organism_name: Schizosaccharomyces pombe",
        ]
    );
}

#[tokio::test]
async fn metadata_errors_are_recorded_and_settle() {
    let fixture = fixture();
    let mut panel = MetadataPanel::new(TaskIdAllocator::new());

    let tomogram = fixture.tomograms[0].clone();
    // No tomogram metadata inserted: the fetch fails.
    panel.load(fixture.gateway.clone(), MetadataItem::Tomogram(tomogram));
    panel.settled().await;

    let view = panel.view();
    let view = view.lock();
    assert!(view.error.as_deref().unwrap_or("").contains("not found"));
    assert_eq!(panel.load_state(), LoadState::Idle);
}

#[tokio::test]
async fn opening_a_tomogram_streams_image_then_annotation_layers() {
    let fixture = fixture();
    let sink = Arc::new(Mutex::new(CollectingSink::default()));
    let mut panel = OpenPanel::new(TaskIdAllocator::new(), Arc::clone(&sink));

    panel.set_tomogram(
        fixture.gateway.clone(),
        fixture.volumes.clone(),
        reqwest::Client::new(),
        fixture.tomograms[0].clone(),
    );
    panel.settled().await;

    let sink = sink.lock();
    assert_eq!(sink.clears, 1);
    assert_eq!(sink.layers.len(), 3);

    // Image first, at the default Low resolution.
    let image = &sink.layers[0];
    assert_eq!(image.kind, LayerKind::Image);
    assert_eq!(image.attrs.name, "TS_026");
    assert_eq!(image.attrs.scale, [13.48 * 4.0; 3]);
    match &image.payload {
        LayerPayload::Image(multiscale) => {
            assert_eq!(multiscale.levels.len(), 1);
            assert_eq!(multiscale.levels[0].index, 2);
        }
        other => panic!("expected an image payload, got {other:?}"),
    }

    // Point annotations aligned to the full-resolution image scale.
    let points = &sink.layers[1];
    assert_eq!(points.kind, LayerKind::Points);
    assert_eq!(points.attrs.name, "ribosome");
    assert_eq!(points.attrs.face_color.as_deref(), Some("red"));
    assert_eq!(points.attrs.scale, [13.48; 3]);
    match &points.payload {
        LayerPayload::Points(data) => {
            assert_eq!(data, &vec![[30.0, 20.0, 10.0], [31.0, 21.0, 11.0]]);
        }
        other => panic!("expected a points payload, got {other:?}"),
    }

    // Segmentation mask as labels, resolution-adjusted like the image.
    let labels = &sink.layers[2];
    assert_eq!(labels.kind, LayerKind::Labels);
    assert_eq!(labels.attrs.name, "ribosome");

    // Reselecting resets the resolution for the next tomogram.
    assert_eq!(panel.resolution(), Resolution::Low);
}

#[tokio::test]
async fn reselecting_a_tomogram_supersedes_the_previous_load() {
    let fixture = fixture();
    let sink = Arc::new(Mutex::new(CollectingSink::default()));
    let mut panel = OpenPanel::new(TaskIdAllocator::new(), Arc::clone(&sink));

    panel.set_tomogram(
        fixture.gateway.clone(),
        fixture.volumes.clone(),
        reqwest::Client::new(),
        fixture.tomograms[0].clone(),
    );
    panel.set_tomogram(
        fixture.gateway.clone(),
        fixture.volumes.clone(),
        reqwest::Client::new(),
        fixture.tomograms[1].clone(),
    );
    panel.settled().await;

    let sink = sink.lock();
    // Only the second tomogram's layers are visible (it has no
    // annotations, so exactly one image layer).
    assert_eq!(sink.layers.len(), 1);
    assert_eq!(sink.layers[0].attrs.name, "TS_027");
    assert_eq!(panel.load_state(), LoadState::Idle);
}

#[tokio::test]
async fn higher_resolution_reload_reuses_the_selected_tomogram() {
    let fixture = fixture();
    let sink = Arc::new(Mutex::new(CollectingSink::default()));
    let mut panel = OpenPanel::new(TaskIdAllocator::new(), Arc::clone(&sink));

    panel.set_tomogram(
        fixture.gateway.clone(),
        fixture.volumes.clone(),
        reqwest::Client::new(),
        fixture.tomograms[2].clone(),
    );
    panel.settled().await;

    panel.set_resolution(Resolution::High);
    panel.load(
        fixture.gateway.clone(),
        fixture.volumes.clone(),
        reqwest::Client::new(),
    );
    panel.settled().await;

    let sink = sink.lock();
    assert_eq!(sink.clears, 2);
    let image = &sink.layers[0];
    assert_eq!(image.attrs.scale, [7.56; 3]);
    match &image.payload {
        LayerPayload::Image(multiscale) => assert_eq!(multiscale.levels[0].index, 0),
        other => panic!("expected an image payload, got {other:?}"),
    }
}
