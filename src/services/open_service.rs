use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use crate::{
    domain::{
        models::{LayerData, LayerPayload, Resolution, ShapeType, Tomogram},
        traits::{PortalGateway, VolumeReader},
    },
    infra::{ndjson, progress::Work},
};

/// Step-producing work yielding the layers of one tomogram: the image at
/// the requested resolution first, then one layer per annotation file.
pub fn load_tomogram_work(
    gateway: Arc<dyn PortalGateway>,
    volumes: Arc<dyn VolumeReader>,
    http: Client,
    tomogram: Tomogram,
    resolution: Resolution,
) -> Work<LayerData, ()> {
    Work::steps(move |sink| async move {
        debug!(tomogram = %tomogram.id, resolution = resolution.label(), "loading tomogram");
        let image = volumes.read_tomogram(&tomogram).await?;
        // Full-resolution scale, captured before the resolution is applied
        // so annotation layers can be aligned to it.
        let image_scale = image.attrs.scale;
        if !sink.emit(image_at_resolution(image, resolution)) {
            return Ok(());
        }

        let annotations = gateway
            .annotations_of_voxel_spacing(tomogram.voxel_spacing_id)
            .await?;
        for annotation in annotations {
            for file in &annotation.files {
                let layer = match file.shape_type {
                    ShapeType::Point | ShapeType::OrientedPoint => {
                        let points =
                            ndjson::read_annotation_points(&http, &annotation, file).await?;
                        Some(points_at_scale(points, image_scale))
                    }
                    ShapeType::SegmentationMask => {
                        let labels = volumes
                            .read_segmentation(&file.https_path, &annotation.object_name)
                            .await?;
                        Some(image_at_resolution(labels, resolution))
                    }
                    ShapeType::Unsupported => None,
                };
                if let Some(layer) = layer {
                    if !sink.emit(layer) {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    })
}

/// Selects the requested level of a multiscale layer and adjusts scale and
/// translation so every resolution shares the same visual extent. A layer
/// with fewer levels than requested keeps its deepest one.
pub fn image_at_resolution(layer: LayerData, resolution: Resolution) -> LayerData {
    let LayerData {
        payload,
        mut attrs,
        kind,
    } = layer;

    let payload = match (payload, resolution.level()) {
        (LayerPayload::Image(image), Some(level)) => {
            let level = level.min(image.levels.len().saturating_sub(1));
            let selected = image.select_level(level).unwrap_or(image);
            LayerPayload::Image(selected)
        }
        (payload, _) => payload,
    };

    let full_scale = attrs.scale;
    let factor = resolution.downscale();
    attrs.scale = [
        full_scale[0] * factor,
        full_scale[1] * factor,
        full_scale[2] * factor,
    ];
    // Lower resolutions have a larger first voxel; shift by half the
    // difference so all levels start at the same scaled (-0.5, ...) corner.
    let translate = attrs.translate;
    attrs.translate = [
        full_scale[0] * (factor - 1.0) / 2.0 + translate[0],
        full_scale[1] * (factor - 1.0) / 2.0 + translate[1],
        full_scale[2] * (factor - 1.0) / 2.0 + translate[2],
    ];

    LayerData {
        payload,
        attrs,
        kind,
    }
}

/// Points inherit the full-resolution image scale so they stay visually
/// aligned with the image regardless of the resolution it was opened at.
pub fn points_at_scale(mut layer: LayerData, image_scale: [f64; 3]) -> LayerData {
    layer.attrs.scale = image_scale;
    layer
}
