//! Newline-delimited JSON annotation decoding.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    domain::models::{Annotation, AnnotationFile, LayerAttrs, LayerData, LayerKind, LayerPayload},
    error::{PortalError, PortalResult},
    infra::io,
};

pub const DEFAULT_POINT_SIZE: f64 = 14.0;
pub const DEFAULT_POINT_OPACITY: f64 = 0.5;
pub const DEFAULT_OBJECT_COLOR: &str = "red";

/// Display color for an annotated object type, with a fallback for
/// objects the table does not know.
pub fn object_color(object_name: &str) -> &'static str {
    match object_name.to_ascii_lowercase().as_str() {
        "ribosome" | "ribosome, 80 s" => "red",
        "fatty acid synthase" => "darkblue",
        _ => DEFAULT_OBJECT_COLOR,
    }
}

#[derive(Debug, Deserialize)]
struct Location {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Deserialize)]
struct PointRecord {
    location: Location,
}

/// Parses NDJSON annotation text into point coordinates, zyx order to stay
/// consistent with the related images. Records of other kinds are skipped;
/// malformed lines are an error.
pub fn parse_points(text: &str) -> PortalResult<Vec<[f64; 3]>> {
    let mut points = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(line)
            .map_err(|err| PortalError::Parse(format!("invalid annotation record: {err}")))?;
        match record.get("type").and_then(Value::as_str) {
            Some("point") | Some("orientedPoint") => {}
            _ => continue,
        }
        let point: PointRecord = serde_json::from_value(record)
            .map_err(|err| PortalError::Parse(format!("invalid point record: {err}")))?;
        points.push([point.location.z, point.location.y, point.location.x]);
    }
    Ok(points)
}

/// Reads one NDJSON file into a points layer with default presentation.
/// S3 URIs in the portal's public bucket are read through its HTTPS mirror.
pub async fn read_points_annotations(http: &Client, uri: &str) -> PortalResult<LayerData> {
    let uri = io::s3_to_https(uri);
    let text = io::fetch_text(http, &uri).await?;
    let data = parse_points(&text)?;
    let mut attrs = LayerAttrs::named("annotations");
    attrs.point_size = Some(DEFAULT_POINT_SIZE);
    attrs.face_color = Some(DEFAULT_OBJECT_COLOR.to_string());
    attrs.opacity = Some(DEFAULT_POINT_OPACITY);
    Ok(LayerData {
        payload: LayerPayload::Points(data),
        attrs,
        kind: LayerKind::Points,
    })
}

/// Reads one of an annotation's point files into a layer named and colored
/// after the annotated object, carrying the annotation record as metadata.
pub async fn read_annotation_points(
    http: &Client,
    annotation: &Annotation,
    file: &AnnotationFile,
) -> PortalResult<LayerData> {
    let mut layer = read_points_annotations(http, &file.https_path).await?;
    layer.attrs.name = annotation.object_name.clone();
    layer.attrs.face_color = Some(object_color(&annotation.object_name).to_string());
    layer.attrs.metadata = annotation.metadata.clone();
    Ok(layer)
}
