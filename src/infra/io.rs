//! URI helpers spanning the portal's HTTPS mirror and the local filesystem.

use reqwest::Client;

use crate::error::{PortalError, PortalResult};

pub const PORTAL_S3_BUCKET: &str = "s3://cryoet-data-portal-public";
pub const PORTAL_HTTPS_HOST: &str = "https://files.cryoetdataportal.cziscience.com";

/// Maps an S3 URI in the portal's public bucket to its CloudFront mirror.
/// URIs outside the bucket pass through unchanged.
pub fn s3_to_https(uri: &str) -> String {
    uri.replacen(PORTAL_S3_BUCKET, PORTAL_HTTPS_HOST, 1)
}

pub fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Fetches the whole body at `uri`, which may be an HTTP(S) URL or a local
/// filesystem path (used by tests and offline mirrors).
pub async fn fetch_text(http: &Client, uri: &str) -> PortalResult<String> {
    if is_remote(uri) {
        let response = http
            .get(uri)
            .send()
            .await
            .map_err(|err| PortalError::External(format!("failed to fetch {uri}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::External(format!(
                "fetch of {uri} failed with status {status}"
            )));
        }
        response
            .text()
            .await
            .map_err(|err| PortalError::External(format!("failed to read {uri}: {err}")))
    } else {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|err| PortalError::External(format!("failed to read {path}: {err}")))
    }
}
