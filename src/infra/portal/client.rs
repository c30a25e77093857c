use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    domain::{
        models::{Annotation, Dataset, JsonMap, Run, Tomogram, VoxelSpacing},
        traits::PortalGateway,
        value_objects::{DatasetId, RunId, TomogramId, VoxelSpacingId},
    },
    dto::{
        graphql::{GraphQlRequest, GraphQlResponse},
        portal::{AnnotationDto, DatasetDto, RunDto, TomogramDto, VoxelSpacingDto},
    },
    error::{PortalError, PortalResult},
    infra::config::AppConfig,
};

use super::queries;

/// GraphQL client for one portal endpoint. Cheap to construct, so call
/// sites that want a private instance per submission can just build one.
#[derive(Clone, Debug)]
pub struct PortalClient {
    graphql_uri: String,
    http: Client,
}

impl PortalClient {
    pub fn new(graphql_uri: impl Into<String>, config: &AppConfig) -> PortalResult<Self> {
        let graphql_uri = graphql_uri.into();
        if graphql_uri.trim().is_empty() {
            return Err(PortalError::Validation("portal URI cannot be empty".into()));
        }
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.http_timeout_ms.max(1)))
            .build()
            .map_err(|err| PortalError::Internal(format!("failed to build http client: {err}")))?;
        Ok(Self { graphql_uri, http })
    }

    pub fn graphql_uri(&self) -> &str {
        &self.graphql_uri
    }

    /// Shared connection pool, reused for non-GraphQL fetches (NDJSON
    /// annotation files).
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Posts one query and returns the `data` payload.
    pub async fn query(&self, query: &str) -> PortalResult<Value> {
        debug!(uri = %self.graphql_uri, "portal query");
        let response = self
            .http
            .post(&self.graphql_uri)
            .json(&GraphQlRequest {
                query: query.to_string(),
            })
            .send()
            .await
            .map_err(|err| PortalError::External(format!("portal request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<empty>".to_string());
            return Err(PortalError::External(format!(
                "portal query failed ({status}): {body}"
            )));
        }

        let envelope: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| PortalError::Parse(format!("invalid portal response: {err}")))?;

        if let Some(error) = envelope.errors.first() {
            return Err(PortalError::External(format!(
                "portal query rejected: {}",
                error.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| PortalError::Parse("portal response carried no data".into()))
    }

    async fn query_list(&self, query: &str, field: &str) -> PortalResult<Vec<Value>> {
        let data = self.query(query).await?;
        match data.get(field) {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(PortalError::Parse(format!(
                "portal response missing list field {field:?}"
            ))),
        }
    }

    async fn query_entities<D, T>(&self, query: &str, field: &str) -> PortalResult<Vec<T>>
    where
        D: DeserializeOwned + Into<T>,
    {
        let items = self.query_list(query, field).await?;
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<D>(item)
                    .map(Into::into)
                    .map_err(|err| PortalError::Parse(format!("invalid {field} record: {err}")))
            })
            .collect()
    }

    async fn query_metadata(&self, query: &str, field: &str, id: u64) -> PortalResult<JsonMap> {
        let items = self.query_list(query, field).await?;
        match items.into_iter().next() {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(PortalError::Parse(format!(
                "metadata record for {field} {id} is not an object"
            ))),
            None => Err(PortalError::NotFound(format!("{field} {id} not found"))),
        }
    }
}

#[async_trait]
impl PortalGateway for PortalClient {
    async fn find_datasets(&self, ids: &[DatasetId]) -> PortalResult<Vec<Dataset>> {
        let ids: Vec<u64> = ids.iter().map(|id| id.0).collect();
        self.query_entities::<DatasetDto, _>(&queries::datasets(&ids), "datasets")
            .await
    }

    async fn find_runs(&self, ids: &[RunId]) -> PortalResult<Vec<Run>> {
        let ids: Vec<u64> = ids.iter().map(|id| id.0).collect();
        self.query_entities::<RunDto, _>(&queries::runs(&ids), "runs")
            .await
    }

    async fn find_voxel_spacings(&self, ids: &[VoxelSpacingId]) -> PortalResult<Vec<VoxelSpacing>> {
        let ids: Vec<u64> = ids.iter().map(|id| id.0).collect();
        self.query_entities::<VoxelSpacingDto, _>(
            &queries::voxel_spacings(&ids),
            "tomogram_voxel_spacings",
        )
        .await
    }

    async fn find_tomograms(&self, ids: &[TomogramId]) -> PortalResult<Vec<Tomogram>> {
        let ids: Vec<u64> = ids.iter().map(|id| id.0).collect();
        self.query_entities::<TomogramDto, _>(&queries::tomograms(&ids), "tomograms")
            .await
    }

    async fn tomograms_of_dataset(&self, dataset: DatasetId) -> PortalResult<Vec<Tomogram>> {
        self.query_entities::<TomogramDto, _>(
            &queries::tomograms_of_dataset(dataset.0),
            "tomograms",
        )
        .await
    }

    async fn tomograms_of_voxel_spacing(
        &self,
        spacing: VoxelSpacingId,
    ) -> PortalResult<Vec<Tomogram>> {
        self.query_entities::<TomogramDto, _>(
            &queries::tomograms_of_voxel_spacing(spacing.0),
            "tomograms",
        )
        .await
    }

    async fn annotations_of_voxel_spacing(
        &self,
        spacing: VoxelSpacingId,
    ) -> PortalResult<Vec<Annotation>> {
        let items = self
            .query_list(&queries::annotations_of_voxel_spacing(spacing.0), "annotations")
            .await?;
        items
            .into_iter()
            .map(|item| {
                let metadata = item.as_object().cloned().unwrap_or_default();
                serde_json::from_value::<AnnotationDto>(item)
                    .map(|dto| dto.into_domain(metadata))
                    .map_err(|err| PortalError::Parse(format!("invalid annotation record: {err}")))
            })
            .collect()
    }

    async fn dataset_metadata(&self, dataset: DatasetId) -> PortalResult<JsonMap> {
        self.query_metadata(&queries::dataset_metadata(dataset.0), "datasets", dataset.0)
            .await
    }

    async fn tomogram_metadata(&self, tomogram: TomogramId) -> PortalResult<JsonMap> {
        self.query_metadata(
            &queries::tomogram_metadata(tomogram.0),
            "tomograms",
            tomogram.0,
        )
        .await
    }

    async fn ping(&self) -> PortalResult<()> {
        self.query(&queries::ping()).await.map(|_| ())
    }
}
