//! REST client for the remote record store.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use forcebridge_core::{AttributeMap, ObjectDescribe, Record, RemoteError};

use crate::{QueryResponse, RemoteApi};
use async_trait::async_trait;

const DEFAULT_API_VERSION: &str = "v52.0";

/// Remote REST API client with bearer auth.
///
/// Owns no retry or token-refresh logic; callers hand in a ready-to-use
/// access token and a shared [`reqwest::Client`] if they have one.
pub struct RestClient {
    http: Client,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl RestClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// Address for one record. Non-default identifier fields use the
    /// external-id addressing form `sobjects/<object>/<field>/<id>`.
    fn record_path(object: &str, id: &str, identifier_field: &str) -> String {
        if identifier_field == "Id" {
            format!("sobjects/{}/{}", object, id)
        } else {
            format!("sobjects/{}/{}/{}", object, identifier_field, id)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        tracing::debug!(url, "remote GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::service_error(status, response).await);
        }
        response.json().await.map_err(|error| RemoteError::InvalidResponse {
            reason: error.to_string(),
        })
    }

    async fn expect_no_content(response: Response) -> Result<(), RemoteError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::service_error(status, response).await)
        }
    }

    async fn service_error(status: StatusCode, response: Response) -> RemoteError {
        let body = response.text().await.unwrap_or_default();
        RemoteError::Service {
            status: status.as_u16(),
            messages: parse_error_messages(&body),
        }
    }
}

/// Extract remote error messages from a JSON error body, verbatim.
///
/// The remote answers errors as `[{"message": ..., "errorCode": ...}]`;
/// anything undecodable is carried through as the raw body text.
fn parse_error_messages(body: &str) -> Vec<String> {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: Option<String>,
        #[serde(rename = "errorCode")]
        error_code: Option<String>,
    }

    if let Ok(errors) = serde_json::from_str::<Vec<ApiErrorBody>>(body) {
        let messages: Vec<String> = errors
            .into_iter()
            .filter_map(|error| error.message.or(error.error_code))
            .collect();
        if !messages.is_empty() {
            return messages;
        }
    }
    if body.is_empty() {
        Vec::new()
    } else {
        vec![body.to_string()]
    }
}

fn transport(error: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        reason: error.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[async_trait]
impl RemoteApi for RestClient {
    async fn query(&self, soql: &str) -> Result<Vec<Record>, RemoteError> {
        let mut page: QueryResponse = self
            .get_json(&self.data_url("query"), &[("q", soql)])
            .await?;
        let mut records: Vec<Record> = page.records.drain(..).map(Record::from_raw).collect();

        // The remote paginates large result sets; follow the continuation
        // links so callers always see the full set.
        while let Some(next) = page.next_records_url.take() {
            let url = format!("{}{}", self.instance_url, next);
            page = self.get_json(&url, &[]).await?;
            records.extend(page.records.drain(..).map(Record::from_raw));
        }

        Ok(records)
    }

    async fn raw_query(&self, soql: &str) -> Result<QueryResponse, RemoteError> {
        self.get_json(&self.data_url("query"), &[("q", soql)]).await
    }

    async fn describe(&self, object: &str) -> Result<ObjectDescribe, RemoteError> {
        let path = format!("sobjects/{}/describe", object.trim_matches('/'));
        self.get_json(&self.data_url(&path), &[]).await
    }

    async fn create(&self, object: &str, attributes: &AttributeMap) -> Result<String, RemoteError> {
        let url = self.data_url(&format!("sobjects/{}", object));
        tracing::debug!(url = %url, object, "remote create");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(attributes)
            .send()
            .await
            .map_err(transport)?;
        let created: CreateResponse = Self::decode(response).await?;
        Ok(created.id)
    }

    async fn update(
        &self,
        object: &str,
        id: &str,
        attributes: &AttributeMap,
        identifier_field: &str,
    ) -> Result<(), RemoteError> {
        let url = self.data_url(&Self::record_path(object, id, identifier_field));
        tracing::debug!(url = %url, object, "remote update");
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(attributes)
            .send()
            .await
            .map_err(transport)?;
        Self::expect_no_content(response).await
    }

    async fn delete(
        &self,
        object: &str,
        id: &str,
        identifier_field: &str,
    ) -> Result<(), RemoteError> {
        let url = self.data_url(&Self::record_path(object, id, identifier_field));
        tracing::debug!(url = %url, object, "remote delete");
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;
        Self::expect_no_content(response).await
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
