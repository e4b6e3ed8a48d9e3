//! # API Client
//!
//! Bearer-authenticated JSON-over-HTTP access to the AREA backend. One
//! instance is built at composition time and shared (via `Arc`) by the
//! service adapters, the snapshot loader and the orchestrator.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::{BlueprintError, RemoteError};
use crate::models::{
    AboutResponse, ConnectionStatus, CreateReactionRequest, Reaction, ServiceKind,
    UpdateReactionRequest,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BlueprintError> {
        if base_url.cannot_be_a_base() {
            return Err(BlueprintError::InvalidBaseUrl {
                value: base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BlueprintError::HttpClient(err.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, BlueprintError> {
        let base_url = config
            .base_url()
            .map_err(|source| BlueprintError::InvalidBaseUrl {
                value: config.api_base_url.clone(),
                source,
            })?;
        Self::new(base_url, config.api_token.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` below the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Network(format!("cannot build url for {path}")))?;
            segments.pop_if_empty();
            segments.extend(path.trim_matches('/').split('/'));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = RemoteError::from_body(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %err, "Backend request failed");
        Err(err)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.endpoint(path)?;
        debug!(method = "GET", %url, "Backend request");
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(method = "POST", %url, "Backend request");
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        Ok(response.json::<T>().await?)
    }

    /// PATCH whose response body is not needed.
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), RemoteError> {
        let url = self.endpoint(path)?;
        debug!(method = "PATCH", %url, "Backend request");
        self.send(self.request(Method::PATCH, url).json(body)).await?;
        Ok(())
    }

    /// DELETE with an optional JSON body; the response body is discarded.
    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<(), RemoteError> {
        let url = self.endpoint(path)?;
        debug!(method = "DELETE", %url, "Backend request");
        let mut builder = self.request(Method::DELETE, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await?;
        Ok(())
    }

    pub async fn list_reactions(&self) -> Result<Vec<Reaction>, RemoteError> {
        self.get_json("/reactions").await
    }

    pub async fn create_reaction(
        &self,
        request: &CreateReactionRequest,
    ) -> Result<Reaction, RemoteError> {
        self.post_json("/reactions", request).await
    }

    pub async fn update_reaction(&self, request: &UpdateReactionRequest) -> Result<(), RemoteError> {
        self.patch(&format!("/reactions/{}", request.id), request).await
    }

    pub async fn delete_reaction(&self, reaction_id: i64) -> Result<(), RemoteError> {
        self.delete(&format!("/reactions/{reaction_id}"), None).await
    }

    pub async fn connection_status(&self, service: ServiceKind) -> Result<bool, RemoteError> {
        let mut url = self.endpoint("/users/connection")?;
        url.query_pairs_mut().append_pair("provider", service.as_str());
        debug!(method = "GET", %url, "Backend request");
        let response = self.send(self.request(Method::GET, url)).await?;
        let status: ConnectionStatus = response.json().await?;
        Ok(status.connected)
    }

    pub async fn about(&self) -> Result<AboutResponse, RemoteError> {
        self.get_json("/about.json").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(
            Url::parse(&server.uri()).unwrap(),
            Some("test-token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = ApiClient::new(
            Url::parse("http://localhost:8080/api/").unwrap(),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("/github/webhook").unwrap().as_str(),
            "http://localhost:8080/api/github/webhook"
        );
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reactions"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 9, "hookId": 1, "reactionType": 2, "config": {} }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let reactions = client_for(&server).list_reactions().await.unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].hook_id, 1);
    }

    #[tokio::test]
    async fn error_body_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/reactions/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "data": { "message": "Reaction not found" } })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).delete_reaction(9).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.server_message(), Some("Reaction not found"));
    }

    #[tokio::test]
    async fn update_reaction_sends_id_and_config() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/reactions/4"))
            .and(body_json(json!({ "id": 4, "config": { "to": "a@b.c" } })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = crate::models::ConfigMap::new();
        config.insert("to".into(), json!("a@b.c"));
        client_for(&server)
            .update_reaction(&UpdateReactionRequest { id: 4, config })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn connection_status_uses_provider_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/connection"))
            .and(query_param("provider", "discord"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": true })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(
            client_for(&server)
                .connection_status(ServiceKind::Discord)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn malformed_json_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).about().await.unwrap_err();
        assert!(matches!(err, RemoteError::MalformedResponse(_)));
    }
}
