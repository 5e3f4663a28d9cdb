//! Blocking HTTP client for the model service.

use super::types::{Group, Model, ModelList, ModelRecord, UpdatePayload, UpdateResponse};
use super::AclService;
use crate::config::Config;
use anyhow::{Context, Result, bail};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};
use ureq::{Agent, Proxy, RequestBuilder};

const GROUPS_PATH: &str = "/api/v1/groups/";
const MODELS_PATH: &str = "/api/models";
const UPDATE_PATH: &str = "/api/v1/models/model/update";

/// Client for the groups, models and model-update endpoints.
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from the startup configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured or the proxy URL is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?.to_string();

        let mut builder = ureq::config::Config::builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false);
        if let Some(proxy) = config.proxy.as_deref() {
            let proxy = Proxy::new(proxy).with_context(|| format!("Invalid proxy URL {proxy}"))?;
            builder = builder.proxy(Some(proxy));
        }
        let agent: Agent = builder.build().new_agent();

        Ok(Self {
            agent,
            base_url,
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request.header("accept", "application/json");
        match self.token.as_deref() {
            Some(token) => request
                .header("authorization", format!("Bearer {token}"))
                .header("cookie", format!("token={token}")),
            None => request,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "Fetching {what}");

        let response = self
            .authorize(self.agent.get(&url))
            .call()
            .with_context(|| format!("Failed to fetch {what} from {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Fetching {what} failed with status {status}");
        }

        response
            .into_body()
            .read_json()
            .with_context(|| format!("Failed to deserialize {what} response"))
    }
}

impl AclService for ApiClient {
    fn list_groups(&self) -> Result<Vec<Group>> {
        let groups: Vec<Group> = self.get_json(GROUPS_PATH, "groups")?;
        info!(count = groups.len(), "Fetched groups");
        Ok(groups)
    }

    fn list_models(&self) -> Result<Vec<Model>> {
        let list: ModelList = self.get_json(MODELS_PATH, "models")?;
        let models: Vec<Model> = list.data.into_iter().map(ModelRecord::into_model).collect();
        info!(count = models.len(), "Fetched models");
        Ok(models)
    }

    fn update_model(&self, payload: &UpdatePayload) -> Result<UpdateResponse> {
        let url = self.url(UPDATE_PATH);
        debug!(model = %payload.id, "Sending model update");

        let response = self
            .authorize(self.agent.post(&url))
            .query("id", &payload.id)
            .send_json(payload)
            .with_context(|| format!("Failed to send update for {}", payload.id))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .context("Failed to read update response")?;

        info!(model = %payload.id, status, "Model update answered");
        Ok(UpdateResponse { status, body })
    }

    fn update_url(&self, model_id: &str) -> String {
        format!(
            "{}?id={}",
            self.url(UPDATE_PATH),
            encode_model_id(model_id)
        )
    }
}

// Path separators stay readable; every other reserved byte is escaped.
fn encode_model_id(model_id: &str) -> String {
    model_id
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}
