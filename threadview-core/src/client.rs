use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, ThreadviewError};
use crate::model::{Assistant, Message, RunStep};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
const ASSISTANTS_BETA: &str = "assistants=v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub order: Option<SortOrder>,
    pub after: Option<String>,
}

impl ListQuery {
    pub fn ascending(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            order: Some(SortOrder::Asc),
            after: None,
        }
    }

    #[must_use]
    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.to_string()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

pub trait ThreadSource {
    fn list_messages(&self, thread_id: &str, query: &ListQuery) -> Result<Page<Message>>;

    fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
        query: &ListQuery,
    ) -> Result<Page<RunStep>>;

    fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
            project: None,
            user_agent: format!("threadviewer/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
        }
    }
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    headers: HeaderMap,
    config: ApiConfig,
}

impl OpenAiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ThreadviewError::MissingApiKey);
        }

        let headers = build_headers(&config)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            headers,
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub fn build_get(&self, path: &str, query: Option<&ListQuery>) -> RequestBuilder {
        let request = self
            .http
            .get(self.endpoint(path))
            .headers(self.headers.clone());
        match query {
            Some(query) => request.query(&query.to_pairs()),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: Option<&ListQuery>) -> Result<T> {
        debug!(path, ?query, "GET");
        let response = self.build_get(path, query).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(ThreadviewError::Status {
                status,
                message: parse_error_message(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ThreadviewError::Decode {
            context: path.to_string(),
            source,
        })
    }
}

impl ThreadSource for OpenAiClient {
    fn list_messages(&self, thread_id: &str, query: &ListQuery) -> Result<Page<Message>> {
        self.get_json(&format!("threads/{thread_id}/messages"), Some(query))
    }

    fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
        query: &ListQuery,
    ) -> Result<Page<RunStep>> {
        self.get_json(
            &format!("threads/{thread_id}/runs/{run_id}/steps"),
            Some(query),
        )
    }

    fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        self.get_json(&format!("assistants/{assistant_id}"), None)
    }
}

fn build_headers(config: &ApiConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
        .map_err(|_| ThreadviewError::InvalidHeader("Authorization"))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert("openai-beta", HeaderValue::from_static(ASSISTANTS_BETA));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ThreadviewError::InvalidHeader("User-Agent"))?,
    );
    if let Some(organization) = config.organization.as_deref() {
        headers.insert(
            "openai-organization",
            HeaderValue::from_str(organization)
                .map_err(|_| ThreadviewError::InvalidHeader("OpenAI-Organization"))?,
        );
    }
    if let Some(project) = config.project.as_deref() {
        headers.insert(
            "openai-project",
            HeaderValue::from_str(project)
                .map_err(|_| ThreadviewError::InvalidHeader("OpenAI-Project"))?,
        );
    }
    Ok(headers)
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let explicit = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = explicit {
        return message;
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
