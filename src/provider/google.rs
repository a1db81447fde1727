//! Google Tasks provider implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{
    AccessToken, ExternalStatus, ExternalTask, NewExternalTask, Page, ProviderError, TaskListRef, TaskPatch,
    TaskProvider,
};
use crate::config::{GoogleConfig, SyncConfig};
use crate::constants::PROVIDER_PAGE_SIZE;
use crate::utils::datetime;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskListsResponse {
    items: Option<Vec<RawTaskList>>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RawTaskList {
    id: String,
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TasksResponse {
    items: Option<Vec<RawTask>>,
    next_page_token: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
struct RawTask {
    id: String,
    title: Option<String>,
    notes: Option<String>,
    due: Option<String>,
    status: Option<String>,
    completed: Option<String>,
    updated: Option<String>,
    deleted: Option<bool>,
}

/// Google Tasks REST client.
pub struct GoogleTasksClient {
    http: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_base_url: Url,
}

impl GoogleTasksClient {
    /// Create a client with the OAuth client credentials and a per-request timeout.
    pub fn new(
        client_id: String,
        client_secret: String,
        google: &GoogleConfig,
        sync: &SyncConfig,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(sync.request_timeout())
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            token_url: google.token_url.clone(),
            api_base_url: parse_base_url(&google.api_base_url)?,
        })
    }

    /// Build a client reading OAuth client credentials from the configured env vars.
    pub fn from_config(google: &GoogleConfig, sync: &SyncConfig) -> anyhow::Result<Self> {
        let (client_id, client_secret) = google.client_credentials()?;
        Ok(Self::new(client_id, client_secret, google, sync)?)
    }

    /// API URL with each segment appended and percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Other(format!("Invalid API base URL: {}", self.api_base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tasks_url(&self, list_id: &str) -> Result<Url, ProviderError> {
        self.api_url(&["lists", list_id, "tasks"])
    }

    fn task_url(&self, list_id: &str, task_id: &str) -> Result<Url, ProviderError> {
        self.api_url(&["lists", list_id, "tasks", task_id])
    }

    async fn send(request: RequestBuilder, context: &str) -> Result<Response, ProviderError> {
        let resp = request.send().await.map_err(|e| transport_error(e, context))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(classify_api_error(status, &body, context))
    }

    async fn send_for_task(request: RequestBuilder, list_id: &str, context: &str) -> Result<ExternalTask, ProviderError> {
        let raw: RawTask = Self::send(request, context)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidData(format!("{context}: {e}")))?;
        Ok(task_from_raw(raw, list_id))
    }
}

#[async_trait]
impl TaskProvider for GoogleTasksClient {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken, ProviderError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, "Token refresh"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_token_error(status, &body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidData(format!("Token refresh: {e}")))?;

        Ok(AccessToken {
            token: token.access_token,
            expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    async fn list_task_lists(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
    ) -> Result<Page<TaskListRef>, ProviderError> {
        let mut request = self
            .http
            .get(self.api_url(&["users", "@me", "lists"])?)
            .bearer_auth(token.as_str())
            .query(&[("maxResults", PROVIDER_PAGE_SIZE.to_string())]);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let body: TaskListsResponse = Self::send(request, "Task lists")
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidData(format!("Task lists: {e}")))?;

        Ok(Page {
            items: body
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|list| TaskListRef {
                    id: list.id,
                    title: list.title,
                })
                .collect(),
            next_page_token: body.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn list_tasks(
        &self,
        token: &AccessToken,
        list_id: &str,
        updated_since: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<Page<ExternalTask>, ProviderError> {
        let mut request = self.http.get(self.tasks_url(list_id)?).bearer_auth(token.as_str()).query(&[
            ("showCompleted", "true".to_string()),
            ("showDeleted", "true".to_string()),
            ("showHidden", "true".to_string()),
            ("maxResults", PROVIDER_PAGE_SIZE.to_string()),
            ("updatedMin", datetime::format_timestamp(updated_since)),
        ]);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        debug!("Listing tasks in '{}' updated since {}", list_id, updated_since);
        let body: TasksResponse = Self::send(request, "Tasks list")
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidData(format!("Tasks list: {e}")))?;

        Ok(Page {
            items: body
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|raw| task_from_raw(raw, list_id))
                .collect(),
            next_page_token: body.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_task(&self, token: &AccessToken, list_id: &str, task_id: &str) -> Result<ExternalTask, ProviderError> {
        let request = self.http.get(self.task_url(list_id, task_id)?).bearer_auth(token.as_str());
        Self::send_for_task(request, list_id, "Task fetch").await
    }

    async fn create_task(
        &self,
        token: &AccessToken,
        list_id: &str,
        task: NewExternalTask,
    ) -> Result<ExternalTask, ProviderError> {
        let request = self
            .http
            .post(self.tasks_url(list_id)?)
            .bearer_auth(token.as_str())
            .json(&create_body(&task));
        Self::send_for_task(request, list_id, "Task create").await
    }

    async fn update_task(
        &self,
        token: &AccessToken,
        list_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<ExternalTask, ProviderError> {
        let request = self
            .http
            .patch(self.task_url(list_id, task_id)?)
            .bearer_auth(token.as_str())
            .json(&patch_body(&patch));
        Self::send_for_task(request, list_id, "Task update").await
    }

    async fn delete_task(&self, token: &AccessToken, list_id: &str, task_id: &str) -> Result<(), ProviderError> {
        let request = self.http.delete(self.task_url(list_id, task_id)?).bearer_auth(token.as_str());
        Self::send(request, "Task delete").await?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error, context: &str) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(format!("{context}: {err}"))
    } else {
        ProviderError::Network(format!("{context}: {err}"))
    }
}

/// Map a failed API response onto the error taxonomy.
fn classify_api_error(status: StatusCode, body: &str, context: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let reason_not_found = parsed
        .as_ref()
        .map(|env| env.error.errors.iter().any(|d| d.reason.as_deref() == Some("notFound")))
        .unwrap_or(false);
    let detail = parsed
        .and_then(|env| env.error.message)
        .unwrap_or_else(|| truncate(body));
    let message = format!("{context}: HTTP {} {}", status.as_u16(), detail).trim_end().to_string();

    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => ProviderError::NotFound(message),
        _ if reason_not_found => ProviderError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout(message),
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => ProviderError::Network(message),
        _ => ProviderError::Other(message),
    }
}

fn classify_token_error(status: StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => {
            let message = match err.error_description {
                Some(desc) => format!("Token refresh failed: {} ({})", err.error, desc),
                None => format!("Token refresh failed: {}", err.error),
            };
            if status.is_server_error() {
                ProviderError::Network(message)
            } else {
                ProviderError::Auth(message)
            }
        }
        Err(_) if status.is_server_error() => {
            ProviderError::Network(format!("Token refresh failed: HTTP {}", status.as_u16()))
        }
        Err(_) => ProviderError::Auth(format!("Token refresh failed: HTTP {}", status.as_u16())),
    }
}

fn task_from_raw(raw: RawTask, list_id: &str) -> ExternalTask {
    ExternalTask {
        id: raw.id,
        list_id: list_id.to_string(),
        title: raw.title.filter(|t| !t.trim().is_empty()),
        notes: raw.notes.filter(|n| !n.trim().is_empty()),
        due: raw.due.as_deref().and_then(datetime::parse_timestamp),
        status: ExternalStatus::from_wire(raw.status.as_deref()),
        completed: raw.completed.as_deref().and_then(datetime::parse_timestamp),
        updated: raw.updated.as_deref().and_then(datetime::parse_timestamp),
        deleted: raw.deleted.unwrap_or(false),
    }
}

fn create_body(task: &NewExternalTask) -> Value {
    let mut body = Map::new();
    body.insert("title".to_string(), json!(task.title));
    body.insert("status".to_string(), json!(task.status.as_wire()));
    if let Some(notes) = &task.notes {
        body.insert("notes".to_string(), json!(notes));
    }
    if let Some(due) = task.due {
        body.insert("due".to_string(), json!(datetime::format_due(due)));
    }
    if let Some(completed) = task.completed {
        body.insert("completed".to_string(), json!(datetime::format_timestamp(completed)));
    }
    Value::Object(body)
}

fn patch_body(patch: &TaskPatch) -> Value {
    let mut body = Map::new();
    if let Some(status) = patch.status {
        body.insert("status".to_string(), json!(status.as_wire()));
    }
    if let Some(completed) = patch.completed {
        body.insert(
            "completed".to_string(),
            completed.map_or(Value::Null, |c| json!(datetime::format_timestamp(c))),
        );
    }
    if let Some(due) = patch.due {
        body.insert("due".to_string(), due.map_or(Value::Null, |d| json!(datetime::format_due(d))));
    }
    Value::Object(body)
}

fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    let url = Url::parse(raw).map_err(|e| ProviderError::Other(format!("Invalid API base URL '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::Other(format!("Invalid API base URL '{raw}': not a base URL")));
    }
    Ok(url)
}

fn truncate(message: &str) -> String {
    const LIMIT: usize = 200;
    if message.chars().count() <= LIMIT {
        message.to_string()
    } else {
        let mut out: String = message.chars().take(LIMIT).collect();
        out.push('…');
        out
    }
}
