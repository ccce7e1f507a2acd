use anyhow::{anyhow, Context, Result};
use reqwest::{RequestBuilder, Url};
use serde_json::{json, Value};

use crate::model::Project;

/// Thin client over the strata API; every call carries the configured bearer token.
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    token: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str, token: &str) -> Result<Self> {
        Url::parse(base).with_context(|| format!("invalid API base URL: {base}"))?;
        let client = reqwest::Client::builder().build().context("failed to build HTTP client")?;
        Ok(Self { base: base.trim_end_matches('/').to_string(), token: token.to_string(), client })
    }

    fn projects_url(&self) -> String {
        format!("{}/projects", self.base)
    }

    fn project_url(&self, id: &str) -> String {
        format!("{}/projects/{}", self.base, urlencoding::encode(id))
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.bearer_auth(&self.token)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let resp = self.authed(self.client.get(self.projects_url())).send().await?;
        let status = resp.status();
        let val: Value = resp.json().await.unwrap_or(json!({"status":"error"}));
        if !status.is_success() {
            return Err(anyhow!("list failed: HTTP {}: {}", status, val));
        }
        let rows = val.get("data").and_then(|d| d.as_array()).cloned().unwrap_or_default();
        Ok(rows.iter().filter_map(Project::from_json).collect())
    }

    /// `None` for any non-2xx answer.
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let resp = self.authed(self.client.get(self.project_url(id))).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let val: Value = resp.json().await.context("project body is not JSON")?;
        Ok(Project::from_json(&val))
    }

    /// Returns the new project id.
    pub async fn create_project(&self, name: &str, description: &str) -> Result<String> {
        let resp = self
            .authed(self.client.post(self.projects_url()))
            .json(&json!({ "name": name, "description": description }))
            .send()
            .await?;
        let status = resp.status();
        let val: Value = resp.json().await.unwrap_or(json!({"status":"error"}));
        if !status.is_success() {
            return Err(anyhow!("create failed: HTTP {}: {}", status, val));
        }
        val.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("create response carried no id"))
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        let resp = self.authed(self.client.delete(self.project_url(id))).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("delete failed: HTTP {}", resp.status()));
        }
        Ok(())
    }
}
