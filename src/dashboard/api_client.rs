use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::api::{HistoryEntryDto, LoginData, VerifyData};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Envelope every endpoint answers with.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct NewHistoryEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub desc: String,
    pub icon: String,
}

/// Thin typed wrapper over the REST API. Cheap to clone; the inner
/// reqwest client is already reference counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginData, ClientError> {
        let data: LoginData = self
            .post(
                "/auth/login",
                &serde_json::json!({ "username": username, "password": password }),
            )
            .await?;
        self.token = Some(data.token.clone());
        Ok(data)
    }

    pub async fn verify(&self) -> Result<VerifyData, ClientError> {
        self.get("/auth/verify").await
    }

    /// Clears the local token whether or not the server call succeeds.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let mut req = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .json(&serde_json::json!({}));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        self.token = None;

        let response = req.send().await?;
        let status = response.status();
        let envelope: Envelope<serde_json::Value> = response.json().await?;
        if !status.is_success() || !envelope.success {
            return Err(ClientError::Rejected(
                envelope.message.unwrap_or_else(|| status.to_string()),
            ));
        }
        Ok(())
    }

    pub async fn list_history(&self, limit: u64) -> Result<Vec<HistoryEntryDto>, ClientError> {
        self.get(&format!("/history?limit={limit}")).await
    }

    pub async fn add_history(
        &self,
        entry: &NewHistoryEntry,
    ) -> Result<HistoryEntryDto, ClientError> {
        self.post("/history", entry).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut req = self.http.get(format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        Self::unwrap_envelope(req.send().await?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self.http.post(format!("{}{path}", self.base_url)).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        Self::unwrap_envelope(req.send().await?).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let envelope: Envelope<T> = response.json().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(
                envelope.message.unwrap_or_else(|| "unauthorized".to_string()),
            ));
        }
        if !status.is_success() || !envelope.success {
            return Err(ClientError::Rejected(
                envelope.message.unwrap_or_else(|| status.to_string()),
            ));
        }

        envelope.data.ok_or_else(|| {
            ClientError::Rejected("response carried no data".to_string())
        })
    }
}
