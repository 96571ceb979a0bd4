//! HTTP client for labpower daemon

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use labpower_api::{
    requests::{ActionRequestBody, LoginRequest},
    responses::{
        AuditEntryResponse, DispatchResponse, ErrorResponse, HealthResponse, LoginResponse,
        TargetResponse,
    },
};

use crate::error::{ClientError, Result};

/// HTTP client for communicating with labpower daemon
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use labpower_client::HttpClient;
    ///
    /// let client = HttpClient::new("http://localhost:8080")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new HTTP client with custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(base_url: impl AsRef<str>, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Reuse a token from an earlier login
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Session token currently held, if any
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build a full URL from a path
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ClientError::Url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(request.bearer_auth(token))
    }

    /// Turn a non-success response into a `ClientError`
    async fn error_from(response: Response) -> ClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);

        if status == StatusCode::UNAUTHORIZED {
            ClientError::Unauthorized(message)
        } else {
            ClientError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.json().await?)
    }

    // System endpoints

    /// Get daemon health status
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn health(&self) -> Result<HealthResponse> {
        Self::send(self.client.get(self.url("/health")?)).await
    }

    // Session endpoints

    /// Log in and keep the issued token for later calls
    ///
    /// # Errors
    /// Returns `ClientError::Unauthorized` for bad credentials.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let session: LoginResponse =
            Self::send(self.client.post(self.url("/api/login")?).json(&body)).await?;

        tracing::debug!(operator = %session.operator, "logged in");
        self.token = Some(session.token.clone());
        Ok(session)
    }

    /// Revoke the held session
    ///
    /// # Errors
    /// Returns `ClientError::NotLoggedIn` if no token is held.
    pub async fn logout(&mut self) -> Result<()> {
        let request = self.authorized(self.client.post(self.url("/api/logout")?))?;
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        self.token = None;
        Ok(())
    }

    // Power control endpoints

    /// List the controllable machines
    ///
    /// # Errors
    /// Returns an error if the request fails or the session is refused.
    pub async fn fleet(&self) -> Result<Vec<TargetResponse>> {
        Self::send(self.authorized(self.client.get(self.url("/api/fleet")?))?).await
    }

    /// Submit a control request.
    ///
    /// A rejected request (unknown action, missing or unknown target) comes
    /// back as `Ok` with `accepted == false`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the session is refused.
    pub async fn perform_action(&self, body: &ActionRequestBody) -> Result<DispatchResponse> {
        let request = self.authorized(self.client.post(self.url("/api/actions")?).json(body))?;
        let response = request.send().await?;

        match response.status() {
            s if s.is_success() => Ok(response.json().await?),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                let text = response.text().await?;
                Ok(serde_json::from_str(&text)?)
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    /// Shut down one machine
    ///
    /// # Errors
    /// See [`HttpClient::perform_action`].
    pub async fn shutdown(&self, address: &str) -> Result<DispatchResponse> {
        self.perform_action(&ActionRequestBody::one("shutdown_one", address))
            .await
    }

    /// Restart one machine
    ///
    /// # Errors
    /// See [`HttpClient::perform_action`].
    pub async fn restart(&self, address: &str) -> Result<DispatchResponse> {
        self.perform_action(&ActionRequestBody::one("restart_one", address))
            .await
    }

    /// Shut down every machine in the fleet
    ///
    /// # Errors
    /// See [`HttpClient::perform_action`].
    pub async fn shutdown_all(&self) -> Result<DispatchResponse> {
        self.perform_action(&ActionRequestBody::all("shutdown_all"))
            .await
    }

    /// Restart every machine in the fleet
    ///
    /// # Errors
    /// See [`HttpClient::perform_action`].
    pub async fn restart_all(&self) -> Result<DispatchResponse> {
        self.perform_action(&ActionRequestBody::all("restart_all"))
            .await
    }

    /// Newest audit entries, oldest first
    ///
    /// # Errors
    /// Returns an error if the request fails or the session is refused.
    pub async fn audit(&self, limit: Option<usize>) -> Result<Vec<AuditEntryResponse>> {
        let mut url = self.url("/api/audit")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        Self::send(self.authorized(self.client.get(url))?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new("http://localhost:8080");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new("not a url");
        assert!(client.is_err());
    }

    #[test]
    fn test_url_building() {
        let client = HttpClient::new("http://localhost:8080").unwrap();
        let url = client.url("/api/actions").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/actions");
    }

    #[test]
    fn test_token_handling() {
        let client = HttpClient::new("http://localhost:8080").unwrap();
        assert!(client.token().is_none());
        assert!(matches!(
            client.authorized(client.client.get("http://localhost:8080/api/fleet")),
            Err(ClientError::NotLoggedIn)
        ));

        let client = client.with_token("abc123");
        assert_eq!(client.token(), Some("abc123"));
        assert!(
            client
                .authorized(client.client.get("http://localhost:8080/api/fleet"))
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_session_required_before_network() {
        let client = HttpClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            client.shutdown_all().await,
            Err(ClientError::NotLoggedIn)
        ));
        assert!(matches!(client.audit(None).await, Err(ClientError::NotLoggedIn)));
    }
}
