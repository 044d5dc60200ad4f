use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Trades a refresh token for a new access token.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken>;
}

pub struct GoogleRefresher {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl GoogleRefresher {
    pub fn new(client_id: String, client_secret: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            client_id,
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[async_trait]
impl CredentialRefresher for GoogleRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AppError::Refresh("OAuth client credentials not configured".to_string()));
        }

        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.client.post(&self.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Refresh(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn refresher(server: &MockServer) -> GoogleRefresher {
        GoogleRefresher::new("client".to_string(), "secret".to_string())
            .with_token_url(format!("{}/token", server.uri()))
    }

    #[tokio::test]
    async fn exchanges_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let token = refresher(&server).refresh("r1").await.unwrap();
        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.expires_in, 3599);
    }

    #[tokio::test]
    async fn invalid_grant_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
            .mount(&server)
            .await;

        assert!(matches!(
            refresher(&server).refresh("r1").await,
            Err(AppError::Refresh(_))
        ));
    }

    #[tokio::test]
    async fn missing_client_config_fails_without_request() {
        let refresher = GoogleRefresher::new(String::new(), String::new());
        assert!(refresher.refresh("r1").await.is_err());
    }
}
