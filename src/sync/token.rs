use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::db::Store;
use crate::services::CredentialRefresher;

/// Tokens expiring sooner than this are refreshed before use.
const REFRESH_MARGIN_MINUTES: i64 = 5;

pub struct TokenProvider {
    store: Arc<dyn Store>,
    refresher: Arc<dyn CredentialRefresher>,
}

impl TokenProvider {
    pub fn new(store: Arc<dyn Store>, refresher: Arc<dyn CredentialRefresher>) -> Self {
        Self { store, refresher }
    }

    /// A bearer token good for at least a few more minutes, or `None` when no
    /// ingestion is possible right now. Never fails.
    pub async fn get_valid_token(&self) -> Option<String> {
        let credential = match self.store.get_credential().await {
            Ok(Some(credential)) => credential,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read stored credential: {}", e);
                return None;
            }
        };

        let (Some(access_token), Some(refresh_token)) =
            (credential.access_token, credential.refresh_token)
        else {
            return None;
        };

        let now = Utc::now();
        if credential
            .expires_at
            .is_some_and(|expires_at| expires_at - now > Duration::minutes(REFRESH_MARGIN_MINUTES))
        {
            return Some(access_token);
        }

        match self.refresher.refresh(&refresh_token).await {
            Ok(token) => {
                let Some(expires_at) = Duration::try_seconds(token.expires_in)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                else {
                    tracing::warn!("Token refresh returned unusable lifetime {}s", token.expires_in);
                    return None;
                };
                if let Err(e) = self
                    .store
                    .set_access_token(&token.access_token, expires_at)
                    .await
                {
                    tracing::warn!("Failed to persist refreshed token: {}", e);
                }
                tracing::info!("Access token refreshed, valid until {}", expires_at);
                Some(token.access_token)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                None
            }
        }
    }
}
