use chrono::{DateTime, Utc};

/// The single stored OAuth credential the ingestion pipeline runs under.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
