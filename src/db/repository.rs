use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Channel, ChannelFilter, Credential, NewChannel, NewVideo, Video, VideoDetailsUpdate,
};

use super::schema::SCHEMA;
use super::store::Store;

const CHANNEL_COLUMNS: &str = "id, title, thumbnail_url, upload_playlist_id, show_livestreams, fast_lane, last_fetched_at, created_at";
const VIDEO_COLUMNS: &str = "id, channel_id, title, thumbnail_url, published_at, duration, is_short, is_livestream, livestream_ended_at, is_hidden, fetched_at";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        tracing::info!("Opening database at {}", db_path);
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for Repository {
    // Channel operations

    async fn get_channel(&self, id: &str) -> Result<Option<Channel>> {
        let id = id.to_string();
        let channel = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM channels WHERE id = ?1", CHANNEL_COLUMNS);
                let channel = conn
                    .query_row(&sql, params![id], channel_from_row)
                    .optional()?;
                Ok(channel)
            })
            .await?;
        Ok(channel)
    }

    async fn insert_channel(&self, channel: NewChannel) -> Result<()> {
        let upload_playlist_id = channel.upload_playlist_id();
        let now = format_datetime(Utc::now());
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO channels (id, title, thumbnail_url, upload_playlist_id, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)
                       ON CONFLICT(id) DO NOTHING"#,
                    params![
                        channel.id,
                        channel.title,
                        channel.thumbnail_url,
                        upload_playlist_id,
                        now
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_channel(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM channels WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn channel_ids(&self) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM channels ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    async fn list_channels(&self, filter: ChannelFilter) -> Result<Vec<Channel>> {
        let channels = self
            .conn
            .call(move |conn| {
                let (clause, fast_lane) = match filter {
                    ChannelFilter::All => ("", None),
                    ChannelFilter::FastLane(fast) => ("WHERE fast_lane = ?1", Some(fast)),
                };
                let sql = format!(
                    "SELECT {} FROM channels {} ORDER BY last_fetched_at ASC NULLS FIRST, id",
                    CHANNEL_COLUMNS, clause
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = match fast_lane {
                    Some(fast) => stmt.query_map(params![fast], channel_from_row)?,
                    None => stmt.query_map([], channel_from_row)?,
                };
                let channels = rows.collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(channels)
            })
            .await?;
        Ok(channels)
    }

    async fn set_fast_lane(&self, id: &str, fast_lane: bool) -> Result<bool> {
        let id = id.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE channels SET fast_lane = ?1 WHERE id = ?2",
                    params![fast_lane, id],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(changed)
    }

    async fn set_last_fetched_at(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let id = id.to_string();
        let at = format_datetime(at);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE channels SET last_fetched_at = ?1 WHERE id = ?2",
                    params![at, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Video operations

    async fn upsert_video(&self, video: NewVideo) -> Result<()> {
        let now = format_datetime(Utc::now());
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO videos (id, channel_id, title, thumbnail_url, published_at, fetched_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(id) DO UPDATE SET
                           title = excluded.title,
                           thumbnail_url = excluded.thumbnail_url
                       WHERE videos.title IS NOT excluded.title
                          OR videos.thumbnail_url IS NOT excluded.thumbnail_url"#,
                    params![
                        video.id,
                        video.channel_id,
                        video.title,
                        video.thumbnail_url,
                        video.published_at.map(format_datetime),
                        now,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get_video(&self, id: &str) -> Result<Option<Video>> {
        let id = id.to_string();
        let video = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS);
                let video = conn.query_row(&sql, params![id], video_from_row).optional()?;
                Ok(video)
            })
            .await?;
        Ok(video)
    }

    async fn existing_video_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids = ids.to_vec();
        let existing = self
            .conn
            .call(move |conn| {
                let placeholders = vec!["?"; ids.len()].join(",");
                let sql = format!("SELECT id FROM videos WHERE id IN ({})", placeholders);
                let mut stmt = conn.prepare(&sql)?;
                let existing = stmt
                    .query_map(params_from_iter(ids.iter()), |row| row.get(0))?
                    .collect::<std::result::Result<HashSet<String>, _>>()?;
                Ok(existing)
            })
            .await?;
        Ok(existing)
    }

    async fn update_video_details(&self, details: VideoDetailsUpdate) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE videos
                       SET duration = ?1, is_livestream = ?2, livestream_ended_at = ?3, is_short = ?4
                       WHERE id = ?5"#,
                    params![
                        details.duration,
                        details.is_livestream,
                        details.livestream_ended_at.map(format_datetime),
                        details.is_short,
                        details.id,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn open_livestream_ids(&self) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM videos WHERE is_livestream = 1 AND livestream_ended_at IS NULL",
                )?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    async fn set_livestream_ended(&self, id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let id = id.to_string();
        let ended_at = format_datetime(ended_at);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE videos SET livestream_ended_at = ?1 WHERE id = ?2",
                    params![ended_at, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Credential operations

    async fn get_credential(&self) -> Result<Option<Credential>> {
        let credential = self
            .conn
            .call(|conn| {
                let credential = conn
                    .query_row(
                        "SELECT access_token, refresh_token, expires_at FROM credentials WHERE id = 1",
                        [],
                        |row| {
                            Ok(Credential {
                                access_token: row.get(0)?,
                                refresh_token: row.get(1)?,
                                expires_at: row
                                    .get::<_, Option<String>>(2)?
                                    .and_then(|s| parse_datetime(&s)),
                            })
                        },
                    )
                    .optional()?;
                Ok(credential)
            })
            .await?;
        Ok(credential)
    }

    async fn save_credential(&self, credential: Credential) -> Result<()> {
        let now = format_datetime(Utc::now());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO credentials (id, access_token, refresh_token, expires_at, updated_at) VALUES (1, ?1, ?2, ?3, ?4)",
                    params![
                        credential.access_token,
                        credential.refresh_token,
                        credential.expires_at.map(format_datetime),
                        now,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn set_access_token(&self, access_token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let access_token = access_token.to_string();
        let expires_at = format_datetime(expires_at);
        let now = format_datetime(Utc::now());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE credentials SET access_token = ?1, expires_at = ?2, updated_at = ?3 WHERE id = 1",
                    params![access_token, expires_at, now],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn count_channels(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM channels", [], |row| row.get(0))?))
            .await?;
        Ok(count)
    }

    async fn count_videos(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?))
            .await?;
        Ok(count)
    }
}

/// Millisecond RFC3339 in UTC sorts lexically in time order.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn opt_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| parse_datetime(&s)))
}

fn channel_from_row(row: &Row) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        title: row.get(1)?,
        thumbnail_url: row.get(2)?,
        upload_playlist_id: row.get(3)?,
        show_livestreams: row.get(4)?,
        fast_lane: row.get(5)?,
        last_fetched_at: opt_datetime(row, 6)?,
        created_at: opt_datetime(row, 7)?.unwrap_or_else(Utc::now),
    })
}

fn video_from_row(row: &Row) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        title: row.get(2)?,
        thumbnail_url: row.get(3)?,
        published_at: opt_datetime(row, 4)?,
        duration: row.get(5)?,
        is_short: row.get(6)?,
        is_livestream: row.get(7)?,
        livestream_ended_at: opt_datetime(row, 8)?,
        is_hidden: row.get(9)?,
        fetched_at: opt_datetime(row, 10)?.unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn channel(id: &str) -> NewChannel {
        NewChannel {
            id: id.to_string(),
            title: format!("Channel {}", id),
            thumbnail_url: None,
        }
    }

    fn video(id: &str, channel_id: &str, title: &str) -> NewVideo {
        NewVideo {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            title: title.to_string(),
            thumbnail_url: Some("https://i.ytimg.com/t.jpg".to_string()),
            published_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn insert_channel_derives_upload_playlist() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_channel(channel("UCabc")).await.unwrap();

        let stored = repo.get_channel("UCabc").await.unwrap().unwrap();
        assert_eq!(stored.upload_playlist_id, "UUabc");
        assert!(stored.last_fetched_at.is_none());
        assert!(!stored.fast_lane);
        assert!(!stored.show_livestreams);
    }

    #[tokio::test]
    async fn deleting_channel_cascades_to_videos() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_channel(channel("UC1")).await.unwrap();
        repo.upsert_video(video("v1", "UC1", "First")).await.unwrap();
        repo.upsert_video(video("v2", "UC1", "Second")).await.unwrap();
        assert_eq!(repo.count_videos().await.unwrap(), 2);

        repo.delete_channel("UC1").await.unwrap();
        assert_eq!(repo.count_channels().await.unwrap(), 0);
        assert_eq!(repo.count_videos().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn video_requires_existing_channel() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(repo.upsert_video(video("v1", "UCmissing", "Orphan")).await.is_err());
    }

    #[tokio::test]
    async fn upsert_refreshes_title_in_place() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_channel(channel("UC1")).await.unwrap();
        repo.upsert_video(video("v1", "UC1", "Old")).await.unwrap();
        repo.upsert_video(video("v1", "UC1", "New")).await.unwrap();

        let stored = repo.get_video("v1").await.unwrap().unwrap();
        assert_eq!(stored.title, "New");
        assert_eq!(repo.count_videos().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn existing_ids_only_reports_known() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_channel(channel("UC1")).await.unwrap();
        repo.upsert_video(video("v1", "UC1", "One")).await.unwrap();

        let ids = vec!["v1".to_string(), "v2".to_string()];
        let existing = repo.existing_video_ids(&ids).await.unwrap();
        assert_eq!(existing.len(), 1);
        assert!(existing.contains("v1"));
        assert!(repo.existing_video_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_channels_puts_never_fetched_first() {
        let repo = Repository::in_memory().await.unwrap();
        for id in ["UCa", "UCb", "UCc"] {
            repo.insert_channel(channel(id)).await.unwrap();
        }
        let now = Utc::now();
        repo.set_last_fetched_at("UCa", now).await.unwrap();
        repo.set_last_fetched_at("UCc", now - Duration::minutes(5)).await.unwrap();
        assert!(repo.set_fast_lane("UCb", true).await.unwrap());

        let all: Vec<String> = repo
            .list_channels(ChannelFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(all, vec!["UCb", "UCc", "UCa"]);

        let normal: Vec<String> = repo
            .list_channels(ChannelFilter::FastLane(false))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(normal, vec!["UCc", "UCa"]);

        let fast = repo.list_channels(ChannelFilter::FastLane(true)).await.unwrap();
        assert_eq!(fast.len(), 1);
        assert_eq!(fast[0].id, "UCb");
    }

    #[tokio::test]
    async fn open_livestreams_close_once_ended() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_channel(channel("UC1")).await.unwrap();
        repo.upsert_video(video("live1", "UC1", "Live")).await.unwrap();
        repo.update_video_details(VideoDetailsUpdate {
            id: "live1".to_string(),
            duration: "P0D".to_string(),
            is_livestream: true,
            livestream_ended_at: None,
            is_short: false,
        })
        .await
        .unwrap();
        assert_eq!(repo.open_livestream_ids().await.unwrap(), vec!["live1"]);

        repo.set_livestream_ended("live1", Utc::now()).await.unwrap();
        assert!(repo.open_livestream_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn credential_round_trip() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(repo.get_credential().await.unwrap().is_none());

        repo.save_credential(Credential {
            access_token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
        })
        .await
        .unwrap();

        let expires = Utc::now() + Duration::hours(1);
        repo.set_access_token("fresh", expires).await.unwrap();

        let stored = repo.get_credential().await.unwrap().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("fresh"));
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
        assert!(stored.expires_at.is_some());
    }
}
