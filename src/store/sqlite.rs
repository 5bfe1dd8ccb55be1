use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::error;
use sqlx::{
    Row, Sqlite,
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
};

use super::VoteStore;
use crate::error::PollError;
use crate::models::{PollResults, VotesMap};
use crate::registry::Registry;
use crate::tally;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// Relational tally store. One row per (poll, option) with a running count;
// every vote is a single upsert, so the database serializes concurrent
// writers and the store stays correct across multiple instances.
pub struct SqliteStore {
    registry: Arc<Registry>,
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(registry: Arc<Registry>, db_url: &str) -> Result<Self, BoxError> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { registry, pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_votes (
                poll_id TEXT NOT NULL,
                option_label TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (poll_id, option_label)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn fetch_poll_rows(&self, poll_id: &str) -> Result<PollResults, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT option_label, count
            FROM poll_votes
            WHERE poll_id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        let mut map = VotesMap::new();
        for row in rows {
            let option: String = row.get("option_label");
            let count: i64 = row.get("count");
            tally::accumulate(&mut map, poll_id, &option, count as u64);
        }

        Ok(tally::results_for(&map, poll_id))
    }
}

#[async_trait]
impl VoteStore for SqliteStore {
    async fn all_votes(&self) -> VotesMap {
        let rows = match sqlx::query("SELECT poll_id, option_label, count FROM poll_votes")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to read votes table: {e}");
                return VotesMap::new();
            }
        };

        let mut map = VotesMap::new();
        for row in rows {
            let poll_id: String = row.get("poll_id");
            let option: String = row.get("option_label");
            let count: i64 = row.get("count");
            tally::accumulate(&mut map, &poll_id, &option, count as u64);
        }

        map
    }

    async fn results(&self, poll_id: &str) -> PollResults {
        match self.fetch_poll_rows(poll_id).await {
            Ok(results) => results,
            Err(e) => {
                error!("Failed to read tally for poll {poll_id}: {e}");
                PollResults::default()
            }
        }
    }

    async fn vote(&self, poll_id: &str, option: &str) -> Result<PollResults, PollError> {
        let poll = self.registry.get(poll_id).ok_or(PollError::UnknownPoll)?;
        if !poll.options.iter().any(|o| o == option) {
            return Err(PollError::InvalidOption);
        }

        sqlx::query(
            r#"
            INSERT INTO poll_votes (poll_id, option_label, count, updated_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(poll_id, option_label)
            DO UPDATE SET count = count + 1, updated_at = excluded.updated_at
            "#,
        )
        .bind(poll_id)
        .bind(option)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PollError::Storage(Box::new(e)))?;

        self.fetch_poll_rows(poll_id)
            .await
            .map_err(|e| PollError::Storage(Box::new(e)))
    }

    // Every vote is written through synchronously; nothing to flush.
    async fn force_write(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Poll;
    use tempfile::TempDir;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::from_polls(vec![Poll {
            id: "pricing-factor".to_string(),
            question: "Which factor changes your quote the most?".to_string(),
            options: vec![
                "Group size".to_string(),
                "Date/season".to_string(),
                "Trip length".to_string(),
                "Vehicle type".to_string(),
            ],
            tags: vec![],
            active: true,
            slug: None,
        }]))
    }

    fn db_url(dir: &TempDir) -> String {
        format!("sqlite:{}", dir.path().join("votes.db").display())
    }

    #[tokio::test]
    async fn vote_upserts_and_aggregates() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::connect(registry(), &db_url(&dir)).await.unwrap();

        let first = store.vote("pricing-factor", "Group size").await.unwrap();
        assert_eq!(first.results["Group size"], 1);
        assert_eq!(first.total, 1);

        let second = store.vote("pricing-factor", "Group size").await.unwrap();
        assert_eq!(second.results["Group size"], 2);
        assert_eq!(second.total, 2);
    }

    #[tokio::test]
    async fn vote_validates_against_the_registry() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::connect(registry(), &db_url(&dir)).await.unwrap();

        store.vote("pricing-factor", "Trip length").await.unwrap();

        assert!(matches!(
            store.vote("no-such-poll", "Trip length").await,
            Err(PollError::UnknownPoll)
        ));
        assert!(matches!(
            store.vote("pricing-factor", "Nonexistent").await,
            Err(PollError::InvalidOption)
        ));

        assert_eq!(store.results("pricing-factor").await.total, 1);
    }

    #[tokio::test]
    async fn counts_survive_a_reconnect() {
        let dir = TempDir::new().unwrap();
        let url = db_url(&dir);

        let store = SqliteStore::connect(registry(), &url).await.unwrap();
        store.vote("pricing-factor", "Vehicle type").await.unwrap();
        store.vote("pricing-factor", "Group size").await.unwrap();
        drop(store);

        let reopened = SqliteStore::connect(registry(), &url).await.unwrap();
        let votes = reopened.all_votes().await;
        assert_eq!(votes["pricing-factor"]["Vehicle type"], 1);
        assert_eq!(votes["pricing-factor"]["Group size"], 1);
        assert_eq!(reopened.results("pricing-factor").await.total, 2);
    }
}
