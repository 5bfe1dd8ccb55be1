use std::collections::HashMap;
use std::sync::Arc;

use log::error;
use tokio::task::JoinSet;

use crate::models::PollResults;
use crate::store::VoteStore;

// Bounds the number of simultaneous storage lookups: lookups inside a batch
// run concurrently, batches run in sequence.
const BATCH_SIZE: usize = 10;

// Resolves result sets for many poll ids in one pass. Every distinct
// requested id gets a key in the output; an id that fails to resolve keeps
// the empty default instead of failing the whole batch.
pub async fn resolve_bulk(
    store: Arc<dyn VoteStore>,
    ids: &[String],
) -> HashMap<String, PollResults> {
    let mut out: HashMap<String, PollResults> = ids
        .iter()
        .map(|id| (id.clone(), PollResults::default()))
        .collect();

    let distinct: Vec<String> = out.keys().cloned().collect();

    for batch in distinct.chunks(BATCH_SIZE) {
        let mut lookups = JoinSet::new();
        for id in batch {
            let store = Arc::clone(&store);
            let id = id.clone();
            lookups.spawn(async move {
                let results = store.results(&id).await;
                (id, results)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((id, results)) => {
                    out.insert(id, results);
                }
                Err(e) => {
                    // The id keeps its empty default entry.
                    error!("Bulk result lookup failed: {e}");
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Poll;
    use crate::registry::Registry;
    use crate::store::FileStore;
    use std::time::Duration;
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

    #[tokio::test]
    async fn bulk_covers_every_id_and_degrades_invalid_ones() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn VoteStore> = Arc::new(
            FileStore::open(
                registry(),
                dir.path().join("polls.json"),
                Duration::from_millis(5),
            )
            .await,
        );

        store.vote("pricing-factor", "Group size").await.unwrap();

        let ids = vec![
            "pricing-factor".to_string(),
            "no-such-poll".to_string(),
            "pricing-factor".to_string(), // duplicates are allowed
        ];
        let data = resolve_bulk(Arc::clone(&store), &ids).await;

        assert_eq!(data.len(), 2);
        assert_eq!(data["pricing-factor"].total, 1);
        assert_eq!(data["no-such-poll"], PollResults::default());

        // Bulk values match the single-poll read path.
        assert_eq!(data["pricing-factor"], store.results("pricing-factor").await);
    }

    #[tokio::test]
    async fn bulk_handles_more_ids_than_one_batch() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn VoteStore> = Arc::new(
            FileStore::open(
                registry(),
                dir.path().join("polls.json"),
                Duration::from_millis(5),
            )
            .await,
        );

        let ids: Vec<String> = (0..25).map(|i| format!("poll-{i}")).collect();
        let data = resolve_bulk(store, &ids).await;
        assert_eq!(data.len(), 25);
        assert!(data.values().all(|r| r.total == 0));
    }
}
