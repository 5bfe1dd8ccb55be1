mod file;
mod sqlite;

pub use file::FileStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::PollError;
use crate::models::{PollResults, VotesMap};

// The vote store exclusively owns the persisted tally. Constructed once at
// startup and handed to route handlers behind an Arc; nothing else mutates
// the persisted counts.
#[async_trait]
pub trait VoteStore: Send + Sync {
    // Full tally mapping. Degrades to empty when the backing data is
    // unreadable rather than failing the caller.
    async fn all_votes(&self) -> VotesMap;

    // Current tally for one poll; empty for unknown ids.
    async fn results(&self, poll_id: &str) -> PollResults;

    // Records one vote after validating the poll and option against the
    // registry, then returns the updated aggregate.
    async fn vote(&self, poll_id: &str, option: &str) -> Result<PollResults, PollError>;

    // Back-compat wrapper over vote().
    async fn increment(&self, poll_id: &str, option: &str) -> Result<(), PollError> {
        self.vote(poll_id, option).await.map(|_| ())
    }

    // Flushes any pending debounced write immediately. Best effort.
    async fn force_write(&self);

    // Whether there are increments not yet on durable storage.
    fn dirty(&self) -> bool {
        false
    }
}
