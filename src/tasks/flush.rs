use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::interval;

use crate::store::VoteStore;

// Safety net under the debounced writer: periodically lands any increments
// that are still only in memory, so a crash between debounce windows loses
// at most one interval of votes.
pub async fn periodic_flush(store: Arc<dyn VoteStore>, every: Duration) {
    info!(
        "Starting background vote flush task ({}s interval)",
        every.as_secs()
    );
    let mut interval = interval(every);
    interval.tick().await; // the first tick completes immediately

    loop {
        interval.tick().await;
        if store.dirty() {
            debug!("Flushing pending votes to storage");
            store.force_write().await;
        }
    }
}
