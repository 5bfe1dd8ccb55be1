use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{error, warn};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::VoteStore;
use crate::error::PollError;
use crate::models::{PollResults, VotesDocument, VotesMap};
use crate::registry::Registry;
use crate::tally;

// JSON-file-backed tally with debounced persistence.
//
// Increments land in the in-memory map synchronously, so reads within the
// process are always fresh; the first increment arms a single pending write
// that fires after the debounce window, and increments inside the window
// join it. Flushes replace the file atomically (write .tmp, rename), so
// readers see either the old or the new complete document.
//
// Correct for a single-instance deployment only: each process keeps its own
// map and write slot, and there is no cross-process coordination.
pub struct FileStore {
    registry: Arc<Registry>,
    path: PathBuf,
    debounce: Duration,
    votes: Arc<Mutex<VotesMap>>,
    dirty: Arc<AtomicBool>,
    pending: AsyncMutex<Option<JoinHandle<()>>>,
}

impl FileStore {
    pub async fn open(registry: Arc<Registry>, path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let votes = read_votes(&path).await;

        Self {
            registry,
            path,
            debounce,
            votes: Arc::new(Mutex::new(votes)),
            dirty: Arc::new(AtomicBool::new(false)),
            pending: AsyncMutex::new(None),
        }
    }

    async fn schedule_persist(&self) {
        let mut slot = self.pending.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            // An armed write will pick up this increment when it fires.
            return;
        }

        let path = self.path.clone();
        let votes = Arc::clone(&self.votes);
        let dirty = Arc::clone(&self.dirty);
        let delay = self.debounce;

        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            persist(&path, &votes, &dirty).await;
        }));
    }
}

#[async_trait]
impl VoteStore for FileStore {
    async fn all_votes(&self) -> VotesMap {
        self.votes.lock().unwrap().clone()
    }

    async fn results(&self, poll_id: &str) -> PollResults {
        let votes = self.votes.lock().unwrap();
        tally::results_for(&votes, poll_id)
    }

    async fn vote(&self, poll_id: &str, option: &str) -> Result<PollResults, PollError> {
        let poll = self.registry.get(poll_id).ok_or(PollError::UnknownPoll)?;
        if !poll.options.iter().any(|o| o == option) {
            return Err(PollError::InvalidOption);
        }

        // The increment happens entirely under the lock, before any await
        // point, so no vote is lost to interleaving.
        let results = {
            let mut votes = self.votes.lock().unwrap();
            let poll_tally = votes.entry(poll_id.to_string()).or_default();
            *poll_tally.entry(option.to_string()).or_insert(0) += 1;
            poll_tally.clone()
        };
        self.dirty.store(true, Ordering::Release);

        self.schedule_persist().await;

        let total = results.values().sum();
        Ok(PollResults { results, total })
    }

    async fn force_write(&self) {
        let mut slot = self.pending.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        persist(&self.path, &self.votes, &self.dirty).await;
    }

    fn dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

async fn read_votes(path: &Path) -> VotesMap {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => match serde_json::from_str::<VotesDocument>(&raw) {
            Ok(doc) => doc.votes,
            Err(e) => {
                warn!("Corrupt votes file {}: {}", path.display(), e);
                VotesMap::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => VotesMap::new(),
        Err(e) => {
            warn!("Could not read votes file {}: {}", path.display(), e);
            VotesMap::new()
        }
    }
}

// Serializes the current snapshot and replaces the file atomically. A write
// failure is logged and swallowed; the in-memory state stays correct for the
// life of the process.
async fn persist(path: &Path, votes: &Mutex<VotesMap>, dirty: &AtomicBool) {
    let document = VotesDocument {
        votes: votes.lock().unwrap().clone(),
    };
    let payload = match serde_json::to_vec_pretty(&document) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Could not serialize votes: {e}");
            return;
        }
    };

    if let Err(e) = replace_file(path, &payload).await {
        error!("Could not write votes file {}: {}", path.display(), e);
        return;
    }

    dirty.store(false, Ordering::Release);
}

async fn replace_file(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, payload).await?;
    tokio::fs::rename(&tmp, path).await
}
