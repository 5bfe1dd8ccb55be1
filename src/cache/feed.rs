use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use flate2::{Compression, write::GzEncoder};
use log::error;

// Served when the registry payload cannot be compressed; keeps the response
// shape stable instead of erroring the endpoint.
const EMPTY_FEED: &[u8] = br#"{"polls":[]}"#;

#[derive(Clone)]
struct CompressedFeed {
    body: Vec<u8>,
    compressed_at: Instant,
}

// Process-wide gzip cache for the poll feed payload. One buffer plus a
// timestamp; within the refresh window the buffer is served as-is, so vote
// updates inside the window are not reflected until the next refresh.
// Staleness-tolerant on purpose.
pub struct FeedCache {
    refresh: Duration,
    state: Mutex<Option<CompressedFeed>>,
}

impl FeedCache {
    pub fn new(refresh: Duration) -> Self {
        Self {
            refresh,
            state: Mutex::new(None),
        }
    }

    // Returns the cached gzip buffer, re-rendering and re-compressing it
    // when the window has elapsed. `render` is only called on refresh.
    pub fn get_or_refresh<F>(&self, render: F) -> Vec<u8>
    where
        F: FnOnce() -> Vec<u8>,
    {
        let mut state = self.state.lock().unwrap();

        if let Some(feed) = state.as_ref() {
            if feed.compressed_at.elapsed() < self.refresh {
                return feed.body.clone();
            }
        }

        let raw = render();
        let body = match gzip(&raw) {
            Ok(body) => body,
            Err(e) => {
                error!("Could not compress poll feed: {e}");
                gzip(EMPTY_FEED).unwrap_or_default()
            }
        };

        *state = Some(CompressedFeed {
            body: body.clone(),
            compressed_at: Instant::now(),
        });

        body
    }
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity((bytes.len() / 2).max(256)),
        Compression::fast(),
    );
    encoder.write_all(bytes)?;
    encoder.finish()
}
