use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Vote counts keyed by poll id, then by option label.
pub type VotesMap = HashMap<String, HashMap<String, u64>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

fn default_active() -> bool {
    true
}

// Derived view of a poll's tally. Never persisted, recomputed on each read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResults {
    pub results: HashMap<String, u64>,
    pub total: u64,
}

// On-disk document for the file-backed store:
// { "votes": { poll_id: { option: count } } }
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VotesDocument {
    #[serde(default)]
    pub votes: VotesMap,
}

// Accepts both the JSON body of POST /api/poll ({"pollId": ..}) and the
// historical POST /api/poll/vote variant ({"poll_id": ..}).
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "pollId", alias = "poll_id")]
    pub poll_id: String,
    pub option: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<String>,
}
