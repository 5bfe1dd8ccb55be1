pub mod bulk;

use crate::models::{PollResults, VotesMap};

// Shapes one poll's tally into the derived {results, total} view.
pub fn results_for(votes: &VotesMap, poll_id: &str) -> PollResults {
    let results = votes.get(poll_id).cloned().unwrap_or_default();
    let total = results.values().sum();
    PollResults { results, total }
}

// Folds one (poll, option, count) observation into a votes map. Used when
// rebuilding the map from relational rows.
pub fn accumulate(map: &mut VotesMap, poll_id: &str, option: &str, count: u64) {
    let tally = map.entry(poll_id.to_string()).or_default();
    *tally.entry(option.to_string()).or_insert(0) += count;
}
