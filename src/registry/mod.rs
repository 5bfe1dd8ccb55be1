use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::models::Poll;

lazy_static! {
    // Auto-generated filler polls keep their historical tallies but are
    // excluded from every listing.
    static ref AUTOFILL_ID: Regex = Regex::new(r"(?i)^autofill_").unwrap();
    static ref AUTOFILL_QUESTION: Regex = Regex::new(r"(?i)^auto-?(fill poll|generated)").unwrap();

    static ref TAG_SYNONYMS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("weddings", "wedding");
        m.insert("wedding", "wedding");
        m.insert("bachelor-parties", "bachelorette");
        m.insert("bachelorette-parties", "bachelorette");
        m.insert("bachelor", "bachelorette");
        m.insert("bachelorette", "bachelorette");
        m.insert("parties", "party-bus");
        m.insert("party-bus", "party-bus");
        m
    };
}

// Read-mostly reference data owned by content tooling. The runtime only
// ever reads it; votes for ids that later disappear from the registry stay
// in the tally but are never surfaced.
pub struct Registry {
    polls: Vec<Poll>,
}

impl Registry {
    // Loads the registry JSON array once at startup. A missing or malformed
    // file degrades to an empty registry so the rest of the service keeps
    // serving.
    pub fn load(path: &Path) -> Self {
        let polls = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<Poll>>(&raw) {
                Ok(polls) => polls,
                Err(e) => {
                    warn!("Malformed poll registry {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Could not read poll registry {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self { polls }
    }

    pub fn from_polls(polls: Vec<Poll>) -> Self {
        Self { polls }
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }

    // Lookup by id, including inactive polls (their tallies remain readable).
    pub fn get(&self, id: &str) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == id)
    }

    // Active polls with auto-generated filler removed, registry order kept.
    pub fn active(&self) -> Vec<&Poll> {
        self.polls.iter().filter(|p| is_listed(p)).collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&Poll> {
        let normalized = normalize_tag(tag);
        self.active()
            .into_iter()
            .filter(|p| {
                if p.tags.is_empty() {
                    return false;
                }
                if normalized == "all" {
                    return true;
                }
                p.tags.iter().any(|t| t.to_lowercase() == normalized)
            })
            .collect()
    }
}

fn is_listed(poll: &Poll) -> bool {
    poll.active && !AUTOFILL_ID.is_match(&poll.id) && !AUTOFILL_QUESTION.is_match(&poll.question)
}

pub fn normalize_tag(tag: &str) -> String {
    let key = tag.trim().to_lowercase();
    match TAG_SYNONYMS.get(key.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(id: &str, question: &str, tags: &[&str], active: bool) -> Poll {
        Poll {
            id: id.to_string(),
            question: question.to_string(),
            options: vec!["Yes".to_string(), "No".to_string()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            active,
            slug: None,
        }
    }

    #[test]
    fn normalizes_tag_synonyms() {
        assert_eq!(normalize_tag("weddings"), "wedding");
        assert_eq!(normalize_tag("Bachelor-Parties"), "bachelorette");
        assert_eq!(normalize_tag("parties"), "party-bus");
        assert_eq!(normalize_tag(" Prom "), "prom");
    }

    #[test]
    fn active_excludes_inactive_and_autofill() {
        let registry = Registry::from_polls(vec![
            poll("pricing-factor", "What matters most?", &[], true),
            poll("retired", "Old question", &[], false),
            poll("autofill_042", "Autofill poll 42", &[], true),
            poll("gen", "Auto-generated question", &[], true),
        ]);

        let listed = registry.active();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "pricing-factor");

        // Inactive polls stay reachable by id for historical tallies.
        assert!(registry.get("retired").is_some());
    }

    #[test]
    fn by_tag_matches_through_synonyms() {
        let registry = Registry::from_polls(vec![
            poll("w1", "Wedding ride?", &["wedding"], true),
            poll("b1", "Bachelorette ride?", &["bachelorette"], true),
            poll("untagged", "No tags", &[], true),
        ]);

        let weddings = registry.by_tag("weddings");
        assert_eq!(weddings.len(), 1);
        assert_eq!(weddings[0].id, "w1");

        // "all" matches every tagged poll but never untagged ones.
        assert_eq!(registry.by_tag("all").len(), 2);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let registry = Registry::load(Path::new("/nonexistent/pollsRegistry.json"));
        assert!(registry.is_empty());
    }
}
