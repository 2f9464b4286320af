//! Ranking state: the per-keyword transition engine and its persistence.

pub mod record;
pub mod store;

pub use record::{format_rank, format_transition, now_string, RankRecord, StoredRecord};
pub use store::{LocalStore, MessageIdTable, RepoStore, StateStore, StateTable};

/// Builds the state key for a (country, keyword) pair.
pub fn state_key(country: &str, keyword: &str) -> String {
    format!("{}|{}", country.to_lowercase(), keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_key_lowercases_country() {
        assert_eq!(state_key("US", "translate"), "us|translate");
        assert_eq!(state_key("gb", "photo editor"), "gb|photo editor");
    }
}
