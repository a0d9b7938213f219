//! Match sink — turns concurrent walker callbacks into one collection.
//!
//! Insertion order depends on worker interleaving, so results are meant to
//! be treated as a set. `into_matches` sorts for stable presentation.
use crate::model::Match;
use parking_lot::Mutex;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct MatchSink {
    matches: Mutex<Vec<Match>>,
}

impl MatchSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one match under the lock.
    pub fn add(&self, m: Match) {
        self.matches.lock().push(m);
    }

    /// Number of matches added so far. Duplicates are counted; the walker
    /// never produces any.
    pub fn len(&self) -> usize {
        self.matches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.lock().is_empty()
    }

    /// Copy of the current contents, sorted by name then path.
    pub fn snapshot(&self) -> Vec<Match> {
        let mut matches = self.matches.lock().clone();
        matches.sort();
        matches
    }

    /// Consume the sink, sorted by name then path.
    pub fn into_matches(self) -> Vec<Match> {
        let mut matches = self.matches.into_inner();
        matches.sort();
        matches
    }

    /// Consume the sink as a set, the form in which scan results are
    /// compared regardless of scheduling.
    pub fn into_set(self) -> BTreeSet<Match> {
        self.matches.into_inner().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_adds_are_all_kept() {
        let sink = Arc::new(MatchSink::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..100 {
                        sink.add(Match::new(format!("p{t}-{i}"), format!("/code/p{t}-{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(sink.len(), 800);
        let sink = Arc::try_unwrap(sink).unwrap();
        assert_eq!(sink.into_set().len(), 800);
    }

    #[test]
    fn test_into_matches_is_sorted() {
        let sink = MatchSink::new();
        assert!(sink.is_empty());
        sink.add(Match::new("zeta", "/c/zeta"));
        sink.add(Match::new("alpha", "/c/alpha"));

        let names: Vec<_> = sink.into_matches().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
