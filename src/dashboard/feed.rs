use std::collections::VecDeque;

use super::classify::LogLine;

pub const FEED_CAPACITY: usize = 100;

/// Where a feed entry came from, used for styling and quick filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    System,
    Receive,
    Send,
    Error,
}

#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub direction: Direction,
    pub line: LogLine,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// Bounded ring of the most recent rendered device events. Oldest
/// entries fall off once the cap is reached.
#[derive(Debug)]
pub struct LiveFeed {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }
}

impl LiveFeed {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, direction: Direction, line: LogLine) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(FeedEntry {
            direction,
            line,
            at: chrono::Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&FeedEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(title: &str) -> LogLine {
        LogLine {
            icon: "bolt",
            title: title.to_string(),
            desc: String::new(),
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut feed = LiveFeed::with_capacity(3);
        for i in 0..5 {
            feed.push(Direction::Receive, line(&format!("entry {i}")));
        }
        assert_eq!(feed.len(), 3);
        let titles: Vec<_> = feed.iter().map(|e| e.line.title.as_str()).collect();
        assert_eq!(titles, vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn latest_points_at_newest_entry() {
        let mut feed = LiveFeed::default();
        feed.push(Direction::System, line("first"));
        feed.push(Direction::Error, line("second"));
        assert_eq!(feed.latest().unwrap().line.title, "second");
        assert_eq!(feed.latest().unwrap().direction, Direction::Error);
    }
}
