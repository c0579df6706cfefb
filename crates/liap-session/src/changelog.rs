use liap_core::SequenceNumber;
use std::collections::VecDeque;

/// One entry in a room's bounded change history: the serialized `frame` sent
/// to clients at the time, tagged with the sequence number and phase it
/// belongs to so a reconnecting client's replay can be sliced by `since`.
#[derive(Debug, Clone)]
pub struct ChangeLogEntry {
    pub sequence_number: SequenceNumber,
    pub reason: &'static str,
    pub phase: &'static str,
    pub frame: String,
}

/// Bounded FIFO of change records. Keeping it bounded makes "replay vs. full
/// sync" a real branch in reconnection handling rather than infinite
/// retention.
pub struct ChangeLog {
    entries: VecDeque<ChangeLogEntry>,
    capacity: usize,
}

impl ChangeLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, entry: ChangeLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The most recently pushed entry, if any — what a fire-and-forget
    /// persistence hook appends after each publish.
    pub fn latest(&self) -> Option<&ChangeLogEntry> {
        self.entries.back()
    }

    /// Entries with `sequence_number > since`, in order. `None` means `since`
    /// is older than anything retained — the caller must fall back to a full
    /// state sync instead of replay.
    pub fn since(&self, since: SequenceNumber) -> Option<Vec<&ChangeLogEntry>> {
        if let Some(oldest) = self.entries.front() {
            if since + 1 < oldest.sequence_number {
                return None;
            }
        } else if since > 0 {
            return None;
        }
        Some(self.entries.iter().filter(|e| e.sequence_number > since).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: SequenceNumber) -> ChangeLogEntry {
        ChangeLogEntry { sequence_number: seq, reason: "test", phase: "turn", frame: String::new() }
    }

    #[test]
    fn bounded_log_drops_oldest() {
        let mut log = ChangeLog::new(2);
        log.push(entry(1));
        log.push(entry(2));
        log.push(entry(3));
        let since = log.since(0);
        assert!(since.is_none(), "entry 1 was evicted, since(0) can't be satisfied from here");
    }

    #[test]
    fn since_returns_only_newer_entries() {
        let mut log = ChangeLog::new(8);
        log.push(entry(1));
        log.push(entry(2));
        log.push(entry(3));
        let tail = log.since(1).unwrap();
        assert_eq!(tail.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn since_current_sequence_yields_nothing() {
        let mut log = ChangeLog::new(8);
        log.push(entry(1));
        assert!(log.since(1).unwrap().is_empty());
    }
}
