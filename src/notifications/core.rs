use std::cmp::Reverse;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// Number of entries surfaced at once: a primary and a secondary slot.
pub const VISIBLE_SLOTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LocalScreenshare,
    Reconnecting,
    TerminalError,
    HandRaise,
    RoleChangeDeclined,
    PollStarted,
    Error,
}

impl NotificationKind {
    /// Lower tiers win. Ambient kinds share the last tier and rank by recency.
    pub fn tier(&self) -> u8 {
        match self {
            NotificationKind::LocalScreenshare => 0,
            NotificationKind::Reconnecting => 1,
            NotificationKind::TerminalError => 2,
            NotificationKind::HandRaise
            | NotificationKind::RoleChangeDeclined
            | NotificationKind::PollStarted
            | NotificationKind::Error => 3,
        }
    }

    /// Sticky kinds stay until dismissed explicitly.
    pub fn is_sticky(&self) -> bool {
        self.tier() < 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissPolicy {
    /// Sticky kinds never expire, everything else uses the queue default.
    #[default]
    KindDefault,
    Never,
    After(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEntry {
    pub id: String,
    pub kind: NotificationKind,
    pub payload: Value,
    /// Queue clock reading when the id was first enqueued.
    pub created_at: Duration,
    pub dismiss: DismissPolicy,
}

impl NotificationEntry {
    pub fn new(id: impl Into<String>, kind: NotificationKind, payload: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            created_at: Duration::ZERO,
            dismiss: DismissPolicy::KindDefault,
        }
    }

    pub fn with_dismiss(mut self, policy: DismissPolicy) -> Self {
        self.dismiss = policy;
        self
    }
}

#[derive(Debug, Clone)]
struct Queued {
    entry: NotificationEntry,
    seq: u64,
    armed_at: Option<Duration>,
}

/// Ranked notification queue.
///
/// Time only moves through [`NotificationQueue::advance`]; auto-dismiss timers
/// start when an entry first becomes visible.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    entries: Vec<Queued>,
    now: Duration,
    next_seq: u64,
    default_auto_dismiss: Duration,
    capacity: usize,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 16)
    }
}

impl NotificationQueue {
    pub fn new(default_auto_dismiss: Duration, capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            now: Duration::ZERO,
            next_seq: 0,
            default_auto_dismiss,
            capacity: capacity.max(VISIBLE_SLOTS),
        }
    }

    /// Add `entry`, or replace the entry with the same id where it stands.
    ///
    /// Returns the entries evicted to respect the capacity.
    pub fn enqueue(&mut self, mut entry: NotificationEntry) -> Vec<NotificationEntry> {
        if let Some(existing) = self.entries.iter_mut().find(|q| q.entry.id == entry.id) {
            entry.created_at = existing.entry.created_at;
            existing.entry = entry;
            existing.armed_at = None;
        } else {
            entry.created_at = self.now;
            self.entries.push(Queued {
                entry,
                seq: self.next_seq,
                armed_at: None,
            });
            self.next_seq = self.next_seq.wrapping_add(1);
        }

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            self.rank();
            if let Some(lowest) = self.entries.pop() {
                evicted.push(lowest.entry);
            }
        }
        self.arm_visible();
        evicted
    }

    /// Remove `id` and cancel its timer. Unknown ids are a no-op.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|q| q.entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.arm_visible();
        }
        removed
    }

    /// Move the queue clock forward and return the entries that expired.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<NotificationEntry> {
        self.now = self.now.saturating_add(elapsed);
        let mut expired = Vec::new();
        loop {
            self.arm_visible();
            let now = self.now;
            let default = self.default_auto_dismiss;
            let due = self.entries.iter().take(VISIBLE_SLOTS).position(|q| {
                match (q.armed_at, expiry(&q.entry, default)) {
                    (Some(armed), Some(after)) => armed.saturating_add(after) <= now,
                    _ => false,
                }
            });
            match due {
                Some(idx) => expired.push(self.entries.remove(idx).entry),
                None => break,
            }
        }
        expired
    }

    /// Primary then secondary entry.
    pub fn visible(&self) -> Vec<&NotificationEntry> {
        let mut ranked: Vec<&Queued> = self.entries.iter().collect();
        ranked.sort_by_key(|q| rank_key(q));
        ranked
            .into_iter()
            .take(VISIBLE_SLOTS)
            .map(|q| &q.entry)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&NotificationEntry> {
        self.entries
            .iter()
            .find(|q| q.entry.id == id)
            .map(|q| &q.entry)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Entries queued but not currently visible.
    pub fn hidden_count(&self) -> usize {
        self.entries.len().saturating_sub(VISIBLE_SLOTS)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn rank(&mut self) {
        self.entries.sort_by_key(rank_key);
    }

    /// Start timers on the visible entries and reset them on hidden ones, so a
    /// resurfaced entry gets its full delay again.
    fn arm_visible(&mut self) {
        self.rank();
        let now = self.now;
        for (rank, queued) in self.entries.iter_mut().enumerate() {
            if rank >= VISIBLE_SLOTS {
                queued.armed_at = None;
            } else if queued.armed_at.is_none() {
                queued.armed_at = Some(now);
            }
        }
    }
}

fn rank_key(queued: &Queued) -> (u8, Reverse<Duration>, Reverse<u64>) {
    (
        queued.entry.kind.tier(),
        Reverse(queued.entry.created_at),
        Reverse(queued.seq),
    )
}

fn expiry(entry: &NotificationEntry, default: Duration) -> Option<Duration> {
    match entry.dismiss {
        DismissPolicy::Never => None,
        DismissPolicy::After(after) => Some(after),
        DismissPolicy::KindDefault if entry.kind.is_sticky() => None,
        DismissPolicy::KindDefault => Some(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, kind: NotificationKind) -> NotificationEntry {
        NotificationEntry::new(id, kind, json!({}))
    }

    fn visible_ids(queue: &NotificationQueue) -> Vec<&str> {
        queue.visible().into_iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn screenshare_banner_outranks_earlier_hand_raise() {
        let mut queue = NotificationQueue::default();
        queue.advance(Duration::from_secs(1));
        queue.enqueue(entry("hand", NotificationKind::HandRaise));
        queue.advance(Duration::from_millis(500));
        queue.enqueue(entry("screen", NotificationKind::LocalScreenshare));
        assert_eq!(visible_ids(&queue), vec!["screen", "hand"]);

        let mut reversed = NotificationQueue::default();
        reversed.enqueue(entry("screen", NotificationKind::LocalScreenshare));
        reversed.advance(Duration::from_millis(500));
        reversed.enqueue(entry("hand", NotificationKind::HandRaise));
        assert_eq!(visible_ids(&reversed), vec!["screen", "hand"]);
    }

    #[test]
    fn ambient_entries_rank_by_recency_and_cap_at_two() {
        let mut queue = NotificationQueue::default();
        for id in ["a", "b", "c"] {
            queue.enqueue(entry(id, NotificationKind::HandRaise));
            queue.advance(Duration::from_millis(10));
        }
        assert_eq!(visible_ids(&queue), vec!["c", "b"]);
        assert_eq!(queue.hidden_count(), 1);

        queue.dismiss("c");
        assert_eq!(visible_ids(&queue), vec!["b", "a"]);
    }

    #[test]
    fn same_instant_ties_break_on_arrival() {
        let mut queue = NotificationQueue::default();
        queue.enqueue(entry("poll", NotificationKind::PollStarted));
        queue.enqueue(entry("hand", NotificationKind::HandRaise));
        assert_eq!(visible_ids(&queue), vec!["hand", "poll"]);
    }

    #[test]
    fn reenqueue_replaces_in_place() {
        let mut queue = NotificationQueue::default();
        queue.enqueue(entry("hand", NotificationKind::HandRaise));
        queue.advance(Duration::from_millis(10));
        queue.enqueue(entry("poll", NotificationKind::PollStarted));
        queue.enqueue(NotificationEntry::new(
            "hand",
            NotificationKind::HandRaise,
            json!({"count": 2}),
        ));

        assert_eq!(queue.len(), 2);
        assert_eq!(visible_ids(&queue), vec!["poll", "hand"]);
        assert_eq!(queue.get("hand").unwrap().payload["count"], 2);
    }

    #[test]
    fn visible_ambient_entries_auto_dismiss() {
        let mut queue = NotificationQueue::new(Duration::from_secs(5), 8);
        queue.enqueue(entry("hand", NotificationKind::HandRaise));
        assert!(queue.advance(Duration::from_secs(4)).is_empty());
        let expired = queue.advance(Duration::from_secs(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "hand");
        assert!(queue.is_empty());
    }

    #[test]
    fn hidden_entries_start_their_timer_when_surfaced() {
        let mut queue = NotificationQueue::new(Duration::from_secs(5), 8);
        queue.enqueue(entry("screen", NotificationKind::LocalScreenshare));
        queue.enqueue(entry("reconnect", NotificationKind::Reconnecting));
        queue.enqueue(entry("hand", NotificationKind::HandRaise));

        assert!(queue.advance(Duration::from_secs(10)).is_empty());
        queue.dismiss("reconnect");
        assert!(queue.advance(Duration::from_secs(4)).is_empty());
        let expired = queue.advance(Duration::from_secs(1));
        assert_eq!(expired[0].id, "hand");
        assert_eq!(visible_ids(&queue), vec!["screen"]);
    }

    #[test]
    fn resurfaced_entry_gets_a_fresh_delay() {
        let mut queue = NotificationQueue::new(Duration::from_secs(5), 8);
        queue.enqueue(entry("hand", NotificationKind::HandRaise));
        assert!(queue.advance(Duration::from_secs(1)).is_empty());

        queue.enqueue(entry("reconnect", NotificationKind::Reconnecting));
        queue.enqueue(entry("screen", NotificationKind::LocalScreenshare));
        assert_eq!(visible_ids(&queue), vec!["screen", "reconnect"]);
        assert!(queue.advance(Duration::from_secs(10)).is_empty());

        queue.dismiss("reconnect");
        assert_eq!(visible_ids(&queue), vec!["screen", "hand"]);
        assert!(queue.advance(Duration::from_millis(1)).is_empty());
        assert!(queue.advance(Duration::from_millis(4_998)).is_empty());
        assert_eq!(visible_ids(&queue), vec!["screen", "hand"]);

        let expired = queue.advance(Duration::from_millis(1));
        assert_eq!(expired[0].id, "hand");
    }

    #[test]
    fn dismiss_cancels_pending_timer() {
        let mut queue = NotificationQueue::new(Duration::from_secs(5), 8);
        queue.enqueue(entry("hand", NotificationKind::HandRaise));
        assert!(queue.dismiss("hand"));
        assert!(!queue.dismiss("hand"));
        assert!(queue.advance(Duration::from_secs(6)).is_empty());
    }

    #[test]
    fn explicit_policy_overrides_kind_default() {
        let mut queue = NotificationQueue::new(Duration::from_secs(5), 8);
        queue.enqueue(
            entry("screen", NotificationKind::LocalScreenshare)
                .with_dismiss(DismissPolicy::After(Duration::from_secs(1))),
        );
        queue.enqueue(entry("poll", NotificationKind::PollStarted).with_dismiss(DismissPolicy::Never));
        let expired = queue.advance(Duration::from_secs(30));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "screen");
        assert!(queue.contains("poll"));
    }

    #[test]
    fn overflow_evicts_lowest_ranked() {
        let mut queue = NotificationQueue::new(Duration::from_secs(5), 2);
        queue.enqueue(entry("old", NotificationKind::HandRaise));
        queue.advance(Duration::from_millis(1));
        queue.enqueue(entry("screen", NotificationKind::LocalScreenshare));
        queue.advance(Duration::from_millis(1));
        let evicted = queue.enqueue(entry("new", NotificationKind::PollStarted));

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "old");
        assert_eq!(visible_ids(&queue), vec!["screen", "new"]);
    }
}
