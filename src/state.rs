use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ConnId = Uuid;

pub const CHAT_HISTORY_CAP: usize = 500;
pub const SYSTEM_SENDER: &str = "System";

/// Milliseconds since the Unix epoch, the unit every timestamp on the wire uses.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/* ------------ playback ------------ */
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub playing: bool,
    pub current_time: f64,
}

/// Last position a viewer said it was at. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerReport {
    pub state: PlaybackState,
    pub last_updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncSource {
    Viewer,
}

/// Playback state as handed to a client, optionally annotated with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveState {
    pub playing: bool,
    pub current_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_from: Option<SyncSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<i64>,
}

impl From<PlaybackState> for EffectiveState {
    fn from(s: PlaybackState) -> Self {
        EffectiveState {
            playing: s.playing,
            current_time: s.current_time,
            last_updated_at: None,
            synced_from: None,
            synced_at: None,
        }
    }
}

impl From<ViewerReport> for EffectiveState {
    fn from(r: ViewerReport) -> Self {
        EffectiveState {
            last_updated_at: Some(r.last_updated_at),
            ..EffectiveState::from(r.state)
        }
    }
}

/* ------------ chat ------------ */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Host,
    Viewer,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub sender_connection_id: Option<ConnId>,
    pub text: String,
    pub timestamp: i64,
}

impl ChatRecord {
    pub fn system(text: impl Into<String>) -> Self {
        ChatRecord {
            sender_name: SYSTEM_SENDER.into(),
            sender_role: SenderRole::System,
            sender_connection_id: None,
            text: text.into(),
            timestamp: now_millis(),
        }
    }
}

/// FIFO buffer; the oldest record goes first once `capacity` is reached.
#[derive(Debug)]
pub struct ChatHistory {
    records: VecDeque<ChatRecord>,
    capacity: usize,
}

impl ChatHistory {
    pub fn new(capacity: usize) -> Self {
        ChatHistory { records: VecDeque::new(), capacity: capacity.max(1) }
    }

    pub fn push(&mut self, record: ChatRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatRecord> {
        self.records.iter()
    }

    pub fn snapshot(&self) -> Vec<ChatRecord> {
        self.iter().cloned().collect()
    }
}

/* ------------ room ------------ */
#[derive(Debug)]
pub struct Room {
    pub name: String,
    pub host: Option<ConnId>,
    pub host_username: String,
    pub watch_password: String,
    pub video_url: String,
    pub subtitle_url: String,
    pub playback: PlaybackState,
    pub latest_viewer_report: Option<ViewerReport>,
    pub roster: Vec<(ConnId, String)>,
    pub chat: ChatHistory,
}

impl Room {
    pub fn new(name: &str, watch_password: &str, chat_capacity: usize) -> Self {
        Room {
            name: name.into(),
            host: None,
            host_username: String::new(),
            watch_password: watch_password.into(),
            video_url: String::new(),
            subtitle_url: String::new(),
            playback: PlaybackState::default(),
            latest_viewer_report: None,
            roster: Vec::new(),
            chat: ChatHistory::new(chat_capacity),
        }
    }

    pub fn usernames(&self) -> Vec<String> {
        self.roster.iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn member_name(&self, conn: ConnId) -> Option<&str> {
        self.roster.iter().find(|(id, _)| *id == conn).map(|(_, n)| n.as_str())
    }

    pub fn members(&self) -> Vec<ConnId> {
        self.roster.iter().map(|(id, _)| *id).collect()
    }

    /// True if someone other than the connections in `except` already uses `username`.
    pub fn name_taken(&self, username: &str, except: &[ConnId]) -> bool {
        self.roster.iter().any(|(id, n)| n == username && !except.contains(id))
    }

    pub fn add_member(&mut self, conn: ConnId, username: &str) {
        match self.roster.iter_mut().find(|(id, _)| *id == conn) {
            Some(entry) => entry.1 = username.into(),
            None => self.roster.push((conn, username.into())),
        }
    }

    pub fn remove_member(&mut self, conn: ConnId) -> Option<String> {
        let pos = self.roster.iter().position(|(id, _)| *id == conn)?;
        Some(self.roster.remove(pos).1)
    }

    pub fn is_host(&self, conn: ConnId) -> bool {
        self.host == Some(conn)
    }

    /// What a (re)binding host should resume from: the freshest viewer report
    /// if there is one, the authoritative state otherwise.
    pub fn effective_state(&self, now: i64) -> EffectiveState {
        match self.latest_viewer_report {
            Some(report) => EffectiveState {
                synced_from: Some(SyncSource::Viewer),
                synced_at: Some(now),
                ..EffectiveState::from(report)
            },
            None => self.playback.into(),
        }
    }
}

/* ------------ per connection ------------ */
/// What a connection currently is. Only identity and lifecycle code writes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Unbound,
    HostIdle { username: String },
    HostBound { username: String, room: String },
    ViewerBound { username: String, room: String },
}

impl Session {
    pub fn room(&self) -> Option<&str> {
        match self {
            Session::HostBound { room, .. } | Session::ViewerBound { room, .. } => Some(room),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Session::Unbound => None,
            Session::HostIdle { username }
            | Session::HostBound { username, .. }
            | Session::ViewerBound { username, .. } => Some(username),
        }
    }

    pub fn role(&self) -> Option<SenderRole> {
        match self {
            Session::Unbound => None,
            Session::ViewerBound { .. } => Some(SenderRole::Viewer),
            _ => Some(SenderRole::Host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> ChatRecord {
        ChatRecord {
            sender_name: "bob".into(),
            sender_role: SenderRole::Viewer,
            sender_connection_id: None,
            text: text.into(),
            timestamp: 0,
        }
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut h = ChatHistory::new(3);
        for t in ["a", "b", "c", "d"] {
            h.push(record(t));
        }
        let texts: Vec<_> = h.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["b", "c", "d"]);
        assert_eq!(h.iter().count(), 3);
        assert_eq!(h.snapshot().first().map(|r| r.text.as_str()), Some("b"));
    }

    #[test]
    fn effective_state_prefers_viewer_report() {
        let mut room = Room::new("cinema", "1234", CHAT_HISTORY_CAP);
        room.playback = PlaybackState { playing: false, current_time: 3.0 };
        assert_eq!(room.effective_state(10), EffectiveState::from(room.playback));

        room.latest_viewer_report = Some(ViewerReport {
            state: PlaybackState { playing: true, current_time: 42.0 },
            last_updated_at: 5,
        });
        let eff = room.effective_state(10);
        assert_eq!(eff.current_time, 42.0);
        assert!(eff.playing);
        assert_eq!(eff.synced_from, Some(SyncSource::Viewer));
        assert_eq!(eff.synced_at, Some(10));
        assert_eq!(eff.last_updated_at, Some(5));
    }

    #[test]
    fn effective_state_wire_shape() {
        let plain = serde_json::to_value(EffectiveState::from(PlaybackState::default())).unwrap();
        assert_eq!(plain, serde_json::json!({"playing": false, "currentTime": 0.0}));

        let mut room = Room::new("cinema", "1234", CHAT_HISTORY_CAP);
        room.latest_viewer_report = Some(ViewerReport {
            state: PlaybackState { playing: true, current_time: 1.5 },
            last_updated_at: 7,
        });
        let synced = serde_json::to_value(room.effective_state(9)).unwrap();
        assert_eq!(synced["syncedFrom"], "viewer");
        assert_eq!(synced["syncedAt"], 9);
    }

    #[test]
    fn roster_upsert_and_conflicts() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut room = Room::new("cinema", "1234", CHAT_HISTORY_CAP);
        room.add_member(a, "alice");
        room.add_member(a, "alice2");
        room.add_member(b, "bob");
        assert_eq!(room.usernames(), ["alice2", "bob"]);
        assert!(room.name_taken("bob", &[a]));
        assert!(!room.name_taken("bob", &[b]));
        assert_eq!(room.remove_member(b).as_deref(), Some("bob"));
        assert_eq!(room.remove_member(b), None);
    }

    #[test]
    fn session_accessors() {
        let s = Session::ViewerBound { username: "bob".into(), room: "cinema".into() };
        assert_eq!(s.room(), Some("cinema"));
        assert_eq!(s.role(), Some(SenderRole::Viewer));
        assert_eq!(Session::HostIdle { username: "alice".into() }.role(), Some(SenderRole::Host));
        assert_eq!(Session::Unbound.username(), None);
    }
}
