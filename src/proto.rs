//! JSON frames exchanged over the session websocket.
//!
//! Inbound:  `{"event": "createRoom", "data": {...}, "ack": 7}`
//! Outbound: `{"event": "rosterUpdate", "data": [...]}`; responses to an inbound
//! frame carrying `ack` come back as `{"event": "ack", "data": {"id": 7, "body": {...}}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ErrorKind, HubErr},
    state::{ChatRecord, EffectiveState, PlaybackState},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Input {
    AuthenticateHost(AuthInput),
    GetRooms,
    CreateRoom(CreateRoomInput),
    JoinRoomAsHost(RoomNameInput),
    JoinRoomAsViewer(ViewerJoinInput),
    ReconnectHost(ReconnectInput),
    ReconnectViewer(ReconnectInput),
    ChatMessage(String),
    HostSetVideo(String),
    HostSetSubtitle(String),
    HostSetPlaybackState(PlaybackState),
    ViewerReportState(PlaybackState),
    RequestRoster,
    GetCurrentPlaybackState,
    GetLatestViewerReport,
    DestroyRoom(String),
    Logout,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthInput {
    pub username: String,
    pub host_secret: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRoomInput {
    pub room_name: String,
    pub watch_password: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomNameInput {
    pub room_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerJoinInput {
    pub username: String,
    pub watch_password: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectInput {
    pub username: String,
    pub room_name: String,
}

/// Splits a raw text frame into its optional ack id and the event.
/// Events without a payload ignore whatever `data` the client attached.
pub fn parse_frame(raw: &str) -> Result<(Option<u64>, Input), serde_json::Error> {
    let mut value: Value = serde_json::from_str(raw)?;
    let ack = value.get("ack").and_then(Value::as_u64);
    match Input::deserialize(&value) {
        Ok(input) => Ok((ack, input)),
        Err(err) => match value.as_object_mut().and_then(|frame| frame.remove("data")) {
            Some(_) => serde_json::from_value(value).map(|input| (ack, input)).map_err(|_| err),
            None => Err(err),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Output {
    Ack(AckOutput),
    RosterUpdate(Vec<String>),
    ChatMessage(ChatRecord),
    MediaUpdate(MediaOutput),
    PlaybackUpdate(PlaybackState),
    RequestViewerState,
    RoomClosed(RoomRef),
    HostDisplaced(RoomRef),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AckOutput {
    pub id: u64,
    pub body: Reply,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaOutput {
    pub video_url: String,
    pub subtitle_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorOutput {
    pub message: String,
}

/* ---------------- responses ---------------- */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Status(StatusReply),
    Room(RoomReply),
    Rooms(RoomsReply),
    Playback(Option<EffectiveState>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything a client needs to render a room right after binding to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    pub video_url: String,
    pub subtitle_url: String,
    pub playback_state: EffectiveState,
    pub chat_history: Vec<ChatRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomsReply {
    pub success: bool,
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    pub has_host: bool,
    pub watch_password: String,
    pub members: usize,
}

impl Reply {
    pub fn ok(message: Option<String>) -> Self {
        Reply::Status(StatusReply { success: true, code: None, message })
    }

    pub fn is_success(&self) -> bool {
        match self {
            Reply::Status(s) => s.success,
            Reply::Room(r) => r.success,
            Reply::Rooms(r) => r.success,
            Reply::Playback(_) => true,
        }
    }
}

impl From<HubErr> for Reply {
    fn from(err: HubErr) -> Self {
        Reply::Status(StatusReply {
            success: false,
            code: Some(err.kind()),
            message: Some(err.to_string()),
        })
    }
}

impl From<RoomReply> for Reply {
    fn from(r: RoomReply) -> Self {
        Reply::Room(r)
    }
}
