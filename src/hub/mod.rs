//! The room core. One `Hub` owns every room and session and is driven by a
//! single task, so each parcel runs to completion before the next one starts.

use std::collections::HashMap;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::{
    error::HubErr,
    proto::{AckOutput, Input, Output, Reply, RoomReply, RoomsReply},
    registry::Registry,
    state::{ConnId, EffectiveState, Session},
};

mod identity;
mod lifecycle;
mod playback;
mod presence;


pub type PeerTx = UnboundedSender<Output>;
pub type HubHandle = UnboundedSender<InputParcel>;

#[derive(Debug, Clone)]
pub struct HubOptions {
    pub host_secret: String,
    pub chat_capacity: usize,
}

#[derive(Debug)]
pub enum InputParcel {
    Connect { conn: ConnId, sender: PeerTx },
    Input { conn: ConnId, ack: Option<u64>, input: Input },
    Disconnect { conn: ConnId },
}

pub struct Hub {
    options: HubOptions,
    registry: Registry,
    sessions: HashMap<ConnId, Session>,
    peers: HashMap<ConnId, PeerTx>,
}

impl Hub {
    pub fn new(options: HubOptions) -> Self {
        Hub {
            registry: Registry::new(options.chat_capacity),
            sessions: HashMap::new(),
            peers: HashMap::new(),
            options,
        }
    }

    pub async fn run(mut self, mut receiver: UnboundedReceiver<InputParcel>) {
        while let Some(parcel) = receiver.recv().await {
            self.process(parcel);
        }
        info!("hub input closed, stopping");
    }

    pub fn process(&mut self, parcel: InputParcel) {
        match parcel {
            InputParcel::Connect { conn, sender } => self.connect(conn, sender),
            InputParcel::Input { conn, ack, input } => {
                let reply = self.handle(conn, input);
                if let Some(body) = reply.as_ref().filter(|r| !r.is_success()) {
                    debug!(%conn, ?body, "request refused");
                }
                if let (Some(id), Some(body)) = (ack, reply) {
                    self.send_to(conn, Output::Ack(AckOutput { id, body }));
                }
            }
            InputParcel::Disconnect { conn } => self.disconnect(conn),
        }
    }

    pub fn connect(&mut self, conn: ConnId, sender: PeerTx) {
        info!(%conn, "connection opened");
        self.peers.insert(conn, sender);
        self.sessions.insert(conn, Session::Unbound);
    }

    /// Runs one event. Returns the response for events that have one.
    pub fn handle(&mut self, conn: ConnId, input: Input) -> Option<Reply> {
        match input {
            Input::AuthenticateHost(a) => {
                Some(respond(self.authenticate_host(conn, &a.username, &a.host_secret), |_| Reply::ok(None)))
            }
            Input::GetRooms => Some(respond(self.list_rooms(conn), |rooms| {
                Reply::Rooms(RoomsReply { success: true, rooms })
            })),
            Input::CreateRoom(c) => Some(respond(
                self.create_room(conn, &c.room_name, &c.watch_password),
                |_| Reply::ok(Some(format!("room {} created", c.room_name))),
            )),
            Input::JoinRoomAsHost(j) => Some(respond(self.join_room_as_host(conn, &j.room_name), Reply::from)),
            Input::JoinRoomAsViewer(j) => Some(respond(
                self.join_room_as_viewer(conn, &j.username, &j.watch_password),
                Reply::from,
            )),
            Input::ReconnectHost(r) => {
                Some(respond(self.reconnect_host(conn, &r.username, &r.room_name), Reply::from))
            }
            Input::ReconnectViewer(r) => {
                Some(respond(self.reconnect_viewer(conn, &r.username, &r.room_name), Reply::from))
            }
            Input::DestroyRoom(name) => Some(respond(self.destroy_room(conn, &name), |_| Reply::ok(None))),
            Input::GetCurrentPlaybackState => Some(Reply::Playback(self.current_playback_state(conn))),
            Input::GetLatestViewerReport => Some(Reply::Playback(self.latest_viewer_report(conn))),
            Input::ChatMessage(text) => {
                self.post_chat_message(conn, &text);
                None
            }
            Input::HostSetVideo(url) => {
                dropped(conn, "hostSetVideo", self.host_set_video(conn, &url));
                None
            }
            Input::HostSetSubtitle(url) => {
                dropped(conn, "hostSetSubtitle", self.host_set_subtitle(conn, &url));
                None
            }
            Input::HostSetPlaybackState(state) => {
                dropped(conn, "hostSetPlaybackState", self.host_set_playback_state(conn, state));
                None
            }
            Input::ViewerReportState(state) => {
                dropped(conn, "viewerReportState", self.viewer_report_state(conn, state));
                None
            }
            Input::RequestRoster => {
                if let Some(room) = self.bound_room(conn) {
                    self.broadcast_roster(&room);
                }
                None
            }
            Input::Logout => {
                self.logout(conn);
                None
            }
        }
    }

    fn bound_room(&self, conn: ConnId) -> Option<String> {
        self.sessions.get(&conn).and_then(Session::room).map(str::to_owned)
    }

    fn room_reply(&self, name: &str, state: EffectiveState, with_name: bool) -> Result<RoomReply, HubErr> {
        let room = self.registry.get(name).ok_or(HubErr::RoomNotFound)?;
        Ok(RoomReply {
            success: true,
            room_name: with_name.then(|| room.name.clone()),
            video_url: room.video_url.clone(),
            subtitle_url: room.subtitle_url.clone(),
            playback_state: state,
            chat_history: room.chat.snapshot(),
        })
    }

    /* ---------------- outbox ---------------- */
    // Delivery is fire-and-forget; a closed peer is cleaned up by its disconnect parcel.

    fn send_to(&self, conn: ConnId, output: Output) {
        if let Some(tx) = self.peers.get(&conn) {
            tx.send(output).ok();
        }
    }

    fn send_room(&self, room: &str, output: Output, except: Option<ConnId>) {
        let Some(room) = self.registry.get(room) else { return };
        for (member, _) in &room.roster {
            if Some(*member) != except {
                self.send_to(*member, output.clone());
            }
        }
    }
}

fn respond<T>(result: Result<T, HubErr>, ok: impl FnOnce(T) -> Reply) -> Reply {
    match result {
        Ok(v) => ok(v),
        Err(e) => e.into(),
    }
}

fn dropped(conn: ConnId, event: &str, result: Result<(), HubErr>) {
    if let Err(err) = result {
        debug!(%conn, event, %err, "event ignored");
    }
}
