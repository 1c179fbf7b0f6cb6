use tracing::{debug, info};

use super::Hub;
use crate::{
    error::{require, HubErr},
    proto::{Output, RoomReply, RoomRef, RoomSummary},
    registry::HostClaim,
    state::{now_millis, ConnId, EffectiveState, Session},
};

impl Hub {
    pub fn list_rooms(&self, conn: ConnId) -> Result<Vec<RoomSummary>, HubErr> {
        self.host_identity(conn)?;
        let mut rooms: Vec<_> = self
            .registry
            .rooms()
            .map(|r| RoomSummary {
                room_name: r.name.clone(),
                host_name: r.host.and_then(|h| r.member_name(h)).map(str::to_owned),
                has_host: r.host.is_some(),
                watch_password: r.watch_password.clone(),
                members: r.roster.len(),
            })
            .collect();
        rooms.sort_by(|a, b| a.room_name.cmp(&b.room_name));
        Ok(rooms)
    }

    pub fn create_room(&mut self, conn: ConnId, room_name: &str, watch_password: &str) -> Result<(), HubErr> {
        let username = self.host_identity(conn)?;
        let previous = self.bound_room(conn);
        self.registry.create_room(room_name, watch_password, conn, &username)?;
        self.leave_previous(conn, previous, room_name);
        self.set_session(conn, Session::HostBound { username: username.clone(), room: room_name.into() });
        info!(%conn, room = room_name, host = %username, "room created");
        self.broadcast_roster(room_name);
        Ok(())
    }

    pub fn join_room_as_host(&mut self, conn: ConnId, room_name: &str) -> Result<RoomReply, HubErr> {
        let username = self.host_identity(conn)?;
        require(room_name, "roomName")?;
        self.bind_host_to(conn, &username, room_name, HostClaim::Join)
    }

    /// Rebinds a host after a reload. When the room is gone the host role is
    /// still granted so host-only calls keep working. A room that answers to
    /// another username grants nothing and leaves the session as it was.
    pub fn reconnect_host(&mut self, conn: ConnId, username: &str, room_name: &str) -> Result<RoomReply, HubErr> {
        require(username, "username")?;
        match self.bind_host_to(conn, username, room_name, HostClaim::Reconnect) {
            Err(HubErr::RoomNotFound) => {
                self.leave_bound_room(conn);
                self.set_session(conn, Session::HostIdle { username: username.into() });
                debug!(%conn, room = room_name, "host reconnect to missing room");
                Err(HubErr::RoomNotFound)
            }
            Err(err @ HubErr::IdentityMismatch(_)) => {
                debug!(%conn, room = room_name, %err, "host reconnect refused");
                Err(err)
            }
            other => other,
        }
    }

    pub fn join_room_as_viewer(
        &mut self,
        conn: ConnId,
        username: &str,
        watch_password: &str,
    ) -> Result<RoomReply, HubErr> {
        let previous = self.bound_room(conn);
        let name = self.registry.join_as_viewer(watch_password, username, conn)?;
        self.finish_viewer_bind(conn, username, &name, previous, true)
    }

    pub fn reconnect_viewer(&mut self, conn: ConnId, username: &str, room_name: &str) -> Result<RoomReply, HubErr> {
        let previous = self.bound_room(conn);
        self.registry.add_viewer(room_name, username, conn)?;
        self.finish_viewer_bind(conn, username, room_name, previous, false)
    }

    /// Leaves the room but keeps the connection; it has to authenticate or join again.
    pub fn logout(&mut self, conn: ConnId) {
        if let Some(room) = self.bound_room(conn) {
            self.depart(conn, &room);
        }
        self.set_session(conn, Session::Unbound);
        debug!(%conn, "logged out");
    }

    /// Transport-level close. Safe to call more than once.
    pub fn disconnect(&mut self, conn: ConnId) {
        if let Some(room) = self.bound_room(conn) {
            self.depart(conn, &room);
        }
        self.sessions.remove(&conn);
        if self.peers.remove(&conn).is_some() {
            info!(%conn, "connection closed");
        }
    }

    /// Closes the room for everyone in it. Members stay connected, unbound.
    pub fn destroy_room(&mut self, conn: ConnId, room_name: &str) -> Result<(), HubErr> {
        let room = self.registry.destroy_room(room_name, conn)?;
        let closed = Output::RoomClosed(RoomRef { room_name: room.name.clone() });
        for member in room.members() {
            self.send_to(member, closed.clone());
            if self.bound_room(member).as_deref() == Some(room_name) {
                self.unbind(member);
            }
        }
        info!(%conn, room = room_name, "room destroyed");
        Ok(())
    }

    pub(super) fn leave_bound_room(&mut self, conn: ConnId) {
        if let Some(room) = self.bound_room(conn) {
            self.depart(conn, &room);
            self.unbind(conn);
        }
    }

    fn bind_host_to(
        &mut self,
        conn: ConnId,
        username: &str,
        room_name: &str,
        claim: HostClaim,
    ) -> Result<RoomReply, HubErr> {
        let previous = self.bound_room(conn);
        let bound = self.registry.bind_host(room_name, conn, username, claim)?;
        if let Some(old) = bound.displaced {
            self.unbind(old);
            self.send_to(old, Output::HostDisplaced(RoomRef { room_name: room_name.into() }));
            info!(conn = %old, room = room_name, "host connection displaced");
        }
        self.leave_previous(conn, previous, room_name);
        self.set_session(conn, Session::HostBound { username: username.into(), room: room_name.into() });
        info!(%conn, room = room_name, username, "host bound");

        self.broadcast_roster(room_name);
        self.append_system_notice(room_name, format!("host {username} joined"));
        self.request_viewer_report_refresh(room_name, conn);
        let state = self
            .registry
            .get(room_name)
            .map(|r| r.effective_state(now_millis()))
            .ok_or(HubErr::RoomNotFound)?;
        self.room_reply(room_name, state, false)
    }

    fn finish_viewer_bind(
        &mut self,
        conn: ConnId,
        username: &str,
        room_name: &str,
        previous: Option<String>,
        with_name: bool,
    ) -> Result<RoomReply, HubErr> {
        self.leave_previous(conn, previous, room_name);
        self.set_session(conn, Session::ViewerBound { username: username.into(), room: room_name.into() });
        debug!(%conn, room = room_name, username, "viewer joined");

        self.broadcast_roster(room_name);
        self.append_system_notice(room_name, format!("{username} joined"));
        let state: EffectiveState = self
            .registry
            .get(room_name)
            .map(|r| r.playback.into())
            .ok_or(HubErr::RoomNotFound)?;
        self.room_reply(room_name, state, with_name)
    }

    fn leave_previous(&mut self, conn: ConnId, previous: Option<String>, next: &str) {
        if let Some(prev) = previous.filter(|p| p != next) {
            self.depart(conn, &prev);
        }
    }

    /// Roster removal plus notices; a room that is already gone needs nothing.
    fn depart(&mut self, conn: ConnId, room: &str) {
        let Some(dep) = self.registry.remove_member(room, conn) else { return };
        self.broadcast_roster(room);
        if dep.was_host {
            info!(%conn, room, "host left");
            self.append_system_notice(room, format!("host {} left", dep.username));
        } else {
            self.append_system_notice(room, format!("{} left", dep.username));
        }
    }
}
