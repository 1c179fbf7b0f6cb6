use tracing::info;

use super::Hub;
use crate::{
    error::{require, HubErr},
    state::{ConnId, Session},
};

impl Hub {
    /// Grants the host role if `secret` matches the shared host credential.
    /// Any room the connection was in is left first.
    pub fn authenticate_host(&mut self, conn: ConnId, username: &str, secret: &str) -> Result<(), HubErr> {
        require(username, "username")?;
        require(secret, "hostSecret")?;
        if secret != self.options.host_secret {
            return Err(HubErr::InvalidCredential);
        }
        self.leave_bound_room(conn);
        self.set_session(conn, Session::HostIdle { username: username.into() });
        info!(%conn, username, "host authenticated");
        Ok(())
    }

    /// Username of an authenticated host, bound or not.
    pub(super) fn host_identity(&self, conn: ConnId) -> Result<String, HubErr> {
        match self.sessions.get(&conn) {
            Some(Session::HostIdle { username }) | Some(Session::HostBound { username, .. }) => {
                Ok(username.clone())
            }
            _ => Err(HubErr::Forbidden("host login required")),
        }
    }

    pub(super) fn set_session(&mut self, conn: ConnId, session: Session) {
        // a connection that already closed must not be resurrected
        if let Some(slot) = self.sessions.get_mut(&conn) {
            *slot = session;
        }
    }

    /// Session after losing its room: hosts keep the role, viewers start over.
    pub(super) fn unbind(&mut self, conn: ConnId) {
        let next = match self.sessions.get(&conn) {
            Some(Session::HostBound { username, .. }) => Session::HostIdle { username: username.clone() },
            Some(Session::ViewerBound { .. }) => Session::Unbound,
            _ => return,
        };
        self.set_session(conn, next);
    }
}
