//! Room table plus its two lookup indices (watch password → room, host connection → room).
//! The indices are only ever touched from inside this file.

use std::collections::HashMap;

use crate::{
    error::{require, HubErr},
    state::{ConnId, Room, CHAT_HISTORY_CAP},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClaim {
    /// `joinRoomAsHost`: an empty slot can be taken by any host.
    Join,
    /// `reconnectHost`: only the room's sticky host username may bind.
    Reconnect,
}

/// Connection that lost the host slot to a newer connection of the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBinding {
    pub displaced: Option<ConnId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub username: String,
    pub was_host: bool,
}

pub struct Registry {
    rooms: HashMap<String, Room>,
    by_password: HashMap<String, String>,
    by_host: HashMap<ConnId, String>,
    chat_capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(CHAT_HISTORY_CAP)
    }
}

impl Registry {
    pub fn new(chat_capacity: usize) -> Self {
        Registry {
            rooms: HashMap::new(),
            by_password: HashMap::new(),
            by_host: HashMap::new(),
            chat_capacity,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Room in which `conn` currently holds the host slot.
    pub fn host_room_of(&self, conn: ConnId) -> Option<&str> {
        self.by_host.get(&conn).map(String::as_str)
    }

    pub fn create_room(
        &mut self,
        name: &str,
        watch_password: &str,
        conn: ConnId,
        username: &str,
    ) -> Result<&Room, HubErr> {
        require(name, "roomName")?;
        require(watch_password, "watchPassword")?;
        if self.rooms.contains_key(name) {
            return Err(HubErr::NameTaken(name.into()));
        }
        if self.by_password.contains_key(watch_password) {
            return Err(HubErr::PasswordTaken);
        }

        let mut room = Room::new(name, watch_password, self.chat_capacity);
        room.host = Some(conn);
        room.host_username = username.into();
        room.add_member(conn, username);

        self.by_password.insert(watch_password.into(), name.into());
        self.by_host.insert(conn, name.into());
        Ok(&*self.rooms.entry(name.into()).or_insert(room))
    }

    pub fn bind_host(
        &mut self,
        name: &str,
        conn: ConnId,
        username: &str,
        claim: HostClaim,
    ) -> Result<HostBinding, HubErr> {
        let room = self.rooms.get_mut(name).ok_or(HubErr::RoomNotFound)?;
        if claim == HostClaim::Reconnect && room.host_username != username {
            return Err(HubErr::IdentityMismatch(name.into()));
        }

        let displaced = match room.host {
            Some(current) if current != conn => {
                if room.member_name(current) != Some(username) {
                    return Err(HubErr::HostSlotOccupied(name.into()));
                }
                Some(current)
            }
            _ => None,
        };

        let mut except = vec![conn];
        except.extend(displaced);
        if room.name_taken(username, &except) {
            return Err(HubErr::NameConflict(username.into()));
        }

        if let Some(old) = displaced {
            room.remove_member(old);
            self.by_host.remove(&old);
        }
        room.host = Some(conn);
        room.add_member(conn, username);
        self.by_host.insert(conn, name.into());
        Ok(HostBinding { displaced })
    }

    /// Resolves the room through the password index. Returns the room name.
    pub fn join_as_viewer(
        &mut self,
        watch_password: &str,
        username: &str,
        conn: ConnId,
    ) -> Result<String, HubErr> {
        require(username, "username")?;
        require(watch_password, "watchPassword")?;
        let name = self.by_password.get(watch_password).cloned().ok_or(HubErr::RoomNotFound)?;
        self.add_viewer(&name, username, conn)?;
        Ok(name)
    }

    pub fn add_viewer(&mut self, name: &str, username: &str, conn: ConnId) -> Result<(), HubErr> {
        require(username, "username")?;
        let room = self.rooms.get_mut(name).ok_or(HubErr::RoomNotFound)?;
        if room.name_taken(username, &[conn]) {
            return Err(HubErr::NameConflict(username.into()));
        }
        if room.is_host(conn) {
            room.host = None;
            self.by_host.remove(&conn);
        }
        room.add_member(conn, username);
        Ok(())
    }

    /// Drops `conn` from the room's roster, vacating the host slot if it held it.
    /// A missing room or member is already clean and yields `None`.
    pub fn remove_member(&mut self, name: &str, conn: ConnId) -> Option<Departure> {
        let room = self.rooms.get_mut(name)?;
        let username = room.remove_member(conn)?;
        let was_host = room.is_host(conn);
        if was_host {
            room.host = None;
            if self.by_host.get(&conn).map(String::as_str) == Some(name) {
                self.by_host.remove(&conn);
            }
        }
        Some(Departure { username, was_host })
    }

    /// Removes the room and both index entries. Only the current host may do this.
    pub fn destroy_room(&mut self, name: &str, requester: ConnId) -> Result<Room, HubErr> {
        if self.host_room_of(requester) != Some(name) {
            return Err(HubErr::Forbidden("only the room's host can destroy it"));
        }
        let room = self.rooms.remove(name).ok_or(HubErr::RoomNotFound)?;
        self.by_password.remove(&room.watch_password);
        if let Some(host) = room.host {
            self.by_host.remove(&host);
        }
        self.by_host.remove(&requester);
        Ok(room)
    }

    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (password, name) in &self.by_password {
            let room = self.rooms.get(name).expect("password index points at a live room");
            assert_eq!(&room.watch_password, password);
        }
        assert_eq!(self.by_password.len(), self.rooms.len());
        for (conn, name) in &self.by_host {
            let room = self.rooms.get(name).expect("host index points at a live room");
            assert_eq!(room.host, Some(*conn));
            assert!(room.member_name(*conn).is_some());
        }
        for room in self.rooms.values() {
            if let Some(host) = room.host {
                assert_eq!(self.by_host.get(&host), Some(&room.name));
            }
            let mut names = room.usernames();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), room.roster.len(), "duplicate username in {}", room.name);
        }
    }
}
