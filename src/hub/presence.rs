use super::Hub;
use crate::{
    proto::Output,
    state::{now_millis, ChatRecord, ConnId},
};

impl Hub {
    /// Sends the current username list to every member of the room.
    pub fn broadcast_roster(&self, room: &str) {
        if let Some(r) = self.registry.get(room) {
            self.send_room(room, Output::RosterUpdate(r.usernames()), None);
        }
    }

    /// Appends to the sender's room history and echoes to the whole room,
    /// sender included. Only unbound senders are ignored.
    pub fn post_chat_message(&mut self, conn: ConnId, text: &str) {
        let Some(session) = self.sessions.get(&conn) else { return };
        let (Some(room), Some(name), Some(role)) = (session.room(), session.username(), session.role())
        else {
            return;
        };
        let record = ChatRecord {
            sender_name: name.to_owned(),
            sender_role: role,
            sender_connection_id: Some(conn),
            text: text.to_owned(),
            timestamp: now_millis(),
        };
        let room = room.to_owned();
        self.append_chat(&room, record);
    }

    pub fn append_system_notice(&mut self, room: &str, text: impl Into<String>) {
        self.append_chat(room, ChatRecord::system(text));
    }

    fn append_chat(&mut self, room: &str, record: ChatRecord) {
        let Some(r) = self.registry.get_mut(room) else { return };
        r.chat.push(record.clone());
        self.send_room(room, Output::ChatMessage(record), None);
    }
}
