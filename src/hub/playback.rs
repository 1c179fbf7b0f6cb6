use super::Hub;
use crate::{
    error::HubErr,
    proto::{MediaOutput, Output},
    state::{now_millis, ConnId, EffectiveState, PlaybackState, Session, ViewerReport},
};

enum Media<'a> {
    Video(&'a str),
    Subtitle(&'a str),
}

impl Hub {
    pub fn host_set_video(&mut self, conn: ConnId, url: &str) -> Result<(), HubErr> {
        self.host_set_media(conn, Media::Video(url))
    }

    pub fn host_set_subtitle(&mut self, conn: ConnId, url: &str) -> Result<(), HubErr> {
        self.host_set_media(conn, Media::Subtitle(url))
    }

    fn host_set_media(&mut self, conn: ConnId, media: Media<'_>) -> Result<(), HubErr> {
        let name = self.hosted_room(conn)?;
        let room = self.registry.get_mut(&name).ok_or(HubErr::RoomNotFound)?;
        match media {
            Media::Video(url) => {
                room.video_url = url.into();
                // a new video starts paused at zero; old viewer positions no longer apply
                room.playback = PlaybackState::default();
                room.latest_viewer_report = None;
            }
            Media::Subtitle(url) => room.subtitle_url = url.into(),
        }
        let update = MediaOutput { video_url: room.video_url.clone(), subtitle_url: room.subtitle_url.clone() };
        self.send_room(&name, Output::MediaUpdate(update), None);
        Ok(())
    }

    /// Overwrites the authoritative state and pushes it to everyone but the host.
    pub fn host_set_playback_state(&mut self, conn: ConnId, state: PlaybackState) -> Result<(), HubErr> {
        let name = self.hosted_room(conn)?;
        let room = self.registry.get_mut(&name).ok_or(HubErr::RoomNotFound)?;
        room.playback = state;
        self.send_room(&name, Output::PlaybackUpdate(state), Some(conn));
        Ok(())
    }

    /// Stores a viewer's observed position. Never broadcast.
    pub fn viewer_report_state(&mut self, conn: ConnId, state: PlaybackState) -> Result<(), HubErr> {
        let Some(Session::ViewerBound { room, .. }) = self.sessions.get(&conn) else {
            return Err(HubErr::Forbidden("only viewers report playback"));
        };
        let room = self.registry.get_mut(room).ok_or(HubErr::RoomNotFound)?;
        room.latest_viewer_report = Some(ViewerReport { state, last_updated_at: now_millis() });
        Ok(())
    }

    /// Asks every viewer of the room to report its position right away.
    pub fn request_viewer_report_refresh(&self, room: &str, host: ConnId) {
        self.send_room(room, Output::RequestViewerState, Some(host));
    }

    pub fn current_playback_state(&self, conn: ConnId) -> Option<EffectiveState> {
        let room = self.registry.get(self.sessions.get(&conn)?.room()?)?;
        Some(room.playback.into())
    }

    pub fn latest_viewer_report(&self, conn: ConnId) -> Option<EffectiveState> {
        let room = self.registry.get(self.sessions.get(&conn)?.room()?)?;
        room.latest_viewer_report.map(EffectiveState::from)
    }

    fn hosted_room(&self, conn: ConnId) -> Result<String, HubErr> {
        self.registry
            .host_room_of(conn)
            .map(str::to_owned)
            .ok_or(HubErr::Forbidden("host only"))
    }
}
