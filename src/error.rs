use serde::Serialize;

pub type AppResult<T> = Result<T, AppErr>;

/// Errors that stop the process from starting or serving.
#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config: {0}")]
    Config(String),
}

/// Rejections produced by the room core. All of them travel back to the
/// caller as `{success: false, code, message}`; none of them is fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HubErr {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid host credential")]
    InvalidCredential,

    #[error("host identity does not match room {0}")]
    IdentityMismatch(String),

    #[error("room name {0} is taken")]
    NameTaken(String),

    #[error("watch password is already in use")]
    PasswordTaken,

    #[error("username {0} is already in the room")]
    NameConflict(String),

    #[error("room {0} already has a host")]
    HostSlotOccupied(String),

    #[error("room not found or wrong password")]
    RoomNotFound,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    Auth,
    Conflict,
    NotFound,
    Permission,
}

impl HubErr {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HubErr::MissingField(_) => ErrorKind::Validation,
            HubErr::InvalidCredential | HubErr::IdentityMismatch(_) => ErrorKind::Auth,
            HubErr::NameTaken(_)
            | HubErr::PasswordTaken
            | HubErr::NameConflict(_)
            | HubErr::HostSlotOccupied(_) => ErrorKind::Conflict,
            HubErr::RoomNotFound => ErrorKind::NotFound,
            HubErr::Forbidden(_) => ErrorKind::Permission,
        }
    }
}

/* helper: every required string field goes through here */
pub fn require(value: &str, field: &'static str) -> Result<(), HubErr> {
    if value.trim().is_empty() {
        Err(HubErr::MissingField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(HubErr::MissingField("username").kind(), ErrorKind::Validation);
        assert_eq!(HubErr::IdentityMismatch("cinema".into()).kind(), ErrorKind::Auth);
        assert_eq!(HubErr::PasswordTaken.kind(), ErrorKind::Conflict);
        assert_eq!(HubErr::HostSlotOccupied("cinema".into()).kind(), ErrorKind::Conflict);
        assert_eq!(HubErr::RoomNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(HubErr::Forbidden("host only").kind(), ErrorKind::Permission);
    }

    #[test]
    fn require_rejects_blank() {
        assert_eq!(require("  ", "roomName"), Err(HubErr::MissingField("roomName")));
        assert!(require("cinema", "roomName").is_ok());
    }

    #[test]
    fn kind_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&ErrorKind::NotFound).unwrap(), "\"notFound\"");
    }
}
