use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use crate::{
    error::{AppErr, AppResult},
    state::CHAT_HISTORY_CAP,
};

const DEFAULT_HOST_PASSWORD: &str = "123456";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_FRAME: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host_secret: String,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub static_dir: PathBuf,
    pub chat_capacity: usize,
    pub max_frame_bytes: usize,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        Ok(Config {
            host_secret: lookup("HOST_PASSWORD").unwrap_or_else(|| DEFAULT_HOST_PASSWORD.into()),
            bind_addr: parse(&lookup, "BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse(&lookup, "PORT", DEFAULT_PORT)?,
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "public".into()).into(),
            chat_capacity: parse(&lookup, "CHAT_HISTORY_CAP", CHAT_HISTORY_CAP)?,
            max_frame_bytes: parse(&lookup, "MAX_FRAME_BYTES", DEFAULT_MAX_FRAME)?,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppErr::Config(format!("{key}={raw}: {e}"))),
    }
}
