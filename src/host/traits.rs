//! Host trait abstraction for pluggable game-server backends

use async_trait::async_trait;
use shopbridge_shared::codec::CodecError;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the game host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("authentication rejected by game host")]
    AuthFailed,

    #[error("game host did not answer within {0:?}")]
    Timeout(Duration),

    #[error("game host closed the connection")]
    Closed,
}

/// A live game server the bridge can query and command.
///
/// Methods take `&mut self`: a host is owned by exactly one main execution
/// context, which serialises every call.
#[async_trait]
pub trait GameHost: Send {
    /// Whether `user` is currently connected (exact name, case-insensitive)
    async fn is_online(&mut self, user: &str) -> Result<bool, HostError>;

    /// Run `command` with console privilege; `Ok(false)` if the host rejected it
    async fn dispatch_command(&mut self, command: &str) -> Result<bool, HostError>;

    /// Human-readable name for this host backend
    fn name(&self) -> &'static str;
}
