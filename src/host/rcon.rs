//! RCON implementation of the game host
//!
//! Connects lazily, logs in with the RCON password, and drops the
//! connection after any failure so the next call starts fresh.

use super::traits::{GameHost, HostError};
use crate::config::BridgeConfig;
use async_trait::async_trait;
use shopbridge_shared::codec::{self, packet_type, FrameDecoder, Packet, AUTH_FAILED_ID};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// Command used to list connected players
const LIST_COMMAND: &str = "list";

/// Reply prefixes the server uses for commands it could not run
const UNKNOWN_COMMAND_PREFIXES: [&str; 2] = ["Unknown command", "Unknown or incomplete command"];

/// Connection settings for an RCON host
#[derive(Debug, Clone)]
pub struct RconConfig {
    /// RCON endpoint, e.g. 127.0.0.1:25575
    pub address: String,
    pub password: String,
    pub connect_timeout: Duration,
    /// Bound on a single login or command exchange
    pub request_timeout: Duration,
}

impl RconConfig {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            address: config.host.rcon_address.clone(),
            password: config.host.rcon_password.clone(),
            connect_timeout: config.host_connect_timeout(),
            request_timeout: config.http_timeout(),
        }
    }
}

/// An authenticated RCON stream
struct RconConnection {
    stream: TcpStream,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl RconConnection {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    async fn send(&mut self, packet: &Packet) -> Result<(), HostError> {
        let encoded = codec::encode(packet)?;
        self.stream.write_all(&encoded).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Packet, HostError> {
        loop {
            if let Some(packet) = self.decoder.decode_next()? {
                return Ok(packet);
            }
            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(HostError::Closed);
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    /// Log in; the server may send an empty response value before the auth reply
    async fn login(&mut self, request_id: i32, password: &str) -> Result<(), HostError> {
        self.send(&Packet::login(request_id, password)).await?;
        loop {
            let reply = self.recv().await?;
            if reply.request_id == AUTH_FAILED_ID {
                return Err(HostError::AuthFailed);
            }
            if reply.kind == packet_type::AUTH_RESPONSE && reply.request_id == request_id {
                return Ok(());
            }
        }
    }

    /// Run one command and return the reply body
    async fn exec(&mut self, request_id: i32, command: &str) -> Result<String, HostError> {
        self.send(&Packet::command(request_id, command)).await?;
        loop {
            let reply = self.recv().await?;
            if reply.request_id == request_id && reply.kind == packet_type::RESPONSE_VALUE {
                return Ok(reply.body);
            }
        }
    }
}

/// Game host reached over RCON
pub struct RconHost {
    config: RconConfig,
    connection: Option<RconConnection>,
    next_request_id: i32,
}

impl RconHost {
    pub fn new(config: RconConfig) -> Self {
        Self {
            config,
            connection: None,
            next_request_id: 0,
        }
    }

    fn next_request_id(&mut self) -> i32 {
        // Stay positive; -1 is reserved for auth failures
        self.next_request_id = self.next_request_id.checked_add(1).unwrap_or(1);
        self.next_request_id
    }

    async fn connect(&mut self) -> Result<RconConnection, HostError> {
        let stream = timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.address),
        )
        .await
        .map_err(|_| HostError::Timeout(self.config.connect_timeout))??;

        let mut connection = RconConnection::new(stream);
        let request_id = self.next_request_id();
        timeout(
            self.config.request_timeout,
            connection.login(request_id, &self.config.password),
        )
        .await
        .map_err(|_| HostError::Timeout(self.config.request_timeout))??;

        info!("Connected to game host at {}", self.config.address);
        Ok(connection)
    }

    /// Run a command, reconnecting first if needed
    pub async fn exec(&mut self, command: &str) -> Result<String, HostError> {
        let mut connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.connect().await?,
        };

        let request_id = self.next_request_id();
        let result = timeout(self.config.request_timeout, connection.exec(request_id, command))
            .await
            .map_err(|_| HostError::Timeout(self.config.request_timeout))
            .and_then(|r| r);

        match result {
            Ok(body) => {
                self.connection = Some(connection);
                Ok(body)
            }
            Err(e) => {
                debug!("Dropping game host connection: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl GameHost for RconHost {
    async fn is_online(&mut self, user: &str) -> Result<bool, HostError> {
        let reply = self.exec(LIST_COMMAND).await?;
        Ok(online_players(&reply)
            .iter()
            .any(|name| name.eq_ignore_ascii_case(user)))
    }

    async fn dispatch_command(&mut self, command: &str) -> Result<bool, HostError> {
        let reply = self.exec(command).await?;
        debug!("Host reply to '{}': {}", command, reply);
        Ok(!is_unknown_command(&reply))
    }

    fn name(&self) -> &'static str {
        "RCON"
    }
}

/// Parse the player names out of a `list` reply.
///
/// `There are 2 of a max of 20 players online: Steve, Alex`
pub fn online_players(reply: &str) -> Vec<&str> {
    match reply.split_once(':') {
        Some((_, names)) => names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

fn is_unknown_command(reply: &str) -> bool {
    let reply = reply.trim_start();
    UNKNOWN_COMMAND_PREFIXES
        .iter()
        .any(|prefix| reply.starts_with(prefix))
}
