//! Game host access
//!
//! The bridge needs two things from the running game server: whether a
//! player is connected, and a way to run a command with console privilege.
//! `GameHost` is that seam; `RconHost` implements it over RCON.

mod rcon;
mod traits;

pub use rcon::{RconConfig, RconHost};
pub use traits::{GameHost, HostError};
