//! Core library for the portico server entry point.
//!
//! The binary resolves its first argument against a registry of lifecycle
//! commands ([`dispatch`], [`commands`]). Background starts are confirmed
//! with the loopback pingback handshake in [`pingback`], and running servers
//! are stopped through the admin endpoint in [`server`].

pub mod build_info;
pub mod cli;
pub mod commands;
pub mod dispatch;
pub mod logging;
pub mod pingback;
pub mod server;

#[cfg(test)]
mod test_helpers;
