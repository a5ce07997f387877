use std::{fmt::Display, net::{IpAddr, SocketAddr}, time::Duration};

use log::{debug, error, info, warn};
use net::PacketState;

pub struct ServerLogger;

impl ServerLogger {
    pub fn preparing_socket(address: &str) {
        info!("Preparing socket {}", address);
    }

    pub fn rate_limited(ip: &IpAddr) {
        debug!("Rate-limited {ip}");
    }

    pub fn tcp_nodelay_failed(err: &std::io::Error) {
        error!("Failed to set TCP_NODELAY: {err}");
    }

    pub fn new_connection(address: &SocketAddr) {
        info!("New connection {}", address);
    }

    pub fn handshake_completed(elapsed_ms: u64, next_state: &str) {
        debug!(
            "Handshake completed in {}ms, next state: {}",
            elapsed_ms, next_state
        );
    }

    pub fn phase_changed(addr: &SocketAddr, from: PacketState, to: PacketState) {
        debug!("{addr}: {} -> {}", from.label(), to.label());
    }

    pub fn player_joined(addr: &SocketAddr, username: &str, entity_id: i32) {
        info!("{username} joined from {addr} as entity {entity_id}");
    }

    pub fn player_left(username: &str) {
        info!("{username} left the game");
    }

    pub fn protocol_violation(addr: &SocketAddr, err: &dyn Display) {
        warn!("Protocol violation from {addr}: {err}");
    }

    pub fn connection_closed(addr: &SocketAddr, err: &dyn Display) {
        debug!("Connection {addr} closed: {err}");
    }

    pub fn connection_error(client: &SocketAddr, err: &dyn Display) {
        if dotenvy::var("DO_NOT_LOG_CONNECTION_ERROR").is_ok() {
            return;
        }
        error!("connection error@{client}: {}", err);
    }

    pub fn disconnect_warning(addr: &SocketAddr, reason: &str) {
        warn!("Disconnecting client {addr}: {reason}");
    }

    pub fn disconnect_failure(addr: &SocketAddr, err: &dyn Display) {
        debug!("Failed to send disconnect to {addr}: {err}");
    }

    pub fn outbound_overflow(addr: &SocketAddr) {
        warn!("Outbound queue full for {addr}, closing session");
    }

    pub fn writer_failed(addr: &SocketAddr, err: &dyn Display) {
        debug!("Writer for {addr} stopped: {err}");
    }

    pub fn keep_alive_missed(addr: &SocketAddr, waited: Duration) {
        warn!("{addr} did not answer keep-alive within {:?}", waited);
    }

    pub fn click_rejected(username: &str, window: u8, slot: i16, err: &dyn Display) {
        debug!("Click by {username} on window {window} slot {slot} rejected: {err}");
    }

    pub fn broadcast_failed(session: u64, err: &dyn Display) {
        debug!("Broadcast to session {session} dropped: {err}");
    }

    pub fn despawn_failed(err: &dyn Display) {
        warn!("Could not announce despawned items: {err}");
    }

    pub fn deadline_missed(stage: &str, duration: Duration, client: &SocketAddr) {
        warn!(
            "Deadline exceeded while {stage} (limit {:?}) client={client}",
            duration
        );
    }
}
