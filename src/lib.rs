//! Server core for a block-world multiplayer game: sessions, the phase
//! machine, container state and broadcast fan-out.
pub mod broadcast;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod inventory;
pub mod logging;
pub mod metrics;
pub mod player;
pub mod registry;
pub mod server;
pub mod telemetry;
pub mod threat;
pub mod world;
