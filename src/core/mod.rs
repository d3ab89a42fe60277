pub mod config;
pub mod error;
pub mod frame;
pub mod launcher;
pub mod network;
pub mod port;
pub mod registry;
pub mod scheduler;
pub mod status;
pub mod time;
pub mod transport;
pub mod types;
