pub mod api;
pub mod cache;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod frame_index;
mod lenient;
pub mod payload;
pub mod playback;
pub mod poller;
pub mod render;
pub mod snapshot;
pub mod types;
