pub mod codec;
pub mod config;
pub mod events;
pub mod sessions;
