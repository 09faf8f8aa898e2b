pub mod config;
pub mod event;
pub mod sdp;
pub mod signaling;
pub mod version;
