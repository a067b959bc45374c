//! PaperVox application library.
//!
//! The binary in `main.rs` is a thin shell over [`runtime::run`]; everything
//! with behavior worth testing lives here, most of it in [`playback`].

pub mod config;
pub mod playback;
pub mod runtime;
pub mod telemetry;
