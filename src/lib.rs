//! pixeldrive: virtual compositing and device output for addressable
//! LED installations.
//!
//! Logical strips ("virtuals") run pluggable pixel generators; a frame
//! scheduler ticks them at a target rate, maps their output onto
//! physical device regions through segments, and per-device workers
//! encode and push the frames over UDP or serial.

pub mod audio;
pub mod color;
pub mod device;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod packets;
pub mod scenes;
pub mod store;
pub mod transport;
pub mod types;
pub mod utils;
pub mod virtuals;

pub use engine::{EngineError, EngineHandle};
pub use events::PipelineEvent;
