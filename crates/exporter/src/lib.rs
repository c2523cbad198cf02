//! Tracker-to-driver exporters
//!
//! Compiles a playable song into sound-driver stream formats by walking a
//! deterministic virtual playback of it: DevSound assembler source (DSX)
//! for a GB-class PSG + PCM runtime, and MinMod music/sample-bank binaries
//! (MNM/MNS) for a GBA playback runtime.

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

mod value_newtypes;

pub mod data;
pub mod driver_constants;
pub mod dsx;
pub mod engine;
pub mod errors;
pub mod events;
pub mod mnm;
pub mod mns;
pub mod walker;
pub mod writer;

pub use dsx::save_dev_sound;
pub use engine::{LoopPoint, PlaybackEngine, RegWrite};
pub use errors::ExportError;
pub use mnm::save_mnm;
pub use mns::save_mns;
pub use value_newtypes::UnsignedValueNewType;
pub use writer::ExportWriter;
