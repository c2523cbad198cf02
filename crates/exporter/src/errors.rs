//! A single location for all of the errors in the exporters

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::fmt::Display;
use std::io;

#[derive(Debug)]
pub enum DeserializeError {
    OpenError(String, io::Error),
    SerdeError(String, serde_json::error::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    ChannelCountOutOfRange(u32),
    NoChannelCount,
    SpeedOutOfRange(u32),
    NoSpeed,
}

#[derive(Debug, PartialEq)]
pub enum SongDataError {
    NoSystems,
    NoSubSongs,
    EmptySpeedVector(usize),
    InvalidSpeed(usize, ValueError),
    OrderTableChannelMismatch { expected: usize, got: usize },
    EffectColumnsChannelMismatch { expected: usize, got: usize },
    PatternIndexOutOfRange { channel: usize, order: usize, pattern: usize },
    EmptyWavetable(usize),
    MacroTooLong { instrument: usize, len: usize },
    SampleLoopOutOfRange { sample: usize, loop_start: usize, loop_end: usize, length: usize },
    InvalidChannelFlags(usize, ValueError),
}

#[derive(Debug)]
pub struct SongDataErrors(pub Vec<SongDataError>);

#[derive(Debug)]
pub enum ExportError {
    /// MNM export requires a MinMod system in the song.
    NoMinModSystem,
    FmtError(std::fmt::Error),
}

impl From<std::fmt::Error> for ExportError {
    fn from(e: std::fmt::Error) -> Self {
        Self::FmtError(e)
    }
}

impl Display for DeserializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenError(filename, e) => write!(f, "Unable to open {}: {}", filename, e),
            Self::SerdeError(filename, e) => write!(f, "Unable to read {}: {}", filename, e),
        }
    }
}

impl Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for SongDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for SongDataErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} errors in song data:", self.0.len())?;
        for e in &self.0 {
            writeln!(f, "  {}", e)?;
        }
        Ok(())
    }
}

impl Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMinModSystem => write!(f, "Song does not contain a MinMod system"),
            Self::FmtError(e) => write!(f, "Formatting error: {}", e),
        }
    }
}
