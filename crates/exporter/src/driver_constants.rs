//! Sound-driver constants

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

// These values MUST match the playback drivers.

/// Identifier and version of a MinMod music (MNM) file.
pub const MNM_IDENT: [u8; 10] = [
    0xd1, 0x4d, 0x69, 0x6e, 0x4d, 0x6f, 0x64, 0x4d, // identifier
    0x01, 0x00, // version
];

/// Identifier and version of a MinMod sample bank (MNS) file.
pub const MNS_IDENT: [u8; 10] = [
    0xd1, 0x4d, 0x69, 0x6e, 0x4d, 0x6f, 0x64, 0x53, // identifier
    0x01, 0x00, // version
];

pub const PAD: [u8; 32] = [0; 32];

// MNM header layout
pub const MNM_FILE_SIZE_OFFSET: usize = 0x0c;
pub const MNM_BEGIN_TICKS_OFFSET: usize = 0x10;
pub const MNM_LOOP_TICKS_OFFSET: usize = 0x14;
pub const MNM_TICK_RATE_OFFSET: usize = 0x18;
pub const MNM_CHANNEL_TABLE_OFFSET: usize = 0x20;
pub const MNM_BYTES_PER_CHANNEL_POINTER: usize = 8;

pub const DEFAULT_MINMOD_CHANNELS: u32 = 16;
pub const MAX_MINMOD_CHANNELS: u8 = 16;

// MNS header layout
pub const MNS_FILE_SIZE_OFFSET: usize = 0x0c;
pub const MNS_SAMPLE_TABLE_OFFSET: usize = 0x20;
pub const MNS_BYTES_PER_SAMPLE_HEADER: usize = 0x18;

/// Unlooped samples are padded with this many bytes of looped silence.
pub const SILENCE_TAIL_BYTES: usize = 32;

/// `pitchBase = log2(centerRate) * PITCH_BASE_SCALE`
pub const PITCH_BASE_SCALE: f64 = 786432.0;

/// A wait opcode executes `1..=MAX_WAIT_TICKS` ticks.
pub const MAX_WAIT_TICKS: u32 = 64;

// Using lower case to match command names in the MinMod driver source code.
pub mod mnm_opcodes {
    // opcodes 0x00 - 0x0f are multi-byte commands, range is the opcode itself

    pub const PATTERN_HINT: u8 = 0x03;
    pub const SET_SAMPLE_OFFSET: u8 = 0x05;
    pub const SET_VOLUME: u8 = 0x06;
    pub const SET_PITCH: u8 = 0x07;
    pub const ADJUST_VOLUME_PAIR: u8 = 0x08;
    pub const SET_SAMPLE: u8 = 0x09;
    pub const SET_ECHO: u8 = 0x0a;
    pub const ADJUST_VOLUME_BOTH: u8 = 0x0b;
    pub const ADJUST_PITCH_LOW: u8 = 0x0c;
    pub const ADJUST_PITCH_HIGH: u8 = 0x0d;
    pub const VOLUME_OFF: u8 = 0x0e;
    pub const RETRIGGER_SAMPLE: u8 = 0x0f;

    // 0x10 - 0x3f: packed volume deltas
    pub const VOL_L_DELTA_BASE: u8 = 0x18;
    pub const VOL_R_DELTA_BASE: u8 = 0x28;
    pub const VOL_LR_DELTA_BASE: u8 = 0x38;

    // 0x40 - 0xbf: packed pitch deltas
    pub const PITCH_LOW_DELTA_BASE: u8 = 0x60;
    pub const PITCH_HIGH_DELTA_BASE: u8 = 0xa0;

    // 0xc0 - 0xff: waits, `0xbf + n` executes `n` ticks
    pub const WAIT_BASE: u8 = 0xbf;

    /// Trailing sentinel wait, executes the residual song duration.
    pub const TERMINATOR: u8 = 0xff;
}

// DevSound driver values

pub const DSX_NOTE_NAMES: [&str; 12] = [
    "C_", "C#", "D_", "D#", "E_", "F_", "F#", "G_", "G#", "A_", "A#", "B_",
];

/// Pattern note sentinel for a key-off, and its `pitchSet` encoding.
pub const NOTE_OFF: i32 = 3 << 28;
/// Pattern note sentinels 101/102 map to a release, encoded as `2 << 28`.
pub const NOTE_RELEASE: i32 = 2 << 28;

/// GB wave-channel volume map: tracker volume 0-15 to hardware level bits.
pub const GB_VOL_MAP: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, //
    0x60, 0x60, 0x60, 0x60, //
    0x40, 0x40, 0x40, 0x40, //
    0x20, 0x20, 0x20, 0x20, //
];

// Synthetic register-dump addresses of the GB PCM channel
pub const GB_PCM_INS_ADDR: u32 = 0xfffe0200;
pub const GB_PCM_VOL_ADDR: u32 = 0xfffe0201;
pub const GB_PCM_SAMPLE_OFFSET_ADDR: u32 = 0xfffe0202;

// MinMod synthetic register-dump namespace: `0xfffe_xxyy`, `xx` is the
// channel, `yy` selects the field.
pub const MINMOD_DUMP_PREFIX: u32 = 0xfffe;

pub mod minmod_fields {
    pub const PITCH: u8 = 0;
    pub const ECHO: u8 = 1;
    pub const VOL_L: u8 = 2;
    pub const VOL_R: u8 = 3;
    pub const SAMPLE: u8 = 4;
    pub const SAMPLE_OFFSET: u8 = 5;
}
