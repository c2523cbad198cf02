//! Scripted playback engine and song builders shared by the exporter tests

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use exporter::data::{
    Pattern, PatternCell, Song, SubSong, SystemConfig, SystemFlags, SystemKind,
};
use exporter::engine::{LoopPoint, PlaybackEngine, RegWrite};

/// Engine state after one `next_tick`, plus the register writes the
/// dispatches produced while processing it.
pub struct EngineTick {
    pub order: i32,
    pub row: i32,
    pub ticks: i32,
    pub writes: Vec<(usize, u32, u16)>,
    pub set_speeds: Option<Vec<u8>>,
}

impl EngineTick {
    pub fn new(order: i32, row: i32, ticks: i32) -> Self {
        Self {
            order,
            row,
            ticks,
            writes: Vec::new(),
            set_speeds: None,
        }
    }
}

/// Generate the engine tick timeline of a straight pattern playback.
///
/// The engine position always points at the next row to fetch, and the
/// tick counter counts down from `speed` to 1 within a row; a row is
/// fetched on the tick after the counter reaches 1.
pub fn pattern_script(n_orders: usize, rows_per_order: usize, speed: i32) -> Vec<EngineTick> {
    assert!(speed >= 1);
    let mut out = Vec::new();
    let mut order = 0i32;
    let mut row = 0i32;
    for _ in 0..(n_orders * rows_per_order) {
        row += 1;
        if row >= rows_per_order as i32 {
            row = 0;
            order += 1;
        }
        out.push(EngineTick::new(order, row, speed));
        for t in 1..speed {
            out.push(EngineTick::new(order, row, speed - t));
        }
    }
    out
}

/// A deterministic `PlaybackEngine` driven by a pre-scripted timeline.
pub struct ScriptedEngine {
    pub song: Song,
    loop_point: LoopPoint,
    script: Vec<EngineTick>,

    pos: usize,
    playing: bool,
    halts: bool,
    order: i32,
    row: i32,
    ticks: i32,
    speeds: Vec<u8>,
    queues: Vec<Vec<RegWrite>>,
    dump: Vec<bool>,
    chan_map: Vec<usize>,
}

impl ScriptedEngine {
    pub fn new(song: Song, loop_order: i32, loop_row: i32, script: Vec<EngineTick>) -> Self {
        let chan_map = song
            .systems
            .iter()
            .enumerate()
            .flat_map(|(i, s)| std::iter::repeat(i).take(s.channels()))
            .collect();
        let n_systems = song.systems.len();
        let speeds = song.subsongs[0].speeds.clone();
        Self {
            song,
            loop_point: LoopPoint {
                order: loop_order,
                row: loop_row,
                end: 0,
            },
            script,
            pos: 0,
            playing: false,
            halts: false,
            order: 0,
            row: 0,
            ticks: 1,
            speeds,
            queues: vec![Vec::new(); n_systems],
            dump: vec![false; n_systems],
            chan_map,
        }
    }

    /// Attach a register write to the given script tick.
    pub fn write_at(&mut self, tick: usize, system: usize, addr: u32, val: u16) {
        self.script[tick].writes.push((system, addr, val));
    }

    pub fn script_mut(&mut self, tick: usize) -> &mut EngineTick {
        &mut self.script[tick]
    }

    /// Make playback halt at the end of the script (`FFxx`-style song end)
    /// instead of looping back.
    pub fn halt_at_end(&mut self) {
        self.halts = true;
    }
}

impl PlaybackEngine for ScriptedEngine {
    fn song(&self) -> &Song {
        &self.song
    }

    fn cur_subsong_index(&self) -> usize {
        0
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn set_repeat_pattern(&mut self, _repeat: bool) {}

    fn set_order(&mut self, _order: u16) {}

    fn walk_song(&mut self) -> LoopPoint {
        self.loop_point
    }

    fn play_sub(&mut self, _preserve_drift: bool) {
        self.pos = 0;
        self.playing = true;
        self.order = 0;
        self.row = 0;
        self.ticks = 1;
        self.speeds = self.song.subsongs[0].speeds.clone();
        for q in &mut self.queues {
            q.clear();
        }
    }

    fn next_tick(&mut self) -> bool {
        if self.pos >= self.script.len() {
            if self.halts {
                self.playing = false;
            }
            return true;
        }
        let t = &self.script[self.pos];
        self.order = t.order;
        self.row = t.row;
        self.ticks = t.ticks;
        if let Some(sp) = &t.set_speeds {
            self.speeds = sp.clone();
        }
        for &(sys, addr, val) in &t.writes {
            if self.dump[sys] {
                self.queues[sys].push(RegWrite::new(addr, val));
            }
        }
        self.pos += 1;
        false
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn cur_order(&self) -> i32 {
        self.order
    }

    fn cur_row(&self) -> i32 {
        self.row
    }

    fn ticks(&self) -> i32 {
        self.ticks
    }

    fn speeds(&self) -> &[u8] {
        &self.speeds
    }

    fn tempo_accum(&self) -> i32 {
        0
    }

    fn virtual_tempo_n(&self) -> i32 {
        150
    }

    fn virtual_tempo_d(&self) -> i32 {
        150
    }

    fn dispatch_of_chan(&self, channel: usize) -> usize {
        self.chan_map[channel]
    }

    fn toggle_register_dump(&mut self, system: usize, enabled: bool) {
        self.dump[system] = enabled;
    }

    fn register_writes(&mut self, system: usize) -> &mut Vec<RegWrite> {
        &mut self.queues[system]
    }
}

pub fn empty_pattern(n_rows: usize) -> Pattern {
    Pattern {
        rows: vec![PatternCell::default(); n_rows],
    }
}

/// A GB song with one order and empty patterns on all four channels.
pub fn gb_song(n_rows: usize, speeds: Vec<u8>) -> Song {
    Song {
        name: "test".to_string(),
        author: String::new(),
        album: String::new(),
        systems: vec![SystemConfig {
            kind: SystemKind::Gb,
            flags: SystemFlags::default(),
        }],
        subsongs: vec![SubSong {
            name: String::new(),
            speeds,
            tick_rate: 0,
            orders: vec![vec![0]; 4],
            patterns: vec![vec![Some(empty_pattern(n_rows))]; 4],
            effect_columns: vec![1; 4],
        }],
        instruments: Vec::new(),
        wavetables: Vec::new(),
        samples: Vec::new(),
    }
}

/// A MinMod song; patterns are irrelevant to the MNM exporter.
pub fn minmod_song(channels: u32) -> Song {
    let n = channels as usize;
    Song {
        name: "test".to_string(),
        author: String::new(),
        album: String::new(),
        systems: vec![SystemConfig {
            kind: SystemKind::GbaMinMod,
            flags: SystemFlags {
                channels: Some(channels),
            },
        }],
        subsongs: vec![SubSong {
            name: String::new(),
            speeds: vec![1],
            tick_rate: 0,
            orders: vec![vec![0]; n],
            patterns: vec![vec![None]; n],
            effect_columns: vec![1; n],
        }],
        instruments: Vec::new(),
        wavetables: Vec::new(),
        samples: Vec::new(),
    }
}

/// MinMod synthetic dump address for `(channel, field)`.
pub fn minmod_addr(channel: u8, field: u8) -> u32 {
    0xfffe0000 | (u32::from(channel) << 8) | u32::from(field)
}
