//! Change-event extraction for the DevSound exporter

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::driver_constants::{
    GB_PCM_INS_ADDR, GB_PCM_SAMPLE_OFFSET_ADDR, GB_PCM_VOL_ADDR, NOTE_OFF, NOTE_RELEASE,
};
use crate::engine::PlaybackEngine;
use crate::walker::TickEvent;

use std::collections::{BTreeMap, BTreeSet};

/// DevSound tracks four PSG channels, the GB PCM channel (4) and up to
/// three PCM DAC channels (5-7).
pub const N_DEVSOUND_CHANNELS: usize = 8;

/// Channel 4: the GB PCM channel, shared with PSG channel 2.
pub const GB_PCM_CHANNEL: usize = 4;

/// A sparse per-key change record.  Only the fields that changed since the
/// last emitted record are present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelCommand {
    pub key_on: Option<bool>,
    pub vol: Option<i32>,
    pub pitch_change: Option<i32>,
    pub ins: Option<i32>,
    pub wait: Option<i32>,
    pub pitch_set: Option<i32>,
    pub sample_offset: Option<i32>,
    pub slide: Option<i32>,
    pub speed1: Option<u8>,
    pub speed2: Option<u8>,
}

impl ChannelCommand {
    fn is_empty(&self) -> bool {
        *self == ChannelCommand::default()
    }
}

/// Values seen this tick, before delta filtering.
#[derive(Debug, Clone, Copy, Default)]
struct NewState {
    note: Option<i32>,
    vol: Option<i32>,
    ins: Option<i32>,
    slide: Option<i32>,
    sample_offset: Option<i32>,
    speed1: Option<u8>,
    speed2: Option<u8>,
}

/// The running fingerprint used to suppress redundant events.  `None`
/// fields never compare equal, forcing the next event to be absolute;
/// that is how the loop anchor invalidates channel state.
#[derive(Debug, Clone, Copy)]
struct LastState {
    pitch: Option<i32>,
    ins: Option<i32>,
    vol: Option<i32>,
    slide: Option<i32>,
}

impl LastState {
    fn initial() -> Self {
        Self {
            pitch: None,
            ins: None,
            vol: Some(15),
            slide: Some(0),
        }
    }

    fn invalidated() -> Self {
        Self {
            pitch: None,
            ins: None,
            vol: None,
            slide: None,
        }
    }
}

/// Per-tick observer translating register dumps and pattern rows into keyed
/// change events.  PSG channels (0-3) are keyed by row, PCM channels (4-7)
/// by tick.
pub struct DevSoundExtractor {
    gb_system: Option<usize>,
    gb_first_chan: usize,
    fx_cols: [u8; 4],

    s4_active: bool,
    /// Interns used sample indices into dense 0-based stream indices.
    pub s4_map: Vec<usize>,

    pub pulse_ins: BTreeSet<i32>,
    pub wave_ins: BTreeSet<i32>,

    last: [LastState; N_DEVSOUND_CHANNELS],
    news: [NewState; N_DEVSOUND_CHANNELS],
    last_speed1: u8,
    last_speed2: u8,

    pub commands: [BTreeMap<u32, ChannelCommand>; N_DEVSOUND_CHANNELS],
}

impl DevSoundExtractor {
    pub fn new(
        gb_system: Option<usize>,
        gb_first_chan: usize,
        fx_cols: [u8; 4],
        speed1: u8,
        speed2: u8,
    ) -> Self {
        Self {
            gb_system,
            gb_first_chan,
            fx_cols,
            s4_active: false,
            s4_map: Vec::new(),
            pulse_ins: BTreeSet::new(),
            wave_ins: BTreeSet::new(),
            last: [LastState::initial(); N_DEVSOUND_CHANNELS],
            news: [NewState::default(); N_DEVSOUND_CHANNELS],
            last_speed1: speed1,
            last_speed2: speed2,
            commands: std::array::from_fn(|_| BTreeMap::new()),
        }
    }

    pub fn observe_tick<E: PlaybackEngine>(&mut self, engine: &mut E, ev: &TickEvent) {
        if ev.loop_anchor {
            for l in self.last.iter_mut() {
                *l = LastState::invalidated();
            }
        }

        // PCM clears every tick
        for n in self.news[GB_PCM_CHANNEL..].iter_mut() {
            *n = NewState::default();
        }

        let gb_system = match self.gb_system {
            Some(s) => s,
            None => return,
        };

        self.observe_pcm_writes(engine, gb_system, ev.tick);

        if ev.new_row {
            self.observe_pattern_row(engine, ev);
        }
    }

    fn observe_pcm_writes<E: PlaybackEngine>(&mut self, engine: &mut E, system: usize, tick: u32) {
        let writes = std::mem::take(engine.register_writes(system));
        for w in &writes {
            match w.addr {
                GB_PCM_INS_ADDR => {
                    self.news[GB_PCM_CHANNEL].ins = Some(i32::from(w.val));
                    self.s4_active = w.val > 0;
                }
                GB_PCM_VOL_ADDR => self.news[GB_PCM_CHANNEL].vol = Some(i32::from(w.val)),
                GB_PCM_SAMPLE_OFFSET_ADDR => {
                    self.news[GB_PCM_CHANNEL].sample_offset = Some(i32::from(w.val))
                }
                _ => (),
            }
        }

        let news = self.news[GB_PCM_CHANNEL];
        let last = &mut self.last[GB_PCM_CHANNEL];
        let mut cmd = ChannelCommand::default();

        if let Some(ins) = news.ins {
            let key_on = ins > 0;
            cmd.key_on = Some(key_on);
            if key_on {
                let sample = (ins - 1) as usize;
                let idx = match self.s4_map.iter().position(|&s| s == sample) {
                    Some(i) => i,
                    None => {
                        self.s4_map.push(sample);
                        self.s4_map.len() - 1
                    }
                };
                if last.ins != Some(idx as i32) {
                    cmd.ins = Some(idx as i32);
                }
                last.ins = Some(idx as i32);
            } else {
                cmd.ins = Some(0);
            }
        }
        if let Some(vol) = news.vol {
            if last.vol != Some(vol) {
                cmd.vol = Some(vol);
                last.vol = Some(vol);
            }
        }
        if let Some(off) = news.sample_offset {
            cmd.sample_offset = Some(off);
        }

        if !cmd.is_empty() {
            self.commands[GB_PCM_CHANNEL].insert(tick, cmd);
        }
    }

    fn observe_pattern_row<E: PlaybackEngine>(&mut self, engine: &mut E, ev: &TickEvent) {
        for i in 0..4 {
            // channel 2 is stolen while sample playback is active
            if i == 2 && self.s4_active {
                continue;
            }

            let ch = i + self.gb_first_chan;
            let subsong = engine.cur_subsong();
            let cell = match subsong
                .pattern(ch, ev.prev_order as usize)
                .and_then(|p| p.rows.get(ev.prev_row as usize))
            {
                Some(c) => c.clone(),
                None => continue,
            };

            if cell.note == 100 {
                self.news[i].note = Some(NOTE_OFF);
            } else if cell.note == 101 || cell.note == 102 {
                self.news[i].note = Some(NOTE_RELEASE);
            } else if cell.note != 0 || cell.octave != 0 {
                self.news[i].note = Some(i32::from(cell.note) + i32::from(cell.octave) * 12);
            }
            if cell.instrument >= 0 {
                self.news[i].ins = Some(i32::from(cell.instrument));
            }
            if cell.volume >= 0 {
                self.news[i].vol = Some(i32::from(cell.volume));
            }
            for &(fx, fx_val) in cell.effects.iter().take(usize::from(self.fx_cols[i])) {
                let fx_val = (if fx_val == -1 { 0 } else { fx_val }) & 255;
                match fx {
                    // slide up / slide down / portamento
                    0x01 | 0x02 | 0x03 => {
                        self.news[i].slide = Some(i32::from(fx_val) | (i32::from(fx) << 8));
                    }
                    // 0x09 and 0x0f are handled separately due to complex groove handling
                    _ => (),
                }
            }

            if i == 0 {
                self.detect_speed_change(engine.speeds());
            }

            let news = self.news[i];
            let last = &mut self.last[i];
            let mut cmd = ChannelCommand::default();

            if let Some(note) = news.note {
                if last.pitch != Some(note) {
                    cmd.pitch_set = Some(note);
                    last.pitch = Some(note);
                }
            }
            if let Some(ins) = news.ins {
                if last.ins != Some(ins) {
                    if i == 2 {
                        self.wave_ins.insert(ins);
                    } else {
                        self.pulse_ins.insert(ins);
                    }
                    cmd.ins = Some(ins);
                    last.ins = Some(ins);
                }
            }
            if let Some(vol) = news.vol {
                if last.vol != Some(vol) {
                    cmd.vol = Some(vol);
                    last.vol = Some(vol);
                }
            }
            if let Some(slide) = news.slide {
                let changed = match last.slide {
                    Some(l) => ((slide & 0xff) != 0 || (l & 0xff) != 0) && slide != l,
                    None => true,
                };
                if changed {
                    cmd.slide = Some(slide);
                    last.slide = Some(slide);
                }
            }
            if news.speed1.is_some() {
                cmd.speed1 = news.speed1;
                cmd.speed2 = news.speed2;
            }

            if !cmd.is_empty() {
                self.commands[i].insert(ev.row, cmd);
            }
            self.news[i] = NewState::default();
        }
    }

    fn detect_speed_change(&mut self, speeds: &[u8]) {
        if let Some(&s1) = speeds.first() {
            if s1 != self.last_speed1 {
                self.last_speed1 = s1;
                if speeds.len() < 2 {
                    self.last_speed2 = s1;
                }
                self.news[0].speed1 = Some(self.last_speed1);
                self.news[0].speed2 = Some(self.last_speed2);
            }
        }
        if speeds.len() >= 2 && speeds[1] != self.last_speed2 {
            self.last_speed2 = speeds[1];
            self.news[0].speed1 = Some(self.last_speed1);
            self.news[0].speed2 = Some(self.last_speed2);
        }
    }
}
