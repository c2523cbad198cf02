//! MinMod music (MNM) export

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::driver_constants::{
    minmod_fields, mnm_opcodes, MAX_WAIT_TICKS, MINMOD_DUMP_PREFIX, MNM_CHANNEL_TABLE_OFFSET,
    MNM_FILE_SIZE_OFFSET, MNM_IDENT,
};
use crate::data::SystemKind;
use crate::engine::PlaybackEngine;
use crate::errors::ExportError;
use crate::mns::save_mns;
use crate::walker::{SongWalker, TickEvent};
use crate::writer::ExportWriter;

use std::collections::BTreeMap;

use log::info;

/// `x - 1` for positive `x`, packing signed small deltas without wasting
/// the zero code.
fn ofs(x: i32) -> i32 {
    if x > 0 {
        x - 1
    } else {
        x
    }
}

/// Classification band of an opcode.  A wait boundary must precede any
/// command batch that opens on a band greater than the band the previous
/// batch closed on.
fn cmd_range(op: u8) -> u8 {
    match op {
        0x00..=0x0f => op,
        0x10..=0x1f => 0x1f,
        0x20..=0x2f => 0x2f,
        0x30..=0x3f => 0x3f,
        0x40..=0x7f => 0x7f,
        0x80..=0xbf => 0xbf,
        0xc0..=0xff => 0xff,
    }
}

/// Split a wait run into `1..=64` tick chunks, one byte each.
///
/// Returns true iff any bytes were written.  A zero-tick wait is
/// unencodable (`0xc0` already executes one tick) and writes nothing.
fn write_wait(w: &mut ExportWriter, ticks: u32) -> bool {
    if ticks == 0 {
        return false;
    }
    let mut remaining = ticks;
    while remaining > 0 {
        let chunk = remaining.min(MAX_WAIT_TICKS);
        w.write_u8(mnm_opcodes::WAIT_BASE + chunk as u8);
        remaining -= chunk;
    }
    true
}

fn encode_pitch(out: &mut Vec<Vec<u8>>, val: i32, last: i32, force: bool) {
    let dt = val - last;
    if dt == 0 && !force {
        return;
    }

    let mut dtl = dt & 0xff;
    let mut dth = (dt >> 8) & 0xff;
    if (dt >= 0 && dtl > 0x80) || (dt < 0 && dtl >= 0x80) {
        dtl -= 0x100;
        dth += 1;
    }
    if dth >= 0x80 {
        dth -= 0x100;
    }

    if dtl != 0 && dtl.abs() <= 0x20 && dth.abs() <= 0x20 && !force {
        out.push(vec![
            (i32::from(mnm_opcodes::PITCH_LOW_DELTA_BASE) + ofs(dtl)) as u8,
        ]);
        if dth != 0 {
            // the reference encoder offsets the high-byte code with the
            // low-byte delta
            out.push(vec![
                (i32::from(mnm_opcodes::PITCH_HIGH_DELTA_BASE) + ofs(dtl)) as u8,
            ]);
        }
    } else if (dtl != 0 && dth != 0) || force {
        out.push(vec![mnm_opcodes::SET_PITCH, val as u8, (val >> 8) as u8]);
    } else if dth == 0 {
        out.push(vec![mnm_opcodes::ADJUST_PITCH_LOW, (0x80 + ofs(dtl)) as u8]);
    } else {
        out.push(vec![mnm_opcodes::ADJUST_PITCH_HIGH, (0x80 + ofs(dth)) as u8]);
    }
}

fn encode_volume(out: &mut Vec<Vec<u8>>, new_l: i32, new_r: i32, last_l: i32, last_r: i32, force: bool) {
    if new_l == 0 && new_r == 0 {
        out.push(vec![mnm_opcodes::VOLUME_OFF]);
        return;
    }

    let dtl = new_l - last_l;
    let dtr = new_r - last_r;
    if dtl == 0 && dtr == 0 && !force {
        return;
    }

    if dtl.abs() <= 0x80 && dtr.abs() <= 0x80 && !force {
        if dtl == dtr {
            if dtl.abs() <= 8 {
                out.push(vec![
                    (i32::from(mnm_opcodes::VOL_LR_DELTA_BASE) + ofs(dtl)) as u8,
                ]);
            } else {
                out.push(vec![mnm_opcodes::ADJUST_VOLUME_BOTH, ofs(dtl) as u8]);
            }
        } else if dtl.abs() <= 8 && dtr.abs() <= 8 {
            if dtl != 0 {
                out.push(vec![
                    (i32::from(mnm_opcodes::VOL_L_DELTA_BASE) + ofs(dtl)) as u8,
                ]);
            }
            if dtr != 0 {
                out.push(vec![
                    (i32::from(mnm_opcodes::VOL_R_DELTA_BASE) + ofs(dtr)) as u8,
                ]);
            }
        } else {
            out.push(vec![
                mnm_opcodes::ADJUST_VOLUME_PAIR,
                ofs(dtl) as u8,
                ofs(dtr) as u8,
            ]);
        }
    } else {
        out.push(vec![
            mnm_opcodes::SET_VOLUME,
            new_l as u8,
            (new_l >> 8) as u8,
            new_r as u8,
            (new_r >> 8) as u8,
        ]);
    }
}

/// Values captured for one channel during one tick.
#[derive(Default, Clone, Copy)]
struct NewVals {
    pitch: Option<u16>,
    echo: Option<u16>,
    vol_l: Option<u16>,
    vol_r: Option<u16>,
    sample: Option<u16>,
    sample_off: Option<u16>,
}

/// Driver-visible channel state.  The force flags are set when the loop
/// anchor invalidates the state; each makes the next emission of its field
/// absolute.
#[derive(Clone, Copy)]
struct ChannelState {
    last_pitch: i32,
    last_vol_l: i32,
    last_vol_r: i32,
    last_sample: i32,
    last_echo: i32,
    force_pitch: bool,
    force_vol: bool,
    force_sample: bool,
    force_echo: bool,
}

impl ChannelState {
    fn initial() -> Self {
        Self {
            last_pitch: 0,
            last_vol_l: 0,
            last_vol_r: 0,
            last_sample: -1,
            last_echo: -1,
            force_pitch: false,
            force_vol: false,
            force_sample: false,
            force_echo: false,
        }
    }

    fn invalidate(&mut self) {
        self.force_pitch = true;
        self.force_vol = true;
        self.force_sample = true;
        self.force_echo = true;
    }
}

/// Translates the MinMod dispatch's synthetic register writes
/// (`0xfffe_xxyy`) into per-tick encoded command lists.
struct MinModExtractor {
    system: usize,
    n_channels: usize,
    pattern_hints: bool,

    last_order: i32,
    state: Vec<ChannelState>,
    news: Vec<NewVals>,
    write_count: u64,

    commands: Vec<BTreeMap<u32, Vec<Vec<u8>>>>,
}

impl MinModExtractor {
    fn new(system: usize, n_channels: usize, pattern_hints: bool) -> Self {
        Self {
            system,
            n_channels,
            pattern_hints,
            last_order: 0,
            state: vec![ChannelState::initial(); n_channels],
            news: vec![NewVals::default(); n_channels],
            write_count: 0,
            commands: vec![BTreeMap::new(); n_channels],
        }
    }

    fn observe_tick<E: PlaybackEngine>(&mut self, engine: &mut E, ev: &TickEvent) {
        if ev.loop_anchor {
            for st in self.state.iter_mut() {
                st.invalidate();
            }
        }

        for n in self.news.iter_mut() {
            *n = NewVals::default();
        }

        let writes = std::mem::take(engine.register_writes(self.system));
        for w in &writes {
            if w.addr >> 16 != MINMOD_DUMP_PREFIX {
                continue;
            }
            let ch = ((w.addr >> 8) & 0xff) as usize;
            if ch >= self.n_channels {
                continue;
            }
            self.write_count += 1;
            let news = &mut self.news[ch];
            match (w.addr & 0xff) as u8 {
                minmod_fields::PITCH => news.pitch = Some(w.val),
                minmod_fields::ECHO => news.echo = Some(w.val),
                minmod_fields::VOL_L => news.vol_l = Some(w.val),
                minmod_fields::VOL_R => news.vol_r = Some(w.val),
                minmod_fields::SAMPLE => news.sample = Some(w.val),
                minmod_fields::SAMPLE_OFFSET => news.sample_off = Some(w.val),
                _ => (),
            }
        }

        for ch in 0..self.n_channels {
            let news = self.news[ch];
            let st = &mut self.state[ch];
            let mut cmds: Vec<Vec<u8>> = Vec::new();

            if ch == 0 && self.pattern_hints && ev.prev_order != self.last_order {
                cmds.push(vec![
                    mnm_opcodes::PATTERN_HINT,
                    ev.prev_row as u8,
                    ev.prev_order as u8,
                    0x00,
                    0xfe,
                ]);
            }

            if let Some(p) = news.pitch {
                encode_pitch(&mut cmds, i32::from(p), st.last_pitch, st.force_pitch);
                st.last_pitch = i32::from(p);
                st.force_pitch = false;
            }

            if news.vol_l.is_some() || news.vol_r.is_some() {
                let new_l = news.vol_l.map_or(st.last_vol_l, i32::from);
                let new_r = news.vol_r.map_or(st.last_vol_r, i32::from);
                encode_volume(&mut cmds, new_l, new_r, st.last_vol_l, st.last_vol_r, st.force_vol);
                st.last_vol_l = new_l;
                st.last_vol_r = new_r;
                st.force_vol = false;
            }

            if let Some(s) = news.sample {
                let s = i32::from(s);
                if !st.force_sample && s == st.last_sample && news.sample_off.is_none() {
                    cmds.push(vec![mnm_opcodes::RETRIGGER_SAMPLE]);
                } else if st.force_sample || s != st.last_sample {
                    cmds.push(vec![mnm_opcodes::SET_SAMPLE, s as u8, (s >> 8) as u8]);
                }
                st.last_sample = s;
                st.force_sample = false;
            }

            if let Some(off) = news.sample_off {
                let off = u32::from(off);
                cmds.push(vec![
                    mnm_opcodes::SET_SAMPLE_OFFSET,
                    off as u8,
                    (off >> 8) as u8,
                    (off >> 16) as u8,
                    (off >> 24) as u8,
                ]);
            }

            if let Some(e) = news.echo {
                let e = i32::from(e);
                if st.force_echo || e != st.last_echo {
                    cmds.push(vec![mnm_opcodes::SET_ECHO, e as u8]);
                }
                st.last_echo = e;
                st.force_echo = false;
            }

            if !cmds.is_empty() {
                self.commands[ch].insert(ev.tick, cmds);
            }
        }

        self.last_order = ev.prev_order;
    }
}

/// Export the MinMod pattern data into `w`.
///
/// Fails when the song has no MinMod system.
fn save_mnm_pattern<E: PlaybackEngine>(
    w: &mut ExportWriter,
    engine: &mut E,
    sys_to_export: Option<&[bool]>,
    loop_song: bool,
    pattern_hints: bool,
) -> Result<(), ExportError> {
    let base = w.tell();

    let (sys_index, n_channels) = {
        let song = engine.song();
        let found = song.systems.iter().enumerate().find(|(i, sys)| {
            let selected = match sys_to_export {
                Some(sel) => sel.get(*i).copied().unwrap_or(false),
                None => true,
            };
            selected && sys.kind == SystemKind::GbaMinMod
        });
        match found {
            Some((i, sys)) => (i, sys.channels()),
            None => return Err(ExportError::NoMinModSystem),
        }
    };
    let tick_rate = engine.cur_subsong().tick_rate;

    // walk the song
    let mut extractor = MinModExtractor::new(sys_index, n_channels, pattern_hints);
    let mut walker = SongWalker::begin(engine, vec![sys_index]);
    while let Some(ev) = walker.step() {
        extractor.observe_tick(walker.engine(), &ev);
    }
    let summary = walker.finish();
    info!("{} register writes total.", extractor.write_count);

    let loop_tick = if loop_song && !summary.stopped {
        summary.loop_tick
    } else {
        None
    };

    // header; lengths and pointers are back-patched below
    w.write_bytes(&MNM_IDENT);
    w.write_u8(n_channels as u8);
    w.write_u8(0); // reserved
    w.write_u32(0); // total file size
    w.write_u32(0); // begin length in ticks
    w.write_u32(0); // loop length in ticks
    w.write_u32(tick_rate); // 0 = vblank
    w.write_u32(0); // reserved
    for _ in 0..n_channels {
        w.write_u32(0); // start pointer
        w.write_u32(0); // loop pointer
    }

    let mut pointers = Vec::with_capacity(n_channels);
    for ch in 0..n_channels {
        let start_ptr = w.tell() - base;
        let mut loop_ptr = None;
        let mut last_tick: u32 = 0;
        let mut last_range: u8 = 0xff;
        let mut looped = false;

        for (&key, tick_cmds) in &extractor.commands[ch] {
            let mut cmds = tick_cmds.clone();
            cmds.sort_by_key(|c| c[0]);

            if !looped {
                if let Some(lt) = loop_tick {
                    if key >= lt {
                        write_wait(w, lt - last_tick);
                        loop_ptr = Some(w.tell() - base);
                        // the loop entry is a wait boundary
                        last_range = 0xff;
                        looped = true;
                        last_tick = lt;
                    }
                }
            }

            if write_wait(w, key - last_tick) {
                last_range = 0xff;
            }
            if let Some(first) = cmds.first() {
                // a wait boundary must precede an upward range step
                debug_assert!(cmd_range(first[0]) <= last_range);
            }
            for c in &cmds {
                w.write_bytes(c);
            }
            if let Some(last) = cmds.last() {
                last_range = cmd_range(last[0]);
            }
            last_tick = key;
        }

        write_wait(w, summary.total_ticks - last_tick);
        w.write_u8(mnm_opcodes::TERMINATOR);

        pointers.push((start_ptr, loop_ptr.unwrap_or(start_ptr)));
    }

    let end = w.tell() - base;
    let loop_tick_song = loop_tick.unwrap_or(0);

    w.seek(base + MNM_FILE_SIZE_OFFSET);
    w.write_u32(end as u32);
    w.write_u32(loop_tick_song);
    w.write_u32(summary.total_ticks - loop_tick_song);

    w.seek(base + MNM_CHANNEL_TABLE_OFFSET);
    for (start, loop_ptr) in pointers {
        w.write_u32(start as u32);
        w.write_u32(loop_ptr as u32);
    }
    w.seek_to_end();

    Ok(())
}

/// Export the song as a MinMod MNM file.
///
/// `export_type` selects the parts written: `2` suppresses the pattern,
/// `1` and `5` suppress the sample bank.
pub fn save_mnm<E: PlaybackEngine>(
    engine: &mut E,
    export_type: u8,
    sys_to_export: Option<&[bool]>,
    loop_song: bool,
    pattern_hints: bool,
) -> Result<ExportWriter, ExportError> {
    let save_pattern = export_type != 2;
    let save_samples = export_type != 1 && export_type != 5;

    let mut w = ExportWriter::new();
    if save_pattern {
        save_mnm_pattern(&mut w, engine, sys_to_export, loop_song, pattern_hints)?;
    }
    if save_samples {
        save_mns(&mut w, engine.song())?;
    }
    Ok(w)
}

#[cfg(test)]
mod test {
    use super::*;

    fn un_ofs(b: i32) -> i32 {
        if b >= 0 {
            b + 1
        } else {
            b
        }
    }

    #[test]
    fn test_ofs_round_trip() {
        for b in -0x20..0x20 {
            assert_eq!(ofs(un_ofs(b)), b);
        }
        assert_eq!(ofs(1), 0);
        assert_eq!(ofs(-1), -1);
        assert_eq!(ofs(0), 0);
    }

    #[test]
    fn test_cmd_range_bands() {
        assert_eq!(cmd_range(0x00), 0x00);
        assert_eq!(cmd_range(0x07), 0x07);
        assert_eq!(cmd_range(0x0f), 0x0f);
        assert_eq!(cmd_range(0x10), 0x1f);
        assert_eq!(cmd_range(0x1f), 0x1f);
        assert_eq!(cmd_range(0x28), 0x2f);
        assert_eq!(cmd_range(0x38), 0x3f);
        assert_eq!(cmd_range(0x60), 0x7f);
        assert_eq!(cmd_range(0xa0), 0xbf);
        assert_eq!(cmd_range(0xc0), 0xff);
        assert_eq!(cmd_range(0xff), 0xff);
    }

    #[test]
    fn test_wait_boundaries() {
        let mut w = ExportWriter::new();
        assert!(!write_wait(&mut w, 0));
        assert!(w.as_bytes().is_empty());

        assert!(write_wait(&mut w, 1));
        assert_eq!(w.as_bytes(), &[0xc0]);

        let mut w = ExportWriter::new();
        write_wait(&mut w, 64);
        assert_eq!(w.as_bytes(), &[0xff]);

        let mut w = ExportWriter::new();
        write_wait(&mut w, 65);
        assert_eq!(w.as_bytes(), &[0xff, 0xc0]);

        let mut w = ExportWriter::new();
        write_wait(&mut w, 5);
        assert_eq!(w.as_bytes(), &[0xc4]);
    }

    #[test]
    fn test_pitch_high_byte_only() {
        let mut out = Vec::new();
        encode_pitch(&mut out, 0x0100, 0, false);
        assert_eq!(out, vec![vec![0x0d, 0x80]]);
    }

    #[test]
    fn test_pitch_short_delta_boundary() {
        let mut out = Vec::new();
        encode_pitch(&mut out, 0x20, 0, false);
        assert_eq!(out, vec![vec![0x60 + 0x1f]]);

        let mut out = Vec::new();
        encode_pitch(&mut out, 0x21, 0, false);
        assert_eq!(out, vec![vec![0x0c, 0x80 + 0x20]]);

        let mut out = Vec::new();
        encode_pitch(&mut out, -0x20 + 100, 100, false);
        assert_eq!(out, vec![vec![0x60 - 0x20]]);
    }

    #[test]
    fn test_pitch_short_delta_high_code_uses_low_delta() {
        // dt = 0x0105: dtl = 5, dth = 1, both codes offset by ofs(dtl)
        let mut out = Vec::new();
        encode_pitch(&mut out, 0x0105, 0, false);
        assert_eq!(out, vec![vec![0x60 + 4], vec![0xa0 + 4]]);
    }

    #[test]
    fn test_pitch_absolute() {
        // both deltas non-zero and wide
        let mut out = Vec::new();
        encode_pitch(&mut out, 0x1234, 0x0591, false);
        assert_eq!(out, vec![vec![0x07, 0x34, 0x12]]);

        // force always selects the absolute form
        let mut out = Vec::new();
        encode_pitch(&mut out, 0x0001, 0, true);
        assert_eq!(out, vec![vec![0x07, 0x01, 0x00]]);
    }

    #[test]
    fn test_pitch_negative_low_delta() {
        // 120 -> 50: dt = -70, low byte form
        let mut out = Vec::new();
        encode_pitch(&mut out, 50, 120, false);
        assert_eq!(out, vec![vec![0x0c, 0x80 - 70]]);
    }

    #[test]
    fn test_pitch_unchanged_is_silent() {
        let mut out = Vec::new();
        encode_pitch(&mut out, 77, 77, false);
        assert!(out.is_empty());
    }

    #[test]
    fn test_volume_off_ignores_last_state() {
        let mut out = Vec::new();
        encode_volume(&mut out, 0, 0, 0, 0, false);
        assert_eq!(out, vec![vec![0x0e]]);

        let mut out = Vec::new();
        encode_volume(&mut out, 0, 0, 100, 50, false);
        assert_eq!(out, vec![vec![0x0e]]);
    }

    #[test]
    fn test_volume_equal_deltas() {
        let mut out = Vec::new();
        encode_volume(&mut out, 13, 13, 8, 8, false);
        assert_eq!(out, vec![vec![0x38 + 4]]);

        let mut out = Vec::new();
        encode_volume(&mut out, 100, 100, 50, 50, false);
        assert_eq!(out, vec![vec![0x0b, 49]]);
    }

    #[test]
    fn test_volume_short_pair() {
        let mut out = Vec::new();
        encode_volume(&mut out, 10, 4, 8, 8, false);
        assert_eq!(out, vec![vec![0x18 + 1], vec![0x28 - 4]]);

        // one side unchanged emits a single code
        let mut out = Vec::new();
        encode_volume(&mut out, 10, 8, 8, 8, false);
        assert_eq!(out, vec![vec![0x18 + 1]]);
    }

    #[test]
    fn test_volume_wide_pair() {
        let mut out = Vec::new();
        encode_volume(&mut out, 100, 8, 8, 9, false);
        assert_eq!(out, vec![vec![0x08, 91, 0xff]]);
    }

    #[test]
    fn test_volume_absolute() {
        let mut out = Vec::new();
        encode_volume(&mut out, 0x180, 0x20, 0, 0, false);
        assert_eq!(out, vec![vec![0x06, 0x80, 0x01, 0x20, 0x00]]);

        let mut out = Vec::new();
        encode_volume(&mut out, 5, 5, 5, 5, true);
        assert_eq!(out, vec![vec![0x06, 5, 0, 5, 0]]);
    }
}
