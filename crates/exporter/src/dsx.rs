//! DevSound assembler export

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::data::{Instrument, InstrumentKind, InstrumentMacro, MacroKind, SystemKind};
use crate::driver_constants::{DSX_NOTE_NAMES, GB_VOL_MAP, NOTE_OFF, NOTE_RELEASE};
use crate::engine::PlaybackEngine;
use crate::errors::ExportError;
use crate::events::{ChannelCommand, DevSoundExtractor, GB_PCM_CHANNEL};
use crate::walker::SongWalker;
use crate::writer::ExportWriter;

use std::fmt::Write;

const CH_NAMES: [&str; 4] = ["4A", "8A", "8B", "8C"];

/// Deduplicated macro table.  Append-only; labels reference entries by
/// dense index.  Lookup is a linear scan, the table stays small.
struct MacroTableEntry {
    values: Vec<i32>,
    loop_pos: Option<usize>,
    rel_pos: Option<usize>,
    wave_flag: bool,
    is_pitch: bool,
}

struct MacroLabels {
    label: String,
    label_r: Option<String>,
    is_new: bool,
}

fn write_macro_label(
    w_ins: &mut ExportWriter,
    tables: &mut Vec<MacroTableEntry>,
    mac: &InstrumentMacro,
    base_label: &str,
    is_wave: bool,
) -> Option<MacroLabels> {
    if mac.is_empty() {
        return None;
    }

    let is_pitch = mac.kind == MacroKind::Pitch;
    let found = tables.iter().position(|v| {
        v.values.len() == mac.len()
            && v.loop_pos == mac.loop_pos
            && v.rel_pos == mac.rel_pos
            && v.wave_flag == is_wave
            && v.is_pitch == is_pitch
            && v.values == mac.values
    });

    let idx = found.unwrap_or(tables.len());
    let label = format!("{}_T{}", base_label, idx);
    let label_r = mac.has_release().then(|| format!("{}R", label));

    if found.is_some() {
        return Some(MacroLabels {
            label,
            label_r,
            is_new: false,
        });
    }

    tables.push(MacroTableEntry {
        values: mac.values.clone(),
        loop_pos: mac.loop_pos,
        rel_pos: mac.rel_pos,
        wave_flag: is_wave,
        is_pitch,
    });
    w_ins.write_text(&label);
    w_ins.write_text(":");

    Some(MacroLabels {
        label,
        label_r,
        is_new: true,
    })
}

/// Run-length encode a non-pitch macro body.  Runs of a value repeat
/// `speed` ticks per step; runs longer than 2 become `val, seq_wait, n-2`
/// chunks, split at 255.
fn write_macro(
    w: &mut ExportWriter,
    mac: &InstrumentMacro,
    label_r: &str,
    is_wave: bool,
) -> std::fmt::Result {
    let mut last_val = mac.values[0];
    let mut last_cnt = i64::from(mac.delay);
    let mut had_loop = false;

    if mac.loop_pos != Some(0) {
        w.write_text("\n    db ");
    }

    let mut write_macro_val = |w: &mut ExportWriter, i: usize, end: bool| -> std::fmt::Result {
        if mac.values[i] != last_val || end {
            if last_cnt > 0 {
                let mut val = (last_val & 0xff) as u8;
                if is_wave && mac.kind == MacroKind::Volume {
                    val = GB_VOL_MAP[usize::from(val & 15)];
                }
                write!(w, "{}", val)?;
                if last_cnt == 2 {
                    write!(w, ",{}", val)?;
                } else if last_cnt > 2 {
                    while last_cnt > 0 {
                        let cnt = last_cnt.min(255);
                        if cnt == 1 {
                            write!(w, ",{}", val)?;
                        } else {
                            write!(w, ",seq_wait,{}", cnt - 2)?;
                        }
                        last_cnt -= cnt;
                    }
                }
                if !end {
                    w.write_text(",");
                }
            }
            last_val = mac.values[i];
            if mac.kind == MacroKind::Arpeggio && (last_val & 0x40000000) != 0 {
                last_val |= 0x80;
            }
            last_cnt = if end { 0 } else { i64::from(mac.speed) };
        } else {
            last_cnt += i64::from(mac.speed);
        }
        Ok(())
    };

    for i in 0..mac.len() {
        let mut nl = false;
        if mac.rel_pos == Some(i) {
            if had_loop {
                write_macro_val(w, i, true)?;
            } else {
                write_macro_val(w, i, true)?;
                w.write_text("\n:\n    db ");
                write_macro_val(w, i, true)?;
            }
            write!(w, "\n    db seq_loop,(:- -@)-1\n{}:", label_r)?;
            had_loop = false;
            nl = true;
        }
        if mac.loop_pos == Some(i) {
            write_macro_val(w, i, true)?;
            w.write_text("\n:");
            had_loop = true;
            nl = true;
        }
        if nl {
            w.write_text("\n    db ");
        }
        write_macro_val(w, i, false)?;
    }
    write_macro_val(w, 0, true)?;
    if had_loop {
        w.write_text("\n    db seq_loop,(:- -@)-1\n");
    } else {
        w.write_text(",seq_end\n");
    }
    Ok(())
}

fn write_pitch_macro(
    w: &mut ExportWriter,
    mac: &InstrumentMacro,
    label_r: &str,
) -> std::fmt::Result {
    let mut had_loop = false;

    // The tracker applies the first macro value before the delay; the
    // DevSound driver does not.  Unroll the delay when the first value
    // is non-zero.
    if mac.delay > 0 && mac.values[0] != 0 {
        w.write_text("\n    db 0");
        for _ in 0..mac.delay {
            write!(w, ",{}", mac.values[0] & 0xff)?;
        }
    } else {
        write!(w, "\n    db {}", mac.delay)?;
    }

    for i in 0..mac.len() {
        let mut nl = false;
        let val = mac.values[i] & 0xff;
        if mac.rel_pos == Some(i) {
            if !had_loop {
                write!(w, "\n:\n    db {}", val)?;
            }
            write!(w, "\n    db pitch_loop,(:- -@)-1\n{}:", label_r)?;
            had_loop = false;
            nl = true;
        }
        if mac.loop_pos == Some(i) {
            w.write_text("\n:");
            had_loop = true;
            nl = true;
        }
        if nl {
            w.write_text("\n    db ");
        } else {
            w.write_text(",");
        }
        write!(w, "{}", val)?;
        for _ in 1..mac.speed {
            write!(w, ",{}", val)?;
        }
    }
    if had_loop {
        w.write_text("\n    db pitch_loop,(:- -@)-1\n");
    } else {
        w.write_text(",pitch_end\n");
    }
    Ok(())
}

fn write_instrument(
    w: &mut ExportWriter,
    w_ins: &mut ExportWriter,
    tables: &mut Vec<MacroTableEntry>,
    ins: &Instrument,
    idx: i32,
    base_label: &str,
    is_wave: bool,
) -> std::fmt::Result {
    if ins.kind != InstrumentKind::Gb {
        return Ok(());
    }

    let mut vol_label = String::from("DSX_DummyTable");
    let mut arp_label = String::from("DSX_DummyTable");
    let mut wave_label = String::from("DSX_DummyTable");
    let mut pitch_label = String::from("DSX_DummyPitch");
    let mut vol_r_label = String::from("0");
    let mut arp_r_label = String::from("0");
    let mut wave_r_label = String::from("0");
    let mut pitch_r_label = String::from("0");

    let mut alt_vol_macro = InstrumentMacro::empty(MacroKind::Volume);
    alt_vol_macro.values = vec![i32::from(ins.initial_env_volume)];

    let vol_macro = match &ins.volume_macro {
        Some(m) if !m.is_empty() => m.clone(),
        _ => alt_vol_macro,
    };
    let arp_macro = ins.macro_or_empty(MacroKind::Arpeggio);
    let wave_macro = if is_wave {
        ins.macro_or_empty(MacroKind::Wave)
    } else {
        ins.macro_or_empty(MacroKind::Duty)
    };
    let pitch_macro = ins.macro_or_empty(MacroKind::Pitch);

    if let Some(l) = write_macro_label(w_ins, tables, &vol_macro, base_label, is_wave) {
        vol_label = l.label;
        if let Some(r) = l.label_r {
            vol_r_label = r;
        }
        if l.is_new {
            write_macro(w_ins, &vol_macro, &vol_r_label, is_wave)?;
        }
    }
    if let Some(l) = write_macro_label(w_ins, tables, &arp_macro, base_label, is_wave) {
        arp_label = l.label;
        if let Some(r) = l.label_r {
            arp_r_label = r;
        }
        if l.is_new {
            write_macro(w_ins, &arp_macro, &arp_r_label, is_wave)?;
        }
    }
    if let Some(l) = write_macro_label(w_ins, tables, &wave_macro, base_label, is_wave) {
        wave_label = l.label;
        if let Some(r) = l.label_r {
            wave_r_label = r;
        }
        if l.is_new {
            write_macro(w_ins, &wave_macro, &wave_r_label, is_wave)?;
        }
    }
    if let Some(l) = write_macro_label(w_ins, tables, &pitch_macro, base_label, is_wave) {
        pitch_label = l.label;
        if let Some(r) = l.label_r {
            pitch_r_label = r;
        }
        if l.is_new {
            write_pitch_macro(w_ins, &pitch_macro, &pitch_r_label)?;
        }
    }

    // ins header
    write!(
        w,
        "{}_I{}{}: ; {}\n",
        base_label,
        if is_wave { "W" } else { "" },
        idx,
        ins.name
    )?;
    write!(
        w,
        "    dw {},{},{},{}\n    dw {},{},{},{}\n",
        vol_label,
        arp_label,
        wave_label,
        pitch_label,
        vol_r_label,
        arp_r_label,
        wave_r_label,
        pitch_r_label
    )?;
    Ok(())
}

/// Emit the pending structural commands followed by one
/// `note`/`wait`/`rest`/`release` covering `rows` rows, splitting at 256.
fn write_psg_cmd(
    w: &mut ExportWriter,
    cmd: &mut ChannelCommand,
    mut rows: i64,
    base_label: &str,
    is_wave: bool,
) -> std::fmt::Result {
    while rows > 0 {
        let val = rows.min(256);
        if let Some(s1) = cmd.speed1 {
            write!(w, "    sound_set_speed {},{}\n", s1, cmd.speed2.unwrap_or(0))?;
        }
        if let Some(ins) = cmd.ins {
            write!(
                w,
                "    sound_instrument {}_I{}{}\n",
                base_label,
                if is_wave { "W" } else { "" },
                ins
            )?;
        }
        if let Some(vol) = cmd.vol {
            write!(w, "    sound_volume {}\n", vol)?;
        }
        if let Some(slide) = cmd.slide {
            match slide >> 8 {
                1 => w.write_text("    sound_slide_up "),
                2 => w.write_text("    sound_slide_down "),
                _ => w.write_text("    sound_portamento "),
            }
            write!(w, "{}\n", slide & 0xff)?;
        }
        match cmd.pitch_set {
            None => w.write_text("    wait "),
            Some(NOTE_OFF) => w.write_text("    rest "),
            Some(NOTE_RELEASE) => w.write_text("    release "),
            Some(pitch) => {
                let oct = pitch.div_euclid(12);
                let note = pitch.rem_euclid(12) as usize;
                write!(w, "    note {},{},", DSX_NOTE_NAMES[note], oct)?;
            }
        }
        write!(w, "{}\n", val & 0xff)?;
        *cmd = ChannelCommand::default();
        rows -= val;
    }
    Ok(())
}

/// Emit one packed PCM record: a bitmask byte followed by the present
/// fields.  The wait byte is folded into the record when the tick delta
/// differs from the previous wait.
fn write_samp_cmd(
    w: &mut ExportWriter,
    cmd: &mut ChannelCommand,
    last_wait: &mut i64,
    mut new_wait: i64,
) -> std::fmt::Result {
    while new_wait > 0 {
        let val = new_wait.min(256);
        if *last_wait != val {
            cmd.wait = Some(new_wait as i32);
            *last_wait = val;
        }

        let mut nbuf = [0u8; 9];
        let mut nlen = 1;
        if let Some(v) = cmd.sample_offset {
            nbuf[0] |= 1 << 6;
            nbuf[nlen] = v as u8;
            nbuf[nlen + 1] = (v >> 8) as u8;
            nlen += 2;
        }
        if let Some(v) = cmd.pitch_set {
            nbuf[0] |= 1 << 5;
            nbuf[nlen] = v as u8;
            nbuf[nlen + 1] = (v >> 8) as u8;
            nlen += 2;
        }
        if let Some(v) = cmd.wait {
            nbuf[0] |= 1 << 4;
            nbuf[nlen] = v as u8;
            nlen += 1;
        }
        if let Some(v) = cmd.ins {
            nbuf[0] |= 1 << 3;
            nbuf[nlen] = v as u8;
            nlen += 1;
        }
        if let Some(v) = cmd.pitch_change {
            nbuf[0] |= 1 << 2;
            nbuf[nlen] = v as u8;
            nlen += 1;
        }
        if let Some(v) = cmd.vol {
            nbuf[0] |= 1 << 1;
            nbuf[nlen] = v as u8;
            nlen += 1;
        }
        if cmd.key_on == Some(true) {
            nbuf[0] |= 1;
        }

        write!(w, "    db {}", nbuf[0])?;
        for b in &nbuf[1..nlen] {
            write!(w, ",{}", b)?;
        }
        w.write_text("\n");

        *cmd = ChannelCommand::default();
        new_wait -= val;
    }
    Ok(())
}

fn write_hexs(w: &mut ExportWriter, data: &[u8]) -> std::fmt::Result {
    if data.is_empty() {
        return Ok(());
    }
    for (i, b) in data.iter().enumerate() {
        if i & 15 == 0 {
            if i != 0 {
                w.write_text("\n");
            }
            write!(w, "    db ${:02x}", b)?;
        } else {
            write!(w, ",${:02x}", b)?;
        }
    }
    w.write_text("\n");
    Ok(())
}

/// Export the song as DevSound assembler source.
///
/// `sys_to_export` selects which systems participate (all when `None`).
/// PSG streams are row-quantized, PCM streams tick-quantized.
pub fn save_dev_sound<E: PlaybackEngine>(
    engine: &mut E,
    sys_to_export: Option<&[bool]>,
    base_label: &str,
) -> Result<ExportWriter, ExportError> {
    let mut gb_idx = None;
    let mut gdac_idx: Vec<usize> = Vec::new();
    let mut dump_systems: Vec<usize> = Vec::new();

    {
        let song = engine.song();
        for (i, sys) in song.systems.iter().enumerate() {
            if let Some(sel) = sys_to_export {
                if !sel.get(i).copied().unwrap_or(false) {
                    continue;
                }
            }
            match sys.kind {
                SystemKind::Gb => {
                    gb_idx = Some(i);
                    dump_systems.push(i);
                }
                SystemKind::PcmDac if gdac_idx.len() < 3 => {
                    gdac_idx.push(i);
                    dump_systems.push(i);
                }
                _ => (),
            }
        }
    }

    let mut gb_ch = 0;
    if let Some(gb) = gb_idx {
        while engine.dispatch_of_chan(gb_ch) != gb {
            gb_ch += 1;
        }
    }

    let subsong = engine.cur_subsong();
    let mut fx_cols = [0u8; 4];
    if gb_idx.is_some() {
        for (i, c) in fx_cols.iter_mut().enumerate() {
            *c = subsong.effect_columns.get(gb_ch + i).copied().unwrap_or(0);
        }
    }
    let speed1 = subsong.speed1();
    let speed2 = subsong.speed2();
    let subsong_name = subsong.name.clone();
    let subsong_index = engine.cur_subsong_index();
    let song_name = engine.song().name.clone();
    let song_author = engine.song().author.clone();
    let song_album = engine.song().album.clone();

    // walk the song
    let mut extractor = DevSoundExtractor::new(gb_idx, gb_ch, fx_cols, speed1, speed2);
    let mut walker = SongWalker::begin(engine, dump_systems);
    while let Some(ev) = walker.step() {
        extractor.observe_tick(walker.engine(), &ev);
    }
    let summary = walker.finish();

    let song = engine.song();
    let mut w = ExportWriter::new();

    write!(
        w,
        concat!(
            "; Generated by exporter v{}\n",
            "; Name:   {}\n",
            "; Author: {}\n",
            "; Album:  {}\n",
            "; Subsong #{}: {}\n\n",
            "{}:\n",
            "    db {},{}\n",
        ),
        env!("CARGO_PKG_VERSION"),
        song_name,
        song_author,
        song_album,
        subsong_index + 1,
        subsong_name,
        base_label,
        speed1,
        speed2
    )?;
    for i in 0..4 {
        if extractor.commands[i].is_empty() {
            w.write_text("    dw DSX_DummyChannel\n");
        } else {
            write!(w, "    dw {}_CH{}\n", base_label, i)?;
        }
    }

    // PSG channels
    for i in 0..4 {
        if extractor.commands[i].is_empty() {
            continue;
        }
        let is_wave = i == 2;
        let mut last_cmd = ChannelCommand::default();
        let mut last_row: i64 = 0;
        let mut looped = false;
        write!(w, "\n{}_CH{}:\n", base_label, i)?;
        for (&key, cmd) in &extractor.commands[i] {
            if !looped && !summary.stopped {
                if let Some(loop_row) = summary.loop_row {
                    if key >= loop_row {
                        write_psg_cmd(
                            &mut w,
                            &mut last_cmd,
                            i64::from(loop_row) - last_row,
                            base_label,
                            is_wave,
                        )?;
                        w.write_text(".loop\n");
                        last_row = loop_row.into();
                        looped = true;
                    }
                }
            }
            write_psg_cmd(
                &mut w,
                &mut last_cmd,
                i64::from(key) - last_row,
                base_label,
                is_wave,
            )?;
            last_row = key.into();
            last_cmd = *cmd;
        }
        write_psg_cmd(
            &mut w,
            &mut last_cmd,
            i64::from(summary.total_rows) - last_row,
            base_label,
            is_wave,
        )?;
        if summary.stopped || summary.loop_row.is_none() {
            w.write_text("    rest 1\n    sound_end\n");
        } else {
            w.write_text("    sound_jump .loop\n");
        }
    }

    // instruments
    let mut tables: Vec<MacroTableEntry> = Vec::new();
    let mut w_ins = ExportWriter::new();
    w.write_text("\n");
    for &i in &extractor.pulse_ins {
        if let Some(ins) = song.instrument(i as usize) {
            write_instrument(&mut w, &mut w_ins, &mut tables, ins, i, base_label, false)?;
        }
    }
    for &i in &extractor.wave_ins {
        if let Some(ins) = song.instrument(i as usize) {
            write_instrument(&mut w, &mut w_ins, &mut tables, ins, i, base_label, true)?;
        }
    }
    w.write_text("\n");
    w.write_bytes(w_ins.as_bytes());
    w.write_text("\n");

    // wavetables, downsampled to 32 entries of 4 bits
    write!(w, "{}_Waves:\n", base_label)?;
    for wt in &song.wavetables {
        if wt.data.is_empty() {
            continue;
        }
        w.write_text("    db ");
        let len = wt.data.len();
        for j in (0..32).step_by(2) {
            write!(
                w,
                "${:x}{:x}",
                wt.data[(j + 1) * len / 32] & 0xf,
                wt.data[j * len / 32] & 0xf
            )?;
            if j < 30 {
                w.write_text(",");
            }
        }
        w.write_text("\n");
    }

    // sample headers
    w.write_text("\nPUSHS\n");
    if !extractor.commands[GB_PCM_CHANNEL].is_empty() || !gdac_idx.is_empty() {
        write!(w, "\nSECTION \"{} Sample Headers\",ROMX\n", base_label)?;
    }
    if !extractor.commands[GB_PCM_CHANNEL].is_empty() {
        let lbl = format!("{}_CH4A", base_label);
        write!(
            w,
            "{0}_CH4:\n    dw BANK({1}),{1},{1}.end,{1}.loop\n",
            base_label, lbl
        )?;
        write!(w, "{}_S4:\n", base_label)?;
        for (i, &sample) in extractor.s4_map.iter().enumerate() {
            let name = song.sample(sample).map(|s| s.name.as_str()).unwrap_or("");
            let lbl = format!("{}_S4_{}", base_label, i);
            write!(w, "    dw BANK({0}),{0},{0}.end,{0}.loop ; {1}\n", lbl, name)?;
        }
    }
    if !gdac_idx.is_empty() {
        write!(w, "{}_CH8:\n", base_label)?;
        for i in 5..8 {
            if extractor.commands[i].is_empty() {
                w.write_text("    dw 0,0,0,0\n");
            } else {
                let lbl = format!("{}_CH{}", base_label, CH_NAMES[i - 4]);
                write!(w, "    dw BANK({0}),{0},{0}.end,{0}.loop\n", lbl)?;
            }
        }
    }

    // sample channel streams
    for i in GB_PCM_CHANNEL..8 {
        if extractor.commands[i].is_empty() {
            continue;
        }
        let mut last_cmd = ChannelCommand::default();
        let mut last_tick: i64 = 0;
        let mut last_wait: i64 = 0;
        let mut looped = false;
        write!(
            w,
            "\nSECTION \"{0} CH{1} Data\",ROMX\n{0}_CH{1}:\n",
            base_label,
            CH_NAMES[i - 4]
        )?;
        for (&key, cmd) in &extractor.commands[i] {
            if !looped && !summary.stopped {
                if let Some(loop_tick) = summary.loop_tick {
                    if key >= loop_tick {
                        write_samp_cmd(
                            &mut w,
                            &mut last_cmd,
                            &mut last_wait,
                            i64::from(loop_tick) - last_tick,
                        )?;
                        w.write_text(".loop\n");
                        last_tick = loop_tick.into();
                        looped = true;
                    }
                }
            }
            write_samp_cmd(
                &mut w,
                &mut last_cmd,
                &mut last_wait,
                i64::from(key) - last_tick,
            )?;
            last_tick = key.into();
            last_cmd = *cmd;
        }
        write_samp_cmd(
            &mut w,
            &mut last_cmd,
            &mut last_wait,
            i64::from(summary.total_ticks) - last_tick,
        )?;
        if summary.stopped || summary.loop_tick.is_none() {
            w.write_text(".loop\n    db 0\n");
        }
        w.write_text(".end\n");
    }

    // 4-bit packed samples
    for (i, &sample) in extractor.s4_map.iter().enumerate() {
        let s = match song.sample(sample) {
            Some(s) => s,
            None => continue,
        };
        let len = if s.looped {
            s.loop_end.min(s.length8())
        } else {
            s.length8()
        };
        let mut buf = Vec::with_capacity(len / 2);
        for j in 0..len / 2 {
            let nibble1 = ((s.data[j * 2] as u8) ^ 0x80) >> 4;
            let nibble2 = ((s.data[j * 2 + 1] as u8) ^ 0x80) >> 4;
            buf.push((nibble1 << 4) | nibble2);
        }
        write!(
            w,
            "\nSECTION \"{0} 4-bit Sample {1}\",ROMX\n{0}_S4_{1}: ; {2}\n",
            base_label, i, s.name
        )?;
        if s.looped {
            let st = (s.loop_start / 2).min(buf.len());
            write_hexs(&mut w, &buf[..st])?;
            w.write_text(".loop\n");
            write_hexs(&mut w, &buf[st..])?;
        } else {
            write_hexs(&mut w, &buf)?;
            w.write_text(".loop\n    ds 32,0\n");
        }
        w.write_text(".end\n");
    }
    w.write_text("\nPOPS\n");

    Ok(w)
}

#[cfg(test)]
mod test {
    use super::*;

    fn text(w: &ExportWriter) -> String {
        String::from_utf8(w.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_write_hexs() {
        let mut w = ExportWriter::new();
        let data: Vec<u8> = (0..18).collect();
        write_hexs(&mut w, &data).unwrap();
        assert_eq!(
            text(&w),
            concat!(
                "    db $00,$01,$02,$03,$04,$05,$06,$07,$08,$09,$0a,$0b,$0c,$0d,$0e,$0f\n",
                "    db $10,$11\n",
            )
        );
    }

    #[test]
    fn test_psg_cmd_chunks_at_256() {
        let mut w = ExportWriter::new();
        let mut cmd = ChannelCommand {
            vol: Some(9),
            ..ChannelCommand::default()
        };
        write_psg_cmd(&mut w, &mut cmd, 300, "S", false).unwrap();
        // the volume is only attached to the first chunk, 256 rows wrap to 0
        assert_eq!(text(&w), "    sound_volume 9\n    wait 0\n    wait 44\n");
    }

    #[test]
    fn test_macro_table_dedup() {
        let mut w_ins = ExportWriter::new();
        let mut tables = Vec::new();
        let mut mac = InstrumentMacro::empty(MacroKind::Volume);
        mac.values = vec![15, 14, 12];

        let a = write_macro_label(&mut w_ins, &mut tables, &mac, "S", false).unwrap();
        assert!(a.is_new);
        assert_eq!(a.label, "S_T0");

        let b = write_macro_label(&mut w_ins, &mut tables, &mac, "S", false).unwrap();
        assert!(!b.is_new);
        assert_eq!(b.label, "S_T0");

        // the same values on a wave channel are a different entry
        let c = write_macro_label(&mut w_ins, &mut tables, &mac, "S", true).unwrap();
        assert!(c.is_new);
        assert_eq!(c.label, "S_T1");

        assert_eq!(tables.len(), 2);
    }
}
