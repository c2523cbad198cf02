//! JSON song data

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::driver_constants::{DEFAULT_MINMOD_CHANNELS, MAX_MINMOD_CHANNELS};
use crate::errors::{DeserializeError, SongDataError, SongDataErrors, ValueError};
use crate::value_newtypes::u8_value_newtype;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::Deserialize;

u8_value_newtype!(
    ChannelCount,
    ChannelCountOutOfRange,
    NoChannelCount,
    1,
    MAX_MINMOD_CHANNELS
);

u8_value_newtype!(Speed, SpeedOutOfRange, NoSpeed, 1, u8::MAX);

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    Gb,
    PcmDac,
    GbaMinMod,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct SystemFlags {
    #[serde(default)]
    pub channels: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct SystemConfig {
    pub kind: SystemKind,

    #[serde(default)]
    pub flags: SystemFlags,
}

impl SystemConfig {
    /// Number of tracker channels this system occupies.
    pub fn channels(&self) -> usize {
        match self.kind {
            SystemKind::Gb => 4,
            SystemKind::PcmDac => 1,
            SystemKind::GbaMinMod => self
                .flags
                .channels
                .unwrap_or(DEFAULT_MINMOD_CHANNELS)
                .min(u32::from(MAX_MINMOD_CHANNELS)) as usize,
        }
    }
}

/// One pattern cell.
///
/// `note` uses the tracker encoding: 0 = empty (unless `octave` is set),
/// 100 = note off, 101/102 = note release, otherwise `note + octave * 12`
/// is the pitch.  `instrument`/`volume` use -1 for an empty column.
#[derive(Deserialize, Clone, Debug)]
pub struct PatternCell {
    #[serde(default)]
    pub note: i16,

    #[serde(default)]
    pub octave: i16,

    #[serde(default = "minus_one")]
    pub instrument: i16,

    #[serde(default = "minus_one")]
    pub volume: i16,

    /// `(effect, value)` pairs; -1 values read as 0.
    #[serde(default)]
    pub effects: Vec<(i16, i16)>,
}

fn minus_one() -> i16 {
    -1
}

impl Default for PatternCell {
    fn default() -> Self {
        Self {
            note: 0,
            octave: 0,
            instrument: -1,
            volume: -1,
            effects: Vec::new(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Pattern {
    pub rows: Vec<PatternCell>,
}

#[derive(Deserialize, Debug)]
pub struct SubSong {
    #[serde(default)]
    pub name: String,

    /// Alternating per-row tick counts, length 1 or 2.
    pub speeds: Vec<u8>,

    /// Engine tick rate in Hz; 0 selects the vblank timer.
    #[serde(default)]
    pub tick_rate: u32,

    /// `orders[channel][order]` is an index into `patterns[channel]`.
    pub orders: Vec<Vec<u16>>,

    /// Pattern store per channel; unused slots are `null`.
    pub patterns: Vec<Vec<Option<Pattern>>>,

    /// Effect column count per channel.
    pub effect_columns: Vec<u8>,
}

impl SubSong {
    pub fn pattern(&self, channel: usize, order: usize) -> Option<&Pattern> {
        let pat_index = *self.orders.get(channel)?.get(order)?;
        self.patterns
            .get(channel)?
            .get(usize::from(pat_index))?
            .as_ref()
    }

    pub fn speed1(&self) -> u8 {
        self.speeds.first().copied().unwrap_or(1)
    }

    pub fn speed2(&self) -> u8 {
        if self.speeds.len() > 1 {
            self.speeds[1]
        } else {
            self.speed1()
        }
    }
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum MacroKind {
    Volume,
    Arpeggio,
    Duty,
    Wave,
    Pitch,
}

#[derive(Deserialize, Clone, Debug)]
pub struct InstrumentMacro {
    pub kind: MacroKind,

    #[serde(default)]
    pub values: Vec<i32>,

    #[serde(default)]
    pub loop_pos: Option<usize>,

    #[serde(default)]
    pub rel_pos: Option<usize>,

    /// Ticks each macro step is held for.
    #[serde(default = "one")]
    pub speed: u32,

    /// Ticks before the first macro step.
    #[serde(default)]
    pub delay: u32,
}

fn one() -> u32 {
    1
}

impl InstrumentMacro {
    pub fn empty(kind: MacroKind) -> Self {
        Self {
            kind,
            values: Vec::new(),
            loop_pos: None,
            rel_pos: None,
            speed: 1,
            delay: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A release point inside the macro splits it into a head and a
    /// continuation that plays after key-off.
    pub fn has_release(&self) -> bool {
        matches!(self.rel_pos, Some(r) if r < self.len())
    }
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Gb,
    Sample,
}

#[derive(Deserialize, Debug)]
pub struct Instrument {
    pub name: String,

    pub kind: InstrumentKind,

    /// GB initial envelope volume, used when the volume macro is empty.
    #[serde(default)]
    pub initial_env_volume: u8,

    #[serde(default)]
    pub volume_macro: Option<InstrumentMacro>,

    #[serde(default)]
    pub arp_macro: Option<InstrumentMacro>,

    #[serde(default)]
    pub duty_macro: Option<InstrumentMacro>,

    #[serde(default)]
    pub wave_macro: Option<InstrumentMacro>,

    #[serde(default)]
    pub pitch_macro: Option<InstrumentMacro>,
}

impl Instrument {
    pub fn macro_or_empty(&self, kind: MacroKind) -> InstrumentMacro {
        let m = match kind {
            MacroKind::Volume => &self.volume_macro,
            MacroKind::Arpeggio => &self.arp_macro,
            MacroKind::Duty => &self.duty_macro,
            MacroKind::Wave => &self.wave_macro,
            MacroKind::Pitch => &self.pitch_macro,
        };
        m.clone().unwrap_or_else(|| InstrumentMacro::empty(kind))
    }
}

#[derive(Deserialize, Debug)]
pub struct Wavetable {
    pub data: Vec<u8>,
}

#[derive(Deserialize, Debug)]
pub struct Sample {
    pub name: String,

    /// Signed 8-bit sample body.
    pub data: Vec<i8>,

    #[serde(default)]
    pub looped: bool,

    #[serde(default)]
    pub loop_start: usize,

    #[serde(default)]
    pub loop_end: usize,

    /// Playback rate of the sample at its natural pitch, in Hz.
    #[serde(default)]
    pub center_rate: u32,
}

impl Sample {
    pub fn length8(&self) -> usize {
        self.data.len()
    }
}

#[derive(Deserialize, Debug)]
pub struct Song {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub album: String,

    pub systems: Vec<SystemConfig>,

    pub subsongs: Vec<SubSong>,

    #[serde(default)]
    pub instruments: Vec<Instrument>,

    #[serde(default)]
    pub wavetables: Vec<Wavetable>,

    #[serde(default)]
    pub samples: Vec<Sample>,
}

impl Song {
    pub fn total_channels(&self) -> usize {
        self.systems.iter().map(SystemConfig::channels).sum()
    }

    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }
}

pub fn load_song_file(path: PathBuf) -> Result<Song, DeserializeError> {
    let file_name = path
        .file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string();

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => return Err(DeserializeError::OpenError(file_name, e)),
    };
    let reader = BufReader::new(file);

    match serde_json::from_reader(reader) {
        Ok(song) => Ok(song),
        Err(e) => Err(DeserializeError::SerdeError(file_name, e)),
    }
}

pub fn validate_song(song: &Song) -> Result<(), SongDataErrors> {
    let mut errors = Vec::new();

    if song.systems.is_empty() {
        errors.push(SongDataError::NoSystems);
    }
    if song.subsongs.is_empty() {
        errors.push(SongDataError::NoSubSongs);
    }

    for (sys_index, sys) in song.systems.iter().enumerate() {
        if sys.kind == SystemKind::GbaMinMod {
            let c = sys.flags.channels.unwrap_or(DEFAULT_MINMOD_CHANNELS);
            if let Err(e) = ChannelCount::try_from(c) {
                errors.push(SongDataError::InvalidChannelFlags(sys_index, e));
            }
        }
    }

    let n_channels = song.total_channels();

    for (ss_index, ss) in song.subsongs.iter().enumerate() {
        if ss.speeds.is_empty() {
            errors.push(SongDataError::EmptySpeedVector(ss_index));
        }
        for &s in &ss.speeds {
            if let Err(e) = Speed::try_from(s) {
                errors.push(SongDataError::InvalidSpeed(ss_index, e));
            }
        }
        if ss.orders.len() != n_channels {
            errors.push(SongDataError::OrderTableChannelMismatch {
                expected: n_channels,
                got: ss.orders.len(),
            });
        }
        if ss.effect_columns.len() != n_channels {
            errors.push(SongDataError::EffectColumnsChannelMismatch {
                expected: n_channels,
                got: ss.effect_columns.len(),
            });
        }
        for (channel, orders) in ss.orders.iter().enumerate() {
            let n_patterns = ss.patterns.get(channel).map_or(0, Vec::len);
            for (order, &pat) in orders.iter().enumerate() {
                if usize::from(pat) >= n_patterns {
                    errors.push(SongDataError::PatternIndexOutOfRange {
                        channel,
                        order,
                        pattern: pat.into(),
                    });
                }
            }
        }
    }

    for (i, wt) in song.wavetables.iter().enumerate() {
        if wt.data.is_empty() {
            errors.push(SongDataError::EmptyWavetable(i));
        }
    }

    for (i, ins) in song.instruments.iter().enumerate() {
        for m in [
            &ins.volume_macro,
            &ins.arp_macro,
            &ins.duty_macro,
            &ins.wave_macro,
            &ins.pitch_macro,
        ]
        .into_iter()
        .flatten()
        {
            if m.len() > 255 {
                errors.push(SongDataError::MacroTooLong {
                    instrument: i,
                    len: m.len(),
                });
            }
        }
    }

    for (i, s) in song.samples.iter().enumerate() {
        if s.looped && (s.loop_start > s.loop_end || s.loop_end > s.length8()) {
            errors.push(SongDataError::SampleLoopOutOfRange {
                sample: i,
                loop_start: s.loop_start,
                loop_end: s.loop_end,
                length: s.length8(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SongDataErrors(errors))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialize_song() {
        let song: Song = serde_json::from_str(
            r##"{
                "name": "test",
                "systems": [
                    { "kind": "gb" },
                    { "kind": "gba_min_mod", "flags": { "channels": 4 } }
                ],
                "subsongs": [{
                    "speeds": [6],
                    "orders": [[0], [0], [0], [0], [0], [0], [0], [0]],
                    "patterns": [
                        [{ "rows": [{ "note": 0, "octave": 4, "volume": 15 }] }],
                        [null], [null], [null], [null], [null], [null], [null]
                    ],
                    "effect_columns": [1, 1, 1, 1, 1, 1, 1, 1]
                }],
                "samples": [{
                    "name": "kick",
                    "data": [0, 1, -2, 3],
                    "center_rate": 8363
                }]
            }"##,
        )
        .unwrap();

        assert_eq!(song.systems[0].channels(), 4);
        assert_eq!(song.systems[1].channels(), 4);
        assert_eq!(song.total_channels(), 8);
        assert!(validate_song(&song).is_ok());

        let p = song.subsongs[0].pattern(0, 0).unwrap();
        assert_eq!(p.rows[0].octave, 4);
        assert_eq!(p.rows[0].instrument, -1);
        assert_eq!(p.rows[0].volume, 15);
    }

    #[test]
    fn test_validate_bad_song() {
        let song = Song {
            name: String::new(),
            author: String::new(),
            album: String::new(),
            systems: vec![SystemConfig {
                kind: SystemKind::GbaMinMod,
                flags: SystemFlags { channels: Some(99) },
            }],
            subsongs: vec![SubSong {
                name: String::new(),
                speeds: vec![],
                tick_rate: 0,
                orders: vec![],
                patterns: vec![],
                effect_columns: vec![],
            }],
            instruments: vec![],
            wavetables: vec![Wavetable { data: vec![] }],
            samples: vec![],
        };

        let e = validate_song(&song).unwrap_err();
        assert!(e.0.contains(&SongDataError::EmptySpeedVector(0)));
        assert!(e.0.contains(&SongDataError::EmptyWavetable(0)));
        assert!(e
            .0
            .contains(&SongDataError::InvalidChannelFlags(
                0,
                ValueError::ChannelCountOutOfRange(99)
            )));
    }
}
