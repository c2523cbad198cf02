//! MNS sample bank tests

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

mod common;

use common::{minmod_song, ScriptedEngine};
use exporter::data::Sample;
use exporter::writer::ExportWriter;
use exporter::{save_mnm, save_mns};

const MNS_IDENT: [u8; 10] = [0xd1, 0x4d, 0x69, 0x6e, 0x4d, 0x6f, 0x64, 0x53, 0x01, 0x00];

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn sample(name: &str, data: Vec<i8>) -> Sample {
    Sample {
        name: name.to_string(),
        data,
        looped: false,
        loop_start: 0,
        loop_end: 0,
        center_rate: 0,
    }
}

#[test]
fn test_looped_sample_layout() {
    let mut song = minmod_song(1);
    song.samples = vec![Sample {
        name: "loop".to_string(),
        data: (0..100).map(|i| i as i8).collect(),
        looped: true,
        loop_start: 10,
        loop_end: 100,
        center_rate: 32768,
    }];

    let mut w = ExportWriter::new();
    save_mns(&mut w, &song).unwrap();
    let b = w.into_bytes();

    assert_eq!(&b[0..10], &MNS_IDENT);
    assert_eq!(u16_at(&b, 0x0a), 0); // reserved
    assert_eq!(u16_at(&b, 0x10), 1); // sample count
    assert_eq!(u16_at(&b, 0x12), 0); // wavetable count

    // sample header: pitch base, start, loop start, loop end, reserved
    assert_eq!(u32_at(&b, 0x20), 15 * 786432); // log2(32768) * 786432
    assert_eq!(u32_at(&b, 0x24), 0x38);
    assert_eq!(u32_at(&b, 0x28), 10);
    assert_eq!(u32_at(&b, 0x2c), 100);
    assert_eq!(u32_at(&b, 0x30), 0);
    assert_eq!(u32_at(&b, 0x34), 0);

    // body: the looped sample is cut at loopEnd
    assert_eq!(u32_at(&b, 0x0c), 0x38 + 100);
    assert_eq!(b.len(), 0x38 + 100);
    assert_eq!(b[0x38], 0);
    assert_eq!(b[0x38 + 99], 99);
}

#[test]
fn test_unlooped_silence_tail_and_alignment() {
    let mut song = minmod_song(1);
    song.samples = vec![
        sample("short", vec![1, 2, 3, 4, 5]),
        sample("next", vec![9, 9, 9, 9]),
    ];

    let mut w = ExportWriter::new();
    save_mns(&mut w, &song).unwrap();
    let b = w.into_bytes();

    assert_eq!(u16_at(&b, 0x10), 2);

    // first sample: header table ends at 0x50, already aligned
    assert_eq!(u32_at(&b, 0x20), 0); // center rate 0 has no pitch base
    assert_eq!(u32_at(&b, 0x24), 0x50);
    assert_eq!(u32_at(&b, 0x28), 5); // length8
    assert_eq!(u32_at(&b, 0x2c), 5 + 32); // silence tail

    // second sample starts 4-byte aligned after 5 + 32 bytes
    let start2 = u32_at(&b, 0x24 + 24);
    assert_eq!(start2, 0x78);
    assert_eq!(start2 % 4, 0);
    assert_eq!(u32_at(&b, 0x28 + 24), 4);
    assert_eq!(u32_at(&b, 0x2c + 24), 4 + 32);

    assert_eq!(u32_at(&b, 0x0c), 0x78 + 4 + 32);

    // silence tail is zeroed
    assert_eq!(&b[0x50 + 5..0x50 + 5 + 32], &[0u8; 32]);
}

#[test]
fn test_mns_appended_after_mnm_pattern() {
    let mut engine = ScriptedEngine::new(minmod_song(1), 0, 0, Vec::new());
    engine.song.samples = vec![sample("kick", vec![1, 2, 3, 4])];

    // export type 0 writes the pattern followed by the sample bank
    let w = save_mnm(&mut engine, 0, None, false, false).unwrap();
    let b = w.into_bytes();

    // MNM part of an empty song is 0x29 bytes
    let base = 0x29;
    assert_eq!(&b[base..base + 10], &MNS_IDENT);

    // MNS offsets are relative to its own start
    assert_eq!(u32_at(&b, base + 0x24), 0x38);
    assert_eq!(u32_at(&b, base + 0x0c), 0x38 + 4 + 32);
    assert_eq!(b.len(), base + 0x38 + 4 + 32);
}
