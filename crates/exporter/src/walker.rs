//! Song walker: deterministic virtual playback of the song

// SPDX-FileCopyrightText: © 2024 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::engine::PlaybackEngine;

use log::info;

/// One processed engine tick.
#[derive(Debug, Clone, Copy)]
pub struct TickEvent {
    /// Tick index, the event key for tick-quantized channels.
    pub tick: u32,

    /// Row index, the event key for row-quantized channels.  Only valid
    /// when `new_row` is set.
    pub row: u32,

    /// Order/row the engine was positioned at before this tick ran; the
    /// pattern cells read on a row boundary come from here.
    pub prev_order: i32,
    pub prev_row: i32,

    /// This tick started a fresh pattern row.
    pub new_row: bool,

    /// This tick is the loop anchor; channel last-state must be
    /// invalidated before observing it.
    pub loop_anchor: bool,
}

/// Totals of a finished walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkSummary {
    pub total_ticks: u32,
    pub total_rows: u32,
    pub loop_tick: Option<u32>,
    pub loop_row: Option<u32>,

    /// Playback halted before looping (jump-to-self, `FFxx`, ...); the
    /// emitted streams must not loop.
    pub stopped: bool,
}

/// Scoped playback session over the engine.
///
/// `begin` stops playback, walks the song for its loop point, enables
/// register dumping on the exported systems and starts a fresh playback.
/// Teardown (disable dumps, drain residual writes, stop the engine) runs on
/// `finish` and, as a guard, on drop.
pub struct SongWalker<'a, E: PlaybackEngine> {
    engine: &'a mut E,
    dump_systems: Vec<usize>,

    loop_order: i32,
    loop_order_row: i32,

    tick: u32,
    row: u32,
    loop_tick: Option<u32>,
    loop_row: Option<u32>,
    last_engine_ticks: i32,

    stopped: bool,
    done: bool,
    torn_down: bool,
}

impl<'a, E: PlaybackEngine> SongWalker<'a, E> {
    pub fn begin(engine: &'a mut E, dump_systems: Vec<usize>) -> Self {
        engine.stop();
        engine.set_repeat_pattern(false);
        engine.set_order(0);

        let lp = engine.walk_song();
        info!("loop point: {} {}", lp.order, lp.row);

        for &s in &dump_systems {
            engine.toggle_register_dump(s, true);
        }
        engine.play_sub(false);

        Self {
            engine,
            dump_systems,
            loop_order: lp.order,
            loop_order_row: lp.row,
            tick: 0,
            row: 0,
            loop_tick: None,
            loop_row: None,
            last_engine_ticks: -1,
            stopped: false,
            done: false,
            torn_down: false,
        }
    }

    pub fn engine(&mut self) -> &mut E {
        self.engine
    }

    /// Advance one tick.  Returns `None` once the song has ended; the final
    /// engine tick that reports the end is not observed.
    pub fn step(&mut self) -> Option<TickEvent> {
        if self.done {
            return None;
        }

        let mut loop_anchor = false;
        if self.loop_tick.is_none()
            && self.engine.cur_order() == self.loop_order
            && self.engine.cur_row() == self.loop_order_row
        {
            let vt = (self.engine.tempo_accum() + self.engine.virtual_tempo_n())
                / self.engine.virtual_tempo_d();
            if self.engine.ticks() - vt <= 0 {
                loop_anchor = true;
                self.loop_tick = Some(self.tick);
                self.loop_row = Some(self.row);
            }
        }

        let prev_order = self.engine.cur_order();
        let prev_row = self.engine.cur_row();

        if self.engine.next_tick() || !self.engine.is_playing() {
            self.stopped = !self.engine.is_playing();
            self.done = true;
            return None;
        }

        let new_row = self.last_engine_ticks <= self.engine.ticks();
        self.last_engine_ticks = self.engine.ticks();

        let ev = TickEvent {
            tick: self.tick,
            row: self.row,
            prev_order,
            prev_row,
            new_row,
            loop_anchor,
        };

        self.tick += 1;
        if new_row {
            self.row += 1;
        }

        Some(ev)
    }

    /// Run teardown and return the walk totals.
    pub fn finish(mut self) -> WalkSummary {
        self.teardown();
        WalkSummary {
            total_ticks: self.tick,
            total_rows: self.row,
            loop_tick: self.loop_tick,
            loop_row: self.loop_row,
            stopped: self.stopped,
        }
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let n_systems = self.engine.song().systems.len();
        for s in 0..n_systems {
            self.engine.register_writes(s).clear();
            self.engine.toggle_register_dump(s, false);
        }
        self.engine.stop();
    }
}

impl<E: PlaybackEngine> Drop for SongWalker<'_, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
