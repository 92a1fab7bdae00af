// Runs the sequencer in real time.
//
// One clock thread owns the timing. It keeps an absolute grid position and
// sleeps until the next deadline (grid + swing offset) instead of re-arming a
// fixed interval, so lateness on one tick never accumulates into drift.
// Everything that touches pattern state goes through the same mutex, which
// is also what pad presses and UI edits lock.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::sequencer::{Sequencer, swing_offset};

pub type SharedSequencer = Arc<Mutex<Sequencer>>;

pub fn shared(seq: Sequencer) -> SharedSequencer {
    Arc::new(Mutex::new(seq))
}

// A panic on another thread mid-edit shouldn't silence the set; take the data as-is.
pub fn lock(seq: &SharedSequencer) -> MutexGuard<'_, Sequencer> {
    seq.lock().unwrap_or_else(|poisoned| {
        warn!("sequencer lock poisoned, recovering");
        poisoned.into_inner()
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClockMsg {
    Start,  // tick step 0 right away
    Retime, // tempo changed: restart the grid from now, keep the position
    Stop,
    Shutdown,
}

#[derive(Clone, Copy, Debug)]
struct Schedule {
    grid: Instant,     // where the upcoming step sits on the straight grid
    deadline: Instant, // grid + swing for that step
}

impl Schedule {
    fn at(grid: Instant, step: usize, interval: Duration, swing: f32) -> Self {
        Self {
            grid,
            deadline: grid + swing_offset(step, interval, swing),
        }
    }
}

pub struct Transport {
    seq: SharedSequencer,
    ctl: Sender<ClockMsg>,
    handle: Option<JoinHandle<()>>,
}

impl Transport {
    pub fn spawn(seq: SharedSequencer) -> anyhow::Result<Self> {
        let (ctl, rx) = crossbeam_channel::unbounded();
        let clock_seq = Arc::clone(&seq);
        let handle = thread::Builder::new()
            .name("clock".into())
            .spawn(move || run_clock(clock_seq, rx))
            .context("spawning clock thread")?;
        Ok(Self {
            seq,
            ctl,
            handle: Some(handle),
        })
    }

    pub fn sequencer(&self) -> SharedSequencer {
        Arc::clone(&self.seq)
    }

    pub fn play(&self) {
        if lock(&self.seq).play() {
            let _ = self.ctl.send(ClockMsg::Start);
        }
    }

    pub fn stop(&self) {
        lock(&self.seq).stop();
        let _ = self.ctl.send(ClockMsg::Stop);
    }

    pub fn toggle(&self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.seq).is_playing()
    }

    // Clamp and apply, then restart the clock at the new rate without
    // moving the cursor.
    pub fn set_tempo(&self, bpm: f32) {
        let playing = {
            let mut seq = lock(&self.seq);
            seq.set_tempo(bpm);
            seq.is_playing()
        };
        if playing {
            let _ = self.ctl.send(ClockMsg::Retime);
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        let _ = self.ctl.send(ClockMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_clock(seq: SharedSequencer, rx: Receiver<ClockMsg>) {
    debug!("clock thread up");
    let mut schedule: Option<Schedule> = None;

    loop {
        let msg = match schedule {
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
            Some(s) => match rx.recv_deadline(s.deadline) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
        };

        match msg {
            Some(ClockMsg::Start) => {
                schedule = Some(Schedule {
                    grid: Instant::now(),
                    deadline: Instant::now(),
                });
            }
            Some(ClockMsg::Retime) => {
                let guard = lock(&seq);
                if guard.is_playing() {
                    let interval = guard.step_interval();
                    let grid = Instant::now() + interval;
                    let step = guard.current_step();
                    schedule = Some(Schedule::at(grid, step, interval, guard.swing()));
                }
            }
            Some(ClockMsg::Stop) => schedule = None,
            Some(ClockMsg::Shutdown) => break,
            None => {
                // deadline reached
                let Some(s) = schedule else { continue };
                let mut guard = lock(&seq);
                if !guard.is_playing() {
                    schedule = None;
                    continue;
                }
                guard.tick();
                let interval = guard.step_interval();
                let mut grid = s.grid + interval;
                // we slept through more than a whole step (suspend, debugger): resync
                let now = Instant::now();
                if grid + interval < now {
                    debug!("clock fell behind, resyncing");
                    grid = now;
                }
                schedule = Some(Schedule::at(grid, guard.current_step(), interval, guard.swing()));
            }
        }
    }

    info!("clock thread shutting down");
}
