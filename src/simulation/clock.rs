//! Fixed-step clock and per-tick side tables
//!
//! - [`FixedStepClock`]      accumulator turning wall-clock callbacks into whole ticks
//! - [`AccelerationTracker`] acceleration derived from consecutive velocities
//! - [`ForceSchedule`]       configured forces waiting on a wall-clock delay
//!
//! Time is kept in integer nanoseconds inside the accumulator so the number
//! of ticks depends only on the summed wall time, not on how it was split
//! into callbacks.

use std::collections::HashMap;

use crate::configuration::config::ForceMode;
use crate::simulation::states::NVec2;

/// Lifecycle of a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockState {
    Idle,    // nothing loaded
    Ready,   // world built, physics not advancing
    Running, // physics advancing
    Paused,  // frozen, still rendering
}

/// Ticks executed at most per callback
pub const MAX_STEPS_PER_FRAME: u32 = 3;

const NS_PER_MS: f64 = 1_000_000.0;

#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step_ns: u64,
    accumulator_ns: u64,
    last_callback_ms: Option<f64>,
    ticks: u64,
}

/// Result of one host callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    pub steps: u32,
    pub wall_delta_ms: f64, // uncapped
}

impl FixedStepClock {
    pub fn new(frame_rate: f64) -> Self {
        Self {
            step_ns: (1000.0 / frame_rate * NS_PER_MS).round() as u64,
            accumulator_ns: 0,
            last_callback_ms: None,
            ticks: 0,
        }
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ns as f64 / NS_PER_MS
    }

    pub fn step_seconds(&self) -> f64 {
        self.step_ns as f64 / (NS_PER_MS * 1000.0)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds since the last reset
    pub fn sim_time(&self) -> f64 {
        self.ticks as f64 * self.step_seconds()
    }

    /// Account for a host callback at `now_ms`. When `running` is false the
    /// accumulator is held at zero and no ticks are due.
    pub fn advance(&mut self, now_ms: f64, running: bool) -> Advance {
        let delta_ms = match self.last_callback_ms {
            Some(prev) if now_ms.is_finite() => (now_ms - prev).max(0.0),
            _ => 0.0,
        };
        if now_ms.is_finite() {
            self.last_callback_ms = Some(now_ms);
        }

        if !running {
            self.accumulator_ns = 0;
            return Advance {
                steps: 0,
                wall_delta_ms: delta_ms,
            };
        }

        let cap_ns = self.step_ns * MAX_STEPS_PER_FRAME as u64;
        let delta_ns = ((delta_ms * NS_PER_MS).round() as u64).min(cap_ns);
        self.accumulator_ns += delta_ns;

        let due = self.accumulator_ns / self.step_ns;
        let steps = due.min(MAX_STEPS_PER_FRAME as u64);
        if steps < due {
            self.accumulator_ns = 0;
        } else {
            self.accumulator_ns -= steps * self.step_ns;
        }
        Advance {
            steps: steps as u32,
            wall_delta_ms: delta_ms,
        }
    }

    /// Count one executed tick
    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    /// Zero time and the accumulator. The next callback measures no delta.
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.accumulator_ns = 0;
        self.last_callback_ms = None;
    }
}

// =========================================================================================
// Derived acceleration
// =========================================================================================

#[derive(Debug, Clone, Copy, Default)]
struct AccelEntry {
    previous: Option<NVec2>,
    acceleration: NVec2,
}

/// `id → (previous velocity, acceleration)`, engine units
#[derive(Debug, Clone, Default)]
pub struct AccelerationTracker {
    entries: HashMap<String, AccelEntry>,
    seeds: HashMap<String, NVec2>,
}

impl AccelerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value reported before the first tick (the declared acceleration)
    pub fn seed(&mut self, id: &str, acceleration: NVec2) {
        self.seeds.insert(id.to_string(), acceleration);
        self.entries.insert(
            id.to_string(),
            AccelEntry {
                previous: None,
                acceleration,
            },
        );
    }

    /// Forget previous velocities so the next sample reads zero
    pub fn restart(&mut self) {
        for entry in self.entries.values_mut() {
            entry.previous = None;
        }
    }

    /// Back to the load-time state: seeds reported, no history
    pub fn reset(&mut self) {
        self.entries = self
            .seeds
            .iter()
            .map(|(id, &a)| {
                (
                    id.clone(),
                    AccelEntry {
                        previous: None,
                        acceleration: a,
                    },
                )
            })
            .collect();
    }

    /// Record a post-step velocity and derive `(v - v_prev) / dt`
    pub fn record(&mut self, id: &str, velocity: NVec2, dt_seconds: f64) -> NVec2 {
        let entry = self.entries.entry(id.to_string()).or_default();
        entry.acceleration = match entry.previous {
            Some(prev) => (velocity - prev) / dt_seconds,
            None => NVec2::zeros(),
        };
        entry.previous = Some(velocity);
        entry.acceleration
    }

    pub fn get(&self, id: &str) -> NVec2 {
        self.entries
            .get(id)
            .map_or_else(NVec2::zeros, |e| e.acceleration)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seeds.clear();
    }
}

// =========================================================================================
// Delayed forces
// =========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledForce {
    pub id: String,
    pub force: NVec2, // engine units
    pub mode: ForceMode,
    pub delay_ms: f64,
}

#[derive(Debug, Clone)]
struct Armed {
    force: ScheduledForce,
    remaining_ms: f64,
    fired: bool,
}

/// Forces armed on the first play and released after their wall-clock delay.
///
/// The countdown only advances while the runtime is running, so a pause holds
/// every unfired force at the delay it had left. Fired impulses stay spent
/// until [`ForceSchedule::cancel`].
#[derive(Debug, Clone, Default)]
pub struct ForceSchedule {
    planned: Vec<ScheduledForce>,
    armed: Vec<Armed>,
    started: bool,
}

impl ForceSchedule {
    pub fn new(planned: Vec<ScheduledForce>) -> Self {
        Self {
            planned,
            armed: Vec::new(),
            started: false,
        }
    }

    /// Arm the whole plan on the first call; later calls resume as is
    pub fn arm(&mut self) {
        if self.started {
            return;
        }
        self.armed = self
            .planned
            .iter()
            .map(|f| Armed {
                force: f.clone(),
                remaining_ms: f.delay_ms.max(0.0),
                fired: false,
            })
            .collect();
        self.started = true;
    }

    /// Drop every armed or active force. The next [`arm`](Self::arm) starts over.
    pub fn cancel(&mut self) {
        self.armed.clear();
        self.started = false;
    }

    /// Forces that have yet to act, or keep acting
    pub fn pending(&self) -> usize {
        self.armed.len()
    }

    /// Count down by the raw wall delta of a callback
    pub fn elapse(&mut self, wall_delta_ms: f64) {
        for a in self.armed.iter_mut() {
            a.remaining_ms -= wall_delta_ms;
        }
    }

    /// Forces acting during the coming tick. Impulses act once.
    pub fn due(&mut self) -> Vec<(String, NVec2)> {
        let mut out = Vec::new();
        for a in self.armed.iter_mut() {
            if a.remaining_ms <= 0.0 {
                out.push((a.force.id.clone(), a.force.force));
                a.fired = true;
            }
        }
        self.armed
            .retain(|a| !(a.fired && a.force.mode == ForceMode::Impulse));
        out
    }
}
