//! Pointer velocity estimation.
//!
//! Uses the impulse strategy: each pair of consecutive samples contributes
//! the kinetic energy needed to move from the previous estimated velocity to
//! the segment velocity, and the result is the velocity matching the total
//! energy. Only recent samples count.

use crate::geometry::PointF;

const HISTORY_SIZE: usize = 20;

/// Samples older than this (relative to the newest) are ignored.
const HORIZON_MS: f32 = 100.0;

/// A gap this long between samples means the pointer stopped.
const ASSUME_STOPPED_MS: f32 = 40.0;

#[derive(Debug, Clone, Copy)]
struct Sample {
    time_nanos: u64,
    position: PointF,
}

/// Ring buffer of recent pointer samples.
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    samples: [Option<Sample>; HISTORY_SIZE],
    index: usize,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self {
            samples: [None; HISTORY_SIZE],
            index: 0,
        }
    }
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn add_sample(&mut self, time_nanos: u64, position: PointF) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.samples[self.index] = Some(Sample {
            time_nanos,
            position,
        });
    }

    /// Velocity in px/s, each axis clamped to `±max_velocity`.
    pub fn velocity(&self, max_velocity: f32) -> PointF {
        let Some(newest) = self.samples[self.index] else {
            return PointF::ZERO;
        };

        // Newest first; `ages` are non-positive offsets from the newest sample.
        let mut xs = Vec::with_capacity(HISTORY_SIZE);
        let mut ys = Vec::with_capacity(HISTORY_SIZE);
        let mut ages = Vec::with_capacity(HISTORY_SIZE);
        let mut previous = newest;
        let mut cursor = self.index;

        while let Some(sample) = self.samples[cursor] {
            let age = millis_between(sample.time_nanos, newest.time_nanos);
            let gap = millis_between(sample.time_nanos, previous.time_nanos);
            if age > HORIZON_MS || gap > ASSUME_STOPPED_MS {
                break;
            }
            xs.push(sample.position.x);
            ys.push(sample.position.y);
            ages.push(-age);
            previous = sample;

            cursor = (cursor + HISTORY_SIZE - 1) % HISTORY_SIZE;
            if ages.len() == HISTORY_SIZE {
                break;
            }
        }

        if ages.len() < 2 {
            return PointF::ZERO;
        }

        let clamp = |v: f32| {
            if v.is_finite() {
                (v * 1000.0).clamp(-max_velocity, max_velocity)
            } else {
                0.0
            }
        };
        PointF::new(
            clamp(impulse_velocity(&xs, &ages)),
            clamp(impulse_velocity(&ys, &ages)),
        )
    }
}

/// Velocity in units per millisecond from newest-first positions and times.
fn impulse_velocity(positions: &[f32], times: &[f32]) -> f32 {
    let start = positions.len() - 1;
    let mut work = 0.0f32;
    let mut next_time = times[start];

    for i in (1..=start).rev() {
        let current_time = next_time;
        next_time = times[i - 1];
        if current_time == next_time {
            continue;
        }
        let segment = (positions[i] - positions[i - 1]) / (current_time - next_time);
        let previous = energy_to_velocity(work);
        work += (segment - previous) * segment.abs();
        if i == start {
            work *= 0.5;
        }
    }

    energy_to_velocity(work)
}

/// Absolute distance between two timestamps, in milliseconds.
fn millis_between(a: u64, b: u64) -> f32 {
    a.abs_diff(b) as f32 / 1_000_000.0
}

fn energy_to_velocity(energy: f32) -> f32 {
    energy.signum() * (2.0 * energy.abs()).sqrt()
}
