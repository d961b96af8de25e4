//! Sleep timer countdown
//!
//! One-second resolution. The timer itself only counts; pausing playback on
//! expiry is the controller's job.

/// Outcome of a single countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTick {
    /// No countdown is running
    Inactive,
    /// Still counting, with the seconds left
    Running(u64),
    /// The countdown just reached zero; the timer is already reset
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SleepTimer {
    remaining: u64,
    /// Bumped on every start, so a restarted countdown can be told apart
    generation: u64,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a countdown, replacing any running one
    ///
    /// A zero duration leaves the timer inactive.
    pub fn start(&mut self, seconds: u64) {
        self.remaining = seconds;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Stops the countdown. Safe to call when inactive.
    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Identifies the most recent countdown
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Seconds left, 0 when inactive
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Advances the countdown by one second
    pub fn tick(&mut self) -> SleepTick {
        match self.remaining {
            0 => SleepTick::Inactive,
            1 => {
                self.remaining = 0;
                SleepTick::Expired
            }
            n => {
                self.remaining = n - 1;
                SleepTick::Running(self.remaining)
            }
        }
    }
}

/// Whole seconds for a fractional sleep duration, rounded up so that
/// "end of chapter" never fires early
pub fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.ceil() as u64
    } else {
        0
    }
}
