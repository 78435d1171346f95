use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fixed-rate tick scheduler driven by a monotonic wall clock.
///
/// All instants are offsets from an arbitrary epoch chosen by the caller
/// (usually the `Instant` the room loop started). Tick boundaries are
/// computed from an origin rather than accumulated, so the simulation clock
/// never drifts: after any sequence of [`advance`](Self::advance) calls the
/// simulated time is exactly `ticks * interval`, and the wall clock is
/// never a full interval ahead of it.
#[derive(Debug, Clone)]
pub struct TickClock {
    tick_rate: u32,
    origin: Duration,
    ticks: u64,
    /// Time elapsed past the last completed tick boundary when paused.
    paused_carry: Option<Duration>,
}

impl TickClock {
    pub fn new(tick_rate: u32, now: Duration) -> Self {
        Self {
            tick_rate: tick_rate.max(1),
            origin: now,
            ticks: 0,
            paused_carry: None,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Length of one tick. Rounded down to whole nanoseconds.
    pub fn tick_interval(&self) -> Duration {
        self.offset(1)
    }

    /// Total ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time covered by the ticks run so far.
    pub fn sim_time(&self) -> Duration {
        self.offset(self.ticks)
    }

    pub fn is_paused(&self) -> bool {
        self.paused_carry.is_some()
    }

    /// Number of ticks that became due since the last call. The caller must
    /// run exactly that many simulation ticks before scheduling again.
    pub fn advance(&mut self, now: Duration) -> u64 {
        if self.paused_carry.is_some() {
            return 0;
        }
        let Some(elapsed) = now.checked_sub(self.origin) else {
            return 0;
        };
        let due = (elapsed.as_nanos() * u128::from(self.tick_rate) / NANOS_PER_SEC) as u64;
        let needed = due.saturating_sub(self.ticks);
        self.ticks += needed;
        needed
    }

    /// Wall-clock instant of the next tick boundary.
    pub fn next_deadline(&self) -> Duration {
        self.origin + self.offset(self.ticks + 1)
    }

    /// Freeze the clock, remembering how far into the current tick it was.
    pub fn pause(&mut self, now: Duration) {
        if self.paused_carry.is_some() {
            return;
        }
        let boundary = self.origin + self.offset(self.ticks);
        self.paused_carry = Some(now.saturating_sub(boundary));
    }

    /// Unfreeze the clock so the remembered partial tick is neither lost nor
    /// counted twice.
    pub fn resume(&mut self, now: Duration) {
        if let Some(carry) = self.paused_carry.take() {
            self.origin = now.saturating_sub(carry + self.offset(self.ticks));
        }
    }

    /// Fraction of a tick that had elapsed when the clock was paused.
    pub fn paused_fraction(&self) -> Option<f64> {
        self.paused_carry
            .map(|carry| carry.as_secs_f64() / self.tick_interval().as_secs_f64())
    }

    fn offset(&self, ticks: u64) -> Duration {
        let nanos = u128::from(ticks) * NANOS_PER_SEC / u128::from(self.tick_rate);
        Duration::from_nanos(nanos as u64)
    }
}
