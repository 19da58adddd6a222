use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Milliseconds elapsed since `since`, floored at zero.
    #[must_use]
    pub fn elapsed_ms(&self, since: DateTime<Utc>) -> u64 {
        let millis = self.now().signed_duration_since(since).num_milliseconds();
        u64::try_from(millis).unwrap_or(0)
    }
}

/// Gate for celebration effects that must not fire back to back.
///
/// `try_fire` succeeds the first time and afterwards only once strictly more
/// than `cooldown` has passed since the last successful fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownGuard {
    cooldown: Duration,
    last_shown_at: Option<DateTime<Utc>>,
}

impl CooldownGuard {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_shown_at: None,
        }
    }

    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.last_shown_at {
            None => true,
            Some(last) => now.signed_duration_since(last) > self.cooldown,
        }
    }

    /// Records a showing at `now` if the cooldown allows it.
    pub fn try_fire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        self.last_shown_at = Some(now);
        true
    }

    #[must_use]
    pub fn last_shown_at(&self) -> Option<DateTime<Utc>> {
        self.last_shown_at
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
