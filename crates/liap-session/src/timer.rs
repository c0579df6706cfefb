use std::time::{Duration, Instant};

/// Per-phase decision deadlines. Mirrors the distinct "decision" vs. "extended"
/// timeout split used for time-boxed phases elsewhere in this kind of server,
/// generalized to this game's single decision-timeout knob (declarations and
/// plays share the same budget).
#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    pub decision: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { decision: Duration::from_secs(30) }
    }
}

/// A single running-or-cleared deadline.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    config: TimerConfig,
    deadline: Option<Instant>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl Timer {
    pub fn new(config: TimerConfig) -> Self {
        Self { config, deadline: None }
    }
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.config.decision);
    }
    pub fn clear(&mut self) {
        self.deadline = None;
    }
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}
