use crate::config::{ConnectionConfig, ReconnectStrategy};
use std::time::Duration;

/// Reconnect delay schedule. Unlike a retry budget, reconnection here is
/// unconditional, so the iterator never exhausts; it only climbs to the
/// configured cap and stays there.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    strategy: ReconnectStrategy,
    step: Duration,
    max_delay: Duration,
    factor: u32,
}

impl BackoffSchedule {
    pub fn constant(step: Duration) -> Self {
        Self {
            strategy: ReconnectStrategy::Constant,
            step,
            max_delay: step,
            factor: 1,
        }
    }

    pub fn exponential(step: Duration, max_delay: Duration, factor: u32) -> Self {
        Self {
            strategy: ReconnectStrategy::Exponential,
            step,
            max_delay,
            factor,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        match config.reconnect_strategy {
            ReconnectStrategy::Constant => Self::constant(config.reconnect_step()),
            ReconnectStrategy::Exponential => Self::exponential(
                config.reconnect_step(),
                config.reconnect_max_delay(),
                config.reconnect_factor as u32,
            ),
        }
    }

    /// Fresh delay sequence, starting again from the base step. Called
    /// anew after every successful connection.
    pub fn delays(&self) -> BackoffIter {
        BackoffIter {
            schedule: self.clone(),
            current: self.step,
        }
    }
}

pub struct BackoffIter {
    schedule: BackoffSchedule,
    current: Duration,
}

impl Iterator for BackoffIter {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let delay = self.current.min(self.schedule.max_delay);

        if self.schedule.strategy == ReconnectStrategy::Exponential {
            // Clamp before multiplying so the accumulator cannot overflow
            self.current = delay
                .saturating_mul(self.schedule.factor)
                .min(self.schedule.max_delay);
        }

        Some(delay)
    }
}
