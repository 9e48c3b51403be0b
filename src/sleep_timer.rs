//! Sleep timer selection.
//!
//! Choices are listed as `Off`, four presets, then `Custom`, so a list
//! index maps to a choice with [`SleepChoice::from_index`].

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

/// Largest custom duration: one day.
pub const MAX_CUSTOM_MINUTES: u32 = 24 * 60;

/// Preset durations in minutes, in list order.
pub const PRESET_MINUTES: [u32; 4] = [10, 20, 30, 60];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SleepTimerError {
    #[error("custom sleep time must be between 1 and {MAX_CUSTOM_MINUTES} minutes, got {0}")]
    OutOfRange(u32),

    #[error("no sleep timer choice at index {0}")]
    UnknownChoice(usize),
}

/// One entry of the sleep timer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepChoice {
    #[default]
    Off,
    /// Index into [`PRESET_MINUTES`].
    Preset(usize),
    Custom(u32),
}

impl SleepChoice {
    /// Maps a list index to a choice.
    ///
    /// Index 5 is the custom entry and takes `custom_minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`SleepTimerError::UnknownChoice`] for indexes past the list
    /// and [`SleepTimerError::OutOfRange`] for a bad custom value.
    pub fn from_index(index: usize, custom_minutes: u32) -> Result<Self, SleepTimerError> {
        match index {
            0 => Ok(Self::Off),
            i if i <= PRESET_MINUTES.len() => Ok(Self::Preset(i - 1)),
            i if i == PRESET_MINUTES.len() + 1 => Self::custom(custom_minutes),
            i => Err(SleepTimerError::UnknownChoice(i)),
        }
    }

    /// # Errors
    ///
    /// Returns [`SleepTimerError::OutOfRange`] unless `1..=1440`.
    pub fn custom(minutes: u32) -> Result<Self, SleepTimerError> {
        if (1..=MAX_CUSTOM_MINUTES).contains(&minutes) {
            Ok(Self::Custom(minutes))
        } else {
            Err(SleepTimerError::OutOfRange(minutes))
        }
    }

    /// Duration in minutes, `None` for `Off`.
    #[must_use]
    pub fn minutes(self) -> Option<u32> {
        match self {
            Self::Off => None,
            Self::Preset(i) => PRESET_MINUTES.get(i).copied(),
            Self::Custom(minutes) => Some(minutes),
        }
    }
}

/// Holds the selected choice and its deadline.
#[derive(Debug, Default)]
pub struct SleepTimer {
    selected: SleepChoice,
    deadline: Option<Instant>,
}

impl SleepTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `choice` starting at `now`. `Off` cancels.
    ///
    /// # Errors
    ///
    /// Returns [`SleepTimerError::OutOfRange`] for a custom value outside
    /// `1..=1440` and [`SleepTimerError::UnknownChoice`] for a preset past
    /// the list; the previous selection is kept.
    pub fn select(&mut self, choice: SleepChoice, now: Instant) -> Result<(), SleepTimerError> {
        match choice {
            SleepChoice::Custom(minutes) => {
                SleepChoice::custom(minutes)?;
            }
            SleepChoice::Preset(i) if i >= PRESET_MINUTES.len() => {
                return Err(SleepTimerError::UnknownChoice(i + 1));
            }
            _ => {}
        }
        match choice.minutes() {
            Some(minutes) => {
                self.deadline = Some(now + Duration::from_secs(u64::from(minutes) * 60));
                info!(minutes, "sleep timer set");
            }
            None => {
                if self.deadline.take().is_some() {
                    debug!("sleep timer cancelled");
                }
            }
        }
        self.selected = choice;
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.selected = SleepChoice::Off;
        self.deadline = None;
    }

    #[must_use]
    pub fn selected(&self) -> SleepChoice {
        self.selected
    }

    /// Time left before the deadline; zero once it passed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    #[must_use]
    pub fn is_counting_down(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline > now)
    }
}
