// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-report throttling for the channel supervisor.

use std::time::Duration;

use tokio::time::Instant;

/// Limits transport-error reporting to once per window.
///
/// Repeated errors inside the window are swallowed so a flapping connection
/// does not log a storm. The first error in any window is always reported.
#[derive(Debug)]
pub struct ErrorThrottle {
    window: Duration,
    last_report: Option<Instant>,
}

impl ErrorThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_report: None,
        }
    }

    /// True when this error should be reported; advances the window if so.
    pub fn should_report(&mut self, now: Instant) -> bool {
        match self.last_report {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_report = Some(now);
                true
            }
        }
    }
}
