use std::time::Duration;

use tokio::time::Instant;

use super::PlaybackStatus;

/// Continuous playback position derived from sparse reports.
///
/// Holds the last reported position together with the instant it was
/// observed. While playing, the estimate advances by elapsed time scaled by
/// the playback rate; otherwise it stays frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEstimator {
    position: i64,
    anchor: Instant,
    rate: f64,
    status: PlaybackStatus,
    length: Option<i64>,
    epoch: u64,
}

impl PositionEstimator {
    /// Stopped estimator at position zero
    pub fn new(now: Instant) -> Self {
        Self {
            position: 0,
            anchor: now,
            rate: 1.0,
            status: PlaybackStatus::Stopped,
            length: None,
            epoch: 0,
        }
    }

    /// Replace the baseline with a reported position
    pub fn rebase(&mut self, position: i64, now: Instant) {
        self.position = position.max(0);
        self.anchor = now;
    }

    /// Jump to a position reported out of band (seek, track change).
    ///
    /// Bumps the [`epoch`](Self::epoch), so position reads started before the
    /// jump can be recognized as outdated.
    pub fn jump(&mut self, position: i64, now: Instant) {
        self.epoch = self.epoch.wrapping_add(1);
        self.rebase(position, now);
    }

    /// Counter of discontinuous jumps
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Update the playback status.
    ///
    /// The estimate at `now` becomes the new baseline, so leaving `Playing`
    /// freezes the position and entering it starts counting from `now`.
    pub fn set_status(&mut self, status: PlaybackStatus, now: Instant) {
        if status == self.status {
            return;
        }

        let position = self.estimate(now);
        self.status = status;
        self.rebase(position, now);
    }

    /// Update the playback rate. Non-positive or non-finite rates are ignored.
    pub fn set_rate(&mut self, rate: f64, now: Instant) {
        if !rate.is_finite() || rate <= 0.0 {
            return;
        }

        let position = self.estimate(now);
        self.rate = rate;
        self.rebase(position, now);
    }

    /// Track length used to clamp the estimate
    pub fn set_length(&mut self, length: Option<i64>) {
        self.length = length.filter(|length| *length > 0);
    }

    /// Current status
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Current rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Estimated position in microseconds at `now`
    pub fn estimate(&self, now: Instant) -> i64 {
        let mut position = self.position;

        if self.status == PlaybackStatus::Playing {
            let elapsed = now.saturating_duration_since(self.anchor);
            position = position.saturating_add(scaled_micros(elapsed, self.rate));
        }

        let position = position.max(0);
        match self.length {
            Some(length) => position.min(length),
            None => position,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn scaled_micros(elapsed: Duration, rate: f64) -> i64 {
    (elapsed.as_micros() as f64 * rate) as i64
}
