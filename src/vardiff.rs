use super::*;

#[derive(Debug, Clone)]
pub struct DecayingAverage {
    value: f64,
    window: Duration,
    last_update: Instant,
}

impl DecayingAverage {
    pub fn new(window: Duration) -> Self {
        Self {
            value: 0.0,
            window,
            last_update: Instant::now(),
        }
    }

    #[cfg(test)]
    fn with_start_time(window: Duration, start: Instant) -> Self {
        Self {
            value: 0.0,
            window,
            last_update: start,
        }
    }

    pub fn record(&mut self, sample: f64, now: Instant) {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }

        let window_secs = self.window.as_secs_f64();
        let decay_exp = (elapsed / window_secs).min(36.0);
        let decay_factor = 1.0 - (-decay_exp).exp();
        let normalizer = 1.0 + decay_factor;

        self.value = (self.value + (sample / elapsed) * decay_factor) / normalizer;
        self.last_update = now;
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Configuration for the vardiff algorithm.
#[derive(Debug, Clone)]
pub struct VardiffConfig {
    /// Target time between share submissions
    pub target_interval: Duration,
    /// Time window for the rolling average
    pub window: Duration,
    /// Minimum shares before considering adjustment
    pub min_shares_for_adjustment: u32,
    /// Minimum time before considering adjustment
    pub min_time_for_adjustment: Duration,
    /// Lower bound of hysteresis band (as fraction of target rate)
    pub hysteresis_low: f64,
    /// Upper bound of hysteresis band (as fraction of target rate)
    pub hysteresis_high: f64,
}

impl VardiffConfig {
    pub fn new(target_interval: Duration, window: Duration) -> Self {
        let target_secs = target_interval.as_secs_f64();
        Self {
            target_interval,
            window,
            // Default thresholds based on ckpool: ~72 shares or ~240 seconds for 5s target
            min_shares_for_adjustment: (target_secs * 14.4) as u32,
            min_time_for_adjustment: Duration::from_secs_f64(target_secs * 48.0),
            // Hysteresis band: [0.5x, 1.33x] of target rate
            hysteresis_low: 0.5,
            hysteresis_high: 1.33,
        }
    }

    /// Target share rate (shares per second at difficulty 1).
    fn target_rate(&self) -> f64 {
        1.0 / self.target_interval.as_secs_f64()
    }
}

impl Default for VardiffConfig {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
    }
}

/// Tracks timing for vardiff decisions.
#[derive(Debug, Clone)]
struct Timing {
    first_share: Instant,
    last_diff_change: Instant,
}

/// Variable difficulty state for a miner connection.
#[derive(Debug, Clone)]
pub struct Vardiff {
    config: VardiffConfig,
    dsps: DecayingAverage,
    current_diff: Difficulty,
    old_diff: Difficulty,
    min_diff: Difficulty,
    max_diff: Option<Difficulty>,
    timing: Option<Timing>,
    shares_since_change: u32,
}

impl Vardiff {
    /// Creates a new vardiff tracker from raw pool settings.
    pub fn new(
        start_diff: Difficulty,
        period: Duration,
        window: Duration,
        min_diff: Option<Difficulty>,
        max_diff: Option<Difficulty>,
    ) -> Self {
        let config = VardiffConfig::new(period, window);
        let min_diff = min_diff.unwrap_or(Difficulty::from(1));
        let start_diff = clamp_diff(start_diff, min_diff, max_diff);

        Self {
            dsps: DecayingAverage::new(config.window),
            config,
            current_diff: start_diff,
            old_diff: start_diff,
            min_diff,
            max_diff,
            timing: None,
            shares_since_change: 0,
        }
    }

    /// Returns the current difficulty.
    pub fn current_diff(&self) -> Difficulty {
        self.current_diff
    }

    /// Overrides the current difficulty, e.g. from a reconnect-difficulty
    /// cache lookup. Still subject to the configured min/max bounds.
    pub fn set_diff(&mut self, diff: Difficulty) {
        self.current_diff = clamp_diff(diff, self.min_diff, self.max_diff);
        self.old_diff = self.current_diff;
    }

    /// Current decaying difficulty-seconds-per-share estimate.
    pub fn dsps(&self) -> f64 {
        self.dsps.value()
    }

    /// Number of shares submitted since the last difficulty change.
    pub fn shares_since_change(&self) -> u32 {
        self.shares_since_change
    }

    /// Records a share and returns a new difficulty if adjustment is needed.
    pub fn record_share(
        &mut self,
        share_diff: Difficulty,
        network_diff: Difficulty,
    ) -> Option<Difficulty> {
        let now = Instant::now();

        // Initialize timing on first share
        if self.timing.is_none() {
            self.timing = Some(Timing {
                first_share: now,
                last_diff_change: now,
            });
        }

        self.dsps.record(share_diff.as_f64(), now);
        self.shares_since_change = self.shares_since_change.saturating_add(1);

        self.evaluate_adjustment(network_diff, now)
    }

    /// Evaluates whether difficulty should be adjusted.
    fn evaluate_adjustment(
        &mut self,
        network_diff: Difficulty,
        now: Instant,
    ) -> Option<Difficulty> {
        let timing = self.timing.as_ref()?;

        let time_since_first = now.duration_since(timing.first_share);
        let time_since_change = now.duration_since(timing.last_diff_change);

        // Check if we have enough data to make a decision
        if !self.ready_for_evaluation(time_since_change) {
            return None;
        }

        let metrics = self.calculate_metrics(time_since_first);

        debug!(
            "Vardiff: evaluating | dsps={:.6} bias={:.4} drr={:.4} target={:.4} range=[{:.4}, {:.4}]",
            metrics.dsps,
            metrics.bias,
            metrics.diff_rate_ratio,
            self.config.target_rate(),
            metrics.low_threshold,
            metrics.high_threshold
        );

        // Check hysteresis - don't adjust if within acceptable range
        if metrics.is_within_hysteresis() {
            debug!("Vardiff: within hysteresis band, no adjustment needed");
            return None;
        }

        self.calculate_new_difficulty(metrics, network_diff, now)
    }

    /// Checks if enough shares/time have passed for evaluation.
    fn ready_for_evaluation(&self, time_since_change: Duration) -> bool {
        let enough_shares = self.shares_since_change >= self.config.min_shares_for_adjustment;
        let enough_time = time_since_change >= self.config.min_time_for_adjustment;

        if !enough_shares && !enough_time {
            debug!(
                "Vardiff: skipping (shares={}/{} time={:.1}s/{:.1}s)",
                self.shares_since_change,
                self.config.min_shares_for_adjustment,
                time_since_change.as_secs_f64(),
                self.config.min_time_for_adjustment.as_secs_f64()
            );
            return false;
        }
        true
    }

    /// Calculates current metrics for difficulty evaluation.
    fn calculate_metrics(&self, time_since_first: Duration) -> Metrics {
        let bias = calculate_time_bias(time_since_first, self.config.window);
        let dsps = self.dsps.value() / bias;
        let current_diff = self.current_diff.as_f64();
        let diff_rate_ratio = dsps / current_diff;
        let target_rate = self.config.target_rate();

        Metrics {
            dsps,
            bias,
            diff_rate_ratio,
            low_threshold: target_rate * self.config.hysteresis_low,
            high_threshold: target_rate * self.config.hysteresis_high,
        }
    }

    /// Calculates and applies new difficulty if appropriate.
    fn calculate_new_difficulty(
        &mut self,
        metrics: Metrics,
        network_diff: Difficulty,
        now: Instant,
    ) -> Option<Difficulty> {
        // Calculate optimal difficulty: dsps * target_interval
        let optimal = metrics.dsps * self.config.target_interval.as_secs_f64();

        let ceiling = self
            .max_diff
            .map(|d| d.as_f64().min(network_diff.as_f64()))
            .unwrap_or(network_diff.as_f64());
        let floor = self.min_diff.as_f64();
        let clamped = optimal.clamp(floor.min(ceiling), ceiling.max(floor));

        debug!(
            "Vardiff: optimal={:.6} clamped={:.6} (min={:.6}, max={:.6})",
            optimal, clamped, floor, ceiling
        );

        if clamped <= 0.0 {
            debug!("Vardiff: invalid clamped value, skipping");
            return None;
        }

        let new_diff = Difficulty::from(clamped);

        // No change if already at optimal
        if self.current_diff == new_diff {
            debug!("Vardiff: already at optimal difficulty {}", new_diff);
            return None;
        }

        // Guard against oscillation on difficulty decrease
        if new_diff < self.current_diff && self.shares_since_change == 1 {
            debug!("Vardiff: first share after potential decrease, deferring");
            if let Some(ref mut timing) = self.timing {
                timing.last_diff_change = now;
            }
            return None;
        }

        debug!(
            "Vardiff: adjusting {} -> {} (drr={:.4} outside [{:.4}, {:.4}])",
            self.current_diff,
            new_diff,
            metrics.diff_rate_ratio,
            metrics.low_threshold,
            metrics.high_threshold
        );

        self.apply_difficulty_change(new_diff, now);
        Some(new_diff)
    }

    /// Applies a difficulty change and resets tracking state.
    fn apply_difficulty_change(&mut self, new_diff: Difficulty, now: Instant) {
        self.old_diff = self.current_diff;
        self.current_diff = new_diff;
        self.shares_since_change = 0;
        if let Some(ref mut timing) = self.timing {
            timing.last_diff_change = now;
        }
    }

    /// Returns current statistics.
    pub fn stats(&self) -> VardiffStats {
        VardiffStats {
            dsps: self.dsps.value(),
            shares_since_change: self.shares_since_change,
        }
    }
}

/// Metrics used for difficulty evaluation.
struct Metrics {
    dsps: f64,
    bias: f64,
    diff_rate_ratio: f64,
    low_threshold: f64,
    high_threshold: f64,
}

impl Metrics {
    fn is_within_hysteresis(&self) -> bool {
        self.diff_rate_ratio > self.low_threshold && self.diff_rate_ratio < self.high_threshold
    }
}

/// Statistics about vardiff state.
#[derive(Debug, Clone)]
pub struct VardiffStats {
    pub dsps: f64,
    pub shares_since_change: u32,
}

/// Calculates time bias based on how much history we have.
///
/// Returns a value approaching 1.0 as elapsed time exceeds the window.
fn calculate_time_bias(elapsed: Duration, window: Duration) -> f64 {
    let ratio = (elapsed.as_secs_f64() / window.as_secs_f64()).min(36.0);
    1.0 - (-ratio).exp()
}

fn clamp_diff(diff: Difficulty, min_diff: Difficulty, max_diff: Option<Difficulty>) -> Difficulty {
    let diff = if diff < min_diff { min_diff } else { diff };
    match max_diff {
        Some(max_diff) if diff > max_diff => max_diff,
        _ => diff,
    }
}
