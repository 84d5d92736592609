//! Time-decayed popularity scoring.
//!
//! Pure and deterministic: the score is always recomputed at read time from
//! whatever counters are current, never persisted. Tuning lives in
//! `[ranking]` settings because the decay constant changes how the feed
//! "feels".

use serde::Deserialize;
use time::OffsetDateTime;

/// Default decay constant: the reference constant 45 000 expressed in
/// milliseconds, giving roughly a 12.5 hour half-life.
pub const DEFAULT_DECAY_MS: f64 = 45_000_000.0;

/// Default exponent applied to the normalized age term.
pub const DEFAULT_GRAVITY: f64 = 1.5;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Age normalization constant in milliseconds.
    pub decay_ms: f64,
    /// Exponent on the age term; larger values favor recency harder.
    pub gravity: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            decay_ms: DEFAULT_DECAY_MS,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

/// `(up - down) / (1 + age_ms / decay_ms) ^ gravity`
///
/// The `1 +` term makes zero age safe. Negative ages (clock skew between
/// writer and reader) clamp to zero rather than inflating the score.
pub fn decay_score(
    upvotes: i64,
    downvotes: i64,
    created_at: OffsetDateTime,
    now: OffsetDateTime,
    config: &RankingConfig,
) -> f64 {
    let age_ms = ((now - created_at).whole_milliseconds() as f64).max(0.0);
    let differential = (upvotes - downvotes) as f64;
    differential / (1.0 + age_ms / config.decay_ms).powf(config.gravity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2026-01-01 00:00 UTC);

    #[test]
    fn deterministic_for_identical_inputs() {
        let config = RankingConfig::default();
        let a = decay_score(10, 2, T0, T0, &config);
        let b = decay_score(10, 2, T0, T0, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_age_is_raw_differential() {
        let config = RankingConfig::default();
        assert_eq!(decay_score(10, 2, T0, T0, &config), 8.0);
        assert_eq!(decay_score(0, 0, T0, T0, &config), 0.0);
    }

    #[test]
    fn score_decays_monotonically_with_age() {
        let config = RankingConfig::default();
        let mut previous = decay_score(10, 2, T0, T0, &config);
        for hours in [1, 6, 24, 72, 720] {
            let score = decay_score(10, 2, T0, T0 + Duration::hours(hours), &config);
            assert!(
                score < previous,
                "score at +{hours}h ({score}) should be below {previous}"
            );
            previous = score;
        }
    }

    #[test]
    fn score_grows_with_differential_at_fixed_age() {
        let config = RankingConfig::default();
        let now = T0 + Duration::hours(3);
        let low = decay_score(5, 2, T0, now, &config);
        let high = decay_score(9, 2, T0, now, &config);
        assert!(high > low);
    }

    #[test]
    fn negative_differential_stays_negative() {
        let config = RankingConfig::default();
        let now = T0 + Duration::hours(1);
        assert!(decay_score(1, 5, T0, now, &config) < 0.0);
    }

    #[test]
    fn clock_skew_clamps_to_zero_age() {
        let config = RankingConfig::default();
        // created_at in the future relative to `now`
        let skewed = decay_score(10, 2, T0 + Duration::minutes(5), T0, &config);
        assert_eq!(skewed, 8.0);
    }

    #[test]
    fn decay_constant_is_tunable() {
        let fast = RankingConfig {
            decay_ms: 1_000.0,
            ..Default::default()
        };
        let slow = RankingConfig::default();
        let now = T0 + Duration::hours(1);
        assert!(decay_score(10, 0, T0, now, &fast) < decay_score(10, 0, T0, now, &slow));
    }
}
