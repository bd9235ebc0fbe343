//! Scheduling decision: whether a repository is due for a contribution run
//! and how many commits to produce.
//!
//! The raw interval draw always honours `[min_interval, max_interval]`, for
//! both the uniform and the Poisson distribution (the Poisson sample is
//! centred on the midpoint and clamped back into the bounds). Activity
//! shaping — weekend damping and working-hours deferral — applies to the
//! drawn interval only, never to the commit-count draw, and may legitimately
//! stretch the effective interval beyond `max_interval` when the due moment
//! must be pushed out of a quiet window.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::config::{Cadence, IntervalDistribution, PatternConfig, WorkingHours};

/// Outcome of the scheduling decision for one repository.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Act { commits: u32 },
    Skip { due_in_hours: f64 },
}

/// Decide whether to contribute now.
///
/// A repository with no prior contribution is always due. Otherwise an
/// interval is drawn, shaped, and compared against the elapsed time since
/// the last successful push.
pub fn decide(
    cadence: &Cadence,
    patterns: &PatternConfig,
    last_contribution: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Decision {
    let Some(last) = last_contribution else {
        return Decision::Act {
            commits: draw_commit_count(cadence, rng),
        };
    };

    let raw = draw_interval_hours(cadence, patterns.distribution, rng);
    let shaped = shape_interval(raw, patterns, now);
    let elapsed_hours = (now - last).num_seconds() as f64 / 3600.0;

    if elapsed_hours < shaped {
        Decision::Skip {
            due_in_hours: shaped - elapsed_hours,
        }
    } else {
        Decision::Act {
            commits: draw_commit_count(cadence, rng),
        }
    }
}

/// Draw an interval within `[min_interval_hours, max_interval_hours]`.
pub fn draw_interval_hours(
    cadence: &Cadence,
    distribution: IntervalDistribution,
    rng: &mut impl Rng,
) -> f64 {
    let (lo, hi) = (cadence.min_interval_hours, cadence.max_interval_hours);
    if lo >= hi {
        return lo;
    }
    match distribution {
        IntervalDistribution::Uniform => rng.gen_range(lo..=hi),
        IntervalDistribution::Poisson => {
            let mean = (lo + hi) / 2.0;
            match Poisson::new(mean) {
                Ok(poisson) => poisson.sample(rng).clamp(lo, hi),
                // Mean of zero (or otherwise degenerate) collapses to uniform.
                Err(_) => rng.gen_range(lo..=hi),
            }
        }
    }
}

/// Draw a commit count within `[min_commits, max_commits]`.
pub fn draw_commit_count(cadence: &Cadence, rng: &mut impl Rng) -> u32 {
    if cadence.min_commits >= cadence.max_commits {
        return cadence.min_commits;
    }
    rng.gen_range(cadence.min_commits..=cadence.max_commits)
}

/// Apply activity shaping to a drawn interval.
///
/// Weekend damping stretches intervals whose due moment lands on Saturday or
/// Sunday; working-hours deferral pushes the due moment forward to the next
/// window start. Both operate in UTC.
pub fn shape_interval(raw_hours: f64, patterns: &PatternConfig, now: DateTime<Utc>) -> f64 {
    let mut hours = raw_hours;

    if patterns.weekend_scale != 1.0 {
        let due = now + Duration::seconds((hours * 3600.0) as i64);
        if is_weekend(due) {
            hours *= patterns.weekend_scale;
        }
    }

    if let Some(window) = &patterns.working_hours {
        let due = now + Duration::seconds((hours * 3600.0) as i64);
        hours += hours_until_window(due, window);
    }

    hours
}

fn is_weekend(moment: DateTime<Utc>) -> bool {
    matches!(moment.weekday(), Weekday::Sat | Weekday::Sun)
}

fn hours_until_window(moment: DateTime<Utc>, window: &WorkingHours) -> f64 {
    let hour = moment.hour();
    if hour >= window.start && hour < window.end {
        0.0
    } else if hour < window.start {
        f64::from(window.start - hour)
    } else {
        f64::from(24 - hour + window.start)
    }
}
