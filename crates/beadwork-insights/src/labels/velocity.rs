use beadwork_core::Issue;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityTrend {
    Accelerating,
    Steady,
    Decelerating,
    Erratic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyVelocity {
    /// Monday 00:00 UTC of the week.
    pub week_start: DateTime<Utc>,
    pub closed: usize,
    pub cumulative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityHistory {
    /// Oldest week first.
    pub weeks: Vec<WeeklyVelocity>,
    /// Trailing 4-week moving average per week.
    pub moving_avg_4: Vec<f64>,
    /// Trailing 8-week moving average per week.
    pub moving_avg_8: Vec<f64>,
    pub variance: f64,
    /// `100 * (1 - sigma/mu)` clamped to [0, 100].
    pub consistency: f64,
    pub trend: VelocityTrend,
}

/// Acceleration thresholds on the second-half / first-half closure ratio.
const ACCEL_RATIO: f64 = 1.3;
const DECEL_RATIO: f64 = 0.7;
/// Coefficient of variation above which the history reads as erratic.
const ERRATIC_CV: f64 = 1.0;

/// Weekly closure history over the trailing `weeks` Monday-aligned weeks.
///
/// `label` restricts the population; `None` covers every issue.
pub fn historical_velocity(
    issues: &[Issue],
    label: Option<&str>,
    weeks: usize,
    now: DateTime<Utc>,
) -> VelocityHistory {
    let members: Vec<&Issue> = issues
        .iter()
        .filter(|i| label.is_none_or(|l| i.labels.iter().any(|x| x == l)))
        .collect();

    let current_week = monday_of(now);
    let week_starts: Vec<DateTime<Utc>> = (0..weeks)
        .rev()
        .map(|back| current_week - Duration::weeks(back as i64))
        .collect();

    let mut counts: Vec<usize> = vec![0; week_starts.len()];
    for issue in &members {
        let Some(closed_at) = issue.closed_at else {
            continue;
        };
        let week = monday_of(closed_at);
        if let Some(i) = week_starts.iter().position(|&start| start == week) {
            counts[i] += 1;
        }
    }

    let mut cumulative = 0_usize;
    let week_rows: Vec<WeeklyVelocity> = week_starts
        .iter()
        .zip(&counts)
        .map(|(&week_start, &closed)| {
            cumulative += closed;
            WeeklyVelocity {
                week_start,
                closed,
                cumulative,
            }
        })
        .collect();

    let moving = |window: usize| -> Vec<f64> {
        (0..counts.len())
            .map(|i| {
                let from = i.saturating_sub(window - 1);
                let slice = &counts[from..=i];
                slice.iter().sum::<usize>() as f64 / slice.len() as f64
            })
            .collect()
    };
    let moving_avg_4 = moving(4);
    let moving_avg_8 = moving(8);

    let n = counts.len() as f64;
    let mean = if n > 0.0 {
        counts.iter().sum::<usize>() as f64 / n
    } else {
        0.0
    };
    let variance = if n > 0.0 {
        counts
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / n
    } else {
        0.0
    };
    let sigma = variance.sqrt();
    let consistency = if mean > 0.0 {
        (100.0 * (1.0 - sigma / mean)).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let trend = classify_trend(&counts, mean, sigma);

    VelocityHistory {
        weeks: week_rows,
        moving_avg_4,
        moving_avg_8,
        variance,
        consistency,
        trend,
    }
}

fn classify_trend(counts: &[usize], mean: f64, sigma: f64) -> VelocityTrend {
    if counts.len() < 2 || mean == 0.0 {
        return VelocityTrend::Steady;
    }
    if sigma / mean > ERRATIC_CV {
        return VelocityTrend::Erratic;
    }
    let half = counts.len() / 2;
    let first: usize = counts[..half].iter().sum();
    let second: usize = counts[counts.len() - half..].iter().sum();
    if first == 0 {
        return if second > 0 {
            VelocityTrend::Accelerating
        } else {
            VelocityTrend::Steady
        };
    }
    let ratio = second as f64 / first as f64;
    if ratio > ACCEL_RATIO {
        VelocityTrend::Accelerating
    } else if ratio < DECEL_RATIO {
        VelocityTrend::Decelerating
    } else {
        VelocityTrend::Steady
    }
}

/// Monday 00:00:00 UTC of the week containing `at`.
fn monday_of(at: DateTime<Utc>) -> DateTime<Utc> {
    let days_from_monday = at.weekday().num_days_from_monday() as i64;
    let date = at.date_naive() - Duration::days(days_from_monday);
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}
