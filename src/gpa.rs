use tracing::debug;

use crate::grades;
use crate::models::{ClassRecord, GpaSummary, MarkingPeriod};

pub const PLACEHOLDER: &str = "-";

/// Running credit and point sums across every class in a roster.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub credits: f64,
    pub weighted_points: f64,
}

/// Change in totals caused by one roster mutation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Delta {
    pub credits: f64,
    pub weighted_points: f64,
}

impl Delta {
    pub fn adding(record: &ClassRecord) -> Self {
        Delta {
            credits: record.credits,
            weighted_points: weighted_contribution(record),
        }
    }

    pub fn removing(record: &ClassRecord) -> Self {
        let added = Delta::adding(record);
        Delta {
            credits: -added.credits,
            weighted_points: -added.weighted_points,
        }
    }

    /// Net change for replacing `old` with `new` in place.
    pub fn replacing(old: &ClassRecord, new: &ClassRecord) -> Self {
        Delta {
            credits: new.credits - old.credits,
            weighted_points: weighted_contribution(new) - weighted_contribution(old),
        }
    }
}

/// Sums recomputed from scratch over every period.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rescan {
    pub credits: f64,
    pub weighted_points: f64,
    pub unweighted_points: f64,
}

pub fn weighted_contribution(record: &ClassRecord) -> f64 {
    grades::weighted_points(record.grade, record.track, record.credits)
}

pub fn unweighted_contribution(record: &ClassRecord) -> f64 {
    grades::unweighted_points(record.grade, record.credits)
}

pub fn rescan(periods: &[MarkingPeriod]) -> Rescan {
    periods
        .iter()
        .flat_map(|period| period.classes.iter())
        .fold(Rescan::default(), |mut acc, record| {
            acc.credits += record.credits;
            acc.weighted_points += weighted_contribution(record);
            acc.unweighted_points += unweighted_contribution(record);
            acc
        })
}

fn ratio(points: f64, credits: f64) -> Option<f64> {
    if credits == 0.0 {
        return None;
    }
    let value = points / credits;
    value.is_finite().then_some(value)
}

/// Holds the running totals and the last derived GPA pair for one roster.
#[derive(Debug, Clone, Default)]
pub struct GpaAggregator {
    totals: Totals,
    summary: GpaSummary,
}

impl GpaAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an aggregator whose totals match `periods` exactly.
    pub fn from_periods(periods: &[MarkingPeriod]) -> Self {
        let scan = rescan(periods);
        let mut aggregator = GpaAggregator {
            totals: Totals {
                credits: scan.credits,
                weighted_points: scan.weighted_points,
            },
            summary: GpaSummary::default(),
        };
        aggregator.refresh(periods);
        aggregator
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn summary(&self) -> GpaSummary {
        self.summary
    }

    pub fn weighted_gpa(&self) -> Option<f64> {
        self.summary.weighted
    }

    pub fn unweighted_gpa(&self) -> Option<f64> {
        self.summary.unweighted
    }

    pub fn apply(&mut self, delta: Delta) {
        self.totals = Totals {
            credits: self.totals.credits + delta.credits,
            weighted_points: self.totals.weighted_points + delta.weighted_points,
        };
    }

    pub fn reset(&mut self) {
        self.totals = Totals::default();
        self.summary = GpaSummary::default();
    }

    /// Re-derives both GPA figures; called after every roster mutation.
    pub fn refresh(&mut self, periods: &[MarkingPeriod]) {
        let scan = rescan(periods);
        // Re-base on the rescan so float residue from add/remove cycles never
        // outlives the mutation that produced it.
        self.totals = Totals {
            credits: scan.credits,
            weighted_points: scan.weighted_points,
        };
        self.summary = GpaSummary {
            weighted: ratio(self.totals.weighted_points, self.totals.credits),
            unweighted: ratio(scan.unweighted_points, scan.credits),
        };
        debug!(
            credits = self.totals.credits,
            weighted_points = self.totals.weighted_points,
            weighted = ?self.summary.weighted,
            unweighted = ?self.summary.unweighted,
            "gpa refreshed"
        );
    }
}

pub fn format_gpa(value: Option<f64>) -> String {
    match value {
        Some(gpa) => format!("{gpa:.2}"),
        None => PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassId, GradeLetter, Track};

    fn record(grade: GradeLetter, credits: f64, track: Track) -> ClassRecord {
        ClassRecord {
            id: ClassId::new(),
            name: "Biology".to_string(),
            grade,
            credits,
            track,
        }
    }

    fn period(ordinal: u32, classes: Vec<ClassRecord>) -> MarkingPeriod {
        MarkingPeriod { ordinal, classes }
    }

    #[test]
    fn empty_roster_has_no_gpa() {
        let aggregator = GpaAggregator::from_periods(&[MarkingPeriod::empty(1)]);
        assert_eq!(aggregator.weighted_gpa(), None);
        assert_eq!(aggregator.unweighted_gpa(), None);
        assert_eq!(format_gpa(aggregator.weighted_gpa()), "-");
    }

    #[test]
    fn zero_credit_classes_keep_gpa_undefined() {
        let periods = vec![period(1, vec![record(GradeLetter::A, 0.0, Track::Ap)])];
        let aggregator = GpaAggregator::from_periods(&periods);
        assert_eq!(aggregator.summary(), GpaSummary::default());
    }

    #[test]
    fn unweighted_uses_regular_points_across_periods() {
        let periods = vec![
            period(1, vec![record(GradeLetter::A, 4.0, Track::Ap)]),
            period(2, vec![record(GradeLetter::B, 3.0, Track::Regular)]),
        ];
        let aggregator = GpaAggregator::from_periods(&periods);
        let weighted = aggregator.weighted_gpa().unwrap();
        let unweighted = aggregator.unweighted_gpa().unwrap();
        assert!((weighted - 29.0 / 7.0).abs() < 1e-9);
        assert!((unweighted - 25.0 / 7.0).abs() < 1e-9);
        assert_eq!(format_gpa(Some(weighted)), "4.14");
        assert_eq!(format_gpa(Some(unweighted)), "3.57");
    }

    #[test]
    fn replacing_delta_is_net_change() {
        let old = record(GradeLetter::B, 3.0, Track::Regular);
        let new = ClassRecord {
            track: Track::Ap,
            ..old.clone()
        };
        let delta = Delta::replacing(&old, &new);
        assert_eq!(delta.credits, 0.0);
        assert!((delta.weighted_points - 3.0).abs() < 1e-9);
        assert_eq!(unweighted_contribution(&old), unweighted_contribution(&new));
    }

    #[test]
    fn refresh_snaps_residue_to_zero() {
        let mut aggregator = GpaAggregator::new();
        aggregator.apply(Delta {
            credits: 1e-17,
            weighted_points: 4e-17,
        });
        aggregator.refresh(&[MarkingPeriod::empty(1)]);
        assert_eq!(aggregator.totals(), Totals::default());
        assert_eq!(aggregator.weighted_gpa(), None);
    }

    #[test]
    fn tiny_credits_survive_cancellation_in_running_totals() {
        let tiny = record(GradeLetter::A, 1e-16, Track::Regular);
        let periods = vec![period(1, vec![tiny.clone()])];
        let mut aggregator = GpaAggregator::new();
        aggregator.apply(Delta {
            credits: 3.0,
            weighted_points: 9.0,
        });
        aggregator.apply(Delta::adding(&tiny));
        aggregator.apply(Delta {
            credits: -3.0,
            weighted_points: -9.0,
        });
        aggregator.refresh(&periods);

        assert_eq!(aggregator.totals().credits, 1e-16);
        let summary = aggregator.summary();
        assert!(summary.weighted.is_some());
        assert_eq!(summary.weighted.is_none(), summary.unweighted.is_none());
        assert!((summary.weighted.unwrap() - 4.0).abs() < 1e-9);
    }
}
