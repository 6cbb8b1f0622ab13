use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RosterError;
use crate::gpa::{Delta, GpaAggregator, Totals};
use crate::models::{check_credits, ClassDraft, ClassId, ClassRecord, GpaSummary, MarkingPeriod};

/// Ordered marking periods plus the aggregator that tracks their totals.
///
/// Every mutating method validates before touching any state and refreshes
/// both GPA figures before returning, so callers only ever observe a
/// consistent roster.
#[derive(Debug, Clone)]
pub struct RosterStore {
    periods: Vec<MarkingPeriod>,
    aggregator: GpaAggregator,
}

/// On-disk form of a roster; totals are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterFile {
    pub periods: Vec<MarkingPeriod>,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    pub fn new() -> Self {
        RosterStore {
            periods: vec![MarkingPeriod::empty(1)],
            aggregator: GpaAggregator::new(),
        }
    }

    /// Rebuilds a store from its file form, rejecting records whose credits
    /// are negative or not finite.
    pub fn from_file(file: RosterFile) -> Result<Self, RosterError> {
        let mut periods = file.periods;
        for record in periods.iter().flat_map(|period| period.classes.iter()) {
            check_credits(record.credits)?;
        }
        if periods.is_empty() {
            periods.push(MarkingPeriod::empty(1));
        }
        renumber(&mut periods);
        let aggregator = GpaAggregator::from_periods(&periods);
        Ok(RosterStore {
            periods,
            aggregator,
        })
    }

    pub fn to_file(&self) -> RosterFile {
        RosterFile {
            periods: self.periods.clone(),
        }
    }

    pub fn periods(&self) -> &[MarkingPeriod] {
        &self.periods
    }

    pub fn period_count(&self) -> u32 {
        self.periods.len() as u32
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassRecord> {
        self.periods
            .iter()
            .flat_map(|period| period.classes.iter())
            .find(|record| record.id == id)
    }

    pub fn totals(&self) -> Totals {
        self.aggregator.totals()
    }

    pub fn gpa(&self) -> GpaSummary {
        self.aggregator.summary()
    }

    /// Appends a class to `period` (or the last period) and returns a copy of it.
    pub fn add_class(
        &mut self,
        period: Option<u32>,
        draft: ClassDraft,
    ) -> Result<ClassRecord, RosterError> {
        let credits = check_credits(draft.credits)?;
        let index = match period {
            Some(ordinal) => self.period_index(ordinal)?,
            None => self.periods.len() - 1,
        };

        let record = ClassRecord {
            id: ClassId::new(),
            name: draft.name,
            grade: draft.grade,
            credits,
            track: draft.track,
        };
        self.periods[index].classes.push(record.clone());
        self.aggregator.apply(Delta::adding(&record));
        self.refresh();

        info!(
            class_id = %record.id,
            period = self.periods[index].ordinal,
            grade = %record.grade,
            credits = record.credits,
            track = %record.track,
            "class added"
        );
        Ok(record)
    }

    /// Replaces every field of a class, applying the old-to-new change as one delta.
    pub fn edit_class(&mut self, id: ClassId, draft: ClassDraft) -> Result<(), RosterError> {
        let credits = check_credits(draft.credits)?;
        let (period_index, class_index) = self.locate(id)?;

        let slot = &mut self.periods[period_index].classes[class_index];
        let updated = ClassRecord {
            id,
            name: draft.name,
            grade: draft.grade,
            credits,
            track: draft.track,
        };
        let delta = Delta::replacing(slot, &updated);
        *slot = updated;
        self.aggregator.apply(delta);
        self.refresh();

        info!(class_id = %id, "class edited");
        Ok(())
    }

    pub fn delete_class(&mut self, id: ClassId) -> Result<(), RosterError> {
        let (period_index, class_index) = self.locate(id)?;
        let removed = self.periods[period_index].classes.remove(class_index);
        self.aggregator.apply(Delta::removing(&removed));
        self.refresh();

        info!(class_id = %id, "class deleted");
        Ok(())
    }

    pub fn add_period(&mut self) -> &MarkingPeriod {
        let ordinal = self
            .periods
            .iter()
            .map(|period| period.ordinal)
            .max()
            .unwrap_or(0)
            + 1;
        self.periods.push(MarkingPeriod::empty(ordinal));
        self.refresh();

        info!(period = ordinal, "marking period added");
        &self.periods[self.periods.len() - 1]
    }

    pub fn delete_period(&mut self, ordinal: u32) -> Result<(), RosterError> {
        let index = self.period_index(ordinal)?;
        if index == 0 {
            return Err(RosterError::CannotDeleteFirstPeriod);
        }

        let removed = self.periods.remove(index);
        for record in &removed.classes {
            self.aggregator.apply(Delta::removing(record));
        }
        renumber(&mut self.periods);
        self.refresh();

        info!(
            period = ordinal,
            classes = removed.classes.len(),
            "marking period deleted"
        );
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.periods = vec![MarkingPeriod::empty(1)];
        self.aggregator.reset();
        self.refresh();

        info!("roster cleared");
    }

    fn refresh(&mut self) {
        self.aggregator.refresh(&self.periods);
    }

    fn period_index(&self, ordinal: u32) -> Result<usize, RosterError> {
        self.periods
            .iter()
            .position(|period| period.ordinal == ordinal)
            .ok_or(RosterError::PeriodNotFound(ordinal))
    }

    fn locate(&self, id: ClassId) -> Result<(usize, usize), RosterError> {
        self.periods
            .iter()
            .enumerate()
            .find_map(|(period_index, period)| {
                period
                    .classes
                    .iter()
                    .position(|record| record.id == id)
                    .map(|class_index| (period_index, class_index))
            })
            .ok_or(RosterError::ClassNotFound(id))
    }
}

fn renumber(periods: &mut [MarkingPeriod]) {
    for (index, period) in periods.iter_mut().enumerate() {
        period.ordinal = index as u32 + 1;
    }
}
