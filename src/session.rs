use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::models::ClassDraft;
use crate::roster::{RosterFile, RosterStore};

/// Loads the roster file, or starts a fresh roster when none exists yet.
pub fn load_roster(path: &Path) -> anyhow::Result<RosterStore> {
    if !path.exists() {
        return Ok(RosterStore::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    let file: RosterFile = serde_json::from_str(&contents)
        .with_context(|| format!("roster {} is not valid JSON", path.display()))?;
    RosterStore::from_file(file)
        .with_context(|| format!("roster {} holds an invalid class", path.display()))
}

pub fn save_roster(path: &Path, roster: &RosterStore) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(&roster.to_file())?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write roster {}", path.display()))?;
    Ok(())
}

/// Adds every row of a CSV file to the roster, creating missing periods.
///
/// Rows are validated up front; a bad row aborts the import before any class is added.
/// A row may open at most one new marking period past those already known.
pub fn import_csv(roster: &mut RosterStore, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        period: Option<u32>,
        name: String,
        grade: String,
        credits: String,
        track: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();
    let mut known_periods = roster.period_count();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let line = index + 2;
        let draft = ClassDraft::parse(&row.name, &row.grade, &row.credits, &row.track)
            .with_context(|| format!("invalid class on line {line}"))?;
        match row.period {
            Some(0) => anyhow::bail!("invalid class on line {line}: marking periods start at 1"),
            Some(ordinal) if ordinal > known_periods + 1 => anyhow::bail!(
                "invalid class on line {line}: marking period {ordinal} skips past period {}",
                known_periods + 1
            ),
            Some(ordinal) => known_periods = known_periods.max(ordinal),
            None => {}
        }
        rows.push((row.period, draft));
    }

    let mut imported = 0usize;
    for (period, draft) in rows {
        if let Some(ordinal) = period {
            while roster.period_count() < ordinal {
                roster.add_period();
            }
        }
        roster.add_class(period, draft)?;
        imported += 1;
    }

    info!(imported, path = %csv_path.display(), "classes imported");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpa::format_gpa;
    use crate::models::{GradeLetter, Track};

    #[test]
    fn missing_file_starts_fresh_roster() {
        let dir = tempfile::tempdir().unwrap();
        let roster = load_roster(&dir.path().join("roster.json")).unwrap();
        assert_eq!(roster.period_count(), 1);
    }

    #[test]
    fn roster_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/roster.json");
        let mut roster = RosterStore::new();
        roster
            .add_class(
                None,
                ClassDraft {
                    name: "Physics".to_string(),
                    grade: GradeLetter::AMinus,
                    credits: 4.0,
                    track: Track::Honors,
                },
            )
            .unwrap();
        roster.add_period();

        save_roster(&path, &roster).unwrap();
        let loaded = load_roster(&path).unwrap();

        assert_eq!(loaded.periods(), roster.periods());
        assert_eq!(loaded.gpa(), roster.gpa());
    }

    #[test]
    fn corrupt_roster_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_roster(&path).is_err());
    }

    #[test]
    fn import_creates_periods_and_updates_gpa() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.csv");
        std::fs::write(
            &path,
            "period,name,grade,credits,track\n\
             1,AP Chemistry,A,4,AP\n\
             2,Algebra II,B,3,Regular\n\
             3,Algebra II,B,0,Regular\n\
             ,Art,A,2,Regular\n",
        )
        .unwrap();

        let mut roster = RosterStore::new();
        let imported = import_csv(&mut roster, &path).unwrap();

        assert_eq!(imported, 4);
        assert_eq!(roster.period_count(), 3);
        assert_eq!(roster.periods()[2].classes.len(), 2);
        assert_eq!(format_gpa(roster.gpa().weighted), "4.11");
        assert_eq!(format_gpa(roster.gpa().unweighted), "3.67");
    }

    #[test]
    fn bad_row_aborts_whole_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.csv");
        std::fs::write(
            &path,
            "period,name,grade,credits,track\n\
             1,Chemistry,A,4,AP\n\
             1,Gym,Q,1,Regular\n",
        )
        .unwrap();

        let mut roster = RosterStore::new();
        assert!(import_csv(&mut roster, &path).is_err());
        assert!(roster.periods()[0].classes.is_empty());
        assert_eq!(roster.gpa().weighted, None);
    }

    #[test]
    fn import_rejects_period_far_past_the_last() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.csv");
        std::fs::write(
            &path,
            "period,name,grade,credits,track\n\
             1,Chemistry,A,4,AP\n\
             4000000000,Gym,A,1,Regular\n",
        )
        .unwrap();

        let mut roster = RosterStore::new();
        let err = import_csv(&mut roster, &path).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert_eq!(roster.period_count(), 1);
        assert!(roster.periods()[0].classes.is_empty());
    }

    #[test]
    fn hand_edited_negative_credits_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(
            &path,
            r#"{"periods":[{"ordinal":1,"classes":[
                {"id":"3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2","name":"Gym","grade":"A","credits":-3.0,"track":"Regular"}
            ]}]}"#,
        )
        .unwrap();

        let err = load_roster(&path).unwrap_err();
        assert!(err.to_string().contains("invalid class"), "{err}");
    }
}
