use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RosterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeLetter {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "U")]
    U,
}

impl GradeLetter {
    pub const ALL: [GradeLetter; 13] = [
        GradeLetter::APlus,
        GradeLetter::A,
        GradeLetter::AMinus,
        GradeLetter::BPlus,
        GradeLetter::B,
        GradeLetter::BMinus,
        GradeLetter::CPlus,
        GradeLetter::C,
        GradeLetter::CMinus,
        GradeLetter::DPlus,
        GradeLetter::D,
        GradeLetter::DMinus,
        GradeLetter::U,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLetter::APlus => "A+",
            GradeLetter::A => "A",
            GradeLetter::AMinus => "A-",
            GradeLetter::BPlus => "B+",
            GradeLetter::B => "B",
            GradeLetter::BMinus => "B-",
            GradeLetter::CPlus => "C+",
            GradeLetter::C => "C",
            GradeLetter::CMinus => "C-",
            GradeLetter::DPlus => "D+",
            GradeLetter::D => "D",
            GradeLetter::DMinus => "D-",
            GradeLetter::U => "U",
        }
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeLetter {
    type Err = RosterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_uppercase();
        GradeLetter::ALL
            .iter()
            .copied()
            .find(|grade| grade.as_str() == wanted)
            .ok_or_else(|| RosterError::InvalidGrade(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    Regular,
    Honors,
    #[serde(rename = "AP")]
    Ap,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Regular => "Regular",
            Track::Honors => "Honors",
            Track::Ap => "AP",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Track {
    type Err = RosterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(Track::Regular),
            "honors" => Ok(Track::Honors),
            "ap" => Ok(Track::Ap),
            _ => Err(RosterError::InvalidTrack(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub Uuid);

impl ClassId {
    pub fn new() -> Self {
        ClassId(Uuid::new_v4())
    }
}

impl Default for ClassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClassId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(ClassId)
    }
}

/// Validated field values for a class, before it is placed in a period.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDraft {
    pub name: String,
    pub grade: GradeLetter,
    pub credits: f64,
    pub track: Track,
}

impl ClassDraft {
    /// Parses raw form text, failing on the first field that does not validate.
    pub fn parse(name: &str, grade: &str, credits: &str, track: &str) -> Result<Self, RosterError> {
        Ok(ClassDraft {
            name: name.trim().to_string(),
            grade: grade.parse()?,
            credits: parse_credits(credits)?,
            track: track.parse()?,
        })
    }
}

pub fn parse_credits(value: &str) -> Result<f64, RosterError> {
    let credits: f64 = value
        .trim()
        .parse()
        .map_err(|_| RosterError::InvalidCredits(value.to_string()))?;
    check_credits(credits)
}

pub fn check_credits(credits: f64) -> Result<f64, RosterError> {
    if credits.is_finite() && credits >= 0.0 {
        Ok(credits)
    } else {
        Err(RosterError::InvalidCredits(credits.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    pub name: String,
    pub grade: GradeLetter,
    pub credits: f64,
    pub track: Track,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingPeriod {
    pub ordinal: u32,
    pub classes: Vec<ClassRecord>,
}

impl MarkingPeriod {
    pub fn empty(ordinal: u32) -> Self {
        MarkingPeriod {
            ordinal,
            classes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpaSummary {
    pub weighted: Option<f64>,
    pub unweighted: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpaSnapshot {
    pub period_count: u32,
    pub weighted_gpa: Option<f64>,
    pub unweighted_gpa: Option<f64>,
    pub saved_at: DateTime<Utc>,
    pub report_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedSnapshot {
    pub id: i64,
    pub user_id: String,
    pub snapshot: GpaSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_parse_from_display_text() {
        assert_eq!("A+".parse::<GradeLetter>(), Ok(GradeLetter::APlus));
        assert_eq!(" b- ".parse::<GradeLetter>(), Ok(GradeLetter::BMinus));
        assert_eq!("u".parse::<GradeLetter>(), Ok(GradeLetter::U));
        assert_eq!(
            "E".parse::<GradeLetter>(),
            Err(RosterError::InvalidGrade("E".to_string()))
        );
    }

    #[test]
    fn tracks_parse_case_insensitively() {
        assert_eq!("ap".parse::<Track>(), Ok(Track::Ap));
        assert_eq!("Honors".parse::<Track>(), Ok(Track::Honors));
        assert!(matches!("IB".parse::<Track>(), Err(RosterError::InvalidTrack(_))));
    }

    #[test]
    fn credits_reject_negative_and_non_numeric() {
        assert_eq!(parse_credits("3.5"), Ok(3.5));
        assert_eq!(parse_credits("0"), Ok(0.0));
        assert!(matches!(parse_credits("-1"), Err(RosterError::InvalidCredits(_))));
        assert!(matches!(parse_credits("three"), Err(RosterError::InvalidCredits(_))));
        assert!(matches!(parse_credits("NaN"), Err(RosterError::InvalidCredits(_))));
        assert!(matches!(parse_credits("inf"), Err(RosterError::InvalidCredits(_))));
    }

    #[test]
    fn default_class_ids_are_fresh() {
        let first = ClassId::default();
        let second = ClassId::default();
        assert_ne!(first, second);
        assert_ne!(first.0, Uuid::nil());
    }

    #[test]
    fn draft_parse_reports_first_bad_field() {
        let draft = ClassDraft::parse("Chemistry", "A-", "4", "Honors").unwrap();
        assert_eq!(draft.grade, GradeLetter::AMinus);
        assert_eq!(draft.track, Track::Honors);

        let err = ClassDraft::parse("Chemistry", "Z", "-4", "Honors").unwrap_err();
        assert_eq!(err, RosterError::InvalidGrade("Z".to_string()));
    }
}
