use crate::models::{GradeLetter, Track};

/// Grade points for one letter grade, per course track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradePoints {
    pub regular: f64,
    pub honors: f64,
    pub ap: f64,
}

impl GradePoints {
    const fn new(regular: f64, honors: f64, ap: f64) -> Self {
        GradePoints {
            regular,
            honors,
            ap,
        }
    }

    pub fn for_track(&self, track: Track) -> f64 {
        match track {
            Track::Regular => self.regular,
            Track::Honors => self.honors,
            Track::Ap => self.ap,
        }
    }
}

pub fn points_for(grade: GradeLetter) -> GradePoints {
    match grade {
        GradeLetter::APlus => GradePoints::new(4.33, 5.00, 5.33),
        GradeLetter::A => GradePoints::new(4.00, 4.67, 5.00),
        GradeLetter::AMinus => GradePoints::new(3.67, 4.33, 4.67),
        GradeLetter::BPlus => GradePoints::new(3.33, 4.00, 4.33),
        GradeLetter::B => GradePoints::new(3.00, 3.67, 4.00),
        GradeLetter::BMinus => GradePoints::new(2.67, 3.33, 3.67),
        GradeLetter::CPlus => GradePoints::new(2.33, 3.00, 3.33),
        GradeLetter::C => GradePoints::new(2.00, 2.67, 3.00),
        GradeLetter::CMinus => GradePoints::new(1.67, 2.33, 2.67),
        GradeLetter::DPlus => GradePoints::new(1.33, 2.00, 2.33),
        GradeLetter::D => GradePoints::new(1.00, 1.67, 2.00),
        GradeLetter::DMinus => GradePoints::new(0.67, 1.34, 1.67),
        GradeLetter::U => GradePoints::new(0.00, 0.00, 0.00),
    }
}

pub fn resolve(grade: GradeLetter, track: Track) -> f64 {
    points_for(grade).for_track(track)
}

pub fn weighted_points(grade: GradeLetter, track: Track, credits: f64) -> f64 {
    resolve(grade, track) * credits
}

pub fn unweighted_points(grade: GradeLetter, credits: f64) -> f64 {
    resolve(grade, Track::Regular) * credits
}
