//! Day codes and the day-group table used by conflict detection.
//!
//! A combined code such as `MTh` meets on both of its days, so it occupies the
//! same room time as `M` and `Th` individually. The table below is the single
//! source of truth for which codes overlap.

use std::collections::BTreeSet;
use std::fmt;

/// Closed set of meeting-day symbols stored on assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayCode {
    M,
    T,
    W,
    Th,
    F,
    S,
    Su,
    MTh,
    TF,
    WS,
}

use DayCode::*;

/// Overlapping codes for every known day code, including the code itself.
const DAY_GROUPS: [(DayCode, &[DayCode]); 10] = [
    (M, &[M, MTh]),
    (T, &[T, TF]),
    (W, &[W, WS]),
    (Th, &[Th, MTh]),
    (F, &[F, TF]),
    (S, &[S, WS]),
    (Su, &[Su]),
    (MTh, &[M, Th, MTh]),
    (TF, &[T, F, TF]),
    (WS, &[W, S, WS]),
];

impl DayCode {
    pub const ALL: [DayCode; 10] = [M, T, W, Th, F, S, Su, MTh, TF, WS];

    /// Exact, case-sensitive match against the stored abbreviation.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.abbreviation() == raw.trim())
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            M => "M",
            T => "T",
            W => "W",
            Th => "Th",
            F => "F",
            S => "S",
            Su => "Su",
            MTh => "MTh",
            TF => "TF",
            WS => "WS",
        }
    }

    /// Calendar name for single-day codes; combined codes have none.
    pub fn day_name(self) -> Option<&'static str> {
        match self {
            M => Some("Monday"),
            T => Some("Tuesday"),
            W => Some("Wednesday"),
            Th => Some("Thursday"),
            F => Some("Friday"),
            S => Some("Saturday"),
            Su => Some("Sunday"),
            MTh | TF | WS => None,
        }
    }

    pub fn is_combined(self) -> bool {
        self.day_name().is_none()
    }

    pub fn conflicts(self) -> &'static [DayCode] {
        DAY_GROUPS
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, group)| *group)
            .unwrap_or(&[])
    }

    pub fn conflicts_with(self, other: DayCode) -> bool {
        self.conflicts().contains(&other)
    }
}

impl fmt::Display for DayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Day codes whose occupied time overlaps `day_code`.
///
/// Unrecognized codes only conflict with themselves; callers that want to
/// refuse them must check [`DayCode::parse`] first.
pub fn conflict_days(day_code: &str) -> BTreeSet<String> {
    match DayCode::parse(day_code) {
        Some(code) => code
            .conflicts()
            .iter()
            .map(|day| day.abbreviation().to_string())
            .collect(),
        None => BTreeSet::from([day_code.to_string()]),
    }
}

/// Single-day names in calendar order, Monday first.
pub fn single_day_names() -> Vec<&'static str> {
    DayCode::ALL
        .into_iter()
        .filter_map(DayCode::day_name)
        .collect()
}
