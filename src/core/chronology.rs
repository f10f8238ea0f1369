//! Most-recent-first ordering for timeline entries (experience, education).
//!
//! Records are compared on an [`EffectiveKey`]: the effective end year and
//! month, then the start year and month, all descending. An ongoing record, or
//! one without an end, uses its start as its end. Missing years count as 0 and
//! missing or unknown months as January; these defaults only affect the
//! comparison, never the records themselves.

use crate::domain::model::{Period, PeriodFields};
use std::cmp::Ordering;

/// Canonical month names, January first.
pub const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// 0-based month index; anything unrecognized is January.
///
/// Case, surrounding whitespace and accents are ignored, English names and
/// the "Setiembre" spelling are accepted.
pub fn month_index(name: Option<&str>) -> u8 {
    let Some(name) = name else {
        return 0;
    };
    let folded = fold(name);
    if folded == "setiembre" {
        return 8;
    }

    MONTHS
        .iter()
        .position(|m| fold(m) == folded)
        .or_else(|| ENGLISH_MONTHS.iter().position(|m| *m == folded))
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(0)
}

fn fold(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized comparison key of a period record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveKey {
    pub end_year: i32,
    pub end_month: u8,
    pub start_year: i32,
    pub start_month: u8,
}

impl EffectiveKey {
    /// Most recent first: every component compares descending.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        other
            .end_year
            .cmp(&self.end_year)
            .then(other.end_month.cmp(&self.end_month))
            .then(other.start_year.cmp(&self.start_year))
            .then(other.start_month.cmp(&self.start_month))
    }
}

pub fn effective_key(period: &PeriodFields<'_>) -> EffectiveKey {
    let start_year = period.start_year.unwrap_or(0);
    let start_month = month_index(period.start_month);

    // 進行中的項目以開始日期作為結束日期
    let end_year = match period.end_year {
        Some(year) if !period.ongoing => year,
        _ => start_year,
    };
    let end_month = match period.end_month {
        Some(month) if !period.ongoing => month_index(Some(month)),
        _ => start_month,
    };

    EffectiveKey {
        end_year,
        end_month,
        start_year,
        start_month,
    }
}

/// Orders records most recent first. Full ties keep their input order.
pub fn rank<T: Period>(records: Vec<T>) -> Vec<T> {
    let mut keyed: Vec<(EffectiveKey, T)> = records
        .into_iter()
        .map(|record| (effective_key(&record.period()), record))
        .collect();

    // sort_by is stable
    keyed.sort_by(|(a, _), (b, _)| a.recency_cmp(b));

    keyed.into_iter().map(|(_, record)| record).collect()
}
