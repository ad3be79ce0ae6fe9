//! Competence month enumeration and the accounting period it names.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The accounting month a transaction is attributed to, independent of its
/// actual due or payment date.
///
/// The twelve labels are fixed strings on the wire (`"Janeiro"` through
/// `"Dezembro"`); parsing is an exact label match. The zero-based index
/// mapping is explicit so that due-date construction never depends on
/// ad-hoc string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetenceMonth {
    /// January.
    Janeiro,
    /// February.
    Fevereiro,
    /// March.
    #[serde(rename = "Março")]
    Marco,
    /// April.
    Abril,
    /// May.
    Maio,
    /// June.
    Junho,
    /// July.
    Julho,
    /// August.
    Agosto,
    /// September.
    Setembro,
    /// October.
    Outubro,
    /// November.
    Novembro,
    /// December.
    Dezembro,
}

impl CompetenceMonth {
    /// All twelve months in calendar order.
    pub const ALL: [CompetenceMonth; 12] = [
        CompetenceMonth::Janeiro,
        CompetenceMonth::Fevereiro,
        CompetenceMonth::Marco,
        CompetenceMonth::Abril,
        CompetenceMonth::Maio,
        CompetenceMonth::Junho,
        CompetenceMonth::Julho,
        CompetenceMonth::Agosto,
        CompetenceMonth::Setembro,
        CompetenceMonth::Outubro,
        CompetenceMonth::Novembro,
        CompetenceMonth::Dezembro,
    ];

    /// The zero-based calendar index (Janeiro is 0, Dezembro is 11).
    pub fn index0(self) -> u8 {
        match self {
            CompetenceMonth::Janeiro => 0,
            CompetenceMonth::Fevereiro => 1,
            CompetenceMonth::Marco => 2,
            CompetenceMonth::Abril => 3,
            CompetenceMonth::Maio => 4,
            CompetenceMonth::Junho => 5,
            CompetenceMonth::Julho => 6,
            CompetenceMonth::Agosto => 7,
            CompetenceMonth::Setembro => 8,
            CompetenceMonth::Outubro => 9,
            CompetenceMonth::Novembro => 10,
            CompetenceMonth::Dezembro => 11,
        }
    }

    /// The month with the given zero-based index, or `None` for indexes
    /// past 11.
    pub fn from_index0(index: u8) -> Option<Self> {
        CompetenceMonth::ALL.get(index as usize).copied()
    }

    /// The wire label for this month.
    pub fn label(self) -> &'static str {
        match self {
            CompetenceMonth::Janeiro => "Janeiro",
            CompetenceMonth::Fevereiro => "Fevereiro",
            CompetenceMonth::Marco => "Março",
            CompetenceMonth::Abril => "Abril",
            CompetenceMonth::Maio => "Maio",
            CompetenceMonth::Junho => "Junho",
            CompetenceMonth::Julho => "Julho",
            CompetenceMonth::Agosto => "Agosto",
            CompetenceMonth::Setembro => "Setembro",
            CompetenceMonth::Outubro => "Outubro",
            CompetenceMonth::Novembro => "Novembro",
            CompetenceMonth::Dezembro => "Dezembro",
        }
    }

    /// The equivalent [time::Month] for date construction.
    pub fn as_time_month(self) -> time::Month {
        match self {
            CompetenceMonth::Janeiro => time::Month::January,
            CompetenceMonth::Fevereiro => time::Month::February,
            CompetenceMonth::Marco => time::Month::March,
            CompetenceMonth::Abril => time::Month::April,
            CompetenceMonth::Maio => time::Month::May,
            CompetenceMonth::Junho => time::Month::June,
            CompetenceMonth::Julho => time::Month::July,
            CompetenceMonth::Agosto => time::Month::August,
            CompetenceMonth::Setembro => time::Month::September,
            CompetenceMonth::Outubro => time::Month::October,
            CompetenceMonth::Novembro => time::Month::November,
            CompetenceMonth::Dezembro => time::Month::December,
        }
    }
}

impl FromStr for CompetenceMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompetenceMonth::ALL
            .into_iter()
            .find(|month| month.label() == s)
            .ok_or_else(|| Error::InvalidMonthName(s.to_string()))
    }
}

impl Display for CompetenceMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An accounting period: a competence month plus a competence year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Competence {
    /// The competence month.
    pub month: CompetenceMonth,
    /// The competence year.
    pub year: i32,
}

impl Competence {
    /// Create a competence period.
    pub fn new(month: CompetenceMonth, year: i32) -> Self {
        Self { month, year }
    }
}

impl Display for Competence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}


#[cfg(test)]
mod competence_tests {
    use super::{Competence, CompetenceMonth};

    #[test]
    fn displays_as_month_slash_year() {
        let competence = Competence::new(CompetenceMonth::Maio, 2025);

        assert_eq!(competence.to_string(), "Maio/2025");
    }
}
