use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Current market snapshot for one symbol. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub company_name: String,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

// One daily bar of a symbol's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMatch {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Look-back window for history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPeriod {
    OneDay,
    OneWeek,
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl HistoryPeriod {
    /// Unknown or missing values fall back to one month.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("1d") => HistoryPeriod::OneDay,
            Some("1w") => HistoryPeriod::OneWeek,
            Some("1mo") => HistoryPeriod::OneMonth,
            Some("3mo") => HistoryPeriod::ThreeMonths,
            Some("6mo") => HistoryPeriod::SixMonths,
            Some("1y") => HistoryPeriod::OneYear,
            _ => HistoryPeriod::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneDay => "1d",
            HistoryPeriod::OneWeek => "1w",
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
        }
    }

    /// Start of the window ending at `end`, using calendar months and years.
    pub fn start_from(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        let months = |n: u32| end.checked_sub_months(Months::new(n)).unwrap_or(end);
        match self {
            HistoryPeriod::OneDay => end - Duration::days(1),
            HistoryPeriod::OneWeek => end - Duration::days(7),
            HistoryPeriod::OneMonth => months(1),
            HistoryPeriod::ThreeMonths => months(3),
            HistoryPeriod::SixMonths => months(6),
            HistoryPeriod::OneYear => months(12),
        }
    }
}
