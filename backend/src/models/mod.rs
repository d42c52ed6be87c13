mod portfolio;
mod quote;
mod transaction;

pub use portfolio::{PortfolioSnapshot, PortfolioSummary, PortfolioTotals, PortfolioView};
pub use quote::{HistoricalPoint, HistoryPeriod, PerformancePoint, Quote, TickerMatch};
pub use transaction::{CreateTransaction, LotMetrics, NewTransaction, Transaction};
