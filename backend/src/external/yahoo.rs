use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::external::price_provider::{
    ExternalPricePoint, ExternalQuote, ExternalTickerMatch, PriceProvider, PriceProviderError,
};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";

/// Yahoo Finance provider. No API key required.
///
/// Quotes come from the chart endpoint's `meta` block, history from its daily
/// indicator arrays, and search from the public autocomplete endpoint.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; Stockfolio/0.1)")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        query: &[(&str, String)],
    ) -> Result<YahooResult, PriceProviderError> {
        let url = format!("{}/{}", CHART_URL, symbol);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        check_status(&resp)?;

        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        first_result(body)
    }
}

fn check_status(resp: &reqwest::Response) -> Result<(), PriceProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        404 => Err(PriceProviderError::NotFound),
        429 => Err(PriceProviderError::RateLimited),
        _ => Err(PriceProviderError::BadResponse(format!("HTTP {}", status))),
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    symbol: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_volume: Option<u64>,
    market_cap: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooBars>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YahooBars {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct YahooSearchResponse {
    #[serde(default)]
    quotes: Vec<YahooSearchQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooSearchQuote {
    symbol: Option<String>,
    #[serde(rename = "longname")]
    long_name: Option<String>,
    #[serde(rename = "shortname")]
    short_name: Option<String>,
    exchange: Option<String>,
    type_disp: Option<String>,
}

fn first_result(body: YahooChartResponse) -> Result<YahooResult, PriceProviderError> {
    if let Some(error) = body.chart.error {
        if error.description.contains("No data found") {
            return Err(PriceProviderError::NotFound);
        }
        return Err(PriceProviderError::BadResponse(error.description));
    }

    body.chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or(PriceProviderError::NotFound)
}

fn quote_from_result(result: YahooResult) -> ExternalQuote {
    let meta = result.meta;
    let previous_close = meta.previous_close.or(meta.chart_previous_close);
    let (change, change_percent) = match (meta.regular_market_price, previous_close) {
        (Some(price), Some(prev)) if prev != 0.0 => {
            let change = price - prev;
            (Some(change), Some(change / prev * 100.0))
        }
        _ => (None, None),
    };

    ExternalQuote {
        symbol: meta.symbol,
        long_name: meta.long_name,
        short_name: meta.short_name,
        price: meta.regular_market_price,
        change,
        change_percent,
        previous_close,
        market_cap: meta.market_cap,
        volume: meta.regular_market_volume,
    }
}

fn points_from_result(result: YahooResult) -> Vec<ExternalPricePoint> {
    let bars = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();

    let mut points: Vec<ExternalPricePoint> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            // Skip null closes (market holidays, halted sessions).
            let close = at(&bars.close, i)?;
            let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(ExternalPricePoint {
                date,
                open: at(&bars.open, i),
                high: at(&bars.high, i),
                low: at(&bars.low, i),
                close,
                volume: bars.volume.get(i).copied().flatten(),
            })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        let result = self
            .fetch_chart(
                symbol,
                &[("interval", "1d".to_string()), ("range", "1d".to_string())],
            )
            .await?;
        Ok(quote_from_result(result))
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let result = self
            .fetch_chart(
                symbol,
                &[
                    ("interval", "1d".to_string()),
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                ],
            )
            .await?;
        Ok(points_from_result(result))
    }

    async fn search(&self, query: &str) -> Result<Vec<ExternalTickerMatch>, PriceProviderError> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("quotesCount", "20"), ("newsCount", "0")])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        check_status(&resp)?;

        let body: YahooSearchResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        Ok(body
            .quotes
            .into_iter()
            .map(|q| ExternalTickerMatch {
                symbol: q.symbol,
                long_name: q.long_name,
                short_name: q.short_name,
                exchange: q.exchange,
                type_display: q.type_disp,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "symbol": "AAPL",
                    "longName": "Apple Inc.",
                    "shortName": "Apple",
                    "regularMarketPrice": 150.0,
                    "chartPreviousClose": 148.0,
                    "regularMarketVolume": 51234000
                },
                "timestamp": [1704292200, 1704205800, 1704378600],
                "indicators": {
                    "quote": [{
                        "open": [184.2, 187.1, null],
                        "high": [185.9, 188.4, null],
                        "low": [183.4, 183.8, null],
                        "close": [184.25, 185.64, null],
                        "volume": [58414500, 82488700, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    fn parse(body: &str) -> Result<YahooResult, PriceProviderError> {
        first_result(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_quote_from_chart_meta() {
        let quote = quote_from_result(parse(CHART_BODY).unwrap());

        assert_eq!(quote.symbol.as_deref(), Some("AAPL"));
        assert_eq!(quote.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(quote.price, Some(150.0));
        assert_eq!(quote.previous_close, Some(148.0));
        assert_eq!(quote.change, Some(2.0));
        assert_eq!(quote.volume, Some(51234000));
        assert!(quote.market_cap.is_none());
    }

    #[test]
    fn test_history_skips_null_closes_and_sorts() {
        let points = points_from_result(parse(CHART_BODY).unwrap());

        assert_eq!(points.len(), 2);
        assert!(points[0].date < points[1].date);
        assert_eq!(points[0].close, 185.64);
        assert_eq!(points[1].close, 184.25);
        assert_eq!(points[1].volume, Some(58414500));
    }

    #[test]
    fn test_chart_error_maps_to_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse(body), Err(PriceProviderError::NotFound)));
    }

    #[test]
    fn test_search_payload_deserializes() {
        let body = r#"{"quotes":[{"symbol":"MSFT","shortname":"Microsoft","longname":"Microsoft Corporation","exchange":"NMS","typeDisp":"Equity"}]}"#;
        let parsed: YahooSearchResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.quotes.len(), 1);
        assert_eq!(parsed.quotes[0].long_name.as_deref(), Some("Microsoft Corporation"));
        assert_eq!(parsed.quotes[0].type_disp.as_deref(), Some("Equity"));
    }
}
