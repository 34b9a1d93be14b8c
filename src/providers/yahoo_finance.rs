use crate::core::config::YahooProviderConfig;
use crate::core::error::FetchError;
use crate::core::holding::HoldingKey;
use crate::core::price::{Fundamentals, FundamentalsProvider, Quote, QuoteProvider};
use crate::providers::util::with_retry;
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("pfdash/", env!("CARGO_PKG_VERSION"));

/// Maps an exchange-local symbol to the ticker Yahoo Finance knows it by.
pub fn yahoo_symbol(key: &HoldingKey) -> String {
    match key.exchange.to_ascii_uppercase().as_str() {
        "NSE" => format!("{}.NS", key.symbol),
        "BSE" | "BOM" => format!("{}.BO", key.symbol),
        _ => key.symbol.clone(),
    }
}

/// Converts a provider float, rejecting NaN, infinities and values outside
/// the range of `Decimal`.
fn finite_decimal(field: &str, value: f64) -> Result<Decimal, String> {
    if !value.is_finite() {
        return Err(format!("{field} is not a finite number"));
    }
    Decimal::from_str(&value.to_string()).map_err(|_| format!("{field} is out of range"))
}

fn optional_decimal(symbol: &str, field: &str, value: Option<f64>) -> Result<Option<Decimal>, FetchError> {
    value
        .map(|v| finite_decimal(field, v))
        .transpose()
        .map_err(|message| FetchError::parse(symbol, message))
}

/// Quotes and fundamentals from the public Yahoo Finance endpoints.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries: 0,
            retry_delay_ms: 0,
        })
    }

    pub fn from_config(config: &YahooProviderConfig) -> reqwest::Result<Self> {
        Ok(Self::with_timeout(&config.base_url, config.timeout())?
            .with_retries(config.retries, config.retry_delay_ms))
    }

    /// Retries transport failures. HTTP error statuses are not retried.
    pub fn with_retries(mut self, retries: usize, delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, symbol: &str) -> Result<T, FetchError> {
        debug!("Requesting data from {}", url);
        let response = with_retry(
            || self.client.get(url).send(),
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| FetchError::unavailable(symbol, format!("Request error: {e}")))?;

        let status = response.status();
        debug!(%status, "Received Yahoo response");
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::unavailable(symbol, format!("HTTP error: {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::unavailable(symbol, format!("Failed to read response: {e}")))?;
        serde_json::from_str(&text).map_err(|e| FetchError::parse(symbol, e.to_string()))
    }
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_open: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    #[instrument(name = "YahooQuoteFetch", skip(self), fields(key = %key))]
    async fn fetch_quote(&self, key: &HoldingKey) -> Result<Quote, FetchError> {
        let symbol = yahoo_symbol(key);
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol
        );

        let data: ChartResponse = self.get_json(&url, &symbol).await?;
        let meta = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .map(|item| item.meta)
            .ok_or_else(|| FetchError::NotFound(symbol.clone()))?;

        let price = meta
            .regular_market_price
            .ok_or_else(|| FetchError::NotFound(symbol.clone()))?;
        let cmp = finite_decimal("regularMarketPrice", price)
            .map_err(|message| FetchError::parse(&symbol, message))?;
        let previous_close = optional_decimal(
            &symbol,
            "chartPreviousClose",
            meta.chart_previous_close.or(meta.previous_close),
        )?;

        let mut quote = Quote::from_price(&symbol, cmp, previous_close);
        quote.long_name = meta.long_name.or(meta.short_name);
        quote.open = optional_decimal(&symbol, "regularMarketOpen", meta.regular_market_open)?;
        quote.day_high =
            optional_decimal(&symbol, "regularMarketDayHigh", meta.regular_market_day_high)?;
        quote.day_low = optional_decimal(&symbol, "regularMarketDayLow", meta.regular_market_day_low)?;
        Ok(quote)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryItem {
    summary_detail: Option<SummaryDetail>,
    earnings: Option<Earnings>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Earnings {
    financials_chart: Option<FinancialsChart>,
}

#[derive(Deserialize, Debug)]
struct FinancialsChart {
    #[serde(default)]
    yearly: Vec<YearlyFinancials>,
}

#[derive(Deserialize, Debug)]
struct YearlyFinancials {
    date: i32,
    revenue: Option<RawValue>,
    earnings: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 25.3, "fmt": "25.30"}`; an empty object
/// means the figure is not available.
#[derive(Deserialize, Debug)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

#[async_trait]
impl FundamentalsProvider for YahooFinanceProvider {
    #[instrument(name = "YahooFundamentalsFetch", skip(self), fields(key = %key))]
    async fn fetch_fundamentals(&self, key: &HoldingKey) -> Result<Fundamentals, FetchError> {
        let symbol = yahoo_symbol(key);
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=summaryDetail,earnings",
            self.base_url, symbol
        );

        let data: QuoteSummaryResponse = self.get_json(&url, &symbol).await?;
        let item = data
            .quote_summary
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| FetchError::NotFound(symbol.clone()))?;

        let pe_ratio = optional_decimal(
            &symbol,
            "trailingPE",
            raw(item.summary_detail.and_then(|d| d.trailing_pe)),
        )?;

        let latest_year = item
            .earnings
            .and_then(|e| e.financials_chart)
            .and_then(|chart| chart.yearly.into_iter().max_by_key(|y| y.date));

        let mut fundamentals = Fundamentals {
            pe_ratio,
            ..Default::default()
        };
        if let Some(year) = latest_year {
            fundamentals.earnings_year = Some(year.date);
            fundamentals.yearly_revenue = optional_decimal(&symbol, "revenue", raw(year.revenue))?;
            fundamentals.yearly_earnings =
                optional_decimal(&symbol, "earnings", raw(year.earnings))?;
        }
        Ok(fundamentals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(
        request_path: &str,
        status_code: u16,
        mock_response: &str,
    ) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn infy() -> HoldingKey {
        HoldingKey::new("INFY", "NSE")
    }

    #[test]
    fn test_yahoo_symbol_mapping() {
        assert_eq!(yahoo_symbol(&HoldingKey::new("INFY", "NSE")), "INFY.NS");
        assert_eq!(yahoo_symbol(&HoldingKey::new("500209", "BSE")), "500209.BO");
        assert_eq!(yahoo_symbol(&HoldingKey::new("500209", "bom")), "500209.BO");
        assert_eq!(yahoo_symbol(&HoldingKey::new("AAPL", "NASDAQ")), "AAPL");
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "INR",
                        "symbol": "INFY.NS",
                        "regularMarketPrice": 1502.1,
                        "chartPreviousClose": 1480.0,
                        "regularMarketDayHigh": 1510.5,
                        "regularMarketDayLow": 1475.25,
                        "longName": "Infosys Limited"
                    }
                }],
                "error": null
            }
        }"#;
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/INFY.NS"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let quote = provider.fetch_quote(&infy()).await.unwrap();

        assert_eq!(quote.symbol, "INFY.NS");
        assert_eq!(quote.cmp, dec!(1502.1));
        assert_eq!(quote.previous_close, Some(dec!(1480)));
        assert_eq!(quote.change, dec!(22.1));
        assert_eq!(quote.day_high, Some(dec!(1510.5)));
        assert_eq!(quote.day_low, Some(dec!(1475.25)));
        assert_eq!(quote.long_name.as_deref(), Some("Infosys Limited"));
    }

    #[tokio::test]
    async fn test_quote_404_is_not_found() {
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;
        let mock_server =
            create_mock_server("/v8/finance/chart/NOPE.NS", 404, mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_quote(&HoldingKey::new("NOPE", "NSE")).await;
        assert_eq!(result, Err(FetchError::NotFound("NOPE.NS".to_string())));
    }

    #[tokio::test]
    async fn test_quote_empty_result_is_not_found() {
        let mock_response = r#"{"chart": {"result": [], "error": null}}"#;
        let mock_server = create_mock_server("/v8/finance/chart/INFY.NS", 200, mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_quote(&infy()).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_quote_server_error_is_unavailable() {
        let mock_server = create_mock_server("/v8/finance/chart/INFY.NS", 500, "oops").await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        match provider.fetch_quote(&infy()).await {
            Err(FetchError::ProviderUnavailable { symbol, message }) => {
                assert_eq!(symbol, "INFY.NS");
                assert!(message.contains("500"), "{message}");
            }
            other => panic!("Expected ProviderUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quote_malformed_body_is_parse_error() {
        let mock_server =
            create_mock_server("/v8/finance/chart/INFY.NS", 200, "<html>blocked</html>").await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_quote(&infy()).await;
        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        // Nothing listens on the discard port
        let provider = YahooFinanceProvider::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap()
            .with_retries(1, 10);
        let result = provider.fetch_quote(&infy()).await;
        assert!(matches!(result, Err(FetchError::ProviderUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_successful_fundamentals_fetch() {
        let mock_response = r#"{
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {"trailingPE": {"raw": 24.87, "fmt": "24.87"}},
                    "earnings": {
                        "financialsChart": {
                            "yearly": [
                                {"date": 2023, "revenue": {"raw": 1467670000000}, "earnings": {"raw": 241080000000}},
                                {"date": 2024, "revenue": {"raw": 1536700000000}, "earnings": {"raw": 262330000000}},
                                {"date": 2022, "revenue": {"raw": 1216410000000}, "earnings": {"raw": 221100000000}}
                            ]
                        }
                    }
                }],
                "error": null
            }
        }"#;
        let mock_server =
            create_mock_server("/v10/finance/quoteSummary/INFY.NS", 200, mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let fundamentals = provider.fetch_fundamentals(&infy()).await.unwrap();

        assert_eq!(fundamentals.pe_ratio, Some(dec!(24.87)));
        assert_eq!(fundamentals.earnings_year, Some(2024));
        assert_eq!(fundamentals.yearly_revenue, Some(dec!(1536700000000)));
        assert_eq!(fundamentals.yearly_earnings, Some(dec!(262330000000)));
    }

    #[tokio::test]
    async fn test_fundamentals_missing_modules_are_none() {
        let mock_response = r#"{
            "quoteSummary": {
                "result": [{"summaryDetail": {"trailingPE": {}}}],
                "error": null
            }
        }"#;
        let mock_server =
            create_mock_server("/v10/finance/quoteSummary/INFY.NS", 200, mock_response).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let fundamentals = provider.fetch_fundamentals(&infy()).await.unwrap();
        assert_eq!(fundamentals, Fundamentals::default());
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        assert_eq!(
            finite_decimal("cmp", f64::NAN),
            Err("cmp is not a finite number".to_string())
        );
        assert!(finite_decimal("cmp", f64::INFINITY).is_err());
        assert_eq!(finite_decimal("cmp", 0.1), Ok(dec!(0.1)));
        assert!(optional_decimal("X", "trailingPE", Some(f64::NEG_INFINITY)).is_err());
    }

    #[test]
    fn test_out_of_range_numbers_rejected() {
        assert_eq!(
            finite_decimal("revenue", 1e30),
            Err("revenue is out of range".to_string())
        );
        match optional_decimal("X", "revenue", Some(-1e40)) {
            Err(FetchError::Parse { message, .. }) => {
                assert_eq!(message, "revenue is out of range")
            }
            other => panic!("Expected a parse error, got {other:?}"),
        }
    }
}
