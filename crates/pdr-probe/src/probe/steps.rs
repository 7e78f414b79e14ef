use serde::Deserialize;

use crate::probe::format::format_usd;

/// The three checks the probe runs, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    ExchangeInfo,
    Ticker24hr,
    Klines,
}

impl ProbeStep {
    pub const ALL: [ProbeStep; 3] = [ProbeStep::ExchangeInfo, ProbeStep::Ticker24hr, ProbeStep::Klines];

    pub fn number(&self) -> usize {
        match self {
            ProbeStep::ExchangeInfo => 1,
            ProbeStep::Ticker24hr => 2,
            ProbeStep::Klines => 3,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ProbeStep::ExchangeInfo => "/api/v3/exchangeInfo",
            ProbeStep::Ticker24hr => "/api/v3/ticker/24hr",
            ProbeStep::Klines => "/api/v3/klines",
        }
    }

    pub fn query(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ProbeStep::ExchangeInfo => &[],
            ProbeStep::Ticker24hr => &[("symbol", "BTCUSDT")],
            ProbeStep::Klines => &[("symbol", "BTCUSDT"), ("interval", "5m"), ("limit", "5")],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProbeStep::ExchangeInfo => "Exchange Info",
            ProbeStep::Ticker24hr => "24hr Ticker for BTC/USDT",
            ProbeStep::Klines => "OHLCV/Klines for BTC/USDT 5m",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            ProbeStep::ExchangeInfo => "Can access Binance API",
            ProbeStep::Ticker24hr => "Can fetch market data",
            ProbeStep::Klines => "Can fetch OHLCV data (what bot needs)",
        }
    }

    /// Wording used when the request never got a response.
    pub fn failure_action(&self) -> &'static str {
        match self {
            ProbeStep::ExchangeInfo => "Failed to connect",
            ProbeStep::Ticker24hr => "Failed to fetch data",
            ProbeStep::Klines => "Failed to fetch OHLCV",
        }
    }

    /// Parse a 200 body into the figures the report prints.
    pub fn summarize(&self, body: &str) -> Result<PayloadSummary, String> {
        match self {
            ProbeStep::ExchangeInfo => {
                let info: ExchangeInfo = serde_json::from_str(body).map_err(|e| e.to_string())?;
                Ok(PayloadSummary::ExchangeInfo {
                    trading_pairs: info.symbols.len(),
                })
            }
            ProbeStep::Ticker24hr => {
                let ticker: Ticker24hr = serde_json::from_str(body).map_err(|e| e.to_string())?;
                Ok(PayloadSummary::Ticker {
                    last_price: ticker.last_price.value()?,
                    price_change_percent: ticker.price_change_percent.value()?,
                })
            }
            ProbeStep::Klines => {
                let candles: Vec<Vec<serde_json::Value>> =
                    serde_json::from_str(body).map_err(|e| e.to_string())?;
                let latest = match candles.last() {
                    Some(candle) => Some(LatestCandle {
                        open: candle_field(candle, 1)?,
                        close: candle_field(candle, 4)?,
                    }),
                    None => None,
                };
                Ok(PayloadSummary::Klines {
                    candles: candles.len(),
                    latest,
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Ticker24hr {
    #[serde(rename = "lastPrice")]
    last_price: Decimal,
    #[serde(rename = "priceChangePercent")]
    price_change_percent: Decimal,
}

/// Binance quotes decimals as strings; plain JSON numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Decimal {
    Text(String),
    Number(f64),
}

impl Decimal {
    fn value(&self) -> Result<f64, String> {
        match self {
            Decimal::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a number", text)),
            Decimal::Number(n) => Ok(*n),
        }
    }
}

fn candle_field(candle: &[serde_json::Value], index: usize) -> Result<f64, String> {
    let value = candle
        .get(index)
        .ok_or_else(|| format!("candle has no field {}", index))?;
    let decimal: Decimal = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    decimal.value()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestCandle {
    pub open: f64,
    pub close: f64,
}

/// What a successful step learned from its response body.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadSummary {
    ExchangeInfo {
        trading_pairs: usize,
    },
    Ticker {
        last_price: f64,
        price_change_percent: f64,
    },
    Klines {
        candles: usize,
        latest: Option<LatestCandle>,
    },
}

impl PayloadSummary {
    /// Indented report lines.
    pub fn lines(&self) -> Vec<String> {
        match self {
            PayloadSummary::ExchangeInfo { trading_pairs } => {
                vec![format!("   Found {} trading pairs", trading_pairs)]
            }
            PayloadSummary::Ticker {
                last_price,
                price_change_percent,
            } => vec![
                format!("   BTC/USDT Price: ${}", format_usd(*last_price)),
                format!("   24h Change: {:.2}%", price_change_percent),
            ],
            PayloadSummary::Klines { candles, latest } => {
                let mut lines = vec![format!("   Fetched {} candles", candles)];
                if let Some(candle) = latest {
                    lines.push(format!(
                        "   Latest candle: Open=${}, Close=${}",
                        format_usd(candle.open),
                        format_usd(candle.close)
                    ));
                }
                lines
            }
        }
    }
}
