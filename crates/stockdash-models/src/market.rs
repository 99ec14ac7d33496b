//! Market data types: subjects, K-line bars, and indicator shapes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// K-line aggregation period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// What the fetch orchestrator is currently looking at
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    pub period: Period,
}

impl Subject {
    pub fn new(code: impl Into<String>, period: Period) -> Self {
        Self {
            code: code.into(),
            period,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.code, self.period.as_str())
    }
}

/// One K-line bar of the base series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

/// Technical indicator identifiers served by the indicator endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Sma,
    Ema,
    Macd,
    Rsi,
    Kdj,
    Boll,
}

impl Indicator {
    /// All indicators fetched per subject, in request order.
    pub const ALL: [Indicator; 6] = [
        Self::Sma,
        Self::Ema,
        Self::Macd,
        Self::Rsi,
        Self::Kdj,
        Self::Boll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Macd => "macd",
            Self::Rsi => "rsi",
            Self::Kdj => "kdj",
            Self::Boll => "boll",
        }
    }

    /// Default lookback parameter sent as `?period=N`, if the
    /// indicator takes one.
    pub fn query_period(&self) -> Option<u32> {
        match self {
            Self::Sma | Self::Ema | Self::Boll => Some(20),
            Self::Rsi => Some(14),
            Self::Macd | Self::Kdj => None,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-indicator response shape, also used for aligned output
///
/// Values are optional because indicator warm-up windows produce nulls
/// and alignment pads short series with nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorSeries {
    Macd {
        macd: Vec<Option<f64>>,
        signal: Vec<Option<f64>>,
        histogram: Vec<Option<f64>>,
    },
    Kdj {
        k: Vec<Option<f64>>,
        d: Vec<Option<f64>>,
        j: Vec<Option<f64>>,
    },
    Boll {
        upper: Vec<Option<f64>>,
        middle: Vec<Option<f64>>,
        lower: Vec<Option<f64>>,
    },
    Values { values: Vec<Option<f64>> },
}

/// Pad with trailing nulls or truncate so `line.len() == len`.
fn align_line(mut line: Vec<Option<f64>>, len: usize) -> Vec<Option<f64>> {
    line.resize(len, None);
    line
}

impl IndicatorSeries {
    /// Realign every line of this series to exactly `len` positions.
    ///
    /// Shorter lines gain trailing nulls; longer lines are truncated.
    pub fn aligned_to(self, len: usize) -> Self {
        match self {
            Self::Macd {
                macd,
                signal,
                histogram,
            } => Self::Macd {
                macd: align_line(macd, len),
                signal: align_line(signal, len),
                histogram: align_line(histogram, len),
            },
            Self::Kdj { k, d, j } => Self::Kdj {
                k: align_line(k, len),
                d: align_line(d, len),
                j: align_line(j, len),
            },
            Self::Boll {
                upper,
                middle,
                lower,
            } => Self::Boll {
                upper: align_line(upper, len),
                middle: align_line(middle, len),
                lower: align_line(lower, len),
            },
            Self::Values { values } => Self::Values {
                values: align_line(values, len),
            },
        }
    }

    /// All-null series for an indicator whose fetch failed.
    pub fn null(indicator: Indicator, len: usize) -> Self {
        let nulls = || vec![None; len];
        match indicator {
            Indicator::Macd => Self::Macd {
                macd: nulls(),
                signal: nulls(),
                histogram: nulls(),
            },
            Indicator::Kdj => Self::Kdj {
                k: nulls(),
                d: nulls(),
                j: nulls(),
            },
            Indicator::Boll => Self::Boll {
                upper: nulls(),
                middle: nulls(),
                lower: nulls(),
            },
            Indicator::Sma | Indicator::Ema | Indicator::Rsi => Self::Values { values: nulls() },
        }
    }

    /// Length of the series (all lines share it after alignment).
    pub fn len(&self) -> usize {
        match self {
            Self::Macd { macd, .. } => macd.len(),
            Self::Kdj { k, .. } => k.len(),
            Self::Boll { upper, .. } => upper.len(),
            Self::Values { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if no position carries a value on any line.
    pub fn is_all_null(&self) -> bool {
        let all_null = |line: &[Option<f64>]| line.iter().all(Option::is_none);
        match self {
            Self::Macd {
                macd,
                signal,
                histogram,
            } => all_null(macd) && all_null(signal) && all_null(histogram),
            Self::Kdj { k, d, j } => all_null(k) && all_null(d) && all_null(j),
            Self::Boll {
                upper,
                middle,
                lower,
            } => all_null(upper) && all_null(middle) && all_null(lower),
            Self::Values { values } => all_null(values),
        }
    }
}

/// Merged, positionally aligned result for one subject
///
/// Every indicator series has exactly `base.len()` positions; index i
/// of any line corresponds to `base[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub subject: Subject,
    pub base: Vec<Kline>,
    pub indicators: BTreeMap<Indicator, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_display_is_cache_key_shaped() {
        let subject = Subject::new("600519", Period::Daily);
        assert_eq!(subject.to_string(), "600519/daily");
    }

    #[test]
    fn indicator_decode_values_shape() {
        let series: IndicatorSeries =
            serde_json::from_str(r#"{"values":[null,1.5,2.0]}"#).expect("decode");
        assert_eq!(
            series,
            IndicatorSeries::Values {
                values: vec![None, Some(1.5), Some(2.0)]
            }
        );
    }

    #[test]
    fn indicator_decode_macd_shape() {
        let series: IndicatorSeries =
            serde_json::from_str(r#"{"macd":[0.1],"signal":[0.2],"histogram":[-0.1]}"#)
                .expect("decode");
        assert!(matches!(series, IndicatorSeries::Macd { .. }));
    }

    #[test]
    fn indicator_decode_kdj_and_boll_shapes() {
        let kdj: IndicatorSeries =
            serde_json::from_str(r#"{"k":[50.0],"d":[45.0],"j":[60.0]}"#).expect("decode");
        assert!(matches!(kdj, IndicatorSeries::Kdj { .. }));

        let boll: IndicatorSeries =
            serde_json::from_str(r#"{"upper":[11.0],"middle":[10.0],"lower":[9.0]}"#)
                .expect("decode");
        assert!(matches!(boll, IndicatorSeries::Boll { .. }));
    }

    #[test]
    fn align_pads_short_series_with_nulls() {
        let series = IndicatorSeries::Values {
            values: vec![Some(1.0), Some(2.0), Some(3.0)],
        };
        let aligned = series.aligned_to(5);
        assert_eq!(
            aligned,
            IndicatorSeries::Values {
                values: vec![Some(1.0), Some(2.0), Some(3.0), None, None]
            }
        );
    }

    #[test]
    fn align_truncates_long_series() {
        let series = IndicatorSeries::Values {
            values: vec![Some(1.0); 8],
        };
        assert_eq!(series.aligned_to(5).len(), 5);
    }

    #[test]
    fn null_series_matches_indicator_shape() {
        let series = IndicatorSeries::null(Indicator::Kdj, 3);
        assert_eq!(series.len(), 3);
        assert!(series.is_all_null());
        assert!(matches!(series, IndicatorSeries::Kdj { .. }));
    }

    #[test]
    fn kline_date_decodes_iso_format() {
        let bar: Kline = serde_json::from_str(
            r#"{"date":"2024-03-01","open":10.0,"high":11.0,"low":9.5,"close":10.5,"volume":1200}"#,
        )
        .expect("decode");
        assert_eq!(bar.date.to_string(), "2024-03-01");
        assert_eq!(bar.volume, Some(1200));
    }
}
