//! Pull-driven fetch orchestration for one subject at a time
//!
//! `load` issues the base-series fetch and all indicator fetches in
//! parallel, aligns every indicator positionally to the base series,
//! and caches the merged result. Each call starts a new epoch; a call
//! whose epoch has been superseded by a newer one resolves to
//! [`LoadOutcome::Superseded`] and never touches the cache. Network
//! cancellation is best-effort at most; the epoch comparison is what
//! guarantees stale cycles stay inert.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::MarketData;
use crate::cache::ResultCache;
use crate::epoch::RequestEpoch;
use crate::error::{ClientError, Result};
use stockdash_models::{Indicator, IndicatorSeries, IndicatorSet, Kline, Subject};

/// Resolution of one `load` call
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Merged result for the requested subject (fresh or cached).
    Loaded(Arc<IndicatorSet>),
    /// A newer `load` superseded this one; the result was discarded
    /// without touching shared state.
    Superseded,
}

impl LoadOutcome {
    pub fn into_loaded(self) -> Option<Arc<IndicatorSet>> {
        match self {
            Self::Loaded(set) => Some(set),
            Self::Superseded => None,
        }
    }
}

/// Issues and merges the per-subject fetch fan-out
///
/// Owns the epoch counter and the result cache; nothing else writes
/// either. Construct once and share.
pub struct FetchOrchestrator {
    market: Arc<dyn MarketData>,
    epoch: RequestEpoch,
    cache: RwLock<ResultCache>,
}

impl FetchOrchestrator {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self {
            market,
            epoch: RequestEpoch::new(),
            cache: RwLock::new(ResultCache::new()),
        }
    }

    /// Load the merged indicator set for a subject.
    ///
    /// A cache hit returns immediately without network I/O (and does
    /// not refresh the entry's eviction position). Otherwise the base
    /// series and all indicators are fetched concurrently; a failed
    /// indicator contributes nulls, while a failed base series fails
    /// the whole call since there is no alignment axis without it.
    pub async fn load(&self, subject: &Subject) -> Result<LoadOutcome> {
        let my_epoch = self.epoch.bump();

        if let Some(hit) = self.cache.read().await.get(subject) {
            debug!(%subject, "cache hit");
            return Ok(LoadOutcome::Loaded(hit));
        }

        let base_fut = self.market.fetch_kline(subject);
        let indicator_futs = Indicator::ALL.map(|indicator| async move {
            match self.market.fetch_indicator(subject, indicator).await {
                Ok(series) => Some(series),
                Err(e) => {
                    // Recovered locally: this indicator contributes
                    // nulls instead of failing the batch.
                    warn!(%subject, %indicator, error = %e, "indicator fetch failed");
                    None
                }
            }
        });
        let (base, raw_series) =
            tokio::join!(base_fut, futures::future::join_all(indicator_futs));

        // A superseded cycle is inert: no cache write, no value and no
        // error surfaced to the caller.
        if !self.epoch.is_current(my_epoch) {
            debug!(%subject, epoch = my_epoch, "load superseded");
            return Ok(LoadOutcome::Superseded);
        }

        let base = base.map_err(|e| ClientError::BaseSeriesUnavailable {
            subject: subject.to_string(),
            reason: e.to_string(),
        })?;

        let merged = Arc::new(merge(subject.clone(), base, raw_series));
        self.cache
            .write()
            .await
            .insert(subject.clone(), Arc::clone(&merged));
        Ok(LoadOutcome::Loaded(merged))
    }

    /// Number of subjects currently cached.
    pub async fn cached_subjects(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Whether a subject is currently cached.
    pub async fn is_cached(&self, subject: &Subject) -> bool {
        self.cache.read().await.contains(subject)
    }

    /// Drop all cached results.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}

/// Align each indicator to the base series by position: index i of a
/// merged line corresponds to base[i], missing positions are null.
fn merge(
    subject: Subject,
    base: Vec<Kline>,
    raw_series: Vec<Option<IndicatorSeries>>,
) -> IndicatorSet {
    let len = base.len();
    let indicators = Indicator::ALL
        .into_iter()
        .zip(raw_series)
        .map(|(indicator, raw)| {
            let series = match raw {
                Some(series) => series.aligned_to(len),
                None => IndicatorSeries::null(indicator, len),
            };
            (indicator, series)
        })
        .collect();
    IndicatorSet {
        subject,
        base,
        indicators,
    }
}
