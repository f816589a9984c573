use std::sync::Arc;
use std::time::Instant;

use pulse_types::{CallerTag, Dashboard, StockCode};

use crate::pool::Pool;

/// Thin front door onto the [`Pool`] for request handlers (watchlist sync,
/// strategy scanners, `refresh_realtime_data`).
///
/// Exists so handler code never touches `Pool` internals directly, and so
/// the `now` timestamp used for TTL bookkeeping is captured once per
/// request rather than re-read per code.
#[derive(Clone)]
pub struct Ingress {
    pool: Arc<Pool>,
}

impl Ingress {
    /// Wrap `pool` for request-handler use.
    #[must_use]
    pub const fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }

    /// Record interest in `codes` from `tag`.
    pub fn enqueue(&self, codes: impl IntoIterator<Item = StockCode>, tag: CallerTag) {
        self.pool.enqueue_many(codes, tag, Instant::now());
    }

    /// Resolve a `refresh_realtime_data` request's dashboard into the codes
    /// it should force a refresh for: the dashboard's own tag, or every
    /// pooled code for [`Dashboard::All`].
    #[must_use]
    pub fn codes_for_refresh(&self, dashboard: Dashboard) -> Vec<StockCode> {
        match dashboard.caller_tag() {
            Some(tag) => self.pool.codes_for(tag),
            None => self.pool.all_codes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_all_returns_every_pooled_code() {
        let pool = Arc::new(Pool::new());
        let ingress = Ingress::new(Arc::clone(&pool));
        let code = StockCode::parse("000001").unwrap();
        ingress.enqueue([code], CallerTag::Watchlist);
        assert_eq!(ingress.codes_for_refresh(Dashboard::All), vec![code]);
    }

    #[test]
    fn refresh_dashboard_maps_to_its_tag() {
        let pool = Arc::new(Pool::new());
        let ingress = Ingress::new(Arc::clone(&pool));
        let code = StockCode::parse("600519").unwrap();
        ingress.enqueue([code], CallerTag::LimitUp);
        assert_eq!(
            ingress.codes_for_refresh(Dashboard::LimitUpDashboard),
            vec![code]
        );
        assert!(ingress
            .codes_for_refresh(Dashboard::WatchlistDashboard)
            .is_empty());
    }
}
