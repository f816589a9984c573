use serde::{Deserialize, Serialize};

/// Closed set of labels identifying which dashboard or subsystem expressed
/// interest in a stock code. New tags require a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerTag {
    /// A user's custom watch list.
    Watchlist,
    /// The moving-average strategy scanner.
    Strategy,
    /// The limit-up unfilled-orders scanner.
    LimitUp,
    /// A client-initiated `refresh_realtime_data` request.
    Refresh,
    /// Startup synchronization from persisted sources.
    Bootstrap,
}

impl CallerTag {
    /// All variants, for exhaustive iteration (dashboard-to-tag mapping, tests).
    pub const ALL: [Self; 5] = [
        Self::Watchlist,
        Self::Strategy,
        Self::LimitUp,
        Self::Refresh,
        Self::Bootstrap,
    ];

    /// Stable lowercase name, used in log fields and the wire protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Watchlist => "watchlist",
            Self::Strategy => "strategy",
            Self::LimitUp => "limitup",
            Self::Refresh => "refresh",
            Self::Bootstrap => "bootstrap",
        }
    }
}

impl std::fmt::Display for CallerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dashboard name, as carried in a `refresh_realtime_data` request. Maps to
/// exactly one [`CallerTag`], or to `all` (every pooled code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    /// Maps to [`CallerTag::Watchlist`].
    WatchlistDashboard,
    /// Maps to [`CallerTag::Strategy`].
    StrategyDashboard,
    /// Maps to [`CallerTag::LimitUp`].
    LimitUpDashboard,
    /// Expands to every code currently in the pool, regardless of tag.
    All,
}

impl Dashboard {
    /// The caller tag this dashboard maps to, or `None` for [`Dashboard::All`]
    /// which expands to the whole pool rather than a single tag's codes.
    #[must_use]
    pub const fn caller_tag(self) -> Option<CallerTag> {
        match self {
            Self::WatchlistDashboard => Some(CallerTag::Watchlist),
            Self::StrategyDashboard => Some(CallerTag::Strategy),
            Self::LimitUpDashboard => Some(CallerTag::LimitUp),
            Self::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_maps_to_tag() {
        assert_eq!(
            Dashboard::WatchlistDashboard.caller_tag(),
            Some(CallerTag::Watchlist)
        );
        assert_eq!(Dashboard::All.caller_tag(), None);
    }
}
