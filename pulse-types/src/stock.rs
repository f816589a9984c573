use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The exchange a [`StockCode`] is listed on, inferred from its leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// Codes beginning with `0` or `3`.
    Shenzhen,
    /// Codes beginning with `6`.
    Shanghai,
}

impl Exchange {
    /// Suffix used by the `slow` (tushare-style) source, e.g. `.SZ`.
    #[must_use]
    pub const fn dot_suffix(self) -> &'static str {
        match self {
            Self::Shenzhen => ".SZ",
            Self::Shanghai => ".SH",
        }
    }

    /// Prefix used by the `scrape` source's URL template, e.g. `sz`.
    #[must_use]
    pub const fn lower_prefix(self) -> &'static str {
        match self {
            Self::Shenzhen => "sz",
            Self::Shanghai => "sh",
        }
    }
}

/// A 6-character equity ticker.
///
/// Stored as a fixed-size byte array rather than a heap `String` so that
/// pool and cache entries stay `Copy` and cheap to key maps by.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode([u8; 6]);

impl StockCode {
    /// Parse a stock code from a string, validating its shape.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidInput`] unless `s` is exactly 6 ASCII
    /// digits.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let bytes = s.as_bytes();
        if bytes.len() != 6 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(EngineError::InvalidInput(format!(
                "stock code must be 6 ASCII digits, got {s:?}"
            )));
        }
        let mut buf = [0u8; 6];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// The exchange this code routes to, based on its leading digit.
    ///
    /// Returns `None` for leading digits that map to neither Shenzhen nor
    /// Shanghai (e.g. `8xxxxx` Beijing-board codes, which this system does
    /// not route).
    #[must_use]
    pub const fn market(&self) -> Option<Exchange> {
        match self.0[0] {
            b'0' | b'3' => Some(Exchange::Shenzhen),
            b'6' => Some(Exchange::Shanghai),
            _ => None,
        }
    }

    /// Borrow the underlying 6 ASCII digits as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Safety: constructed only from validated ASCII digits.
        std::str::from_utf8(&self.0).unwrap_or("000000")
    }
}

impl fmt::Debug for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StockCode").field(&self.as_str()).finish()
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StockCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StockCode> for String {
    fn from(value: StockCode) -> Self {
        value.as_str().to_owned()
    }
}
