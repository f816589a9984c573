use pulse_types::StockCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Sentinel code that always yields [`pulse_types::EngineError::PermanentUpstream`].
pub const FAIL_CODE: &str = "999999";
/// Sentinel code that always yields [`pulse_types::EngineError::TransientUpstream`].
pub const TIMEOUT_CODE: &str = "999998";

/// Deterministic `(price, prev_close)` fixture for a known test code, or a
/// flat `(10.00, 10.00)` default for any other code.
#[must_use]
pub fn fixture_for(code: StockCode) -> (Decimal, Decimal) {
    match code.as_str() {
        "000001" => (dec!(10.52), dec!(10.00)),
        "600519" => (dec!(1680.30), dec!(1700.00)),
        "300750" => (dec!(205.88), dec!(200.00)),
        _ => (dec!(10.00), dec!(10.00)),
    }
}
