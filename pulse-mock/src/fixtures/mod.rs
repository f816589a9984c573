mod prices;

pub use prices::{FAIL_CODE, TIMEOUT_CODE, fixture_for};
