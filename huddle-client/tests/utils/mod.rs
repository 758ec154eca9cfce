
pub use manager_harness::*;
pub use mock_connection::*;
pub use signal_helpers::*;

use std::time::Duration;

/// Upper bound for anything the code under test does asynchronously.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Polls `check` until it holds or [`WAIT_TIMEOUT`] passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
