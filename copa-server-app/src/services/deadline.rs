use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single round-trip to the store.
#[derive(Clone, Copy, Debug)]
pub struct StoreDeadline {
    timeout: Duration,
}

impl StoreDeadline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run<F: Future>(&self, call: F) -> Result<F::Output, AppError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(output) => Ok(output),
            Err(_) => {
                log::warn!("Store call exceeded {:?}", self.timeout);
                Err(AppError::StoreTimeout(self.timeout))
            }
        }
    }
}

impl Default for StoreDeadline {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_TIMEOUT)
    }
}
