use std::future::Future;
use std::time::Duration;

use tracing::error;

use crate::error::{Error, Result};

/// Await `fut`, failing with `Error::Timeout` once `after` elapses.
pub async fn with_deadline<T, F>(stage: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            error!("{} exceeded deadline of {:?}", stage, after);
            Err(Error::Timeout { stage, after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_future_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        };
        let err = with_deadline("test", Duration::from_secs(1), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { stage: "test", .. }));
    }

    #[tokio::test]
    async fn fast_future_passes_through() {
        let v = with_deadline("test", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }
}
