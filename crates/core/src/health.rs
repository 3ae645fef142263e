//! Periodic backend health polling.
//!
//! The monitor polls `GET /health` on a fixed interval and publishes the resulting
//! [`BackendMode`] on a watch channel. It is display-only: the session never blocks on it.

use crate::backend::DiagnosisBackend;
use crate::config::CoreConfig;
use api_shared::BackendMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Check the backend once. Errors and timeouts both classify as offline.
pub async fn check_backend(backend: &dyn DiagnosisBackend, timeout: Duration) -> BackendMode {
    match tokio::time::timeout(timeout, backend.health()).await {
        Ok(Ok(res)) => BackendMode::from_health(Some(&res)),
        Ok(Err(e)) => {
            tracing::debug!("health check failed: {}", e);
            BackendMode::Offline
        }
        Err(_) => {
            tracing::debug!("health check timed out after {:?}", timeout);
            BackendMode::Offline
        }
    }
}

pub struct HealthMonitor {
    mode: watch::Receiver<BackendMode>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Start polling on the current tokio runtime. The first check runs immediately.
    pub fn spawn(backend: Arc<dyn DiagnosisBackend>, cfg: &CoreConfig) -> Self {
        let (tx, rx) = watch::channel(BackendMode::Offline);
        let cancel = CancellationToken::new();
        let interval = cfg.health_poll_interval();
        let timeout = cfg.health_timeout();

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let mode = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    mode = check_backend(backend.as_ref(), timeout) => mode,
                };

                tx.send_if_modified(|current| {
                    if *current == mode {
                        return false;
                    }
                    tracing::info!("backend mode changed: {} -> {}", current, mode);
                    *current = mode;
                    true
                });
            }
        });

        Self {
            mode: rx,
            cancel,
            handle: Some(handle),
        }
    }

    /// Latest published mode.
    pub fn mode(&self) -> BackendMode {
        self.mode.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BackendMode> {
        self.mode.clone()
    }

    /// Stop polling and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("health monitor task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisMode;
    use crate::error::BackendError;
    use crate::testing::FakeBackend;
    use api_shared::HealthRes;

    fn cfg() -> CoreConfig {
        CoreConfig::new("http://localhost:8000", AnalysisMode::Live)
            .expect("valid config")
            .with_health_polling(Duration::from_secs(10), Duration::from_secs(2))
            .expect("valid polling")
    }

    #[tokio::test(start_paused = true)]
    async fn check_timeout_is_offline() {
        let backend = FakeBackend::default();
        backend.push_health(
            Duration::from_secs(5),
            Ok(HealthRes {
                mock_mode: true,
                model_id: None,
            }),
        );
        assert_eq!(
            check_backend(&backend, Duration::from_secs(2)).await,
            BackendMode::Offline
        );
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_publishes_mode_changes() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_health(
            Duration::ZERO,
            Ok(HealthRes {
                mock_mode: true,
                model_id: None,
            }),
        );
        backend.push_health(
            Duration::ZERO,
            Ok(HealthRes {
                mock_mode: false,
                model_id: Some("google/medgemma-4b-it".into()),
            }),
        );
        backend.push_health(Duration::ZERO, Err(BackendError::Timeout));

        let monitor = HealthMonitor::spawn(backend.clone(), &cfg());
        let mut rx = monitor.subscribe();

        rx.changed().await.expect("first check");
        assert_eq!(*rx.borrow(), BackendMode::Demo);

        rx.changed().await.expect("second check");
        assert!(rx.borrow().is_real_ai());

        rx.changed().await.expect("third check");
        assert_eq!(monitor.mode(), BackendMode::Offline);

        monitor.shutdown().await;
    }
}
