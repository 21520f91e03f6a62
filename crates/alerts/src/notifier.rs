//! Scheduled report delivery.

use crate::config::ThreadsConfig;
use crate::telegram::ReportSink;
use balance_engine::BalanceService;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of one delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Sends the alert report of every configured thread's network.
pub struct Notifier {
    service: Arc<BalanceService>,
    sink: Arc<dyn ReportSink>,
    threads: ThreadsConfig,
}

impl Notifier {
    pub fn new(service: Arc<BalanceService>, sink: Arc<dyn ReportSink>, threads: ThreadsConfig) -> Self {
        Self {
            service,
            sink,
            threads,
        }
    }

    /// Build and send one report per thread. A failing thread is logged and
    /// the remaining threads still get their report.
    pub async fn dispatch_reports(&self) -> DeliveryStats {
        let mut stats = DeliveryStats::default();

        for thread in &self.threads.threads {
            let text = match self.service.stat(&thread.network).await {
                Ok(text) => text,
                Err(e) => {
                    error!(network = %thread.network, error = %e, "Failed to build report");
                    stats.failed += 1;
                    continue;
                }
            };

            match self.sink.send_report(thread, &text).await {
                Ok(true) => stats.sent += 1,
                Ok(false) => stats.empty += 1,
                Err(e) => {
                    error!(
                        network = %thread.network,
                        chat_id = thread.chat_id,
                        error = %e,
                        "Failed to deliver report"
                    );
                    stats.failed += 1;
                }
            }
        }

        info!(
            sent = stats.sent,
            empty = stats.empty,
            failed = stats.failed,
            "Scheduled reports dispatched"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatThread;
    use crate::telegram::{has_content, TelegramError};
    use async_trait::async_trait;
    use balance_core::{NetworksConfig, NetworksSource};
    use balance_engine::{Collector, CollectorConfig, InMemoryBalanceStore, Router, ServiceConfig};
    use balance_feeds::MockBalanceAdapter;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn send_report(&self, thread: &ChatThread, text: &str) -> Result<bool, TelegramError> {
            if !has_content(text) {
                return Ok(false);
            }
            self.sent
                .lock()
                .unwrap()
                .push((thread.chat_id, text.to_string()));
            Ok(true)
        }
    }

    fn thread(network: &str, chat_id: i64) -> ChatThread {
        ChatThread {
            network: network.to_string(),
            description: String::new(),
            chat_id,
            thread_id: 1,
        }
    }

    #[tokio::test]
    async fn test_dispatch_skips_empty_reports() {
        let store = Arc::new(InMemoryBalanceStore::new());
        let now = Utc::now();
        store.seed("A", "adrich", now - Duration::minutes(2), 10.0);
        store.seed("A", "adrich", now - Duration::minutes(1), 20.0);

        let router = Router::new().with_adapter("A", Arc::new(MockBalanceAdapter::balance(5.0)));
        let collector = Arc::new(Collector::new(
            Arc::new(router),
            store.clone(),
            CollectorConfig::default(),
        ));
        let networks = NetworksConfig::from_json(
            r#"{"networks": {"adrich": {"A": {"token": "t", "is_active": true}}}}"#,
        )
        .unwrap();
        let service = Arc::new(BalanceService::new(
            NetworksSource::Static(networks),
            collector,
            store,
            ServiceConfig::default(),
        ));

        let sink = Arc::new(RecordingSink::default());
        let threads = ThreadsConfig {
            threads: vec![thread("adrich", -1), thread("unknown", -2)],
        };
        let notifier = Notifier::new(service, sink.clone(), threads);

        let stats = notifier.dispatch_reports().await;

        assert_eq!(stats, DeliveryStats { sent: 1, empty: 1, failed: 0 });
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, -1);
        assert!(sent[0].1.ends_with("<b>A</b>: 5.00 (spend 40.00) ⚠️\n\n"));
    }
}
