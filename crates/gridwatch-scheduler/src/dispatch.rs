//! Notification dispatch: formats an event and fans it out to subscribers
//! over a `ChatTransport`. One subscriber's failure never affects another's.

use std::sync::Arc;

use futures::future::join_all;
use gridwatch_core::{ChatTransport, Event, EventKind, Subscriber, UserId};

/// Delivery failure for one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchFailure {
    pub user_id: UserId,
    pub error: String,
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<DispatchFailure>,
}

pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Send `event` to every subscriber in `subscribers` with notifications
    /// enabled. Sends run concurrently; failures are collected, not retried.
    pub async fn dispatch(&self, event: &Event, subscribers: &[Subscriber]) -> DispatchReport {
        let text = notification_text(event);
        let targets: Vec<UserId> = subscribers
            .iter()
            .filter(|s| s.notifications_enabled)
            .map(|s| s.user_id)
            .collect();

        let sends = targets.iter().map(|&user_id| {
            let text = &text;
            async move { (user_id, self.transport.send_message(user_id, text, None).await) }
        });

        let mut report = DispatchReport::default();
        for (user_id, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("⚠️ Notification to {user_id} via {} failed: {e}", self.transport.name());
                    report.failures.push(DispatchFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.delivered > 0 {
            tracing::info!(
                "📣 {} {} delivered to {} subscriber(s)",
                event.platform,
                event.kind,
                report.delivered
            );
        }
        report
    }
}

/// Chat text for an event notification (Telegram Markdown).
pub fn notification_text(event: &Event) -> String {
    let emoji = match event.kind {
        EventKind::NewJob => "🆕",
        EventKind::JobCompleted => "✅",
        EventKind::PaymentUpdate => "💰",
        EventKind::StatusChange => "🔄",
    };
    let title = match event.kind {
        EventKind::NewJob => "New job",
        EventKind::JobCompleted => "Job completed",
        EventKind::PaymentUpdate => "Payment update",
        EventKind::StatusChange => "Status change",
    };

    format!(
        "{emoji} *{}: {title}*\n\n{}\n\n_🕒 {}_",
        event.platform,
        escape_markdown(&event.summary),
        event.detected_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Escape Telegram MarkdownV1 special characters.
pub fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use gridwatch_core::{GridWatchError, PlatformId, ReplyKeyboard, Result};
    use std::sync::Mutex;

    /// Records every send; fails for users in `failing`.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Mutex<Vec<(UserId, String)>>,
        pub(crate) failing: Vec<UserId>,
    }

    impl RecordingTransport {
        pub(crate) fn failing_for(users: &[UserId]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: users.to_vec(),
            }
        }

        pub(crate) fn recipients(&self) -> Vec<UserId> {
            let mut ids: Vec<_> = self.sent.lock().unwrap().iter().map(|(id, _)| *id).collect();
            ids.sort();
            ids
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_message(&self, user_id: UserId, text: &str, _keyboard: Option<&ReplyKeyboard>) -> Result<()> {
            if self.failing.contains(&user_id) {
                return Err(GridWatchError::Channel(format!("chat {user_id} blocked the bot")));
            }
            self.sent.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
    }

    fn subscriber(user_id: UserId, enabled: bool) -> Subscriber {
        Subscriber {
            user_id,
            notifications_enabled: enabled,
        }
    }

    fn payment() -> Event {
        Event::new(
            PlatformId::Golem,
            EventKind::PaymentUpdate,
            "Earnings increased by 5.00 (total 50.00)",
            Some(5.0),
        )
    }

    #[tokio::test]
    async fn test_only_enabled_subscribers_receive() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(transport.clone());

        let report = dispatcher
            .dispatch(&payment(), &[subscriber(1, true), subscriber(2, false), subscriber(3, true)])
            .await;

        assert_eq!(report.delivered, 2);
        assert!(report.failures.is_empty());
        assert_eq!(transport.recipients(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_subscriber() {
        let transport = Arc::new(RecordingTransport::failing_for(&[2]));
        let dispatcher = Dispatcher::new(transport.clone());

        let report = dispatcher
            .dispatch(&payment(), &[subscriber(1, true), subscriber(2, true), subscriber(3, true)])
            .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].user_id, 2);
        assert!(report.failures[0].error.contains("blocked"));
        assert_eq!(transport.recipients(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_no_subscribers_no_sends() {
        let transport = Arc::new(RecordingTransport::default());
        let report = Dispatcher::new(transport.clone()).dispatch(&payment(), &[]).await;
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn test_notification_text() {
        let text = notification_text(&payment());
        assert!(text.starts_with("💰 *GolemSP: Payment update*"));
        assert!(text.contains("Earnings increased by 5.00"));
        assert!(text.contains("UTC_"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("node_1 *x* [a] `b`"), "node\\_1 \\*x\\* \\[a] \\`b\\`");
    }
}
