//! Display loop
//!
//! The output stage: waits for the relay to signal a completed notification,
//! then renders it through a [`Presenter`]. An active call takes over the
//! screen until it is removed; otherwise each complete notification is shown
//! once, in arrival order, and held for the configured time. With nothing to
//! show the presenter gets the link state instead.

use crate::relay::{LinkState, NotificationRelay};
use crate::store::NotificationRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Render-ready view of a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub id: u32,
    pub application: &'static str,
    /// Local time as `HH:MM`, or `--:--` when the peer sent no usable date
    pub time: String,
    pub title: String,
    pub body: String,
    pub call: bool,
}

impl From<&NotificationRecord> for NotificationView {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            id: record.id,
            application: record.application.display_name(),
            time: record
                .timestamp
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string()),
            title: record.title.clone(),
            body: record.body.clone(),
            call: record.is_call(),
        }
    }
}

/// Something that can put notifications in front of the user
pub trait Presenter: Send {
    fn show(&mut self, view: &NotificationView);
    fn standby(&mut self, state: &LinkState);
}

/// What one pass of the display loop rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStep {
    Call(u32),
    Notification(u32),
    Standby,
}

pub struct DisplayLoop<P: Presenter> {
    relay: Arc<NotificationRelay>,
    presenter: P,
    hold: Duration,
    refresh: Duration,
}

impl<P: Presenter> DisplayLoop<P> {
    pub fn new(relay: Arc<NotificationRelay>, presenter: P) -> Self {
        let hold = relay.config().display_hold();
        let refresh = relay.config().call_refresh();
        Self {
            relay,
            presenter,
            hold,
            refresh,
        }
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Render whatever currently has priority.
    pub fn step(&mut self) -> DisplayStep {
        if let Some(call) = self.relay.active_call() {
            // An incomplete call still blocks regular notifications.
            if call.complete {
                self.presenter.show(&NotificationView::from(&call));
                return DisplayStep::Call(call.id);
            }
            self.presenter.standby(&self.relay.link_state());
            return DisplayStep::Standby;
        }

        let next = self
            .relay
            .unpresented_records()
            .into_iter()
            .find(|record| record.complete);
        if let Some(record) = next {
            self.presenter.show(&NotificationView::from(&record));
            self.relay.mark_presented(record.id);
            return DisplayStep::Notification(record.id);
        }

        self.presenter.standby(&self.relay.link_state());
        DisplayStep::Standby
    }

    /// Run until `shutdown` fires or its sender is dropped.
    pub async fn run(mut self, mut shutdown: mpsc::Receiver<()>) -> P {
        let relay = Arc::clone(&self.relay);
        loop {
            let step = self.step();
            let pause = match step {
                DisplayStep::Notification(_) => self.hold,
                DisplayStep::Call(_) | DisplayStep::Standby => self.refresh,
            };

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = relay.completion().notified(), if step == DisplayStep::Standby => {}
                _ = tokio::time::sleep(pause) => {}
            }
        }
        log::debug!("Display loop stopped");
        self.presenter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::responses::AttributeResponse;
    use crate::types::AttributeId;

    #[derive(Default)]
    struct RecordingPresenter {
        shown: Vec<NotificationView>,
        standby: usize,
    }

    impl Presenter for RecordingPresenter {
        fn show(&mut self, view: &NotificationView) {
            self.shown.push(view.clone());
        }

        fn standby(&mut self, _state: &LinkState) {
            self.standby += 1;
        }
    }

    fn deliver(relay: &NotificationRelay, id: u32, app_id: &str, title: &str, body: &str) {
        relay.submit_response_frame(&AttributeResponse::encode(
            id,
            AttributeId::AppIdentifier,
            app_id,
        ));
        relay.submit_response_frame(&AttributeResponse::encode(id, AttributeId::Title, title));
        relay.submit_response_frame(&AttributeResponse::encode(id, AttributeId::Message, body));
    }

    fn relay() -> Arc<NotificationRelay> {
        NotificationRelay::new(RelayConfig::default()).unwrap().0
    }

    #[test]
    fn test_shows_each_notification_once() {
        let relay = relay();
        deliver(&relay, 1, "com.apple.MobileSMS", "Alice", "Hello");
        deliver(&relay, 2, "org.whispersystems.signal", "Bob", "Yo");

        let mut display = DisplayLoop::new(Arc::clone(&relay), RecordingPresenter::default());
        assert_eq!(display.step(), DisplayStep::Notification(1));
        assert_eq!(display.step(), DisplayStep::Notification(2));
        assert_eq!(display.step(), DisplayStep::Standby);

        let shown = &display.presenter().shown;
        assert_eq!(shown[0].application, "iMessage");
        assert_eq!(shown[0].title, "Alice");
        assert_eq!(shown[1].body, "Yo");
        assert!(relay.unpresented_records().is_empty());
    }

    #[test]
    fn test_incomplete_records_wait() {
        let relay = relay();
        relay.submit_response_frame(&AttributeResponse::encode(
            1,
            AttributeId::AppIdentifier,
            "com.apple.MobileSMS",
        ));
        relay.submit_response_frame(&AttributeResponse::encode(1, AttributeId::Title, "Alice"));

        let mut display = DisplayLoop::new(Arc::clone(&relay), RecordingPresenter::default());
        assert_eq!(display.step(), DisplayStep::Standby);
        assert_eq!(relay.unpresented_records().len(), 1);
    }

    #[test]
    fn test_call_has_priority() {
        let relay = relay();
        deliver(&relay, 1, "com.apple.MobileSMS", "Alice", "Hello");
        deliver(&relay, 9, "com.apple.mobilephone", "Mom", "Incoming call");

        let mut display = DisplayLoop::new(Arc::clone(&relay), RecordingPresenter::default());
        assert_eq!(display.step(), DisplayStep::Call(9));
        assert_eq!(display.step(), DisplayStep::Call(9));
        assert!(display.presenter().shown.iter().all(|v| v.call));

        relay.submit_event_frame(&[2, 0, 1, 0, 9, 0, 0, 0]);
        assert_eq!(display.step(), DisplayStep::Notification(1));
    }

    #[test]
    fn test_view_time_format() {
        let relay = relay();
        deliver(&relay, 1, "com.apple.MobileSMS", "Alice", "Hello");
        relay.submit_response_frame(&AttributeResponse::encode(
            1,
            AttributeId::Date,
            "20240315T094502",
        ));
        deliver(&relay, 2, "com.apple.MobileSMS", "Carol", "Hey");

        let view = NotificationView::from(&relay.find(1).unwrap());
        assert_eq!(view.time, "09:45");
        let view = NotificationView::from(&relay.find(2).unwrap());
        assert_eq!(view.time, "--:--");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_wakes_on_completion() {
        let relay = relay();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let display = DisplayLoop::new(Arc::clone(&relay), RecordingPresenter::default());
        let handle = tokio::spawn(display.run(shutdown_rx));

        tokio::task::yield_now().await;
        deliver(&relay, 1, "com.apple.MobileSMS", "Alice", "Hello");
        tokio::time::sleep(Duration::from_millis(10)).await;

        shutdown_tx.send(()).await.unwrap();
        let presenter = handle.await.unwrap();
        assert_eq!(presenter.shown.len(), 1);
        assert_eq!(presenter.shown[0].id, 1);
        assert!(presenter.standby >= 1);
    }
}
