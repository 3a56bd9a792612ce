//! Push payloads and notification delivery.
//!
//! The push contract is a JSON object with `title` and `body` string fields;
//! anything else is silently dropped. Delivery goes through the
//! `NotificationSink` seam so hosts (and tests) decide how notifications are
//! actually shown.

use async_trait::async_trait;
use serde::Deserialize;

/// Parsed push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibration: Vec<u32>,
    /// Route opened when the notification is tapped.
    pub route: String,
}

/// Host-side notification surface.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Display a notification.
    async fn show(&self, notification: Notification);

    /// Dismiss a previously shown notification.
    async fn close(&self, id: &str);

    /// Open the given URL, or focus an existing client already on it.
    async fn open_or_focus(&self, url: &str);
}

/// Sink that records every call, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub shown: std::sync::Mutex<Vec<Notification>>,
    pub closed: std::sync::Mutex<Vec<String>>,
    pub opened: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, notification: Notification) {
        self.shown.lock().unwrap().push(notification);
    }

    async fn close(&self, id: &str) {
        self.closed.lock().unwrap().push(id.to_string());
    }

    async fn open_or_focus(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parses_title_and_body() {
        let payload: PushPayload =
            serde_json::from_slice(br#"{"title":"Round starting","body":"1.5x streak"}"#).unwrap();
        assert_eq!(payload.title, "Round starting");
        assert_eq!(payload.body, "1.5x streak");
    }

    #[test]
    fn test_payload_tolerates_extra_fields() {
        let payload: PushPayload =
            serde_json::from_slice(br#"{"title":"T","body":"B","tag":"promo"}"#).unwrap();
        assert_eq!(payload.title, "T");
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(serde_json::from_slice::<PushPayload>(b"not-json").is_err());
        assert!(serde_json::from_slice::<PushPayload>(br#"{"title":"only"}"#).is_err());
    }

    #[tokio::test]
    async fn test_recording_sink_records_in_order() {
        let sink = RecordingSink::default();
        sink.show(Notification {
            title: "T".into(),
            body: "B".into(),
            icon: "/icons/icon-192.png".into(),
            badge: "/icons/badge-72.png".into(),
            vibration: vec![200, 100, 200],
            route: "/game".into(),
        })
        .await;
        sink.close("n1").await;
        sink.open_or_focus("http://localhost:3000/game").await;

        assert_eq!(sink.shown.lock().unwrap().len(), 1);
        assert_eq!(sink.closed.lock().unwrap().as_slice(), ["n1"]);
        assert_eq!(
            sink.opened.lock().unwrap().as_slice(),
            ["http://localhost:3000/game"]
        );
    }
}
