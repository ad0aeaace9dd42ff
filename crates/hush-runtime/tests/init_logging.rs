//! Degraded paths are reported through `tracing`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hush_core::HushConfig;
use hush_core::testing::RecordingHost;
use hush_runtime::{Hush, HushOptions};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_tracing<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

#[test]
fn failed_init_warns_and_goes_passive() {
    let mut config = HushConfig::default();
    config.scroll.settle_frames = 0;
    let events = with_captured_tracing(|| {
        let hush = Hush::new(
            RecordingHost::new(),
            HushOptions {
                config,
                ..HushOptions::default()
            },
        );
        assert!(!hush.is_active());
    });

    let warning = events
        .iter()
        .find(|e| e.target == "hush.runtime" && e.level == tracing::Level::WARN)
        .expect("expected an initialization warning");
    assert!(warning.fields["error"].contains("settle_frames"));
}

#[test]
fn successful_init_is_announced() {
    let events = with_captured_tracing(|| {
        let hush = Hush::new(RecordingHost::new(), HushOptions::default());
        assert!(hush.is_active());
    });
    let info = events
        .iter()
        .find(|e| e.target == "hush.runtime" && e.level == tracing::Level::INFO)
        .expect("expected an init event");
    assert_eq!(info.fields.get("pattern_cache").map(String::as_str), Some("true"));
    assert_eq!(info.fields.get("engine").map(String::as_str), Some("unknown"));
}
