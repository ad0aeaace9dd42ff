//! Whole-runtime behavior against the recording host.

use std::time::Duration;

use hush_core::testing::{HostCall, RecordingHost};
use hush_core::{
    GenerationKind, HushConfig, LifecycleSignal, MessageId, ScrollMetrics, SettingKey,
    Visibility,
};
use hush_runtime::{Hush, HushOptions, Phase};
use pretty_assertions::assert_eq;

const CHROME: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
const SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";
const PAGE: &str = "<!doctype html><body>page</body>";
const REAPPLY_DELAY: Duration = Duration::from_millis(100);

fn start() -> LifecycleSignal {
    LifecycleSignal::GenerationStarted {
        kind: GenerationKind::Normal,
    }
}

fn runtime() -> Hush<RecordingHost> {
    let mut host = RecordingHost::new();
    host.render_message(MessageId(0), &[]);
    let mut hush = Hush::new(host, HushOptions::default().with_user_agent(CHROME));
    hush.host_mut().calls.clear();
    hush
}

fn reapplies(hush: &Hush<RecordingHost>) -> usize {
    hush.host().count(|c| matches!(c, HostCall::Reapply(_)))
}

#[test]
fn tokens_defer_once_and_reapply_once() {
    let mut hush = runtime();
    hush.dispatch(start());
    for _ in 0..3 {
        hush.dispatch(LifecycleSignal::StreamTokenReceived);
        assert!(hush.suspension().is_suspended());
        assert_eq!(hush.suspension().hold_count(), 1);
    }
    hush.dispatch(LifecycleSignal::GenerationEnded);
    assert!(!hush.suspension().is_suspended());
    assert_eq!(reapplies(&hush), 0, "reapplication waits for the delay");

    hush.advance(Duration::from_millis(99));
    assert_eq!(reapplies(&hush), 0);
    hush.advance(Duration::from_millis(1));
    assert_eq!(reapplies(&hush), 1);
    hush.advance(Duration::from_secs(10));
    assert_eq!(reapplies(&hush), 1);

    let calls = &hush.host().calls;
    let reapply = calls.iter().position(|c| *c == HostCall::Reapply(MessageId(0))).unwrap();
    assert_eq!(calls[reapply + 1], HostCall::EmitRendered(MessageId(0)));
    let snap = hush.stats();
    assert_eq!(snap.deferred_generations, 1);
    assert_eq!(snap.reapply_passes, 1);
}

#[test]
fn start_then_end_without_tokens_does_nothing() {
    let mut hush = runtime();
    hush.dispatch(start());
    assert!(!hush.suspension().is_suspended());
    hush.dispatch(LifecycleSignal::GenerationEnded);
    hush.advance(Duration::from_secs(1));
    assert_eq!(reapplies(&hush), 0);
    assert!(hush.host().calls.is_empty());
    assert_eq!(hush.phase(), Phase::Idle);
}

#[test]
fn pre_existing_suspension_is_left_alone_but_reapply_runs() {
    let mut hush = runtime();
    let external = hush.suspension().acquire("another-extension");
    hush.dispatch(start());
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    hush.dispatch(LifecycleSignal::GenerationStopped);
    assert!(hush.suspension().is_suspended());
    assert_eq!(hush.suspension().holders(), vec!["another-extension".to_owned()]);
    hush.advance(REAPPLY_DELAY);
    assert_eq!(reapplies(&hush), 1);
    external.release();
    assert!(!hush.suspension().is_suspended());
}

#[test]
fn stop_follows_the_end_path() {
    let mut hush = runtime();
    hush.dispatch(start());
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    hush.dispatch(LifecycleSignal::GenerationStopped);
    hush.dispatch(LifecycleSignal::GenerationEnded);
    hush.advance(REAPPLY_DELAY);
    assert_eq!(reapplies(&hush), 1);
}

#[test]
fn end_without_start_is_a_no_op() {
    let mut hush = runtime();
    hush.dispatch(LifecycleSignal::GenerationEnded);
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    hush.advance(REAPPLY_DELAY);
    assert!(hush.host().calls.is_empty());
}

#[test]
fn background_generation_is_ignored() {
    let mut hush = runtime();
    hush.dispatch(LifecycleSignal::GenerationStarted {
        kind: GenerationKind::Background,
    });
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    assert!(!hush.suspension().is_suspended());
    assert_eq!(hush.phase(), Phase::Idle);
}

#[test]
fn vanished_message_is_skipped_silently() {
    let mut hush = runtime();
    hush.host_mut().missing_messages.insert(MessageId(0));
    hush.dispatch(start());
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    hush.dispatch(LifecycleSignal::GenerationEnded);
    hush.advance(REAPPLY_DELAY);
    assert_eq!(reapplies(&hush), 0);
    assert_eq!(hush.stats().reapply_passes, 0);
    assert_eq!(hush.pending_tasks(), 0);
}

#[test]
fn scroll_anchor_round_trip() {
    let mut hush = runtime();
    hush.host_mut().scroll = Some(ScrollMetrics {
        scroll_height: 1000.0,
        scroll_top: 700.0,
        client_height: 300.0,
    });
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Hidden,
    });
    hush.host_mut().scroll = Some(ScrollMetrics {
        scroll_height: 1200.0,
        scroll_top: 700.0,
        client_height: 300.0,
    });
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Visible,
    });

    hush.frame();
    assert!(hush.host().calls.is_empty(), "restore waits two frames");
    hush.frame();
    assert_eq!(hush.host().calls, vec![HostCall::SetScrollTop(900.0)]);
    assert_eq!(hush.stats().scroll_restores, 1);

    // The snapshot was consumed: another show does nothing.
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Visible,
    });
    hush.frame();
    hush.frame();
    assert_eq!(hush.stats().scroll_restores, 1);
}

#[test]
fn scroll_anchor_respects_setting_and_missing_container() {
    let mut hush = runtime();
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Hidden,
    });
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Visible,
    });
    assert_eq!(hush.pending_tasks(), 0);

    hush.host_mut().scroll = Some(ScrollMetrics {
        scroll_height: 1000.0,
        scroll_top: 0.0,
        client_height: 300.0,
    });
    hush.apply_setting(SettingKey::PreserveScroll, false);
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Hidden,
    });
    hush.dispatch(LifecycleSignal::VisibilityChanged {
        visibility: Visibility::Visible,
    });
    assert_eq!(hush.pending_tasks(), 0);
}

#[test]
fn pattern_cache_follows_setting() {
    let mut hush = runtime();
    assert!(hush.patterns().is_installed());
    let a = hush.compile("x+", "g").unwrap();
    let b = hush.compile("x+", "g").unwrap();
    assert!(std::rc::Rc::ptr_eq(&a, &b));
    assert_eq!(hush.stats().cache_hits, 1);
    assert_eq!(hush.stats().cache_misses, 1);

    hush.dispatch(LifecycleSignal::SettingsChanged {
        key: SettingKey::CachePatterns,
        enabled: false,
    });
    assert!(!hush.patterns().is_installed());
    hush.apply_setting(SettingKey::CachePatterns, true);
    assert!(hush.patterns().is_installed());
}

#[test]
fn webkit_hosts_run_without_pattern_cache() {
    let hush = Hush::new(RecordingHost::new(), HushOptions::default().with_user_agent(SAFARI));
    assert!(hush.is_active());
    assert!(!hush.patterns().is_installed());
    let a = hush.compile("x", "").unwrap();
    let b = hush.compile("x", "").unwrap();
    assert!(!std::rc::Rc::ptr_eq(&a, &b));
}

#[test]
fn edits_rescan_embeds_and_announce() {
    let mut hush = runtime();
    hush.host_mut().render_message(MessageId(1), &[PAGE]);
    hush.dispatch(LifecycleSignal::MessageRendered { message: MessageId(1) });
    assert_eq!(hush.embeds().registry().len(), 1);

    hush.host_mut().render_message(MessageId(1), &["no page now"]);
    hush.dispatch(LifecycleSignal::MessageUpdated { message: MessageId(1) });
    assert!(hush.embeds().registry().is_empty());
    assert_eq!(hush.host().calls.last(), Some(&HostCall::EmitRendered(MessageId(1))));
}

#[test]
fn lazy_embed_setting_unmounts_and_resumes() {
    let mut hush = runtime();
    hush.host_mut().render_message(MessageId(1), &[PAGE]);
    hush.dispatch(LifecycleSignal::MessageRendered { message: MessageId(1) });
    let placeholder = hush.host().placeholders()[0];
    hush.on_intersection(placeholder, true);
    assert_eq!(hush.stats().embeds_created, 1);

    hush.apply_setting(SettingKey::LazyEmbedRendering, false);
    assert!(hush.host().live_surfaces().is_empty());
    assert_eq!(hush.stats().embeds_destroyed, 1);

    hush.apply_setting(SettingKey::LazyEmbedRendering, true);
    hush.on_intersection(placeholder, true);
    assert_eq!(hush.host().live_surfaces().len(), 1);
    assert_eq!(hush.stats().embeds_created, 2);
}

#[test]
fn surface_resize_reaches_the_host() {
    let mut hush = runtime();
    hush.host_mut().render_message(MessageId(1), &[PAGE]);
    hush.dispatch(LifecycleSignal::MessageRendered { message: MessageId(1) });
    let placeholder = hush.host().placeholders()[0];
    hush.on_intersection(placeholder, true);
    let surface = hush.host().live_surfaces()[0];
    assert!(hush.on_surface_message(surface, r#"{"type":"resize","height":99999}"#));
    assert_eq!(
        hush.host().calls.last(),
        Some(&HostCall::SetHeight {
            surface,
            height_px: 10_000.0
        })
    );
}

#[test]
fn blur_suppression_applied_at_init_and_on_change() {
    let options = HushOptions {
        settings: hush_core::Settings {
            suppress_blur_globally: true,
            ..hush_core::Settings::default()
        },
        ..HushOptions::default()
    };
    let mut hush = Hush::new(RecordingHost::new(), options);
    assert!(hush.host().calls.contains(&HostCall::BlurSuppressed(true)));
    hush.apply_setting(SettingKey::SuppressBlurGlobally, false);
    assert_eq!(hush.host().calls.last(), Some(&HostCall::BlurSuppressed(false)));
}

#[test]
fn disabling_deferral_mid_stream_still_releases() {
    let mut hush = runtime();
    hush.dispatch(start());
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    hush.apply_setting(SettingKey::DeferDuringStreaming, false);
    hush.dispatch(LifecycleSignal::GenerationEnded);
    assert!(!hush.suspension().is_suspended());
    assert_eq!(
        hush.host().count(|c| *c == HostCall::EffectsReduced(false)),
        1
    );
}

#[test]
fn invalid_config_fails_closed() {
    let mut config = HushConfig::default();
    config.patterns.capacity = 0;
    let options = HushOptions {
        config: config.clone(),
        ..HushOptions::default()
    };
    assert!(Hush::try_new(RecordingHost::new(), options.clone()).is_err());

    let mut hush = Hush::new(RecordingHost::new(), options);
    assert!(!hush.is_active());
    assert!(!hush.patterns().is_installed());
    hush.dispatch(start());
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    assert!(!hush.suspension().is_suspended());
    assert!(hush.host().calls.is_empty());
    assert!(hush.compile("a", "").is_ok());
}

#[test]
fn json_signals_are_routed() {
    let mut hush = runtime();
    hush.dispatch_json(r#"{"event":"generation_started","kind":"normal"}"#).unwrap();
    hush.dispatch_json(r#"{"event":"stream_token_received"}"#).unwrap();
    assert!(hush.suspension().is_suspended());
    assert!(hush.dispatch_json(r#"{"event":"nope"}"#).is_err());
}

#[test]
fn options_from_sources() {
    let options = HushOptions::from_sources(
        Some("[streaming]\nreapply_delay_ms = 250\n"),
        Some(r#"{"cache_patterns": false}"#),
    )
    .unwrap();
    assert_eq!(options.config.streaming.reapply_delay_ms, 250);
    assert!(!options.settings.cache_patterns);
    assert!(options.settings.defer_during_streaming);
    assert!(HushOptions::from_sources(None, Some("{not json")).is_err());
}

#[test]
fn shutdown_releases_everything() {
    let mut hush = runtime();
    hush.dispatch(start());
    hush.dispatch(LifecycleSignal::StreamTokenReceived);
    hush.shutdown();
    assert!(!hush.suspension().is_suspended());
    assert!(!hush.patterns().is_installed());
    assert_eq!(hush.pending_tasks(), 0);
    assert!(!hush.is_active());
    let host = hush.into_host();
    assert_eq!(host.calls.last(), Some(&HostCall::EffectsReduced(false)));
}
