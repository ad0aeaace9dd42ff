//! Scroll-anchor preservation across page visibility changes.
//!
//! Browsers may skip rendering for hidden pages and then recompute the
//! virtualized message heights on return, which shifts content under a
//! reader pinned near the bottom. The anchor records the distance from the
//! bottom on hide and puts the viewport back at that distance once layout
//! has settled after show.
//!
//! The snapshot is single-shot: a hide overwrites any unconsumed snapshot and
//! a show consumes it immediately, even though the restore itself runs a
//! few frames later.

use std::rc::Rc;

use hush_core::{ScrollHost, Stats};

const TARGET: &str = "hush.scroll";

/// Single-shot distance-from-bottom snapshot taken when the page is hidden.
#[derive(Debug)]
pub struct ScrollAnchor {
    snapshot: Option<f64>,
    stats: Rc<Stats>,
}

impl ScrollAnchor {
    /// Anchor with no snapshot.
    #[must_use]
    pub fn new(stats: Rc<Stats>) -> Self {
        Self {
            snapshot: None,
            stats,
        }
    }

    /// Unconsumed snapshot, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<f64> {
        self.snapshot
    }

    /// Page hidden: remember the distance from the bottom. No-op without a
    /// scroll container.
    pub fn on_hidden<H: ScrollHost + ?Sized>(&mut self, host: &H) -> Option<f64> {
        let metrics = host.scroll_metrics()?;
        let distance = metrics.distance_from_bottom();
        self.snapshot = Some(distance);
        tracing::trace!(target: TARGET, distance, "scroll anchor captured");
        Some(distance)
    }

    /// Page shown: hand out and forget the snapshot. The caller restores it
    /// once layout has settled.
    pub fn on_visible(&mut self) -> Option<f64> {
        self.snapshot.take()
    }

    /// Drop any unconsumed snapshot.
    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    /// Put the viewport `distance` pixels above the bottom, never above the
    /// top. Returns the applied offset.
    pub fn restore<H: ScrollHost + ?Sized>(&self, host: &mut H, distance: f64) -> Option<f64> {
        let metrics = host.scroll_metrics()?;
        let top = (metrics.scroll_height - metrics.client_height - distance).max(0.0);
        match host.set_scroll_top(top) {
            Ok(()) => {
                self.stats.record_scroll_restore();
                tracing::debug!(target: TARGET, distance, top, "scroll anchor restored");
                Some(top)
            }
            Err(err) => {
                tracing::debug!(target: TARGET, error = %err, "scroll restore skipped");
                None
            }
        }
    }
}
