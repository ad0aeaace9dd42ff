//! Reference-counted suspension of the host's deferred transform pipeline.
//!
//! Several unrelated actors may want the host's expensive transforms paused
//! at the same time (hush during a stream, another extension during a bulk
//! edit, ...). Each actor takes its own [`SuspensionToken`]; the pipeline
//! stays suspended while at least one token is held. Releasing a token only
//! ever removes that actor's hold, so no actor can resume the pipeline out
//! from under another.
//!
//! ```
//! use hush_core::suspension::SuspensionCoordinator;
//!
//! let coordinator = SuspensionCoordinator::new();
//! let external = coordinator.acquire("bulk-edit");
//! let ours = coordinator.acquire("hush");
//! ours.release();
//! assert!(coordinator.is_suspended());
//! external.release();
//! assert!(!coordinator.is_suspended());
//! ```

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug)]
struct Hold {
    id: u64,
    holder: Cow<'static, str>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    holds: Vec<Hold>,
}

/// Shared registry of suspension holds. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct SuspensionCoordinator {
    inner: Rc<RefCell<Inner>>,
}

impl SuspensionCoordinator {
    /// Empty coordinator: nothing suspended.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a hold on behalf of `holder`.
    pub fn acquire(&self, holder: impl Into<Cow<'static, str>>) -> SuspensionToken {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.holds.push(Hold {
            id,
            holder: holder.into(),
        });
        SuspensionToken {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Whether any hold exists.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        !self.inner.borrow().holds.is_empty()
    }

    /// Number of outstanding holds.
    #[must_use]
    pub fn hold_count(&self) -> usize {
        self.inner.borrow().holds.len()
    }

    /// Names of current holders, oldest first.
    #[must_use]
    pub fn holders(&self) -> Vec<String> {
        self.inner
            .borrow()
            .holds
            .iter()
            .map(|h| h.holder.to_string())
            .collect()
    }
}

/// One actor's hold on the suspension. Released on [`release`](Self::release)
/// or drop.
#[derive(Debug)]
#[must_use = "dropping a token releases the hold immediately"]
pub struct SuspensionToken {
    id: u64,
    registry: Weak<RefCell<Inner>>,
}

impl SuspensionToken {
    /// Release this hold.
    pub fn release(self) {
        drop(self);
    }

    /// Whether this token's hold is still registered.
    #[must_use]
    pub fn is_held(&self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let held = inner.borrow().holds.iter().any(|h| h.id == self.id);
        held
    }
}

impl Drop for SuspensionToken {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let Ok(mut inner) = inner.try_borrow_mut() else {
            return;
        };
        inner.holds.retain(|h| h.id != self.id);
    }
}
