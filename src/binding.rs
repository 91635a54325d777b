//! Lifecycle binding between a component and local storage
//!
//! State machine per instance:
//! `Idle` --activate--> `Mounted` --deactivate | unload--> `Unmounted`
//!
//! Activation restores state and, when that succeeded against a usable
//! store, subscribes an unload fallback. Deactivation saves and drops the
//! fallback. If the page is torn down before deactivation runs, the fallback
//! performs the same save instead. Whichever runs first wins; the other is a
//! no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::component::Persistent;
use crate::persistence::{PersistSlot, Persistence, RestoreOutcome, SaveOutcome};
use crate::platform::{self, SubscriptionId, TerminationSignal};
use crate::resolve::display_name;

/// Host framework lifecycle hooks
pub trait Lifecycle {
    /// The component became active (mounted)
    fn on_activate(&mut self);
    /// The component is about to become inactive (unmount)
    fn on_deactivate(&mut self);
}

/// Binding lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not activated yet
    Idle,
    Mounted,
    /// Saved and detached; terminal
    Unmounted,
}

#[derive(Debug)]
struct Tracking {
    phase: Phase,
    slot: PersistSlot,
    subscription: Option<SubscriptionId>,
}

struct Shared<C> {
    component: Rc<RefCell<C>>,
    persistence: Rc<Persistence>,
    signal: Rc<dyn TerminationSignal>,
    tracking: RefCell<Tracking>,
}

impl<C: Persistent + 'static> Shared<C> {
    fn activate(self: &Rc<Self>) -> Option<RestoreOutcome> {
        if self.tracking.borrow().phase != Phase::Idle {
            log::debug!("Ignoring activate outside Idle");
            return None;
        }

        let mut slot = self.tracking.borrow().slot;
        let outcome = match self.component.try_borrow_mut() {
            Ok(mut component) => self.persistence.restore(&mut *component, &mut slot),
            Err(_) => {
                log::warn!("Component busy during activate, skipping restore");
                RestoreOutcome::Busy
            }
        };

        let subscription = if self.persistence.is_available() && slot.is_loaded() {
            let weak: Weak<Self> = Rc::downgrade(self);
            Some(self.signal.subscribe(Rc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.finish();
                }
            })))
        } else {
            None
        };

        let mut tracking = self.tracking.borrow_mut();
        tracking.phase = Phase::Mounted;
        tracking.slot = slot;
        tracking.subscription = subscription;
        Some(outcome)
    }

    /// Save and detach; shared by deactivation and the unload fallback
    ///
    /// A busy component leaves the binding `Mounted` with its fallback
    /// registered, so a later deactivate or unload can still save.
    fn finish(&self) -> Option<SaveOutcome> {
        if self.tracking.borrow().phase != Phase::Mounted {
            return None;
        }
        let Ok(component) = self.component.try_borrow() else {
            log::warn!("Component busy during deactivate, save deferred");
            return Some(SaveOutcome::Busy);
        };

        let (slot, subscription) = {
            let mut tracking = self.tracking.borrow_mut();
            tracking.phase = Phase::Unmounted;
            (tracking.slot, tracking.subscription.take())
        };
        let outcome = self.persistence.save(&*component, &slot);
        drop(component);

        if let Some(id) = subscription {
            self.signal.unsubscribe(id);
        }
        Some(outcome)
    }
}

/// Persists one component's state across activations
pub struct LocalStorageBinding<C: Persistent + 'static> {
    shared: Rc<Shared<C>>,
}

impl<C: Persistent + 'static> LocalStorageBinding<C> {
    pub fn new(
        component: Rc<RefCell<C>>,
        persistence: Rc<Persistence>,
        signal: Rc<dyn TerminationSignal>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                component,
                persistence,
                signal,
                tracking: RefCell::new(Tracking {
                    phase: Phase::Idle,
                    slot: PersistSlot::new(),
                    subscription: None,
                }),
            }),
        }
    }

    /// Bind against the page's localStorage and `beforeunload`
    pub fn browser(component: Rc<RefCell<C>>) -> Self {
        Self::new(component, Persistence::browser(), platform::default_signal())
    }

    pub fn component(&self) -> &Rc<RefCell<C>> {
        &self.shared.component
    }

    pub fn phase(&self) -> Phase {
        self.shared.tracking.borrow().phase
    }

    /// Whether restore has run against the store
    pub fn is_loaded(&self) -> bool {
        self.shared.tracking.borrow().slot.is_loaded()
    }

    /// The unload fallback registration, while one is active
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.shared.tracking.borrow().subscription
    }

    /// Restore and register the unload fallback; `None` if not `Idle`
    pub fn activate(&self) -> Option<RestoreOutcome> {
        let outcome = self.shared.activate();
        if let Some(outcome) = &outcome {
            log::debug!(
                "Activated {}: {:?}",
                self.shared.component.try_borrow().map(|c| display_name(&*c)).unwrap_or_default(),
                outcome
            );
        }
        outcome
    }

    /// Save and drop the unload fallback; `None` if not `Mounted`
    pub fn deactivate(&self) -> Option<SaveOutcome> {
        self.shared.finish()
    }

    /// Remove the stored blob for this component
    pub fn clear(&self) -> bool {
        match self.shared.component.try_borrow() {
            Ok(component) => self.shared.persistence.clear(&*component),
            Err(_) => false,
        }
    }
}

impl<C: Persistent + 'static> Lifecycle for LocalStorageBinding<C> {
    fn on_activate(&mut self) {
        self.activate();
    }

    fn on_deactivate(&mut self) {
        self.deactivate();
    }
}

impl<C: Persistent + 'static> Drop for LocalStorageBinding<C> {
    fn drop(&mut self) {
        // Dropped without deactivating: don't leave a dead handler registered
        let subscription = self.shared.tracking.borrow_mut().subscription.take();
        if let Some(id) = subscription {
            self.shared.signal.unsubscribe(id);
        }
    }
}
