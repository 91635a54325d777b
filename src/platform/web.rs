//! Browser backends: `window.localStorage` and the `beforeunload` event

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::{KeyValueStore, StorageError, SubscriptionId, TerminationSignal};

fn access_error(op: &str, err: JsValue) -> StorageError {
    // Quota errors surface as DOMException("QuotaExceededError")
    StorageError::Access(format!("localStorage {op} failed: {err:?}"))
}

/// `window.localStorage`
#[derive(Debug, Clone)]
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    /// Look up `window.localStorage`
    ///
    /// Returns `None` when there is no window, or when the property getter
    /// throws (iOS private browsing, sandboxed iframes).
    pub fn local() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok().flatten()?;
        Some(Self { storage })
    }
}

impl KeyValueStore for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| access_error("get_item", e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| access_error("set_item", e))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| access_error("remove_item", e))
    }
}

type Listener = Closure<dyn FnMut(web_sys::Event)>;

/// `beforeunload` listeners on `window`
#[derive(Default)]
pub struct BeforeUnload {
    listeners: RefCell<BTreeMap<SubscriptionId, Listener>>,
    /// Listeners removed from the window but possibly still on the stack
    retired: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl BeforeUnload {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TerminationSignal for BeforeUnload {
    fn subscribe(&self, handler: Rc<dyn Fn()>) -> SubscriptionId {
        // Safe point: no listener of ours is running during subscribe
        self.retired.borrow_mut().clear();

        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| handler());
        if let Some(window) = web_sys::window() {
            if let Err(e) = window
                .add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref())
            {
                log::warn!("Failed to add beforeunload listener: {:?}", e);
            }
        }
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Some(closure) = self.listeners.borrow_mut().remove(&id) else {
            return false;
        };
        if let Some(window) = web_sys::window() {
            let _ = window.remove_event_listener_with_callback(
                "beforeunload",
                closure.as_ref().unchecked_ref(),
            );
        }
        // A listener may unsubscribe itself; dropping it here would free the
        // closure mid-call
        self.retired.borrow_mut().push(closure);
        true
    }
}
