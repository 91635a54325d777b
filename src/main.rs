//! Local Persist demo entry point
//!
//! Native: runs two "page loads" of a preferences panel against an in-process
//! store and shows the state surviving between them.
//! Web: probes localStorage and reports whether persistence is available.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    local_persist::init_logging();
    let persistence = local_persist::Persistence::browser();
    log::info!("localStorage capability: {:?}", persistence.capability());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde::{Deserialize, Serialize};

    use local_persist::{
        ComponentState, Lifecycle, LocalStorageBinding, MemoryStore, PersistConfig, Persistence,
        Persistent, State, UnloadRegistry,
    };

    /// Typed view of the panel's persisted fields
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Prefs {
        #[serde(default)]
        theme: Option<String>,
        #[serde(default)]
        font_size: Option<u32>,
        #[serde(default)]
        draft: Option<String>,
    }

    struct PrefsPanel {
        state: ComponentState,
        config: PersistConfig<PrefsPanel>,
    }

    impl PrefsPanel {
        fn new() -> Self {
            Self {
                state: ComponentState::new(),
                // Drafts are session-only
                config: PersistConfig::new()
                    .storage_key("prefs-panel")
                    .state_filter(["theme", "font_size"]),
            }
        }

        fn prefs(&self) -> Prefs {
            serde_json::from_value(serde_json::Value::Object(self.state.fields().clone()))
                .unwrap_or_default()
        }

        fn update(&mut self, prefs: &Prefs) {
            if let Ok(serde_json::Value::Object(patch)) = serde_json::to_value(prefs) {
                self.state.merge(patch);
            }
        }
    }

    impl Persistent for PrefsPanel {
        fn state(&self) -> &State {
            self.state.fields()
        }

        fn set_state(&mut self, patch: State) {
            self.state.merge(patch);
        }

        fn persist_config(&self) -> &PersistConfig<Self> {
            &self.config
        }

        fn display_name(&self) -> Option<&str> {
            Some("PrefsPanel")
        }
    }

    pub fn run() {
        let store = Rc::new(MemoryStore::new());
        let persistence = Rc::new(Persistence::new(store.clone()));
        let unload = Rc::new(UnloadRegistry::new());

        // First load: user changes settings, then navigates away
        let panel = Rc::new(RefCell::new(PrefsPanel::new()));
        let mut binding =
            LocalStorageBinding::new(panel.clone(), persistence.clone(), unload.clone());
        binding.on_activate();
        panel.borrow_mut().update(&Prefs {
            theme: Some("dark".to_string()),
            font_size: Some(14),
            draft: Some("unsent message".to_string()),
        });
        binding.on_deactivate();
        println!("Stored blob: {}", store.peek("prefs-panel").unwrap_or_default());

        // Second load: tab is closed without unmounting
        let panel = Rc::new(RefCell::new(PrefsPanel::new()));
        let mut binding = LocalStorageBinding::new(panel.clone(), persistence, unload.clone());
        binding.on_activate();
        println!("Restored prefs: {:?}", panel.borrow().prefs());

        let mut prefs = panel.borrow().prefs();
        prefs.theme = Some("solarized".to_string());
        panel.borrow_mut().update(&prefs);
        unload.fire();
        println!("After unload: {}", store.peek("prefs-panel").unwrap_or_default());
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    local_persist::init_logging();
    log::info!("Local Persist (native) demo starting...");
    demo::run();
}
