//! # Drawer Registry
//!
//! One `CashDrawer` per drawer id, each behind its own async lock.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DrawerRegistry                                                         │
//! │  Arc<Mutex<HashMap<id, DrawerSlot>>>   ← std Mutex, held only to look  │
//! │       │                                   up or insert a slot           │
//! │       ├── "front-1" ─► Arc<tokio::Mutex<Option<CashDrawer>>>           │
//! │       │                 held for validate → persist → swap              │
//! │       └── "bar"     ─► Arc<tokio::Mutex<Option<CashDrawer>>>           │
//! │                                                                         │
//! │  Two terminals on "front-1" queue on the same slot.                    │
//! │  "front-1" and "bar" never wait on each other.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slot holds `None` until the drawer is first used, then the drawer as
//! rehydrated from storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use till_core::CashDrawer;

/// A drawer's lock. `None` means not yet loaded from storage.
pub type DrawerSlot = Arc<tokio::sync::Mutex<Option<CashDrawer>>>;

/// Registry of per-drawer slots. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct DrawerRegistry {
    slots: Arc<Mutex<HashMap<String, DrawerSlot>>>,
}

impl DrawerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the drawer's slot, creating an unloaded one on first use.
    pub fn slot(&self, drawer_id: &str) -> DrawerSlot {
        let mut slots = self.slots.lock().expect("Drawer registry mutex poisoned");
        slots
            .entry(drawer_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    /// Drawer ids that have a slot, sorted.
    pub fn drawer_ids(&self) -> Vec<String> {
        let slots = self.slots.lock().expect("Drawer registry mutex poisoned");
        let mut ids: Vec<String> = slots.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of drawers with a slot.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("Drawer registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_same_slot() {
        let registry = DrawerRegistry::new();
        let a = registry.slot("front-1");
        let b = registry.slot("front-1");
        let c = registry.slot("bar");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.drawer_ids(), vec!["bar", "front-1"]);
    }

    #[test]
    fn test_clones_share_slots() {
        let registry = DrawerRegistry::new();
        let clone = registry.clone();
        let a = registry.slot("front-1");
        assert!(Arc::ptr_eq(&a, &clone.slot("front-1")));
        assert_eq!(clone.len(), 1);
    }

    #[tokio::test]
    async fn test_slots_lock_independently() {
        let registry = DrawerRegistry::new();
        let front = registry.slot("front-1");
        let bar = registry.slot("bar");

        let _held = front.lock().await;
        assert!(front.try_lock().is_err());
        assert!(bar.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_new_slot_is_unloaded() {
        let registry = DrawerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.slot("front-1").lock().await.is_none());
    }
}
