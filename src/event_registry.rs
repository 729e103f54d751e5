//! Observer lists backing the bridge's event surfaces.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Handle returned by [`EventRegistry::subscribe`], used to remove the
/// registration again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Callback<P> = Arc<dyn Fn(&P) + Send + Sync>;

struct RegistryEntry<P> {
    id: SubscriptionId,
    callback: Callback<P>,
}

/// Ordered list of callback registrations for one event surface.
///
/// Firing iterates a snapshot of the registrations, so callbacks may
/// subscribe or unsubscribe during dispatch without disturbing the emit in
/// flight. Registrations removed mid-dispatch still receive that emit.
pub struct EventRegistry<P> {
    entries: Mutex<Vec<RegistryEntry<P>>>,
}

impl<P> EventRegistry<P> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Adds a callback and returns the id that removes it again.
    pub fn subscribe(&self, callback: impl Fn(&P) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.lock_entries().push(RegistryEntry {
            id: id.clone(),
            callback: Arc::new(callback),
        });
        id
    }

    /// Removes a registration. Returns false when the id is not registered.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|entry| entry.id != *id);
        entries.len() != before
    }

    /// Invokes every registered callback, in subscription order.
    pub fn emit(&self, payload: &P) {
        let snapshot: Vec<Callback<P>> = self
            .lock_entries()
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();
        for callback in snapshot {
            callback(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<RegistryEntry<P>>> {
        match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<P> Default for EventRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_and_emit_invokes_callbacks_in_order() {
        let registry: EventRegistry<u32> = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        registry.subscribe(move |value| first.lock().unwrap().push(("first", *value)));
        let second = Arc::clone(&seen);
        registry.subscribe(move |value| second.lock().unwrap().push(("second", *value)));

        registry.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe_removes_callback() {
        let registry: EventRegistry<()> = EventRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let id = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.emit(&());
        assert!(registry.unsubscribe(&id));
        assert!(!registry.unsubscribe(&id));
        registry.emit(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_does_not_disturb_the_emit_in_flight() {
        let registry: Arc<EventRegistry<()>> = Arc::new(EventRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));

        let registry_handle = Arc::clone(&registry);
        let victim_counter = Arc::clone(&count);
        let victim = registry.subscribe(move |_| {
            victim_counter.fetch_add(1, Ordering::SeqCst);
        });
        let remover_counter = Arc::clone(&count);
        registry.subscribe(move |_| {
            remover_counter.fetch_add(1, Ordering::SeqCst);
            registry_handle.unsubscribe(&victim);
        });

        // Snapshot semantics: the victim was subscribed first, so it still
        // sees the emit that removes it.
        registry.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 2);

        registry.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_subscribe_during_dispatch_takes_effect_on_next_emit() {
        let registry: Arc<EventRegistry<()>> = Arc::new(EventRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));

        let registry_handle = Arc::clone(&registry);
        let outer_counter = Arc::clone(&count);
        registry.subscribe(move |_| {
            outer_counter.fetch_add(1, Ordering::SeqCst);
            let inner_counter = Arc::clone(&outer_counter);
            registry_handle.subscribe(move |_| {
                inner_counter.fetch_add(10, Ordering::SeqCst);
            });
        });

        registry.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 2);
    }
}
