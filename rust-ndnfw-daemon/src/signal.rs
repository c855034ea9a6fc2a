//! One-to-many signals with synchronous delivery.
//!
//! A `Signal` fans an event out to every connected callback, in connection
//! order, on the thread that emits. `connect` returns a `Connection` handle;
//! dropping the handle disconnects the callback.

use std::sync::{Arc, Mutex, Weak};

struct Slots<T> {
    next_id: u64,
    callbacks: Vec<(u64, Box<dyn Fn(&T) + Send>)>,
}

pub struct Signal<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Registers a callback. The callback stays connected for the lifetime of
    /// the returned handle.
    ///
    /// Callbacks must not connect or disconnect on this same signal while it
    /// is being emitted.
    pub fn connect(&self, callback: impl Fn(&T) + Send + 'static) -> Connection {
        let id = {
            let mut slots = self.slots.lock().unwrap();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.callbacks.push((id, Box::new(callback)));
            id
        };

        let weak: Weak<Mutex<Slots<T>>> = Arc::downgrade(&self.slots);
        Connection {
            disconnect: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    let mut slots = slots.lock().unwrap();
                    slots.callbacks.retain(|(slot_id, _)| *slot_id != id);
                }
            })),
        }
    }

    /// Delivers `args` to every connected callback in connection order.
    pub fn emit(&self, args: &T) {
        let slots = self.slots.lock().unwrap();
        for (_, callback) in &slots.callbacks {
            callback(args);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().callbacks.is_empty()
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.slots.lock().map(|s| s.callbacks.len()).unwrap_or(0);
        write!(f, "Signal({} connected)", n)
    }
}

/// RAII handle for a connected callback.
pub struct Connection {
    disconnect: Option<Box<dyn FnOnce() + Send>>,
}

impl Connection {
    /// Disconnects now rather than at drop. Idempotent.
    pub fn disconnect(mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}
