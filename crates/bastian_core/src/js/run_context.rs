use core::fmt;
use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::js::{Handle, NativeFunction};

static NEXT_REALM_ID: AtomicU32 = AtomicU32::new(1);

thread_local! {
    // Innermost context last. Only `RunContextGuard` pops.
    static ACTIVE: RefCell<Vec<Handle<RunContext>>> = const { RefCell::new(Vec::new()) };
}

/// Identifies a native function registered in a realm. Backends store it in the function's
/// callback data, trampolines decode it to find their way back to the host callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeKey {
    pub realm: u32,
    pub slot: u32,
}

impl NativeKey {
    pub fn to_bits(self) -> u64 {
        (u64::from(self.realm) << 32) | u64::from(self.slot)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            realm: (bits >> 32) as u32,
            slot: bits as u32,
        }
    }
}

/// One realm: a backend execution context plus the native functions exported into it.
///
/// The backend state is opaque to the core (`v8::Global<v8::Context>`, a QuickJS context, ...)
/// and is reached through [`RunContext::state`].
pub struct RunContext {
    id: u32,
    backend: &'static str,
    natives: RefCell<Vec<NativeFunction>>,
    state: Box<dyn Any>,
}

impl RunContext {
    pub fn new<S: Any>(backend: &'static str, state: S) -> Handle<Self> {
        Handle::new(Self {
            id: NEXT_REALM_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            natives: RefCell::new(Vec::new()),
            state: Box::new(state),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn state<S: Any>(&self) -> Option<&S> {
        self.state.downcast_ref::<S>()
    }

    pub fn register(&self, function: NativeFunction) -> NativeKey {
        let mut natives = self.natives.borrow_mut();
        natives.push(function);

        NativeKey {
            realm: self.id,
            slot: (natives.len() - 1) as u32,
        }
    }

    pub fn native(&self, slot: u32) -> Option<NativeFunction> {
        self.natives.borrow().get(slot as usize).cloned()
    }

    pub fn native_count(&self) -> usize {
        self.natives.borrow().len()
    }

    /// The innermost active context on this thread.
    pub fn current() -> Option<Handle<RunContext>> {
        ACTIVE.with(|active| active.borrow().last().cloned())
    }

    /// Makes `context` current until the returned guard is dropped, which restores whatever was
    /// current before.
    pub fn set_current(context: Handle<RunContext>) -> RunContextGuard {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            let depth = active.len();
            active.push(context);
            RunContextGuard { depth }
        })
    }

    /// Looks up an active context by id, innermost first.
    pub fn find(id: u32) -> Option<Handle<RunContext>> {
        ACTIVE.with(|active| active.borrow().iter().rev().find(|ctx| ctx.id == id).cloned())
    }

    pub fn is_active(id: u32) -> bool {
        Self::find(id).is_some()
    }

    /// Number of contexts on the active stack.
    pub fn depth() -> usize {
        ACTIVE.with(|active| active.borrow().len())
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("natives", &self.native_count())
            .finish_non_exhaustive()
    }
}

#[must_use = "the context is only current while the guard is alive"]
pub struct RunContextGuard {
    depth: usize,
}

impl Drop for RunContextGuard {
    fn drop(&mut self) {
        // The stack may already be gone during thread teardown.
        let popped = ACTIVE.try_with(|active| {
            let mut active = active.borrow_mut();
            if active.len() > self.depth {
                active.split_off(self.depth)
            } else {
                Vec::new()
            }
        });

        // Released after the borrow ends, dropping a realm may run backend destructors.
        drop(popped);
    }
}
