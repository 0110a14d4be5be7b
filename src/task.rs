//! Inline-storage task container.
//!
//! [`FixedFnOnce`] is a move-only analog of a boxed `FnOnce` that keeps the
//! callable in a fixed byte buffer inside the value itself. Construction,
//! invocation, and moves are O(1) and never touch the heap, which matters
//! here because the pool creates and destroys tasks on every submission.
//!
//! Type erasure uses two plain function pointers instead of a vtable: a
//! *call* slot that moves the callable out of the buffer and invokes it, and
//! an optional *drop* slot that destroys it in place. Callables that need no
//! drop (free functions, capture-less closures) carry no drop slot at all.
//!
//! Every callable receives the id of the worker that runs it; nullary
//! submission paths wrap their closure and ignore the argument.

use std::mem::{self, MaybeUninit};

use crate::errors::EmptyCall;

/// Strictest callable alignment the inline buffer supports.
const STORAGE_ALIGN: usize = 16;

/// Inline storage size for tasks queued by the pool.
///
/// Roomy enough for a typical capturing closure plus a result channel; a
/// callable that does not fit is rejected when its submission is compiled.
pub const TASK_STORAGE_SIZE: usize = 128;

/// The pool's queued task type: a void callable in 128 bytes of storage.
pub type Task = FixedFnOnce<(), TASK_STORAGE_SIZE>;

#[repr(C, align(16))]
struct Storage<const N: usize>([MaybeUninit<u8>; N]);

/// A move-only `FnOnce(usize) -> R` held in `N` bytes of inline storage.
///
/// The container is either empty or holds exactly one callable. Invoking it
/// consumes the callable; invoking an empty container fails with
/// [`EmptyCall`]. Dropping a non-empty container drops the stored callable.
/// Copying is not available, moving works like any Rust move and leaves the
/// source inaccessible; [`take`](FixedFnOnce::take) is the explicit transfer
/// that leaves an empty container behind.
pub struct FixedFnOnce<R = (), const N: usize = 64> {
    storage: Storage<N>,
    call_fn: Option<unsafe fn(*mut u8, usize) -> R>,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl<R, const N: usize> FixedFnOnce<R, N> {
    /// Creates an empty container. Invoking it yields [`EmptyCall`].
    pub const fn empty() -> Self {
        Self {
            storage: Storage([MaybeUninit::uninit(); N]),
            call_fn: None,
            drop_fn: None,
        }
    }

    /// Moves `f` into the container's inline storage.
    ///
    /// The `Send` bound is what lets the container itself cross threads.
    /// Callables larger than `N` bytes, or with alignment above 16, fail to
    /// compile.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(usize) -> R + Send + 'static,
    {
        const {
            assert!(
                mem::size_of::<F>() <= N,
                "callable does not fit in the task's inline storage",
            );
            assert!(
                mem::align_of::<F>() <= STORAGE_ALIGN,
                "callable alignment exceeds the task storage alignment",
            );
        }

        let mut this = Self::empty();
        // SAFETY: the const block above proves F fits and the buffer's
        // 16-byte alignment satisfies F's.
        unsafe { this.storage.0.as_mut_ptr().cast::<F>().write(f) };
        this.call_fn = Some(call_erased::<R, F>);
        this.drop_fn = if mem::needs_drop::<F>() {
            Some(drop_erased::<F>)
        } else {
            None
        };
        this
    }

    /// Stores a free function.
    ///
    /// Function pointers are `Copy` and need no drop slot, so this is the
    /// degenerate case of [`new`](FixedFnOnce::new).
    pub fn from_fn(f: fn(usize) -> R) -> Self
    where
        R: 'static,
    {
        Self::new(f)
    }

    /// Invokes the stored callable, passing the executing worker's id.
    ///
    /// Consumes the callable: the container is empty afterwards, and a
    /// second call returns `Err(EmptyCall)`.
    pub fn call(&mut self, worker_id: usize) -> Result<R, EmptyCall> {
        let call = self.call_fn.take().ok_or(EmptyCall)?;
        // The call slot moves the callable out of the buffer; clear the drop
        // slot first so a panic inside the callable cannot double-drop it.
        self.drop_fn = None;
        // SAFETY: `call_fn` was set, so the buffer holds the callable that
        // `call` expects.
        Ok(unsafe { call(self.storage.0.as_mut_ptr().cast(), worker_id) })
    }

    /// Transfers the callable out, leaving this container empty.
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::empty())
    }

    /// `true` if no callable is stored.
    pub fn is_empty(&self) -> bool {
        self.call_fn.is_none()
    }
}

impl<R, const N: usize> Drop for FixedFnOnce<R, N> {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn.take() {
            // SAFETY: a live drop slot implies the buffer still holds an
            // initialized callable.
            unsafe { drop_fn(self.storage.0.as_mut_ptr().cast()) };
        }
    }
}

/// Moves the `F` out of `storage` and invokes it.
///
/// # Safety
/// `storage` must hold an initialized `F`; ownership transfers to this call.
unsafe fn call_erased<R, F: FnOnce(usize) -> R>(storage: *mut u8, worker_id: usize) -> R {
    let f = storage.cast::<F>().read();
    f(worker_id)
}

/// Drops the `F` in `storage` in place.
///
/// # Safety
/// `storage` must hold an initialized `F`.
unsafe fn drop_erased<F>(storage: *mut u8) {
    storage.cast::<F>().drop_in_place();
}
