//! Cancellable background work (SPEC_FULL §0): generalized from the
//! teacher's `task_control.rs` signal-pair pattern, swapping its
//! hardware-specific raw mutex for `embassy_sync`'s `CriticalSectionRawMutex`
//! so it stays usable on any target `critical-section` supports. Used for
//! the handful of delayed jobs spec §5 names as cancellable: the full-batt
//! recheck, the tracker worker, and the UVLO follow-up read.

use core::{cell::UnsafeCell, future::Future};

use alloc::sync::Arc;
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};

/// The return value of the task, when cancelled.
#[non_exhaustive]
pub struct Aborted {}

struct Inner<R: Send, D: Send = ()> {
    token: Signal<CriticalSectionRawMutex, ()>,
    exited: Signal<CriticalSectionRawMutex, Result<R, Aborted>>,
    resources: UnsafeCell<D>,
}

unsafe impl<R: Send, D: Send> Send for Inner<R, D> {}
unsafe impl<R: Send, D: Send> Sync for Inner<R, D> {}

impl<R: Send, D: Send> Inner<R, D> {
    const fn new(resources: D) -> Self {
        Self {
            token: Signal::new(),
            exited: Signal::new(),
            resources: UnsafeCell::new(resources),
        }
    }

    async fn stop_from_outside(&self) -> Result<R, Aborted> {
        self.token.signal(());
        self.exited.wait().await
    }

    fn has_exited(&self) -> bool {
        self.exited.signaled()
    }

    /// # Safety
    /// The caller must ensure this function is not called reentrantly.
    async unsafe fn run_cancellable<'a, F>(&'a self, f: impl FnOnce(&'a mut D) -> F)
    where
        F: Future<Output = R> + 'a,
    {
        self.token.reset();
        self.exited.reset();

        let resources = unsafe { &mut *self.resources.get() };

        let result = match select(f(resources), self.token.wait()).await {
            Either::First(result) => Ok(result),
            Either::Second(_) => Err(Aborted {}),
        };
        self.exited.signal(result)
    }
}

pub struct TaskController<R: Send, D: Send = ()> {
    inner: Arc<Inner<R, D>>,
}

impl<R: Send> TaskController<R, ()> {
    pub fn new() -> Self {
        Self::from_resources(())
    }
}

impl<R: Send> Default for TaskController<R, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send, D: Send> TaskController<R, D> {
    pub fn from_resources(resources: D) -> Self {
        Self {
            inner: Arc::new(Inner::new(resources)),
        }
    }

    pub async fn stop(&self) -> Result<R, Aborted> {
        self.inner.stop_from_outside().await
    }

    pub fn has_exited(&self) -> bool {
        self.inner.has_exited()
    }

    pub fn token(&self) -> TaskControlToken<R, D> {
        debug_assert_eq!(Arc::strong_count(&self.inner), 1);
        TaskControlToken {
            inner: self.inner.clone(),
        }
    }

    pub fn unwrap(self) -> D {
        let inner = self.inner.clone();
        core::mem::drop(self);
        Arc::try_unwrap(inner)
            .ok()
            .expect("token still held elsewhere")
            .resources
            .into_inner()
    }
}

impl<R: Send, D: Send> Drop for TaskController<R, D> {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) > 1 {
            self.inner.token.signal(());
        }
    }
}

pub struct TaskControlToken<R: Send, D: Send = ()> {
    inner: Arc<Inner<R, D>>,
}

impl<R: Send, D: Send> TaskControlToken<R, D> {
    pub async fn run_cancellable<'a, F>(&'a mut self, f: impl FnOnce(&'a mut D) -> F)
    where
        F: Future<Output = R> + 'a,
    {
        unsafe {
            // Safety: this is the only call site of `Inner::run_cancellable`
            // and `run_cancellable` takes `&mut self`.
            self.inner.run_cancellable(f).await
        }
    }
}
