//! Ctrl+C handling shared by the server and the watch loop.
//!
//! `ctrlc` allows a single process-wide handler, so `main` installs one
//! [`Shutdown`] and hands clones to whoever blocks:
//!
//! - blocking loops register a hook (`server.unblock()`, a channel send)
//! - sleeping loops use [`Shutdown::wait_timeout`] instead of `thread::sleep`

use crate::log;
use anyhow::{Context, Result};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    stopped: bool,
    hooks: Vec<Hook>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    cond: Condvar,
}

/// Cloneable stop flag with wake-ups.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    /// Create a flag triggered by Ctrl+C. Call once per process.
    pub fn install() -> Result<Self> {
        let shutdown = Self::default();
        let handle = shutdown.clone();
        ctrlc::set_handler(move || {
            log!("signal"; "shutting down...");
            handle.trigger();
        })
        .context("Failed to set Ctrl+C handler")?;
        Ok(shutdown)
    }

    /// Stop everything waiting on this flag. Later calls do nothing.
    pub fn trigger(&self) {
        let hooks = {
            let mut state = self.inner.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            std::mem::take(&mut state.hooks)
        };
        self.inner.cond.notify_all();

        for hook in hooks {
            hook();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.state.lock().stopped
    }

    /// Run `hook` on shutdown, or right away if it already happened.
    pub fn on_trigger(&self, hook: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.state.lock();
        if state.stopped {
            drop(state);
            hook();
        } else {
            state.hooks.push(Box::new(hook));
        }
    }

    /// Sleep for `timeout` or until shutdown, whichever comes first.
    ///
    /// Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !state.stopped {
            if self.inner.cond.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.stopped
    }
}
