use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// Monotonic call counter; only the newest call may publish results.
#[derive(Debug, Default)]
pub(crate) struct Generation(AtomicU64);

impl Generation {
    /// Starts a new call and returns its ticket.
    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

/// Marks a watched state as loading for the lifetime of one call.
///
/// The loading flag is cleared on drop, on every exit path, but only when no
/// newer call has started since.
pub(crate) struct LoadingGuard<'a, S> {
    state: &'a watch::Sender<S>,
    generation: &'a Generation,
    ticket: u64,
    clear: fn(&mut S),
}

impl<'a, S> LoadingGuard<'a, S> {
    pub(crate) fn begin(
        state: &'a watch::Sender<S>,
        generation: &'a Generation,
        start: fn(&mut S),
        clear: fn(&mut S),
    ) -> Self {
        let ticket = generation.advance();
        state.send_modify(start);

        Self {
            state,
            generation,
            ticket,
            clear,
        }
    }

    pub(crate) fn is_current(&self) -> bool {
        self.generation.is_current(self.ticket)
    }

    /// Applies `update` only while this call is still the newest.
    pub(crate) fn publish(&self, update: impl FnOnce(&mut S)) -> bool {
        if !self.is_current() {
            return false;
        }

        self.state.send_modify(update);
        true
    }
}

impl<S> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        if self.is_current() {
            self.state.send_modify(self.clear);
        }
    }
}
