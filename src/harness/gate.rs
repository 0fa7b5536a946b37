use parking_lot::{Condvar, Mutex};

/// A one-shot start signal shared by the tasks of a single scenario.
///
/// Every waiter blocks in [`StartGate::wait`] until [`StartGate::release`] is called once.
/// Waiters arriving after the release pass straight through.
#[derive(Debug, Default)]
pub(crate) struct StartGate {
    released: Mutex<bool>,
    signal: Condvar,
}

impl StartGate {
    /// Creates a closed gate.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Opens the gate and wakes every waiting task.
    pub(crate) fn release(&self) {
        let mut released = self.released.lock();
        if *released {
            return;
        }

        *released = true;
        self.signal.notify_all();
    }

    /// Blocks the calling thread until the gate has been released.
    pub(crate) fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.signal.wait(&mut released);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        *self.released.lock()
    }
}
