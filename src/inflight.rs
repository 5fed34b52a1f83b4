// Restores a component's state when an in-flight call is dropped before it resolves

use parking_lot::Mutex;

pub(crate) struct RestoreOnDrop<'a, T> {
    state: &'a Mutex<T>,
    restore: Option<T>,
}

impl<'a, T> RestoreOnDrop<'a, T> {
    pub(crate) fn new(state: &'a Mutex<T>, restore: T) -> Self {
        Self {
            state,
            restore: Some(restore),
        }
    }

    // The call resolved; its outcome owns the state from here
    pub(crate) fn disarm(mut self) {
        self.restore = None;
    }
}

impl<T> Drop for RestoreOnDrop<'_, T> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            *self.state.lock() = restore;
            tracing::debug!("in-flight call dropped, state restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_restores_state() {
        let state = Mutex::new(2);
        {
            let _guard = RestoreOnDrop::new(&state, 1);
            *state.lock() = 3;
        }
        assert_eq!(*state.lock(), 1);
    }

    #[test]
    fn test_disarmed_guard_leaves_state_alone() {
        let state = Mutex::new(2);
        let guard = RestoreOnDrop::new(&state, 1);
        *state.lock() = 3;

        guard.disarm();

        assert_eq!(*state.lock(), 3);
    }
}
