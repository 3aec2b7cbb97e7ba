use std::sync::{Mutex, PoisonError};

/// A flag and lock pair admitting one operation at a time.
///
/// Later attempts are rejected, never queued. The flag is released either by
/// the caller on failure or by whoever observes the operation complete.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Mutex<bool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag. `false` if an operation is already in flight.
    pub fn try_begin(&self) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if *in_flight {
            return false;
        }
        *in_flight = true;
        true
    }

    pub fn release(&self) {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_in_flight(&self) -> bool {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
