// Coalesces a burst of text edits into one history entry.
//
// The first edit of a burst captures the state before it; every edit
// restarts the countdown; when it runs out the captured state is released.

#[derive(Clone, Debug)]
pub struct EditDebounce<T> {
    quantum: f64,
    remaining: f64,
    pending: Option<T>,
}

impl<T> EditDebounce<T> {
    pub fn new(quantum_secs: f64) -> Self {
        Self {
            quantum: quantum_secs.max(0.0),
            remaining: 0.0,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// `before` is only called for the first edit of a burst.
    pub fn edit(&mut self, before: impl FnOnce() -> T) {
        if self.pending.is_none() {
            self.pending = Some(before());
        }
        self.remaining = self.quantum;
    }

    /// Advance by `elapsed` seconds; yields the captured state once the
    /// countdown expires.
    pub fn tick(&mut self, elapsed: f64) -> Option<T> {
        self.pending.as_ref()?;
        self.remaining -= elapsed;
        if self.remaining <= 0.0 { self.flush() } else { None }
    }

    /// Release the captured state right away.
    pub fn flush(&mut self) -> Option<T> {
        self.remaining = 0.0;
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_keeps_first_snapshot() {
        let mut d = EditDebounce::new(0.5);
        d.edit(|| "before");
        d.edit(|| "later");
        assert!(d.is_pending());
        assert_eq!(d.tick(0.3), None);
        d.edit(|| "even later"); // restarts the countdown
        assert_eq!(d.tick(0.3), None);
        assert_eq!(d.tick(0.3), Some("before"));
        assert!(!d.is_pending());
        assert_eq!(d.tick(1.0), None);
    }

    #[test]
    fn flush_releases_immediately() {
        let mut d = EditDebounce::new(10.0);
        d.edit(|| 1);
        assert_eq!(d.flush(), Some(1));
        assert_eq!(d.flush(), None);
    }
}
