/// Notified once after every orchestrated command, whatever its outcome.
///
/// A failed command may still have touched the files the host watches, so
/// the refresh is not limited to successful runs.
pub trait StateRefresher {
    fn refresh(&self);
}

impl<F: Fn()> StateRefresher for F {
    fn refresh(&self) {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_closure_refresher() {
        let count = Cell::new(0);
        let refresher = || count.set(count.get() + 1);
        refresher.refresh();
        refresher.refresh();
        assert_eq!(count.get(), 2);
    }
}
