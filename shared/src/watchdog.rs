// Hardware watchdog access
// Long network calls must run with the watchdog paused, and it must come
// back on however the call ends.

use log::debug;

pub trait Watchdog {
    fn enable(&self);
    fn disable(&self);
    fn feed(&self);
}

impl<T: Watchdog + ?Sized> Watchdog for &T {
    fn enable(&self) {
        (**self).enable()
    }

    fn disable(&self) {
        (**self).disable()
    }

    fn feed(&self) {
        (**self).feed()
    }
}

/// Disables the watchdog for its lifetime. Re-enabled on drop, including
/// early returns and unwinding.
#[must_use = "the watchdog is re-enabled as soon as the guard is dropped"]
pub struct WatchdogPause<'a, W: Watchdog + ?Sized> {
    watchdog: &'a W,
}

impl<'a, W: Watchdog + ?Sized> WatchdogPause<'a, W> {
    pub fn new(watchdog: &'a W) -> Self {
        debug!("Watchdog paused");
        watchdog.disable();
        Self { watchdog }
    }
}

impl<W: Watchdog + ?Sized> Drop for WatchdogPause<'_, W> {
    fn drop(&mut self) {
        self.watchdog.enable();
        debug!("Watchdog resumed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{RecordingWatchdog, WatchdogEvent};

    #[test]
    fn pause_disables_then_enables() {
        let watchdog = RecordingWatchdog::default();
        {
            let _pause = WatchdogPause::new(&watchdog);
            assert_eq!(watchdog.events(), vec![WatchdogEvent::Disabled]);
        }
        assert_eq!(
            watchdog.events(),
            vec![WatchdogEvent::Disabled, WatchdogEvent::Enabled]
        );
    }

    #[test]
    fn pause_enables_again_when_unwinding() {
        let watchdog = RecordingWatchdog::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _pause = WatchdogPause::new(&watchdog);
            panic!("request blew up");
        }));

        assert!(result.is_err());
        assert_eq!(watchdog.events().last(), Some(&WatchdogEvent::Enabled));
    }
}
