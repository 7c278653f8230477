use crate::error::{Error, Stage};

/// How long a hardware status spin may run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollLimit {
    /// Spin until the hardware answers, however long that takes.
    #[default]
    Unbounded,
    /// Give up after this many unsuccessful checks.
    Iterations(u32),
}

/// Block until `done` returns true.
///
/// `done` is evaluated at least once. With [`PollLimit::Iterations`] the spin
/// ends in [`Error::Timeout`] for `stage` once the budget is spent.
pub fn spin_until<F>(limit: PollLimit, stage: Stage, mut done: F) -> Result<(), Error>
where
    F: FnMut() -> bool,
{
    let mut checks: u32 = 0;
    loop {
        if done() {
            return Ok(());
        }
        checks = checks.saturating_add(1);
        if let PollLimit::Iterations(max) = limit {
            if checks >= max {
                log_warn!("gave up polling after {} checks", checks);
                return Err(Error::Timeout(stage));
            }
        }
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_returns_once_done() {
        let mut remaining = 1000;
        let result = spin_until(PollLimit::Unbounded, Stage::CacheFlush, || {
            remaining -= 1;
            remaining == 0
        });
        assert_eq!(result, Ok(()));
        assert_eq!(remaining, 0);
    }

    #[test]
    fn bounded_times_out() {
        let mut calls = 0;
        let result = spin_until(PollLimit::Iterations(5), Stage::Unprotect, || {
            calls += 1;
            false
        });
        assert_eq!(result, Err(Error::Timeout(Stage::Unprotect)));
        assert_eq!(calls, 5);
    }

    #[test]
    fn bounded_succeeds_within_budget() {
        let mut calls = 0;
        let result = spin_until(PollLimit::Iterations(5), Stage::Unprotect, || {
            calls += 1;
            calls == 5
        });
        assert_eq!(result, Ok(()));
    }
}
