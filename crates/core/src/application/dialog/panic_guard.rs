// Panic isolation for job behaviours
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Result of a panic-guarded call
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Call completed
    Success(T),
    /// Call panicked
    Panicked(String),
}

/// Run a job behaviour hook with panic isolation
///
/// A panicking behaviour only fails its own job; the dialog goes on with the
/// other jobs of the message.
pub fn execute_guarded<F, T>(job: &str, f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            error!(job, panic_msg = %panic_msg, "Job behaviour panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_through() {
        assert!(matches!(
            execute_guarded("JobA", || 42),
            PanicGuardResult::Success(42)
        ));
    }

    #[test]
    fn test_panic_is_caught() {
        let result: PanicGuardResult<()> = execute_guarded("JobA", || panic!("boom"));
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "boom"),
            PanicGuardResult::Success(_) => panic!("expected panic"),
        }
    }
}
