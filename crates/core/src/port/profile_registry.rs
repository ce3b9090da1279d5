// Export Profile Registry Port (Interface)

use crate::domain::ExportProfile;
use crate::error::Result;

/// Registered import/export profiles, grouped by format family
pub trait ProfileRegistry: Send + Sync {
    fn profiles(&self, family: &str) -> Result<Vec<ExportProfile>>;

    fn profile(&self, family: &str, name: &str) -> Result<Option<ExportProfile>> {
        Ok(self
            .profiles(family)?
            .into_iter()
            .find(|p| p.name == name))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub struct MockProfileRegistry {
        profiles: Vec<ExportProfile>,
        lookups: Arc<Mutex<usize>>,
    }

    impl MockProfileRegistry {
        pub fn new(profiles: Vec<ExportProfile>) -> Self {
            Self {
                profiles,
                lookups: Arc::new(Mutex::new(0)),
            }
        }

        /// Number of `profiles` calls so far
        pub fn lookups(&self) -> usize {
            *self.lookups.lock().unwrap()
        }
    }

    impl ProfileRegistry for MockProfileRegistry {
        fn profiles(&self, _family: &str) -> Result<Vec<ExportProfile>> {
            *self.lookups.lock().unwrap() += 1;
            Ok(self.profiles.clone())
        }
    }
}
