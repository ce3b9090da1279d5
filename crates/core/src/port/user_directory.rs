// User Directory Port (Interface)

use crate::domain::{User, UserFlags};
use crate::error::Result;
use async_trait::async_trait;

/// Users and their per-bank settings
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    /// Persistently add `flags` to a user's flags
    async fn add_flags(&self, id: &str, flags: UserFlags) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub struct MockUserDirectory {
        users: Arc<Mutex<HashMap<String, User>>>,
    }

    impl MockUserDirectory {
        pub fn new(users: Vec<User>) -> Self {
            Self {
                users: Arc::new(Mutex::new(
                    users.into_iter().map(|u| (u.id.clone(), u)).collect(),
                )),
            }
        }

        pub fn get(&self, id: &str) -> Option<User> {
            self.users.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl UserDirectory for MockUserDirectory {
        async fn find_user(&self, id: &str) -> Result<Option<User>> {
            Ok(self.get(id))
        }

        async fn add_flags(&self, id: &str, flags: UserFlags) -> Result<()> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
            user.flags = user.flags.union(flags);
            Ok(())
        }
    }
}
