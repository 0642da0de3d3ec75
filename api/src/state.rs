use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sqlx::PgPool;
use stride_core::coach::Coach;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub coach: Arc<Coach>,
    pub turn_locks: TurnLocks,
}

/// One async mutex per user id, so a user's turns and approvals never interleave.
#[derive(Clone, Default)]
pub struct TurnLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TurnLocks {
    pub async fn acquire(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody is holding or waiting on.
            locks.retain(|id, lock| *id == user_id || Arc::strong_count(lock) > 1);
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = TurnLocks::default();
        let user = Uuid::now_v7();

        let guard = locks.acquire(user).await;
        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.acquire(user)).await;
        assert!(waiting.is_err());

        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.acquire(user)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn different_users_do_not_block_and_idle_locks_are_dropped() {
        let locks = TurnLocks::default();
        let first = locks.acquire(Uuid::now_v7()).await;
        let second =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::now_v7())).await;
        assert!(second.is_ok());

        drop(first);
        drop(second);
        let _third = locks.acquire(Uuid::now_v7()).await;
        assert_eq!(locks.len(), 1);
    }
}
