use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per game id.
///
/// Lifecycle operations hold their game's lock for their whole duration so
/// read-modify-write cycles on the same manifest never interleave. Different
/// games do not contend.
#[derive(Debug, Default)]
pub struct GameLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, game_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(game_id.to_string()).or_default().clone()
    }

    /// Wait for exclusive access to `game_id`
    pub async fn acquire(&self, game_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(game_id).lock_owned().await
    }
}
