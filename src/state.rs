use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::RevocationGate;
use crate::locks::KeyedLocks;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub revocation: Arc<dyn RevocationGate>,
    pub timetable_locks: Arc<KeyedLocks>,
}

impl AppState {
    pub fn new(db: SqlitePool, revocation: Arc<dyn RevocationGate>) -> Self {
        Self {
            db,
            revocation,
            timetable_locks: Arc::new(KeyedLocks::new()),
        }
    }
}
