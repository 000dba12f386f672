// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    repository::{AttemptRepository, MemoryStore, PgStore, QuizRepository, UserRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
}

impl AppState {
    /// State backed by Postgres.
    pub fn postgres(pool: PgPool, config: Config) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            users: store.clone(),
            quizzes: store.clone(),
            attempts: store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// State backed by a fresh process-local store.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            quizzes: store.clone(),
            attempts: store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
