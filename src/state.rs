/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - gate: AccessGate (鍵・検証ルール・authority 変換、起動後は不変)
 *   - users: UserRepository (Postgres or in-memory)
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::repos::UserRepository;
use crate::services::auth::AccessGate;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(gate: Arc<AccessGate>, users: Arc<dyn UserRepository>) -> Self {
        Self { gate, users }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
