/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Cheap to clone (Arc inside)
 */
use std::sync::Arc;

use crate::services::authz::Authorizer;

#[derive(Clone, Debug)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
}

impl AppState {
    pub fn new(authorizer: Arc<Authorizer>) -> Self {
        Self { authorizer }
    }
}
