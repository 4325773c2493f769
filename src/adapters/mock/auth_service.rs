use crate::domain::value_objects::Actor;
use crate::ports::auth_service::{AuthService as AuthServiceTrait, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Mock implementation of AuthService
///
/// Resolves bearer tokens from a fixed table instead of a real session store.
/// The table is seeded from configuration or registered directly in tests.
pub struct AuthService {
    tokens: Mutex<HashMap<String, Actor>>,
}

impl AuthService {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_tokens(tokens: impl IntoIterator<Item = (String, Actor)>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into_iter().collect()),
        }
    }

    /// Register a token for testing purposes
    pub fn register(&self, token: impl Into<String>, actor: Actor) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), actor);
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthServiceTrait for AuthService {
    async fn authenticate(&self, token: &str) -> Result<Option<Actor>> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied())
    }
}
