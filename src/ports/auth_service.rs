use crate::domain::value_objects::Actor;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Authentication port for the external session/auth context.
///
/// Token issuance and validation live outside this service.
/// The lending core only ever sees the resolved `Actor`.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolve a bearer token to the caller identity and role.
    ///
    /// Returns `None` when the token is unknown or expired.
    async fn authenticate(&self, token: &str) -> Result<Option<Actor>>;
}
