/// Supplies the signed-in user's id.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<i64>;
}

/// A user id fixed at startup, typically from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(Option<i64>);

impl StaticIdentity {
    pub fn new(user_id: Option<i64>) -> Self {
        Self(user_id)
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<i64> {
        self.0
    }
}
