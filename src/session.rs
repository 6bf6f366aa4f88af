/// Supplies the credentials attached to every backend request.
///
/// Token refresh belongs to the auth layer; implementations only report the
/// token that is current at the time of the call.
pub trait SessionProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A session holding a fixed token, as handed over by the login flow
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Session {
            token: if token.trim().is_empty() {
                None
            } else {
                Some(token)
            },
        }
    }

    pub fn anonymous() -> Self {
        Session { token: None }
    }
}

impl SessionProvider for Session {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
