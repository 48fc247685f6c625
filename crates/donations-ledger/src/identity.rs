use donations_types::{AccountId, Identity, SessionToken};

/// Cookie that carries the anonymous session token.
pub const SESSION_COOKIE: &str = "donation_session_id";

/// Lifetime of a freshly issued session cookie.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Identification a request arrived with, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub account: Option<AccountId>,
    pub session: Option<SessionToken>,
}

impl Credentials {
    pub fn account(id: AccountId) -> Self {
        Self {
            account: Some(id),
            session: None,
        }
    }

    pub fn session(token: SessionToken) -> Self {
        Self {
            account: None,
            session: Some(token),
        }
    }

    /// The identity the request acts as, without minting anything. An
    /// authenticated account takes precedence over a session cookie.
    pub fn identity(&self) -> Option<Identity> {
        self.account
            .map(Identity::Account)
            .or_else(|| self.session.clone().map(Identity::Session))
    }

    /// Every identity the request carries: the account first, then the session.
    pub fn identities(&self) -> Vec<Identity> {
        let mut out = Vec::with_capacity(2);
        if let Some(id) = self.account {
            out.push(Identity::Account(id));
        }
        if let Some(token) = &self.session {
            out.push(Identity::Session(token.clone()));
        }
        out
    }
}

/// Outcome of [`resolve`]. When `issued` is set the caller must persist it as
/// the session cookie for [`SESSION_TTL_HOURS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: Identity,
    pub issued: Option<SessionToken>,
}

/// Resolve the acting identity, minting a session token on first anonymous
/// contact. Never fails.
pub fn resolve(credentials: &Credentials) -> Resolution {
    match credentials.identity() {
        Some(identity) => Resolution {
            identity,
            issued: None,
        },
        None => {
            let token = SessionToken::generate();
            Resolution {
                identity: Identity::Session(token.clone()),
                issued: Some(token),
            }
        }
    }
}
