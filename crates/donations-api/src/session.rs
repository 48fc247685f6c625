use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use donations_ledger::{Credentials, SESSION_COOKIE, SESSION_TTL_HOURS};
use donations_types::{AccountId, SessionToken};

/// Account bearer token claims. `sub` is the numeric account id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

/// Account carried by `Authorization: Bearer <jwt>`. A missing, invalid or
/// expired token leaves the request anonymous instead of rejecting it.
pub fn bearer_account(headers: &HeaderMap, jwt_secret: &str) -> Option<AccountId> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))?;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => AccountId::new(data.claims.sub),
        Err(e) => {
            debug!("Ignoring bearer token: {}", e);
            None
        }
    }
}

pub fn session_from_jar(jar: &CookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .and_then(|c| SessionToken::parse(c.value()))
}

/// Everything the request identifies itself with.
pub fn credentials(headers: &HeaderMap, jar: &CookieJar, jwt_secret: &str) -> Credentials {
    Credentials {
        account: bearer_account(headers, jwt_secret),
        session: session_from_jar(jar),
    }
}

pub fn session_cookie(token: &SessionToken, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(SESSION_TTL_HOURS))
        .build()
}

/// Empties and expires the session cookie.
pub fn expire_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
