use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use donations_api::checkout::{INVALID_TOTAL, NO_DONATIONS, TOTAL_MISMATCH};
use donations_api::render::NO_IDENTITY;
use donations_api::session::Claims;
use donations_api::{AppState, AppStateInner, SiteConfig, router};
use donations_db::Database;
use donations_ledger::{
    DonationForms, DonationLedger, InMemoryForms, IntegrityKey, PaymentTrigger, SESSION_COOKIE,
};
use donations_types::AccountId;
use jsonwebtoken::{EncodingKey, Header, encode};

const HOOK_SECRET: &str = "hook-secret";
const JWT_SECRET: &str = "jwt-secret";

fn bearer_token(account: AccountId) -> String {
    let claims = Claims {
        sub: account.get(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

struct TestApp {
    app: Router,
    forms: Arc<InMemoryForms>,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    /// Value of the session cookie set by this response, if any.
    fn session_cookie(&self) -> Option<String> {
        self.set_cookies().into_iter().find_map(|c| {
            let first = c.split(';').next()?.to_string();
            first
                .strip_prefix(&format!("{}=", SESSION_COOKIE))
                .map(str::to_string)
        })
    }
}

fn test_app() -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let forms = Arc::new(
        InMemoryForms::new()
            .with_form(6, "Lamp Offering")
            .with_form(19, "Contact Us"),
    );
    let ledger = DonationLedger::new(
        db,
        forms.clone(),
        DonationForms::default(),
        PaymentTrigger::default(),
        IntegrityKey::new("form-secret"),
    );
    let state: AppState = Arc::new(AppStateInner {
        ledger,
        jwt_secret: JWT_SECRET.into(),
        hook_secret: HOOK_SECRET.into(),
        site: SiteConfig::default(),
    });
    TestApp {
        app: router(state),
        forms,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn hook(&self, cookie: Option<&str>, event: Value) -> Reply {
        let mut req = Request::builder()
            .method("POST")
            .uri("/hooks/forms")
            .header("content-type", "application/json")
            .header("x-hook-secret", HOOK_SECRET);
        if let Some(token) = cookie {
            req = req.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        self.send(req.body(Body::from(event.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(token) = cookie {
            req = req.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookie: &str, form: &str) -> Reply {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, cookie))
            .header(header::REFERER, "/checkout")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(req).await
    }

    /// Submits a donation on form 6 as an anonymous visitor; returns the
    /// minted session token.
    async fn donate_anonymously(&self, entry_id: i64, amount: &str) -> String {
        self.forms.insert_entry(entry_id, [(81, amount.to_string())]);
        let reply = self
            .hook(None, entry_created(6, entry_id, json!({ "81": amount })))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.session_cookie().expect("session cookie issued")
    }

    /// Anti-forgery token embedded in the visitor's checkout page.
    async fn security_token(&self, session: &str) -> String {
        let html = self.get("/checkout", Some(session)).await.text();
        let marker = "id=\"donation-security\" value=\"";
        let start = html.find(marker).expect("token embedded") + marker.len();
        let end = start + html[start..].find('"').unwrap();
        html[start..end].to_string()
    }
}

fn entry_created(form_id: i64, entry_id: i64, fields: Value) -> Value {
    json!({
        "type": "entry_created",
        "data": { "form_id": form_id, "entry_id": entry_id, "fields": fields }
    })
}

fn payment_completed(action_id: i64) -> Value {
    json!({
        "type": "payment_status_changed",
        "data": { "entry_id": 5000, "status": "complete", "action_id": action_id, "amount": "75.50" }
    })
}

#[tokio::test]
async fn donation_lifecycle_from_submission_to_payment() {
    let t = test_app();

    // Anonymous submission creates one row owned by a fresh session.
    t.forms.insert_entry(900, [(81, "50.00".to_string())]);
    let reply = t
        .hook(None, entry_created(6, 900, json!({ "81": "50.00" })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "ingested": true, "redirect": "/checkout" }));
    let cookie = reply
        .set_cookies()
        .into_iter()
        .find(|c| c.starts_with(SESSION_COOKIE))
        .unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=86400"));
    let sid = reply.session_cookie().unwrap();

    let reply = t.get(&format!("/donations?sid={}", sid), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!([{
            "label": "Lamp Offering",
            "amount": "50.00",
            "entry_id": 900,
            "session_token": sid,
        }])
    );

    // Owner edits the amount; the external entry follows.
    let token = t.security_token(&sid).await;
    let reply = t
        .post_form(
            "/donations/update",
            &sid,
            &format!("entry_id=900&amount=75.50&security={}", token),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "success": true, "redirect": "/checkout" }));
    assert_eq!(t.forms.entry_field(900, 81).as_deref(), Some("75.50"));

    // Matching total passes, a wrong one blocks.
    let reply = t.get("/checkout?total_amount=75.50", Some(&sid)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.text().contains("<th class=\"donations-total\">75.50</th>"));

    let reply = t.get("/checkout?total_amount=999.99", Some(&sid)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.text().contains(TOTAL_MISMATCH));

    // Payment completion clears the ledger and expires the cookie.
    let reply = t.hook(Some(&sid), payment_completed(43398)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "reconciled": true, "deleted": 1 }));
    assert_eq!(reply.session_cookie().as_deref(), Some(""));
    assert!(
        reply
            .set_cookies()
            .iter()
            .any(|c| c.starts_with(SESSION_COOKIE) && c.contains("Max-Age=0"))
    );

    let reply = t.get(&format!("/donations?sid={}", sid), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({ "message": "No donations found" }));
}

#[tokio::test]
async fn hook_requires_shared_secret() {
    let t = test_app();
    for secret in [Some("guess"), Some("hook-secre"), Some(""), None] {
        let mut req = Request::builder()
            .method("POST")
            .uri("/hooks/forms")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            req = req.header("x-hook-secret", secret);
        }
        let req = req
            .body(Body::from(entry_created(6, 1, json!({ "81": "5" })).to_string()))
            .unwrap();
        let reply = t.send(req).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "{secret:?}");
    }

    let reply = t.get("/donations?user_id=1", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_forms_are_not_ingested() {
    let t = test_app();
    let reply = t
        .hook(None, entry_created(19, 1, json!({ "81": "5.00" })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "ingested": false }));
    assert!(reply.session_cookie().is_none());
}

#[tokio::test]
async fn resubmitted_entry_is_not_duplicated() {
    let t = test_app();
    let sid = t.donate_anonymously(900, "10").await;

    let reply = t
        .hook(Some(&sid), entry_created(6, 900, json!({ "81": "10" })))
        .await;
    assert_eq!(reply.json(), json!({ "ingested": false, "redirect": "/checkout" }));

    let reply = t.get(&format!("/donations?sid={}", sid), None).await;
    assert_eq!(reply.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mutations_reject_bad_tokens_and_foreign_rows() {
    let t = test_app();
    let owner = t.donate_anonymously(900, "50.00").await;
    let intruder = t.donate_anonymously(901, "1.00").await;

    let reply = t
        .post_form("/donations/update", &owner, "entry_id=900&amount=1.00&security=forged")
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(
        reply.json(),
        json!({ "success": false, "message": "Invalid security token" })
    );

    let token = t.security_token(&intruder).await;
    let reply = t
        .post_form(
            "/donations/delete",
            &intruder,
            &format!("entry_id=900&security={}", token),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = t.get(&format!("/donations?sid={}", owner), None).await;
    assert_eq!(reply.json()[0]["amount"], "50.00");
    assert!(t.forms.has_entry(900));
}

#[tokio::test]
async fn invalid_amount_is_a_bad_request() {
    let t = test_app();
    let sid = t.donate_anonymously(900, "50.00").await;
    let token = t.security_token(&sid).await;

    let reply = t
        .post_form(
            "/donations/update",
            &sid,
            &format!("entry_id=900&amount=-5&security={}", token),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["success"], false);
}

#[tokio::test]
async fn owner_deletes_row_and_external_entry() {
    let t = test_app();
    let sid = t.donate_anonymously(900, "5").await;
    t.forms.insert_entry(901, [(81, "6".to_string())]);
    t.hook(Some(&sid), entry_created(6, 901, json!({ "81": "6" })))
        .await;
    let token = t.security_token(&sid).await;

    let reply = t
        .post_form(
            "/donations/delete",
            &sid,
            &format!("entry_id=900&security={}", token),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(!t.forms.has_entry(900));

    let rows = t.get(&format!("/donations?sid={}", sid), None).await.json();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["entry_id"], 901);
}

#[tokio::test]
async fn checkout_blocks_bad_or_empty_totals() {
    let t = test_app();

    let reply = t.get("/checkout?total_amount=10", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.text().contains(NO_DONATIONS));

    let reply = t.get("/checkout?total_amount=abc", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.text().contains(INVALID_TOTAL));

    let reply = t.get("/checkout", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.text().contains(NO_IDENTITY));
}

#[tokio::test]
async fn payment_for_other_action_is_ignored() {
    let t = test_app();
    let sid = t.donate_anonymously(900, "5").await;

    let reply = t.hook(Some(&sid), payment_completed(1)).await;
    assert_eq!(reply.json(), json!({ "reconciled": false, "deleted": 0 }));
    assert!(reply.session_cookie().is_none());

    let reply = t.hook(None, payment_completed(43398)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);

    let reply = t.get(&format!("/donations?sid={}", sid), None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn bearer_account_owns_its_donations() {
    let t = test_app();
    let account = AccountId::new(7).unwrap();
    let jwt = bearer_token(account);

    let req = Request::builder()
        .method("POST")
        .uri("/hooks/forms")
        .header("content-type", "application/json")
        .header("x-hook-secret", HOOK_SECRET)
        .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
        .body(Body::from(entry_created(6, 42, json!({ "81": 20 })).to_string()))
        .unwrap();
    let reply = t.send(req).await;
    assert_eq!(reply.json()["ingested"], true);
    assert!(reply.session_cookie().is_none());

    let reply = t.get("/donations?user_id=7", None).await;
    assert_eq!(
        reply.json(),
        json!([{ "label": "Lamp Offering", "amount": "20.00", "entry_id": 42, "account_id": 7 }])
    );

    let req = Request::builder()
        .method("GET")
        .uri("/donations")
        .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
        .body(Body::empty())
        .unwrap();
    assert_eq!(t.send(req).await.status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_ok() {
    let t = test_app();
    let reply = t.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "ok");
}
