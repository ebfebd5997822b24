//! Gateway tests against a mock backend.
//!
//! Every mock requires the bearer header, so a request without it gets a 404
//! from the mock server and fails the test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};

use super::auth::{SessionError, SharedToken, StaticToken, TokenSource};
use super::client::ApiClient;
use super::decode::ResponseDecoder;
use super::endpoints;
use super::error::{ApiError, FailureMessage, FALLBACK_MESSAGE};
use super::router::EntityKind;
use super::types::CallOptions;
use crate::crypto::EnvelopeKey;

const TOKEN: &str = "tok-1";
const BEARER: &str = "Bearer tok-1";

// ── Helpers ──────────────────────────────────────────────────────────

fn decoder() -> ResponseDecoder {
    ResponseDecoder::new(EnvelopeKey::from_bytes([42u8; 32]))
}

fn sealed(value: &Value) -> String {
    decoder().encode(value).unwrap()
}

fn client(server: &MockServer) -> ApiClient {
    client_with(server, Arc::new(StaticToken::new(TOKEN)))
}

fn client_with(server: &MockServer, tokens: Arc<dyn TokenSource>) -> ApiClient {
    ApiClient::new(&server.base_url(), tokens, decoder())
}

/// Token source that counts how often a request was about to be built.
struct CountingToken {
    calls: AtomicUsize,
}

impl CountingToken {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenSource for CountingToken {
    fn token(&self) -> Result<Option<String>, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(TOKEN.to_string()))
    }
}

// ── Verbs ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_decrypts_body() {
    let server = MockServer::start();
    let units = json!([{"_id": "u1", "name": "Kilogram"}]);
    let mock = server.mock(|when, then| {
        when.method(GET).path("/unit/getAll").header("authorization", BEARER);
        then.status(200).body(sealed(&units));
    });

    let result: Value = client(&server).get("/unit/getAll").await.unwrap();
    assert_eq!(result, units);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_base_url_trailing_slash() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/dashboard/summary").header("authorization", BEARER);
        then.status(200).body(sealed(&json!({"orders": 3})));
    });

    let client = ApiClient::new(
        &format!("{}/", server.base_url()),
        Arc::new(StaticToken::new(TOKEN)),
        decoder(),
    );
    let summary: Value = client.get(endpoints::DASHBOARD_SUMMARY).await.unwrap();
    assert_eq!(summary["orders"], 3);
    mock.assert();
}

#[tokio::test]
async fn test_post_sends_json() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/category/add")
            .header("authorization", BEARER)
            .json_body(json!({"name": "Hardware"}));
        then.status(201).body(sealed(&json!({"_id": "c1", "name": "Hardware"})));
    });

    let created: Value = client(&server)
        .post("/category/add", &json!({"name": "Hardware"}))
        .await
        .unwrap();
    assert_eq!(created["_id"], "c1");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_patch_fills_id_from_payload() {
    let server = MockServer::start();
    let payload = json!({"_id": "64f..1", "name": "Gram"});
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/unit/updateById/64f..1")
            .header("authorization", BEARER)
            .json_body(json!({"_id": "64f..1", "name": "Gram"}));
        then.status(200).body(sealed(&json!({"ok": true})));
    });

    let result: Value = client(&server)
        .patch("/unit/updateById/:id", &payload)
        .await
        .unwrap();
    assert_eq!(result, json!({"ok": true}));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_patch_without_identifier_sends_nothing() {
    let server = MockServer::start();
    let tokens = CountingToken::new();
    let client = client_with(&server, tokens.clone());

    let result = client
        .patch::<_, Value>("/unit/updateById/:id", &json!({"name": "Gram"}))
        .await;
    assert!(matches!(result, Err(ApiError::MissingIdentifier { .. })));
    assert_eq!(tokens.calls(), 0);
}

#[tokio::test]
async fn test_patch_without_placeholder_sends_path_unchanged() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/settings/currency")
            .header("authorization", BEARER)
            .json_body(json!({"symbol": "€"}));
        then.status(200).body(sealed(&json!({"symbol": "€"})));
    });

    let result: Value = client(&server)
        .patch(endpoints::CURRENCY_SETTINGS, &json!({"symbol": "€"}))
        .await
        .unwrap();
    assert_eq!(result["symbol"], "€");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_delete_fills_id() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/unit/deleteById/abc123")
            .header("authorization", BEARER);
        then.status(200).body(sealed(&json!({"deleted": 1})));
    });

    let result: Value = client(&server)
        .delete("/unit/deleteById/:id", "abc123")
        .await
        .unwrap();
    assert_eq!(result["deleted"], 1);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_multipart_defaults_to_put() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/product/uploadImage/p1")
            .header("authorization", BEARER)
            .header_prefix("content-type", "multipart/form-data; boundary=")
            .body_includes("Box of nails");
        then.status(200).body(sealed(&json!({"image": "p1.png"})));
    });

    let form = reqwest::multipart::Form::new()
        .text("name", "Box of nails")
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4e, 0x47]).file_name("p1.png"),
        );
    let path = endpoints::fill_id(endpoints::PRODUCT_IMAGE, "p1");
    let result: Value = client(&server).multipart(&path, form).await.unwrap();
    assert_eq!(result["image"], "p1.png");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_multipart_with_post() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/product/addWithImage")
            .header("authorization", BEARER);
        then.status(201).body(sealed(&json!({"_id": "p2"})));
    });

    let form = reqwest::multipart::Form::new().text("name", "Hammer");
    let result: Value = client(&server)
        .multipart_with(endpoints::PRODUCT_ADD_WITH_IMAGE, form, reqwest::Method::POST)
        .await
        .unwrap();
    assert_eq!(result["_id"], "p2");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_custom_call_merges_headers_and_params() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/query")
            .query_param("lang", "en")
            .header("authorization", BEARER)
            .header("content-type", "application/json")
            .header("x-shop", "main")
            .json_body(json!({"question": "What is low on stock?"}));
        then.status(200).body(sealed(&json!({"answer": "Nails"})));
    });

    let options = CallOptions::new(reqwest::Method::POST)
        .data(json!({"question": "What is low on stock?"}))
        .param("lang", "en")
        .header("X-Shop", "main")
        .header("Authorization", "Bearer forged");
    let result: Value = client(&server)
        .custom_call(endpoints::CHAT_QUERY, options)
        .await
        .unwrap();
    assert_eq!(result["answer"], "Nails");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_custom_call_get_drops_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/report/sales")
            .query_param("from", "2024-01-01")
            .header("authorization", BEARER)
            .body("");
        then.status(200).body(sealed(&json!({"total": 1200})));
    });

    let options = CallOptions::default()
        .data(json!({"ignored": true}))
        .param("from", "2024-01-01");
    let result: Value = client(&server)
        .custom_call(endpoints::SALES_REPORT, options)
        .await
        .unwrap();
    assert_eq!(result["total"], 1200);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_custom_call_without_token_drops_caller_authorization() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/query")
            .header_missing("authorization")
            .header("x-shop", "main");
        then.status(200).body(sealed(&json!({"answer": "Nails"})));
    });

    let options = CallOptions::new(reqwest::Method::POST)
        .data(json!({"question": "What is low on stock?"}))
        .header("X-Shop", "main")
        .header("Authorization", "Bearer forged");
    let result: Value = client_with(&server, Arc::new(SharedToken::new()))
        .custom_call(endpoints::CHAT_QUERY, options)
        .await
        .unwrap();
    assert_eq!(result["answer"], "Nails");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_custom_call_rejects_bad_header() {
    let server = MockServer::start();
    let tokens = CountingToken::new();
    let options = CallOptions::default().header("bad header", "x");

    let result = client_with(&server, tokens.clone())
        .custom_call::<Value>("/chat/query", options)
        .await;
    assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    assert_eq!(tokens.calls(), 0);
}

// ── Token handling ───────────────────────────────────────────────────

#[tokio::test]
async fn test_token_is_read_per_call() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET).path("/user/getAll").header("authorization", "Bearer first");
        then.status(200).body(sealed(&json!([])));
    });
    let second = server.mock(|when, then| {
        when.method(GET).path("/user/getAll").header("authorization", "Bearer second");
        then.status(200).body(sealed(&json!([])));
    });

    let shared = SharedToken::new();
    let client = client_with(&server, Arc::new(shared.clone()));

    shared.set("first");
    let _: Value = client.get("/user/getAll").await.unwrap();
    shared.set("second");
    let _: Value = client.get("/user/getAll").await.unwrap();

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn test_no_token_still_sends() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/settings/currency");
        then.status(200).body(sealed(&json!({"symbol": "€"})));
    });

    let client = client_with(&server, Arc::new(SharedToken::new()));
    let settings: Value = client.get(endpoints::CURRENCY_SETTINGS).await.unwrap();
    assert_eq!(settings["symbol"], "€");
    assert_eq!(mock.calls(), 1);
}

// ── Failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_non_2xx_is_raw_status() {
    let server = MockServer::start();
    let body = sealed(&json!({"message": "Not allowed"}));
    server.mock(|when, then| {
        when.method(GET).path("/admin/getAll").header("authorization", BEARER);
        then.status(403).body(body.clone());
    });

    let err = client(&server)
        .get::<Value>("/admin/getAll")
        .await
        .unwrap_err();
    match &err {
        ApiError::Status { status, body: raw } => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(raw, body.as_bytes());
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(err.user_message(), FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_plain_json_success_is_decode_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/customer/getAll").header("authorization", BEARER);
        then.status(200).json_body(json!([{"_id": "c1"}]));
    });

    let err = client(&server)
        .get::<Value>("/customer/getAll")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_add_normalizes_backend_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/supplier/add").header("authorization", BEARER);
        then.status(409)
            .body(sealed(&json!({"message": "Company already registered"})));
    });

    let err = client(&server)
        .add::<_, Value>("/supplier/add", &json!({"name": "Acme"}))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Company already registered");
    match err {
        ApiError::Create { message, source } => {
            assert_eq!(
                message,
                FailureMessage::Decoded("Company already registered".into())
            );
            assert!(matches!(*source, ApiError::Status { .. }));
        }
        other => panic!("expected create error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_add_garbage_error_body_falls_back() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/customer/add").header("authorization", BEARER);
        then.status(500).body("<html>Internal Server Error</html>");
    });

    let result = client(&server)
        .create::<_, Value>(&endpoints::CUSTOMERS, &json!({"name": "Bob"}))
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.user_message(), "Something went wrong");
    assert!(matches!(
        err,
        ApiError::Create {
            message: FailureMessage::Fallback,
            ..
        }
    ));
}

#[tokio::test]
async fn test_add_transport_failure_falls_back() {
    let client = ApiClient::new(
        "http://127.0.0.1:1",
        Arc::new(StaticToken::new(TOKEN)),
        decoder(),
    );

    let err = client
        .add::<_, Value>("/unit/add", &json!({"name": "Box"}))
        .await
        .unwrap_err();
    match err {
        ApiError::Create { message, source } => {
            assert_eq!(message, FailureMessage::Fallback);
            assert!(matches!(*source, ApiError::Transport(_)));
        }
        other => panic!("expected create error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hung_request_stays_pending() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/report/stock").header("authorization", BEARER);
        then.status(200)
            .delay(Duration::from_secs(3))
            .body(sealed(&json!({})));
    });

    let client = client(&server);
    let outcome = tokio::time::timeout(
        Duration::from_millis(300),
        client.get::<Value>(endpoints::STOCK_REPORT),
    )
    .await;
    assert!(outcome.is_err(), "request resolved instead of staying pending");
}

// ── Entity router ────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_routes_every_kind() {
    let server = MockServer::start();
    let client = client(&server);

    for kind in EntityKind::ALL {
        let path = format!("/{}/updateById/id-{}", kind.tag(), kind.tag());
        let mock = server.mock(|when, then| {
            when.method(PATCH).path(path.as_str()).header("authorization", BEARER);
            then.status(200).body(sealed(&json!({"updated": kind.tag()})));
        });

        let entity = json!({"_id": format!("id-{}", kind.tag()), "name": "x"});
        let result: Value = client.update(kind.tag(), &entity).await.unwrap();
        assert_eq!(result["updated"], kind.tag());
        assert_eq!(mock.calls(), 1, "{}", kind);
    }
}

#[tokio::test]
async fn test_update_unknown_tag_sends_nothing() {
    let server = MockServer::start();
    let tokens = CountingToken::new();
    let client = client_with(&server, tokens.clone());

    for tag in ["order", "warehouse", ""] {
        let result = client.update::<_, Value>(tag, &json!({"_id": "1"})).await;
        assert!(
            matches!(result, Err(ApiError::UnsupportedEntity(ref t)) if t == tag),
            "{:?}",
            tag
        );
    }
    assert_eq!(tokens.calls(), 0);
}

#[tokio::test]
async fn test_update_missing_identifier_sends_nothing() {
    let server = MockServer::start();
    let tokens = CountingToken::new();
    let client = client_with(&server, tokens.clone());

    for kind in EntityKind::ALL {
        let result = client
            .update::<_, Value>(kind.tag(), &json!({"name": "no id"}))
            .await;
        match result {
            Err(ApiError::MissingIdentifier { entity }) => assert_eq!(entity, kind.tag()),
            other => panic!("{}: expected missing identifier, got {:?}", kind, other),
        }
    }

    // Identifier check comes first, even for unknown tags.
    let result = client.update::<_, Value>("warehouse", &json!({})).await;
    assert!(matches!(result, Err(ApiError::MissingIdentifier { .. })));
    assert_eq!(tokens.calls(), 0);
}

// ── Convenience calls ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_and_delete_by_id() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET).path("/order/getAll").header("authorization", BEARER);
        then.status(200).body(sealed(&json!([{"_id": "o1"}])));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/order/deleteById/o1").header("authorization", BEARER);
        then.status(200).body(sealed(&json!({"deleted": true})));
    });

    let client = client(&server);
    let orders: Vec<Value> = client.list(&endpoints::ORDERS).await.unwrap();
    assert_eq!(orders.len(), 1);
    let _: Value = client.delete_by_id(&endpoints::ORDERS, "o1").await.unwrap();

    assert_eq!(list.calls(), 1);
    assert_eq!(delete.calls(), 1);
}

#[tokio::test]
async fn test_currency_symbol() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/settings/currency").header("authorization", BEARER);
        then.status(200).body(sealed(&json!({"symbol": "₹", "code": "INR"})));
    });

    assert_eq!(client(&server).currency_symbol().await, "₹");
}

#[tokio::test]
async fn test_currency_symbol_falls_back() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/settings/currency").header("authorization", BEARER);
        then.status(200).body("not an envelope");
    });

    assert_eq!(client(&server).currency_symbol().await, "$");
}
