//! End-to-end flows through the router with the in-memory store:
//! HTTP -> params -> compiler/resolver -> store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use catalogue_server::api::{create_router, ApiContext};
use catalogue_server::store::{AcceptAllValidator, InMemoryStore, SchemaValidator};

const COS_ID: &str = "0f1b4bd9-4b06-4a74-a6a7-0f8a2c1f4c01";
const RS_ID: &str = "e9a2f1c8-1a34-4cbe-9d3e-0f8a2c1f4c02";
const PROVIDER_ID: &str = "83995e8c-fa80-4241-93c0-e86a66154eb6";
const GROUP_ID: &str = "5c0a28ef-7a37-4d3c-b8b4-0f8a2c1f4c04";
const RESOURCE_ID: &str = "8b95ab80-a3c1-44f3-b0b0-dfc53c7f2b2e";

fn test_router() -> axum::Router {
    let store = Arc::new(InMemoryStore::new());
    let validator: Arc<dyn SchemaValidator> = Arc::new(AcceptAllValidator);
    let ctx = ApiContext::new(store, validator, Duration::from_secs(3));
    create_router().with_state(ctx)
}

/// Percent-encode the characters our JSON-array query params carry.
fn enc(raw: &str) -> String {
    raw.replace('"', "%22")
        .replace('[', "%5B")
        .replace(']', "%5D")
        .replace(' ', "%20")
}

async fn send(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register the full hierarchy: COS -> ResourceServer -> Provider ->
/// ResourceGroup -> Resource, plus the "pune" instance namespace.
async fn seed(router: &axum::Router) {
    let (status, _) = send(router, "POST", "/instance?id=pune", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let items = vec![
        json!({"id": COS_ID, "type": ["COS"], "name": "exchange root"}),
        json!({
            "id": RS_ID, "type": ["ResourceServer"], "name": "rs.example.org",
            "cos": COS_ID, "resourceServerURL": "https://rs.example.org"
        }),
        json!({
            "id": PROVIDER_ID, "type": ["Provider"], "name": "city sensing",
            "resourceServer": RS_ID, "providerUserId": "user-42"
        }),
        json!({
            "id": GROUP_ID, "type": ["ResourceGroup"], "name": "aqm sensors",
            "provider": PROVIDER_ID, "instance": "pune"
        }),
        json!({
            "id": RESOURCE_ID, "type": ["Resource"], "name": "aqm unit 7",
            "provider": PROVIDER_ID, "resourceGroup": GROUP_ID, "instance": "pune"
        }),
    ];
    for item in items {
        let (status, body) = send(router, "POST", "/item", Some(item)).await;
        assert_eq!(status, StatusCode::CREATED, "seed failed: {}", body);
    }
}

#[tokio::test]
async fn full_hierarchy_registration_and_lookup() {
    let router = test_router();
    seed(&router).await;

    let (status, body) = send(
        &router,
        "GET",
        &format!("/item?id={}", RESOURCE_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Success");
    // Inherited identifiers were copied down from the ancestry
    let doc = &body["results"][0];
    assert_eq!(doc["providerUserId"], "user-42");
    assert_eq!(doc["resourceServerURL"], "https://rs.example.org");
    assert_eq!(doc["cos"], COS_ID);
}

#[tokio::test]
async fn provider_with_unknown_server_is_rejected() {
    let router = test_router();
    seed(&router).await;

    let (status, body) = send(
        &router,
        "POST",
        "/item",
        Some(json!({
            "id": "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee",
            "type": ["Provider"],
            "resourceServer": "11111111-2222-4333-8444-555555555555"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "urn:dx:cat:LinkValidationFailed");
    assert_eq!(body["status"], "Fail");

    // And nothing was written
    let (status, _) = send(
        &router,
        "GET",
        "/item?id=aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attribute_search_and_count() {
    let router = test_router();
    seed(&router).await;

    let uri = format!(
        "/search?property={}&value={}",
        enc(r#"["id"]"#),
        enc(&format!(r#"[["{}"]]"#, RESOURCE_ID))
    );
    let (status, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalHits"], 1);
    assert_eq!(body["results"][0]["id"], RESOURCE_ID);

    let (status, body) = send(&router, "GET", "/count?q=aqm*", None).await;
    assert_eq!(status, StatusCode::OK);
    // The group and the resource both carry "aqm" names
    assert_eq!(body["totalHits"], 2);
}

#[tokio::test]
async fn count_rejects_response_filter_mode() {
    let router = test_router();
    seed(&router).await;

    let uri = format!("/count?q=aqm&filter={}", enc(r#"["id"]"#));
    let (status, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "urn:dx:cat:InvalidSyntax");
}

#[tokio::test]
async fn relationship_traversal_both_directions() {
    let router = test_router();
    seed(&router).await;

    let uri = format!("/relationship?id={}&rel=resourceGroup", RESOURCE_ID);
    let (status, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], GROUP_ID);

    let uri = format!("/relationship?id={}&rel=resource", GROUP_ID);
    let (_, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(body["results"][0]["id"], RESOURCE_ID);

    let uri = format!("/relationship?id={}&rel=type", RESOURCE_ID);
    let (_, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(body["results"], json!(["Resource"]));

    let uri = format!("/relationship?id={}&rel=cos", RESOURCE_ID);
    let (_, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(body["results"][0]["id"], COS_ID);
}

#[tokio::test]
async fn rel_search_unknown_root_is_empty_success() {
    let router = test_router();
    seed(&router).await;

    let uri = format!(
        "/relsearch?relationship=abcd.abcd&value={}",
        enc(r#"["anything"]"#)
    );
    let (status, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Success");
    assert!(body.get("results").is_none() || body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_guards_and_teardown() {
    let router = test_router();
    seed(&router).await;

    // Parents with live dependents refuse deletion
    for blocked in [COS_ID, RS_ID, PROVIDER_ID, GROUP_ID] {
        let (status, body) = send(&router, "DELETE", &format!("/item?id={}", blocked), None).await;
        assert_eq!(status, StatusCode::CONFLICT, "expected 409 for {}", blocked);
        assert_eq!(body["type"], "urn:dx:cat:Conflict");
    }

    // The instance namespace still has members
    let (status, _) = send(&router, "DELETE", "/instance?id=pune", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Leaf-first teardown succeeds all the way up
    for id in [RESOURCE_ID, GROUP_ID, PROVIDER_ID, RS_ID, COS_ID] {
        let (status, _) = send(&router, "DELETE", &format!("/item?id={}", id), None).await;
        assert_eq!(status, StatusCode::OK, "teardown failed for {}", id);
    }
    let (status, _) = send(&router, "DELETE", "/instance?id=pune", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_delete_id_is_rejected() {
    let router = test_router();
    let (status, body) = send(&router, "DELETE", "/item?id=not%20a%20uuid!", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "urn:dx:cat:InvalidUuid");
}

#[tokio::test]
async fn instance_header_scopes_search() {
    let router = test_router();
    seed(&router).await;

    let request = Request::builder()
        .method("GET")
        .uri("/search?q=sensor")
        .header("instance", "pune")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    for doc in body["results"].as_array().unwrap() {
        assert_eq!(doc["instance"], "pune");
    }
}

#[tokio::test]
async fn duplicate_item_registration_conflicts() {
    let router = test_router();
    seed(&router).await;

    let (status, body) = send(
        &router,
        "POST",
        "/item",
        Some(json!({
            "id": RESOURCE_ID, "type": ["Resource"],
            "provider": PROVIDER_ID, "resourceGroup": GROUP_ID
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "urn:dx:cat:Conflict");
}

#[tokio::test]
async fn instance_listing_aggregates_members() {
    let router = test_router();
    seed(&router).await;

    let (status, body) = send(&router, "GET", "/instances", None).await;
    assert_eq!(status, StatusCode::OK);
    let buckets = body["results"].as_array().unwrap();
    assert_eq!(buckets[0]["key"], "pune");
    assert_eq!(buckets[0]["docCount"], 2);
}
