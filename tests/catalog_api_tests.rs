use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use armoire::{
    ApiClient, ApiError, ClientConfig, CurrentToken, NewProduct, NewUser, ProductQuery,
    ProductService, ProductUpdate, UserQuery, UserService, UserUpdate,
};

/// One captured request. `body_json` is only populated for JSON payloads;
/// `body_text` always carries a lossy rendering so multipart and form bodies
/// can be inspected too.
#[derive(Clone, Debug)]
struct Captured {
    method: String,
    path: String,
    query: String,
    authorization: Option<String>,
    content_type: String,
    body_text: String,
    body_json: Option<Value>,
}

#[derive(Clone)]
struct BackendState {
    requests: Arc<AsyncMutex<Vec<Captured>>>,
    responses: Arc<AsyncMutex<HashMap<String, (u16, Value)>>>,
}

async fn capture(State(state): State<BackendState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let content_type = parts
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body_text = String::from_utf8_lossy(&bytes).into_owned();
    let body_json = if content_type.contains("application/json") {
        serde_json::from_slice(&bytes).ok()
    } else {
        None
    };

    state.requests.lock().await.push(Captured {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().unwrap_or("").to_string(),
        authorization: parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        content_type,
        body_text,
        body_json,
    });

    let key = format!("{} {}", parts.method, parts.uri.path());
    let (status, body) = state
        .responses
        .lock()
        .await
        .get(&key)
        .cloned()
        .unwrap_or((200, json!({})));

    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("mock response")
}

struct MockBackend {
    base_url: String,
    requests: Arc<AsyncMutex<Vec<Captured>>>,
    responses: Arc<AsyncMutex<HashMap<String, (u16, Value)>>>,
    join: JoinHandle<()>,
}

impl MockBackend {
    async fn start() -> Self {
        let requests = Arc::new(AsyncMutex::new(Vec::new()));
        let responses = Arc::new(AsyncMutex::new(HashMap::new()));
        let state = BackendState {
            requests: requests.clone(),
            responses: responses.clone(),
        };

        let app = Router::new().fallback(capture).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let join = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server error");
        });

        Self {
            base_url,
            requests,
            responses,
            join,
        }
    }

    async fn respond(&self, method_and_path: &str, status: u16, body: Value) {
        self.responses
            .lock()
            .await
            .insert(method_and_path.to_string(), (status, body));
    }

    async fn last_request(&self) -> Captured {
        self.requests
            .lock()
            .await
            .last()
            .cloned()
            .expect("no request captured")
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.join.abort();
    }
}

fn client(base_url: &str) -> ApiClient {
    let cfg = ClientConfig {
        base_url: base_url.to_string(),
        ..ClientConfig::default()
    };
    ApiClient::new(&cfg, CurrentToken::new())
}

fn query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (k.to_string(), v.to_string())
        })
        .collect()
}

// ==============================
// Products
// ==============================

#[tokio::test]
async fn product_list_sends_filters_and_parses_envelope() {
    let mock = MockBackend::start().await;
    mock.respond(
        "GET /product/controller/api/v1/products",
        200,
        json!({
            "data": [
                { "product_id": "p-1", "name": "Oak Shelf", "unit_price": 129.0 },
                { "product_id": "p-2", "name": "Oak Table", "stock": 4 }
            ],
            "pagination_info": {
                "totalElements": 23, "totalPages": 3, "currentPage": 2, "size": 10
            }
        }),
    )
    .await;

    let products = ProductService::new(client(&mock.base_url));
    let page = products
        .list(&ProductQuery {
            page: 2,
            size: 10,
            search: Some("  oak  ".to_string()),
            status: Some("active".to_string()),
        })
        .await
        .expect("list");

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].name, "Oak Shelf");
    let info = page.pagination_info.expect("pagination info");
    assert_eq!(info.total_elements, 23);
    assert_eq!(info.total_pages, 3);

    let req = mock.last_request().await;
    assert_eq!(req.method, "GET");
    let pairs = query_pairs(&req.query);
    assert!(pairs.contains(&("page".to_string(), "2".to_string())));
    assert!(pairs.contains(&("size".to_string(), "10".to_string())));
    // Search terms are trimmed before they go on the wire.
    assert!(pairs.contains(&("name".to_string(), "oak".to_string())));
    assert!(pairs.contains(&("status".to_string(), "active".to_string())));
}

#[tokio::test]
async fn product_list_omits_blank_search_and_all_status() {
    let mock = MockBackend::start().await;
    mock.respond(
        "GET /product/controller/api/v1/products",
        200,
        json!({ "data": [] }),
    )
    .await;

    let products = ProductService::new(client(&mock.base_url));
    let page = products
        .list(&ProductQuery {
            search: Some("   ".to_string()),
            status: Some("all".to_string()),
            ..ProductQuery::default()
        })
        .await
        .expect("list");
    assert!(page.data.is_empty());
    assert!(page.pagination_info.is_none());

    let pairs = query_pairs(&mock.last_request().await.query);
    assert!(pairs.iter().all(|(k, _)| k != "name" && k != "status"));
    assert!(pairs.contains(&("page".to_string(), "1".to_string())));
    assert!(pairs.contains(&("size".to_string(), "10".to_string())));
}

#[tokio::test]
async fn bulk_create_posts_an_array_and_rejects_empty_input() {
    let mock = MockBackend::start().await;
    mock.respond(
        "POST /product/controller/api/v1/products",
        200,
        json!({ "data": [
            { "product_id": "p-9", "name": "Walnut Desk" },
            { "product_id": "p-10", "name": "Walnut Chair" }
        ]}),
    )
    .await;

    let products = ProductService::new(client(&mock.base_url));

    let err = products.create(&[]).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));

    let mut desk = NewProduct::named("Walnut Desk");
    desk.unit_price = Some(499.0);
    let chair = NewProduct::named("Walnut Chair");
    let created = products.create(&[desk, chair]).await.expect("create");
    assert_eq!(created.len(), 2);
    assert_eq!(created[1].product_id, "p-10");

    let req = mock.last_request().await;
    let body = req.body_json.expect("json body");
    let items = body.as_array().expect("array payload");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Walnut Desk");
    assert_eq!(items[0]["unit_price"], 499.0);
    // Unset optional fields stay off the wire entirely.
    assert!(items[1].get("unit_price").is_none());
}

#[tokio::test]
async fn product_update_body_leaves_out_blank_fields() {
    let mock = MockBackend::start().await;

    let products = ProductService::new(client(&mock.base_url));
    products
        .update(
            "p-1",
            ProductUpdate {
                name: Some("  Oak Shelf XL  ".to_string()),
                category: Some("   ".to_string()),
                unit_price: Some(149.0),
                description: None,
                low_stock: None,
                status: None,
            },
        )
        .await
        .expect("update");

    let req = mock.last_request().await;
    assert_eq!(req.method, "PUT");
    assert_eq!(req.path, "/product/controller/api/v1/p-1");
    // Blank strings are dropped; surviving values keep their whitespace.
    assert_eq!(
        req.body_json.expect("json body"),
        json!({ "name": "  Oak Shelf XL  ", "unit_price": 149.0 })
    );
}

#[tokio::test]
async fn item_ids_are_percent_encoded_in_paths() {
    let mock = MockBackend::start().await;
    mock.respond(
        "GET /product/controller/api/v1/sku%202024%2Foak",
        200,
        json!({ "data": { "product_id": "sku 2024/oak", "name": "Oak Bed" } }),
    )
    .await;

    let products = ProductService::new(client(&mock.base_url));
    let product = products.get("sku 2024/oak").await.expect("get");
    assert_eq!(product.name, "Oak Bed");
    assert_eq!(mock.last_request().await.path, "/product/controller/api/v1/sku%202024%2Foak");

    products.delete("sku 2024/oak").await.expect("delete");
    let req = mock.last_request().await;
    assert_eq!(req.method, "DELETE");
    assert_eq!(req.path, "/product/controller/api/v1/sku%202024%2Foak");
}

#[tokio::test]
async fn image_upload_is_multipart_under_the_file_field() {
    let mock = MockBackend::start().await;

    let products = ProductService::new(client(&mock.base_url));
    products
        .upload_image("p-1", "sofa.png", Bytes::from_static(b"fake image bytes"))
        .await
        .expect("upload");

    let req = mock.last_request().await;
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/product/controller/api/v1/p-1/image");
    assert!(req.content_type.starts_with("multipart/form-data"));
    assert!(req.body_text.contains("name=\"file\""));
    assert!(req.body_text.contains("filename=\"sofa.png\""));
    assert!(req.body_text.contains("fake image bytes"));
}

// ==============================
// Users
// ==============================

#[tokio::test]
async fn user_list_repeats_each_role_filter() {
    let mock = MockBackend::start().await;
    mock.respond(
        "GET /user/controller/api/v1/users",
        200,
        json!({ "data": [
            { "user_id": "u-1", "name": "Ada", "roles": ["admin"] }
        ]}),
    )
    .await;

    let users = UserService::new(client(&mock.base_url));
    let page = users
        .list(&UserQuery {
            roles: vec!["admin".to_string(), "staff".to_string()],
            ..UserQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].roles, vec!["admin"]);

    let pairs = query_pairs(&mock.last_request().await.query);
    let roles: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "roles")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(roles, vec!["admin", "staff"]);
}

#[tokio::test]
async fn register_normalizes_and_unwraps_the_envelope() {
    let mock = MockBackend::start().await;
    mock.respond(
        "POST /auth/controller/api/v1/register",
        200,
        json!({
            "status": "created",
            "data": {
                "user_id": "u-42",
                "name": "Ada Vance",
                "email": "ada.vance@example.com",
                "phone": "555-0100",
                "status": "active"
            }
        }),
    )
    .await;

    let users = UserService::new(client(&mock.base_url));
    let mut new_user = NewUser::new("  Ada Vance  ", "Ada.Vance@Example.COM", "hunter2");
    new_user.phone = Some("  555-0100  ".to_string());
    let created = users.register(new_user).await.expect("register");
    assert_eq!(created.user_id, "u-42");
    assert_eq!(created.email.as_deref(), Some("ada.vance@example.com"));

    let body = mock.last_request().await.body_json.expect("json body");
    assert_eq!(body["name"], "Ada Vance");
    assert_eq!(body["email"], "ada.vance@example.com");
    assert_eq!(body["phone"], "555-0100");
    assert_eq!(body["status"], "active");
    // Empty role lists are omitted; absent phone would be an explicit null.
    assert!(body.get("roles").is_none());
}

#[tokio::test]
async fn register_sends_explicit_null_phone() {
    let mock = MockBackend::start().await;
    mock.respond(
        "POST /auth/controller/api/v1/register",
        200,
        json!({ "data": { "user_id": "u-43", "name": "Bo" } }),
    )
    .await;

    let users = UserService::new(client(&mock.base_url));
    users
        .register(NewUser::new("Bo", "bo@example.com", "hunter2"))
        .await
        .expect("register");

    let body = mock.last_request().await.body_json.expect("json body");
    assert!(body.get("phone").is_some());
    assert_eq!(body["phone"], Value::Null);
}

#[tokio::test]
async fn user_update_keeps_explicit_empty_roles() {
    let mock = MockBackend::start().await;

    let users = UserService::new(client(&mock.base_url));
    users
        .update(
            "u-1",
            UserUpdate {
                name: Some("   ".to_string()),
                roles: Some(Vec::new()),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("update");

    let req = mock.last_request().await;
    assert_eq!(req.path, "/user/controller/api/v1/u-1");
    // Blank name is sanitized away; clearing all roles is a deliberate edit
    // and goes through as an empty array.
    assert_eq!(req.body_json.expect("json body"), json!({ "roles": [] }));
}

#[tokio::test]
async fn avatar_upload_targets_the_user_item() {
    let mock = MockBackend::start().await;

    let users = UserService::new(client(&mock.base_url));
    users
        .upload_avatar("u-1", "me.jpg", Bytes::from_static(b"jpeg-ish"))
        .await
        .expect("upload");

    let req = mock.last_request().await;
    assert_eq!(req.path, "/user/controller/api/v1/u-1/avatar");
    assert!(req.content_type.starts_with("multipart/form-data"));
    assert!(req.body_text.contains("name=\"file\""));
    assert!(req.body_text.contains("filename=\"me.jpg\""));
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let mock = MockBackend::start().await;
    mock.respond(
        "POST /auth/controller/api/v1/register",
        409,
        json!({ "message": "Email already registered" }),
    )
    .await;

    let users = UserService::new(client(&mock.base_url));
    let err = users
        .register(NewUser::new("Ada", "ada@example.com", "hunter2"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert!(!err.is_unauthorized());
    assert_eq!(err.message(), "Email already registered");
}
