//! Integration test support for Shopfront.
//!
//! [`FakeGateway`] is an in-process HTTP gateway speaking the same JSON API
//! as the real one: `{success, data, pagination, message}` envelopes, bearer
//! authentication, per-user carts with populated product lines, and orders.
//! Tests spawn one per test on an ephemeral port and point a storefront at
//! [`FakeGateway::base_url`].
//!
//! The gateway records add-to-cart bodies and product requests, and can be
//! told to reject adds after a number of successes, so reconciliation and
//! caching behavior can be observed from the outside.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Timestamp stamped on every order.
pub const ORDER_DATE: &str = "2026-01-15T10:30:00Z";

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone)]
struct StoredProduct {
    id: String,
    name: String,
    price: f64,
    category: String,
    sizes: Vec<String>,
    stock: u32,
}

impl StoredProduct {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "description": format!("{} description", self.name),
            "price": self.price,
            "category": self.category,
            "sizes": self.sizes,
            "stock": self.stock,
            "imageUrl": format!("https://img.example.com/{}.jpg", self.id),
        })
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    name: String,
    email: String,
    password: String,
}

impl StoredUser {
    fn to_json(&self) -> Value {
        json!({ "_id": self.id, "name": self.name, "email": self.email })
    }
}

#[derive(Debug, Clone)]
struct StoredLine {
    id: String,
    product_id: String,
    size: String,
    quantity: u32,
}

#[derive(Debug, Default)]
struct GatewayState {
    products: Vec<StoredProduct>,
    users: Vec<StoredUser>,
    tokens: HashMap<String, String>,
    carts: HashMap<String, Vec<StoredLine>>,
    orders: HashMap<String, Vec<Value>>,
    recorded_adds: Vec<Value>,
    product_requests: usize,
    /// Adds still accepted before every further add is rejected.
    accept_adds: Option<usize>,
    next_id: u64,
}

impl GatewayState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn product(&self, id: &str) -> Option<&StoredProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    fn populated_cart(&self, user_id: &str) -> Value {
        let lines = self.carts.get(user_id).map(Vec::as_slice).unwrap_or_default();
        Value::Array(
            lines
                .iter()
                .map(|line| {
                    let product = self
                        .product(&line.product_id)
                        .map_or_else(|| json!(line.product_id), StoredProduct::to_json);
                    json!({
                        "_id": line.id,
                        "product": product,
                        "size": line.size,
                        "quantity": line.quantity,
                    })
                })
                .collect(),
        )
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<StoredUser> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        let user_id = self.tokens.get(token)?;
        self.users.iter().find(|u| &u.id == user_id).cloned()
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = self.next_id("token");
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }
}

type SharedState = Arc<Mutex<GatewayState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, GatewayState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// FakeGateway
// =============================================================================

/// A running fake gateway. The server task stops when this is dropped.
pub struct FakeGateway {
    addr: SocketAddr,
    state: SharedState,
    server: JoinHandle<()>,
}

impl FakeGateway {
    /// Bind to an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let state = SharedState::default();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// API root, including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Add a product to the catalog.
    pub fn add_product(&self, id: &str, name: &str, price: f64, category: &str, sizes: &[&str]) {
        lock(&self.state).products.push(StoredProduct {
            id: id.to_string(),
            name: name.to_string(),
            price,
            category: category.to_string(),
            sizes: sizes.iter().map(|s| (*s).to_string()).collect(),
            stock: 10,
        });
    }

    /// Set the stock of a product; adds beyond it are rejected.
    pub fn set_stock(&self, id: &str, stock: u32) {
        if let Some(product) = lock(&self.state).products.iter_mut().find(|p| p.id == id) {
            product.stock = stock;
        }
    }

    /// Register an account directly. Returns its user id.
    pub fn add_user(&self, name: &str, email: &str, password: &str) -> String {
        let mut state = lock(&self.state);
        let id = state.next_id("user");
        state.users.push(StoredUser {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    /// Put a line straight into a user's remote cart.
    pub fn put_cart_line(&self, user_id: &str, product_id: &str, size: &str, quantity: u32) {
        let mut state = lock(&self.state);
        let id = state.next_id("line");
        state.carts.entry(user_id.to_string()).or_default().push(StoredLine {
            id,
            product_id: product_id.to_string(),
            size: size.to_string(),
            quantity,
        });
    }

    /// A user's remote cart as `(product id, size, quantity)` triples.
    #[must_use]
    pub fn cart_of(&self, user_id: &str) -> Vec<(String, String, u32)> {
        lock(&self.state)
            .carts
            .get(user_id)
            .map(|lines| {
                lines
                    .iter()
                    .map(|l| (l.product_id.clone(), l.size.clone(), l.quantity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of orders placed by a user.
    #[must_use]
    pub fn order_count(&self, user_id: &str) -> usize {
        lock(&self.state).orders.get(user_id).map_or(0, Vec::len)
    }

    /// Every `POST /cart` body received, in order.
    #[must_use]
    pub fn recorded_adds(&self) -> Vec<Value> {
        lock(&self.state).recorded_adds.clone()
    }

    /// Number of product listing and product detail requests served.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        lock(&self.state).product_requests
    }

    /// Accept `n` more adds, then reject every add with a 400.
    pub fn accept_adds(&self, n: usize) {
        lock(&self.state).accept_adds = Some(n);
    }

    /// Accept every add again.
    pub fn accept_all_adds(&self) {
        lock(&self.state).accept_adds = None;
    }
}

impl Drop for FakeGateway {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/products", get(list_products))
        .route("/api/products/seed", post(seed_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/cart/{id}", put(update_cart_line).delete(remove_cart_line))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order))
        .with_state(state)
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn unauthorized() -> Response {
    fail(StatusCode::UNAUTHORIZED, "Not authorized, token failed")
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    quantity: u32,
    size: String,
}

#[derive(Deserialize)]
struct UpdateBody {
    quantity: u32,
}

fn auth_payload(user: &StoredUser, token: &str) -> Value {
    json!({ "token": token, "_id": user.id, "name": user.name, "email": user.email })
}

async fn register(State(state): State<SharedState>, Json(body): Json<RegisterBody>) -> Response {
    let mut state = lock(&state);
    if state.users.iter().any(|u| u.email == body.email) {
        return fail(StatusCode::BAD_REQUEST, "User already exists");
    }
    let user = StoredUser {
        id: state.next_id("user"),
        name: body.name,
        email: body.email,
        password: body.password,
    };
    let token = state.issue_token(&user.id);
    let payload = auth_payload(&user, &token);
    state.users.push(user);
    (StatusCode::CREATED, Json(json!({ "success": true, "data": payload }))).into_response()
}

async fn login(State(state): State<SharedState>, Json(body): Json<LoginBody>) -> Response {
    let mut state = lock(&state);
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .cloned()
    else {
        return fail(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };
    let token = state.issue_token(&user.id);
    ok(auth_payload(&user, &token))
}

async fn me(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    lock(&state)
        .user_for(&headers)
        .map_or_else(unauthorized, |user| ok(user.to_json()))
}

async fn list_products(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    state.product_requests += 1;

    let search = params.get("search").map(|s| s.to_lowercase());
    let min_price = params.get("minPrice").and_then(|p| p.parse::<f64>().ok());
    let max_price = params.get("maxPrice").and_then(|p| p.parse::<f64>().ok());
    let page = params
        .get("page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = params
        .get("limit")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(12)
        .max(1);

    let matching: Vec<&StoredProduct> = state
        .products
        .iter()
        .filter(|p| search.as_ref().is_none_or(|s| p.name.to_lowercase().contains(s)))
        .filter(|p| params.get("category").is_none_or(|c| &p.category == c))
        .filter(|p| params.get("size").is_none_or(|s| p.sizes.contains(s)))
        .filter(|p| min_price.is_none_or(|min| p.price >= min))
        .filter(|p| max_price.is_none_or(|max| p.price <= max))
        .collect();

    let total = matching.len();
    let items: Vec<Value> = matching
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(|p| p.to_json())
        .collect();

    Json(json!({
        "success": true,
        "data": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": total.div_ceil(limit),
        },
    }))
    .into_response()
}

async fn get_product(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    state.product_requests += 1;
    state
        .product(&id)
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"), |p| ok(p.to_json()))
}

async fn seed_products(State(state): State<SharedState>) -> Response {
    let mut state = lock(&state);
    state.products = vec![
        StoredProduct {
            id: "seed-tee".to_string(),
            name: "Classic Tee".to_string(),
            price: 20.0,
            category: "Men".to_string(),
            sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
            stock: 50,
        },
        StoredProduct {
            id: "seed-dress".to_string(),
            name: "Summer Dress".to_string(),
            price: 45.5,
            category: "Women".to_string(),
            sizes: vec!["XS".to_string(), "S".to_string(), "M".to_string()],
            stock: 25,
        },
    ];
    let count = state.products.len();
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": format!("Seeded {count} products") })),
    )
        .into_response()
}

async fn get_cart(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    ok(state.populated_cart(&user.id))
}

async fn add_to_cart(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    state.recorded_adds.push(body.clone());

    if let Some(remaining) = state.accept_adds {
        if remaining == 0 {
            return fail(StatusCode::BAD_REQUEST, "Insufficient stock");
        }
        state.accept_adds = Some(remaining - 1);
    }

    let Ok(add) = serde_json::from_value::<AddBody>(body) else {
        return fail(StatusCode::BAD_REQUEST, "Invalid cart item");
    };
    let Some(product) = state.product(&add.product_id).cloned() else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };

    let lines = state.carts.entry(user.id.clone()).or_default();
    let existing = lines
        .iter()
        .position(|l| l.product_id == add.product_id && l.size == add.size);
    let wanted = existing
        .and_then(|i| lines.get(i))
        .map_or(0, |l| l.quantity)
        + add.quantity;
    if wanted > product.stock {
        return fail(StatusCode::BAD_REQUEST, "Insufficient stock");
    }

    match existing.and_then(|i| lines.get_mut(i)) {
        Some(line) => line.quantity = wanted,
        None => {
            let id = state.next_id("line");
            state.carts.entry(user.id.clone()).or_default().push(StoredLine {
                id,
                product_id: add.product_id,
                size: add.size,
                quantity: add.quantity,
            });
        }
    }
    ok(state.populated_cart(&user.id))
}

async fn update_cart_line(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    let Some(line) = state
        .carts
        .get_mut(&user.id)
        .and_then(|lines| lines.iter_mut().find(|l| l.id == id))
    else {
        return fail(StatusCode::NOT_FOUND, "Cart item not found");
    };
    line.quantity = body.quantity;
    ok(state.populated_cart(&user.id))
}

async fn remove_cart_line(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    if let Some(lines) = state.carts.get_mut(&user.id) {
        lines.retain(|l| l.id != id);
    }
    ok(state.populated_cart(&user.id))
}

async fn clear_cart(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    state.carts.remove(&user.id);
    ok(json!([]))
}

async fn create_order(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    let lines = state.carts.get(&user.id).cloned().unwrap_or_default();
    if lines.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Cart is empty");
    }

    let mut total = 0.0;
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let Some(product) = state.product(&line.product_id) else {
            return fail(StatusCode::BAD_REQUEST, "Product no longer available");
        };
        total += product.price * f64::from(line.quantity);
        items.push(json!({
            "name": product.name,
            "size": line.size,
            "quantity": line.quantity,
            "price": product.price,
        }));
    }

    let order = json!({
        "_id": state.next_id("order"),
        "items": items,
        "totalPrice": total,
        "status": "pending",
        "orderDate": ORDER_DATE,
    });
    state.carts.remove(&user.id);
    state.orders.entry(user.id).or_default().push(order.clone());
    (StatusCode::CREATED, Json(json!({ "success": true, "data": order }))).into_response()
}

async fn list_orders(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    ok(json!(state.orders.get(&user.id).cloned().unwrap_or_default()))
}

async fn get_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return unauthorized();
    };
    state
        .orders
        .get(&user.id)
        .and_then(|orders| {
            orders
                .iter()
                .find(|o| o.get("_id").and_then(Value::as_str) == Some(id.as_str()))
        })
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"), |o| ok(o.clone()))
}
