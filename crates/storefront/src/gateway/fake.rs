//! In-memory recording gateway for service tests.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;

use shopfront_core::{CartLineId, Email, OrderId, OrderStatus, Price, ProductId, Quantity, Size, UserId};

use crate::models::{Cart, CartLine, Order, OrderItem, Product, ProductPage, ProductQuery, ProductRef, User};

use super::types::{AddToCartRequest, AuthGrant, LoginRequest, RegisterRequest};
use super::{Gateway, GatewayError};

pub const PASSWORD: &str = "correct-horse";
pub const TOKEN: &str = "fake.jwt.token";

/// A gateway call as recorded by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register,
    Login,
    CurrentUser,
    ListProducts,
    GetProduct(ProductId),
    SeedProducts,
    GetCart,
    AddToCart(AddToCartRequest),
    UpdateCartLine(CartLineId, Quantity),
    RemoveCartLine(CartLineId),
    ClearCart,
    CreateOrder,
    ListOrders,
    GetOrder(OrderId),
}

struct RemoteLine {
    id: CartLineId,
    product: ProductId,
    size: Size,
    quantity: Quantity,
}

#[derive(Default)]
struct FakeState {
    products: HashMap<ProductId, Product>,
    user: Option<User>,
    remote_cart: Vec<RemoteLine>,
    orders: Vec<Order>,
    calls: Vec<Call>,
    next_id: u64,
    /// Number of add requests accepted before every further add fails.
    accept_adds: Option<usize>,
    reject_current_user: bool,
    unavailable: bool,
}

/// Single-user gateway holding a catalog, one remote cart, and orders.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

pub fn product(id: &str, cents: i64, sizes: &[&str]) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        description: String::new(),
        price: Price::from_cents(cents).unwrap(),
        category: "Men".to_string(),
        sizes: sizes.iter().map(|s| Size::parse(s).unwrap()).collect(),
        stock: 10,
        image_url: None,
    }
}

pub fn shopper() -> User {
    User {
        id: UserId::new("u1"),
        name: "Ada".to_string(),
        email: Email::parse("ada@example.com").unwrap(),
    }
}

impl FakeGateway {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
            state.user = Some(shopper());
        }
        fake
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn adds(&self) -> Vec<AddToCartRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddToCart(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn accept_adds(&self, n: usize) {
        self.state.lock().unwrap().accept_adds = Some(n);
    }

    pub fn reject_current_user(&self) {
        self.state.lock().unwrap().reject_current_user = true;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Put a line straight into the remote cart.
    pub fn seed_remote_line(&self, product: &str, size: &str, quantity: i64) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_line_id();
        state.remote_cart.push(RemoteLine {
            id,
            product: ProductId::new(product),
            size: Size::parse(size).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
        });
    }

    /// The remote cart as the gateway would return it.
    pub fn remote_cart(&self) -> Cart {
        self.state.lock().unwrap().cart()
    }
}

impl FakeState {
    fn next_line_id(&mut self) -> CartLineId {
        self.next_id += 1;
        CartLineId::new(format!("line-{}", self.next_id))
    }

    fn cart(&self) -> Cart {
        Cart::from_lines(self.remote_cart.iter().map(|line| CartLine {
            line_id: Some(line.id.clone()),
            product: self
                .products
                .get(&line.product)
                .cloned()
                .map_or_else(|| ProductRef::Reference(line.product.clone()), ProductRef::Snapshot),
            size: line.size.clone(),
            quantity: line.quantity,
        }))
    }

    fn record(&mut self, call: Call) -> Result<(), GatewayError> {
        self.calls.push(call);
        if self.unavailable {
            return Err(GatewayError::Server {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn grant(&self) -> AuthGrant {
        AuthGrant {
            token: SecretString::from(TOKEN),
            user: self.user.clone().unwrap_or_else(shopper),
        }
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthGrant, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Register)?;
        state.user = Some(User {
            id: UserId::new("u-new"),
            name: request.name.to_string(),
            email: Email::parse(request.email).unwrap(),
        });
        Ok(state.grant())
    }

    async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthGrant, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::Login)?;
        if request.password != PASSWORD {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "Invalid credentials".to_string(),
            });
        }
        Ok(state.grant())
    }

    async fn current_user(&self) -> Result<User, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::CurrentUser)?;
        if state.reject_current_user {
            return Err(GatewayError::Unauthorized("Invalid token".to_string()));
        }
        Ok(state.user.clone().unwrap_or_else(shopper))
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::ListProducts)?;
        let mut items: Vec<Product> = state.products.values().cloned().collect();
        items.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(ProductPage {
            total: items.len() as u64,
            items,
            page: query.page,
            limit: query.limit,
            pages: 1,
        })
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::GetProduct(id.clone()))?;
        state
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound("Product not found".to_string()))
    }

    async fn seed_products(&self) -> Result<(), GatewayError> {
        self.state.lock().unwrap().record(Call::SeedProducts)
    }

    async fn get_cart(&self) -> Result<Cart, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::GetCart)?;
        Ok(state.cart())
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Cart, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::AddToCart(request.clone()))?;

        if let Some(remaining) = state.accept_adds {
            if remaining == 0 {
                return Err(GatewayError::Rejected {
                    status: 400,
                    message: "Insufficient stock".to_string(),
                });
            }
            state.accept_adds = Some(remaining - 1);
        }

        if !state.products.contains_key(&request.product_id) {
            return Err(GatewayError::NotFound("Product not found".to_string()));
        }

        if let Some(line) = state
            .remote_cart
            .iter_mut()
            .find(|l| l.product == request.product_id && l.size == request.size)
        {
            line.quantity = line.quantity.saturating_add(request.quantity);
        } else {
            let id = state.next_line_id();
            state.remote_cart.push(RemoteLine {
                id,
                product: request.product_id.clone(),
                size: request.size.clone(),
                quantity: request.quantity,
            });
        }
        Ok(state.cart())
    }

    async fn update_cart_line(
        &self,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> Result<Cart, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::UpdateCartLine(line_id.clone(), quantity))?;
        let line = state
            .remote_cart
            .iter_mut()
            .find(|l| &l.id == line_id)
            .ok_or_else(|| GatewayError::NotFound("Cart item not found".to_string()))?;
        line.quantity = quantity;
        Ok(state.cart())
    }

    async fn remove_cart_line(&self, line_id: &CartLineId) -> Result<Cart, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::RemoveCartLine(line_id.clone()))?;
        state.remote_cart.retain(|l| &l.id != line_id);
        Ok(state.cart())
    }

    async fn clear_cart(&self) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::ClearCart)?;
        state.remote_cart.clear();
        Ok(())
    }

    async fn create_order(&self) -> Result<Order, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::CreateOrder)?;
        let cart = state.cart();
        if cart.is_empty() {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "Cart is empty".to_string(),
            });
        }
        let items = cart
            .lines()
            .iter()
            .filter_map(|line| {
                line.product.snapshot().map(|p| OrderItem {
                    name: p.name.clone(),
                    size: line.size.clone(),
                    quantity: line.quantity,
                    price: p.price,
                })
            })
            .collect();
        state.next_id += 1;
        let order = Order {
            id: OrderId::new(format!("order-{}", state.next_id)),
            items,
            total_price: cart.total(),
            status: OrderStatus::Pending,
            order_date: Utc::now(),
        };
        state.remote_cart.clear();
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::ListOrders)?;
        Ok(state.orders.clone())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.record(Call::GetOrder(id.clone()))?;
        state
            .orders
            .iter()
            .find(|o| &o.id == id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound("Order not found".to_string()))
    }
}
