//! # PostgreSQL Store
//!
//! `PgStore` implements every store trait on one lazily created pool.
//!
//! Constructing a store never touches the network. The pool is opened (and
//! migrations applied) by the first operation that needs it and reused from
//! then on; a failed attempt leaves the cell empty so the next request retries.

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shop_core::{
    Cart, CartLineItem, CartStore, NewProduct, NewUser, Product, ProductFilter, ProductStore,
    Role, ShopError, ShopResult, StoreHealth, StoreStats, User, UserStore,
};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use tracing::{error, info};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, seller_id, category, image_url, stock, created_at, updated_at";

/// Tables reported by the health check
const TABLES: [&str; 4] = ["users", "products", "carts", "cart_items"];

/// PostgreSQL-backed store
pub struct PgStore {
    config: DatabaseConfig,
    pool: OnceCell<PgPool>,
}

impl PgStore {
    /// Create a store. Does not connect.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// Wrap an already open pool (migrations are the caller's business)
    pub fn with_pool(config: DatabaseConfig, pool: PgPool) -> Self {
        Self {
            config,
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    /// Whether the pool has been opened yet
    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    /// The shared pool, opening it on first use
    pub async fn pool(&self) -> ShopResult<&PgPool> {
        self.pool.get_or_try_init(|| connect(&self.config)).await
    }
}

async fn connect(config: &DatabaseConfig) -> ShopResult<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| {
            error!("PostgreSQL connection failed: {}", e);
            ShopError::Store(format!("Connection failed: {}", e))
        })?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| ShopError::Store(format!("Migration failed: {}", e)))?;

    info!(
        "Database connection established with {} max connections",
        config.max_connections
    );

    Ok(pool)
}

/// Map driver errors onto the shop taxonomy
fn db_err(err: sqlx::Error) -> ShopError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_email_key") => return ShopError::DuplicateEmail,
                Some("users_username_key") => return ShopError::DuplicateUsername,
                _ => {}
            }
        }
    }
    error!("Database error: {}", err);
    ShopError::Store(err.to_string())
}

/// SQLSTATE numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

fn is_out_of_range(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE))
}

/// Error mapping for the cart line upsert, where only the summed quantity can overflow
fn line_upsert_err(err: sqlx::Error) -> ShopError {
    if is_out_of_range(&err) {
        return ShopError::validation("Quantity too large");
    }
    db_err(err)
}

/// Escape LIKE metacharacters so the needle matches literally
pub(crate) fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Rows
// =============================================================================

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = ShopError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .map_err(|_| ShopError::Store(format!("Unknown role in users table: {}", row.role)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    seller_id: Uuid,
    category: String,
    image_url: String,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            seller_id: row.seller_id,
            category: row.category,
            image_url: row.image_url,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct LineRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
    added_at: DateTime<Utc>,
}

impl TryFrom<LineRow> for CartLineItem {
    type Error = ShopError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| ShopError::Store(format!("Negative quantity on line {}", row.id)))?;
        Ok(CartLineItem {
            id: row.id,
            product_id: row.product_id,
            quantity,
            added_at: row.added_at,
        })
    }
}

fn users_from(rows: Option<UserRow>) -> ShopResult<Option<User>> {
    rows.map(User::try_from).transpose()
}

async fn fetch_cart(conn: &mut PgConnection, user_id: Uuid) -> ShopResult<Option<Cart>> {
    let Some(cart) = sqlx::query_as::<_, CartRow>(
        "SELECT id, user_id, updated_at FROM carts WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, LineRow>(
        "SELECT id, product_id, quantity, added_at
         FROM cart_items
         WHERE cart_id = $1
         ORDER BY added_at ASC, id ASC",
    )
    .bind(cart.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?
    .into_iter()
    .map(CartLineItem::try_from)
    .collect::<ShopResult<Vec<_>>>()?;

    Ok(Some(Cart {
        id: cart.id,
        user_id: cart.user_id,
        items,
        updated_at: cart.updated_at,
    }))
}

// =============================================================================
// Store implementations
// =============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool().await?)
            .await
            .map_err(db_err)?;
        users_from(row)
    }

    async fn find_user_by_username(&self, username: &str) -> ShopResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.pool().await?)
            .await
            .map_err(db_err)?;
        users_from(row)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(self.pool().await?)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn insert_user(&self, user: NewUser) -> ShopResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, username, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(self.pool().await?)
        .await
        .map_err(db_err)?;

        User::try_from(row)
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn get_product(&self, id: Uuid) -> ShopResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool().await?)
        .await
        .map_err(db_err)?;

        Ok(row.map(Product::from))
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = ANY($1)",
            PRODUCT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(self.pool().await?)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> ShopResult<Vec<Product>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE 1=1",
            PRODUCT_COLUMNS
        ));

        // text search
        if let Some(ref q) = filter.q {
            let pattern = format!("%{}%", escape_like(q));
            query.push(" AND (name ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR description ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }

        // category
        if let Some(ref category) = filter.category {
            query.push(" AND category = ");
            query.push_bind(category.clone());
        }

        // price range
        if let Some(min) = filter.min_price {
            query.push(" AND price >= ");
            query.push_bind(min);
        }

        if let Some(max) = filter.max_price {
            query.push(" AND price <= ");
            query.push_bind(max);
        }

        query.push(" ORDER BY created_at ASC, id ASC");

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool().await?)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn products_by_seller(&self, seller_id: Uuid) -> ShopResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE seller_id = $1 ORDER BY created_at ASC, id ASC",
            PRODUCT_COLUMNS
        ))
        .bind(seller_id)
        .fetch_all(self.pool().await?)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn insert_product(&self, product: NewProduct) -> ShopResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (id, name, description, price, seller_id, category, image_url, stock)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.seller_id)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(product.stock)
        .fetch_one(self.pool().await?)
        .await
        .map_err(db_err)?;

        Ok(Product::from(row))
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_for_user(&self, user_id: Uuid) -> ShopResult<Option<Cart>> {
        let mut conn = self.pool().await?.acquire().await.map_err(db_err)?;
        fetch_cart(&mut conn, user_id).await
    }

    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> ShopResult<Cart> {
        let quantity = i32::try_from(quantity)
            .map_err(|_| ShopError::validation("Quantity too large"))?;
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        // find-or-create in one statement; the unique user_id key serializes racers
        let cart_id: Uuid = sqlx::query_scalar(
            "INSERT INTO carts (id, user_id, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        // increment-or-insert against the (cart_id, product_id) key
        sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, added_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (cart_id, product_id)
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .map_err(line_upsert_err)?;

        let cart = fetch_cart(&mut tx, user_id)
            .await?
            .ok_or_else(|| ShopError::Internal("Cart vanished inside its own transaction".into()))?;

        tx.commit().await.map_err(db_err)?;
        Ok(cart)
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> ShopResult<Option<Cart>> {
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        let cart_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

        let Some(cart_id) = cart_id else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let cart = fetch_cart(&mut tx, user_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(cart)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn stats(&self) -> ShopResult<StoreStats> {
        let pool = self.pool().await?;

        let name: String = sqlx::query_scalar("SELECT current_database()")
            .fetch_one(pool)
            .await
            .map_err(db_err)?;

        let mut collections = BTreeMap::new();
        for table in TABLES {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(pool)
                .await
                .map_err(db_err)?;
            collections.insert(table.to_string(), count);
        }

        Ok(StoreStats {
            backend: "postgres",
            name: Some(name),
            collections,
        })
    }
}
