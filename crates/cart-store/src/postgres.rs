use async_trait::async_trait;
use common::{CartLineId, Money, OrderId, ProductId, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CartLine, CartLineView, CatalogReader, Order, OrderLine, OrderStatus, OrderSummary,
    ProductSnapshot, Result, StoreError,
    store::{CheckoutTx, StorefrontStore},
};

const CART_VIEW_SQL: &str = r#"
    SELECT c.id, c.product_id, c.quantity, c.added_at, p.name, p.price_cents, p.image_url
    FROM cart_lines c
    JOIN products p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY c.added_at ASC, c.id ASC
"#;

/// PostgreSQL-backed storefront store.
///
/// Same-user operations are serialized with a transaction-scoped advisory
/// lock keyed on the user id, so a checkout in flight excludes concurrent
/// cart mutations for that user while different users proceed in parallel.
/// The quantity merge is additionally a single `ON CONFLICT` upsert, never
/// a read-then-write pair.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

async fn lock_user(tx: &mut Transaction<'static, Postgres>, user_id: UserId) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(user_id.as_uuid().to_string())
        .execute(&mut **tx)
        .await
        .map_err(conflict_or_db)?;
    Ok(())
}

fn conflict_or_db(e: sqlx::Error) -> StoreError {
    // 40001 = serialization_failure, 40P01 = deadlock_detected
    if let sqlx::Error::Database(ref db_err) = e
        && matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
    {
        return StoreError::Conflict;
    }
    StoreError::Database(e)
}

fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
    Ok(CartLine {
        id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        added_at: row.try_get("added_at")?,
    })
}

fn row_to_cart_view(row: PgRow) -> Result<CartLineView> {
    Ok(CartLineView {
        line_id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        name: row.try_get("name")?,
        unit_price: Money::from_cents(row.try_get("price_cents")?),
        image_url: row.try_get("image_url")?,
        added_at: row.try_get("added_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Internal(format!("unrecognized order status: {status_raw}")))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        status,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_order_line(row: PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn row_to_order_summary(row: PgRow) -> Result<OrderSummary> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Internal(format!("unrecognized order status: {status_raw}")))?;

    Ok(OrderSummary {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        status,
        created_at: row.try_get("created_at")?,
        item_count: row.try_get("item_count")?,
    })
}

#[async_trait]
impl StorefrontStore for PostgresStore {
    type Tx = PostgresCheckoutTx;

    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO cart_lines (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity, added_at
            "#,
        )
        .bind(CartLineId::new().as_uuid())
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("cart_lines_product_id_fkey")
            {
                return StoreError::UnknownProduct(product_id);
            }
            conflict_or_db(e)
        })?;

        tx.commit().await.map_err(conflict_or_db)?;
        row_to_cart_line(row)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let result = sqlx::query("UPDATE cart_lines SET quantity = $3 WHERE id = $1 AND user_id = $2")
            .bind(line_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(conflict_or_db)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LineNotFound);
        }
        tx.commit().await.map_err(conflict_or_db)
    }

    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1 AND user_id = $2")
            .bind(line_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(conflict_or_db)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LineNotFound);
        }
        tx.commit().await.map_err(conflict_or_db)
    }

    async fn cart_view(&self, user_id: UserId) -> Result<Vec<CartLineView>> {
        let rows = sqlx::query(CART_VIEW_SQL)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_cart_view).collect()
    }

    async fn begin_checkout(&self, user_id: UserId) -> Result<Self::Tx> {
        tracing::debug!(%user_id, "opening checkout transaction");
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        Ok(PostgresCheckoutTx { tx, user_id })
    }

    async fn order_with_lines(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>> {
        let order_row = sqlx::query(
            "SELECT id, user_id, total_cents, status, created_at FROM orders WHERE id = $1 AND user_id = $2",
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(order_row) = order_row else {
            return Ok(None);
        };
        let order = row_to_order(&order_row)?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .into_iter()
            .map(row_to_order_line)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some((order, lines)))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.total_cents, o.status, o.created_at,
                   (SELECT COUNT(*) FROM order_lines ol WHERE ol.order_id = o.id) AS item_count
            FROM orders o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order_summary).collect()
    }
}

/// Checkout transaction over PostgreSQL.
///
/// Wraps one sqlx transaction holding the per-user advisory lock; dropping
/// it without commit rolls everything back.
pub struct PostgresCheckoutTx {
    tx: Transaction<'static, Postgres>,
    user_id: UserId,
}

#[async_trait]
impl CheckoutTx for PostgresCheckoutTx {
    async fn cart_snapshot(&mut self) -> Result<Vec<CartLineView>> {
        let rows = sqlx::query(CART_VIEW_SQL)
            .bind(self.user_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(conflict_or_db)?;

        rows.into_iter().map(row_to_cart_view).collect()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(conflict_or_db)?;
        Ok(())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .execute(&mut *self.tx)
            .await
            .map_err(conflict_or_db)?;
        }
        Ok(())
    }

    async fn clear_cart(&mut self) -> Result<()> {
        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(self.user_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(conflict_or_db)?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(conflict_or_db)
    }
}

/// PostgreSQL-backed catalog reader over the `products` relation.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a new PostgreSQL catalog reader.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or updates a product.
    ///
    /// The catalog is owned by an external system in production; this is
    /// the seam used by seeds and tests.
    pub async fn upsert_product(&self, product: &ProductSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                image_url = EXCLUDED.image_url,
                updated_at = now()
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(&product.image_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_product(row: PgRow) -> Result<ProductSnapshot> {
    Ok(ProductSnapshot {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        image_url: row.try_get("image_url")?,
    })
}

#[async_trait]
impl CatalogReader for PostgresCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>> {
        let row = sqlx::query("SELECT id, name, price_cents, image_url FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_product).transpose()
    }

    async fn products(&self) -> Result<Vec<ProductSnapshot>> {
        let rows =
            sqlx::query("SELECT id, name, price_cents, image_url FROM products ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(row_to_product).collect()
    }
}
