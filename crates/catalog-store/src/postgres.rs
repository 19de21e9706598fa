use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Contact, ContactId, LineDetails, LineItem, LineItemId, Money, NewContact, NewLineItem,
    NewStockEntry, Order, OrderDetails, OrderId, OrderScope, OrderStatus, Result, Shop, ShopId,
    StockEntry, StockEntryId, StoreError, User, UserId, UserKind,
    store::{CatalogStore, StoreTransaction},
};

const STOCK_COLUMNS: &str = r#"
    s.id AS stock_id, s.shop_id AS stock_shop_id, s.product_name AS stock_product_name,
    s.model AS stock_model, s.quantity AS stock_quantity, s.price AS stock_price,
    s.price_rrc AS stock_price_rrc, sh.accepts_orders AS stock_shop_accepts_orders
"#;

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.state, o.created_at, o.contact_id";

const LINE_COLUMNS: &str = "l.id, l.order_id, l.stock_entry_id, l.quantity, l.price";

const CONTACT_COLUMNS: &str =
    "id, user_id, city, street, house, structure, building, apartment, phone";

const SHOP_COLUMNS: &str = "id, name, owner_id, accepts_orders";

/// PostgreSQL-backed catalog store implementation.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("catalog migrations applied");
        Ok(())
    }

    /// Registers a user.
    pub async fn add_user(&self, email: &str, kind: UserKind) -> Result<User> {
        let id: i64 = sqlx::query_scalar("INSERT INTO users (email, kind) VALUES ($1, $2) RETURNING id")
            .bind(email)
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(User {
            id: UserId::new(id),
            email: email.to_string(),
            kind,
        })
    }

    /// Issues an access token for a user.
    pub async fn add_token(&self, user_id: UserId, token: &str) -> Result<()> {
        sqlx::query("INSERT INTO access_tokens (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Registers a shop.
    pub async fn add_shop(
        &self,
        name: &str,
        owner_id: Option<UserId>,
        accepts_orders: bool,
    ) -> Result<Shop> {
        let sql = format!(
            "INSERT INTO shops (name, owner_id, accepts_orders) VALUES ($1, $2, $3) RETURNING {SHOP_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .bind(owner_id.map(|id| id.as_i64()))
            .bind(accepts_orders)
            .fetch_one(&self.pool)
            .await?;
        row_to_shop(&row)
    }

    /// Imports a stock entry.
    pub async fn add_stock_entry(&self, entry: NewStockEntry) -> Result<StockEntry> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_entries (shop_id, product_name, model, quantity, price, price_rrc)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(entry.shop_id.as_i64())
        .bind(&entry.product_name)
        .bind(&entry.model)
        .bind(i64::from(entry.quantity))
        .bind(entry.price.amount())
        .bind(entry.price_rrc.amount())
        .fetch_one(&self.pool)
        .await?;

        fetch_stock_entry(&self.pool, StockEntryId::new(id))
            .await?
            .ok_or(StoreError::MissingReference {
                entity: "stock entry",
                id,
            })
    }

    async fn lines_for_orders(
        &self,
        order_ids: &[i64],
        shop_id: Option<ShopId>,
    ) -> Result<HashMap<OrderId, Vec<LineDetails>>> {
        let sql = format!(
            r#"
            SELECT {LINE_COLUMNS}, {STOCK_COLUMNS}
            FROM line_items l
            JOIN stock_entries s ON s.id = l.stock_entry_id
            JOIN shops sh ON sh.id = s.shop_id
            WHERE l.order_id = ANY($1) AND ($2::BIGINT IS NULL OR s.shop_id = $2)
            ORDER BY l.id ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(order_ids)
            .bind(shop_id.map(|id| id.as_i64()))
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<OrderId, Vec<LineDetails>> = HashMap::new();
        for row in rows {
            let line = row_to_line(&row)?;
            let stock = row_to_stock(&row)?;
            grouped
                .entry(line.order_id)
                .or_default()
                .push(LineDetails { line, stock });
        }
        Ok(grouped)
    }

    async fn with_lines(
        &self,
        orders: Vec<Order>,
        shop_id: Option<ShopId>,
    ) -> Result<Vec<OrderDetails>> {
        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let mut lines = self.lines_for_orders(&ids, shop_id).await?;
        Ok(orders
            .into_iter()
            .map(|order| OrderDetails {
                lines: lines.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

fn quantity_from(row: &PgRow, column: &str, table: &'static str) -> Result<u32> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw).map_err(|_| StoreError::CorruptRow {
        table,
        reason: format!("{column} out of range: {raw}"),
    })
}

fn row_to_stock(row: &PgRow) -> Result<StockEntry> {
    Ok(StockEntry {
        id: StockEntryId::new(row.try_get("stock_id")?),
        shop_id: ShopId::new(row.try_get("stock_shop_id")?),
        product_name: row.try_get("stock_product_name")?,
        model: row.try_get("stock_model")?,
        quantity: quantity_from(row, "stock_quantity", "stock_entries")?,
        price: Money::new(row.try_get("stock_price")?),
        price_rrc: Money::new(row.try_get("stock_price_rrc")?),
        shop_accepts_orders: row.try_get("stock_shop_accepts_orders")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let state: String = row.try_get("state")?;
    let status = state.parse::<OrderStatus>().map_err(|e| StoreError::CorruptRow {
        table: "orders",
        reason: e.to_string(),
    })?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        status,
        created_at: row.try_get("created_at")?,
        contact_id: row
            .try_get::<Option<i64>, _>("contact_id")?
            .map(ContactId::new),
    })
}

fn row_to_line(row: &PgRow) -> Result<LineItem> {
    Ok(LineItem {
        id: LineItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        stock_entry_id: StockEntryId::new(row.try_get("stock_entry_id")?),
        quantity: quantity_from(row, "quantity", "line_items")?,
        price: Money::new(row.try_get("price")?),
    })
}

fn row_to_shop(row: &PgRow) -> Result<Shop> {
    Ok(Shop {
        id: ShopId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        owner_id: row.try_get::<Option<i64>, _>("owner_id")?.map(UserId::new),
        accepts_orders: row.try_get("accepts_orders")?,
    })
}

fn row_to_contact(row: &PgRow) -> Result<Contact> {
    Ok(Contact {
        id: ContactId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        city: row.try_get("city")?,
        street: row.try_get("street")?,
        house: row.try_get("house")?,
        structure: row.try_get("structure")?,
        building: row.try_get("building")?,
        apartment: row.try_get("apartment")?,
        phone: row.try_get("phone")?,
    })
}

async fn fetch_stock_entry<'e, E: PgExecutor<'e>>(
    executor: E,
    id: StockEntryId,
) -> Result<Option<StockEntry>> {
    let sql = format!(
        r#"
        SELECT {STOCK_COLUMNS}
        FROM stock_entries s
        JOIN shops sh ON sh.id = s.shop_id
        WHERE s.id = $1
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id.as_i64())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(row_to_stock).transpose()
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn stock_entry(&self, id: StockEntryId) -> Result<Option<StockEntry>> {
        fetch_stock_entry(&self.pool, id).await
    }

    async fn list_stock_entries(&self, shop_id: Option<ShopId>) -> Result<Vec<StockEntry>> {
        let sql = format!(
            r#"
            SELECT {STOCK_COLUMNS}
            FROM stock_entries s
            JOIN shops sh ON sh.id = s.shop_id
            WHERE sh.accepts_orders AND ($1::BIGINT IS NULL OR s.shop_id = $1)
            ORDER BY s.id ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(shop_id.map(|id| id.as_i64()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_stock).collect()
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.kind
            FROM access_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let kind = match row.try_get::<String, _>("kind")?.as_str() {
            "shop" => UserKind::Shop,
            "buyer" => UserKind::Buyer,
            other => {
                return Err(StoreError::CorruptRow {
                    table: "users",
                    reason: format!("unknown user kind: {other}"),
                });
            }
        };
        Ok(Some(User {
            id: UserId::new(row.try_get("id")?),
            email: row.try_get("email")?,
            kind,
        }))
    }

    async fn shop_by_owner(&self, owner_id: UserId) -> Result<Option<Shop>> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE owner_id = $1");
        let row = sqlx::query(&sql)
            .bind(owner_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shop).transpose()
    }

    async fn set_shop_accepts_orders(
        &self,
        owner_id: UserId,
        accepts: bool,
    ) -> Result<Option<Shop>> {
        let sql = format!(
            "UPDATE shops SET accepts_orders = $2 WHERE owner_id = $1 RETURNING {SHOP_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(owner_id.as_i64())
            .bind(accepts)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shop).transpose()
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
        scope: OrderScope,
    ) -> Result<Vec<OrderDetails>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            WHERE o.user_id = $1 AND (o.state = 'basket') = $2
            ORDER BY o.created_at DESC, o.id DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .bind(scope == OrderScope::Basket)
            .fetch_all(&self.pool)
            .await?;
        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;

        self.with_lines(orders, None).await
    }

    async fn orders_for_shop(&self, shop_id: ShopId) -> Result<Vec<OrderDetails>> {
        let sql = format!(
            r#"
            SELECT DISTINCT {ORDER_COLUMNS}
            FROM orders o
            JOIN line_items l ON l.order_id = o.id
            JOIN stock_entries s ON s.id = l.stock_entry_id
            WHERE s.shop_id = $1 AND o.state <> 'basket'
            ORDER BY o.created_at DESC, o.id DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(shop_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;

        self.with_lines(orders, Some(shop_id)).await
    }

    async fn contacts(&self, user_id: UserId) -> Result<Vec<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = $1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_contact).collect()
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact> {
        let sql = format!(
            r#"
            INSERT INTO contacts (user_id, city, street, house, structure, building, apartment, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(contact.user_id.as_i64())
            .bind(&contact.city)
            .bind(&contact.street)
            .bind(&contact.house)
            .bind(&contact.structure)
            .bind(&contact.building)
            .bind(&contact.apartment)
            .bind(&contact.phone)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return StoreError::MissingReference {
                        entity: "user",
                        id: contact.user_id.as_i64(),
                    };
                }
                StoreError::Database(e)
            })?;
        row_to_contact(&row)
    }
}

/// Transaction over the PostgreSQL store.
///
/// Dropping it without committing rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    async fn fetch_basket(&mut self, user_id: UserId) -> Result<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.user_id = $1 AND o.state = 'basket' FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn find_basket(&mut self, user_id: UserId) -> Result<Option<Order>> {
        self.fetch_basket(user_id).await
    }

    async fn get_or_create_basket(&mut self, user_id: UserId) -> Result<Order> {
        // A concurrent creator makes this wait and then do nothing.
        sqlx::query(
            r#"
            INSERT INTO orders (user_id, state)
            VALUES ($1, 'basket')
            ON CONFLICT (user_id) WHERE state = 'basket' DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .execute(&mut *self.tx)
        .await?;

        self.fetch_basket(user_id)
            .await?
            .ok_or_else(|| StoreError::CorruptRow {
                table: "orders",
                reason: format!("basket of user {user_id} missing after insert"),
            })
    }

    async fn order_for_update(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 AND o.user_id = $2 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(order_id.as_i64())
            .bind(user_id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn stock_entry(&mut self, id: StockEntryId) -> Result<Option<StockEntry>> {
        fetch_stock_entry(&mut *self.tx, id).await
    }

    async fn try_decrement_stock(&mut self, id: StockEntryId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE stock_entries SET quantity = quantity - $2 WHERE id = $1 AND quantity >= $2",
        )
        .bind(id.as_i64())
        .bind(i64::from(quantity))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_stock(&mut self, id: StockEntryId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE stock_entries SET quantity = quantity + $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(i64::from(quantity))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingReference {
                entity: "stock entry",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    async fn upsert_line_item(&mut self, order_id: OrderId, line: NewLineItem) -> Result<LineItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO line_items AS l (order_id, stock_entry_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT unique_order_line DO UPDATE SET
                quantity = l.quantity + EXCLUDED.quantity,
                price = EXCLUDED.price
            RETURNING l.id, l.order_id, l.stock_entry_id, l.quantity, l.price
            "#,
        )
        .bind(order_id.as_i64())
        .bind(line.stock_entry_id.as_i64())
        .bind(i64::from(line.quantity))
        .bind(line.price.amount())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_line(&row)
    }

    async fn line_item(
        &mut self,
        order_id: OrderId,
        line_id: LineItemId,
    ) -> Result<Option<LineItem>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM line_items l WHERE l.id = $1 AND l.order_id = $2 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(line_id.as_i64())
            .bind(order_id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_line).transpose()
    }

    async fn lines_in_order(
        &mut self,
        order_id: OrderId,
        ids: &[LineItemId],
    ) -> Result<Vec<LineItem>> {
        let ids: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let sql = format!(
            r#"
            SELECT {LINE_COLUMNS}
            FROM line_items l
            WHERE l.order_id = $1 AND l.id = ANY($2)
            ORDER BY l.id ASC
            FOR UPDATE
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_i64())
            .bind(&ids)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(row_to_line).collect()
    }

    async fn count_lines(&mut self, order_id: OrderId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE order_id = $1")
            .bind(order_id.as_i64())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn set_line_quantity(&mut self, line_id: LineItemId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE line_items SET quantity = $2 WHERE id = $1")
            .bind(line_id.as_i64())
            .bind(i64::from(quantity))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingReference {
                entity: "line item",
                id: line_id.as_i64(),
            });
        }
        Ok(())
    }

    async fn delete_line_items(&mut self, ids: &[LineItemId]) -> Result<u64> {
        let ids: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let result = sqlx::query("DELETE FROM line_items WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn contact(&mut self, user_id: UserId, contact_id: ContactId) -> Result<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(contact_id.as_i64())
            .bind(user_id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_contact).transpose()
    }

    async fn transition_order(
        &mut self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        contact_id: Option<ContactId>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET state = $3, contact_id = COALESCE($4, contact_id)
            WHERE id = $1 AND state = $2
            "#,
        )
        .bind(order_id.as_i64())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(contact_id.map(|id| id.as_i64()))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
