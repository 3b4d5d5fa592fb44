//! Cart persistence.
//!
//! Every item statement is scoped by `cart_id`, so an item id taken from a
//! form can only ever touch the caller's own cart.

use sqlx::{PgConnection, PgPool};

use technova_core::{CartId, CartItemId, MAX_LINE_QUANTITY, ProductId, QuantityUpdate, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartItem, CartOwner};

const CART_ITEM_SELECT: &str = "\
    SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, \
           p.name AS product_name, p.slug AS product_slug, c.slug AS category_slug, \
           p.primary_image, p.price, p.compare_at_price, p.stock_quantity, p.status \
    FROM cart_items ci \
    JOIN products p ON p.id = ci.product_id \
    JOIN categories c ON c.id = p.category_id";

fn max_quantity() -> i32 {
    i32::try_from(MAX_LINE_QUANTITY).unwrap_or(i32::MAX)
}

/// Find the cart of an owner on an open connection.
async fn find_on(conn: &mut PgConnection, owner: &CartOwner) -> Result<Option<Cart>, sqlx::Error> {
    match owner {
        CartOwner::User(user_id) => {
            sqlx::query_as::<_, Cart>(
                "SELECT id, user_id, session_key FROM carts WHERE user_id = $1",
            )
            .bind(*user_id)
            .fetch_optional(conn)
            .await
        }
        CartOwner::Session(key) => {
            sqlx::query_as::<_, Cart>(
                "SELECT id, user_id, session_key FROM carts WHERE session_key = $1",
            )
            .bind(key.as_str())
            .fetch_optional(conn)
            .await
        }
    }
}

/// Find or create the cart of an owner on an open connection.
async fn get_or_create_on(conn: &mut PgConnection, owner: &CartOwner) -> Result<Cart, sqlx::Error> {
    match owner {
        CartOwner::User(user_id) => {
            sqlx::query(
                "INSERT INTO carts (user_id) VALUES ($1) \
                 ON CONFLICT (user_id) WHERE user_id IS NOT NULL DO NOTHING",
            )
            .bind(*user_id)
            .execute(&mut *conn)
            .await?;
        }
        CartOwner::Session(key) => {
            sqlx::query(
                "INSERT INTO carts (session_key) VALUES ($1) \
                 ON CONFLICT (session_key) WHERE session_key IS NOT NULL DO NOTHING",
            )
            .bind(key.as_str())
            .execute(&mut *conn)
            .await?;
        }
    }
    find_on(conn, owner)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Repository for cart operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The owner's cart, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(find_on(&mut *conn, owner).await?)
    }

    /// The owner's cart, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert or lookup fails.
    pub async fn get_or_create(&self, owner: &CartOwner) -> Result<Cart, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(get_or_create_on(&mut *conn, owner).await?)
    }

    /// Items of a cart with their product data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, cart: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let sql = format!("{CART_ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.created_at, ci.id");
        Ok(sqlx::query_as::<_, CartItem>(&sql)
            .bind(cart)
            .fetch_all(self.pool)
            .await?)
    }

    /// Total units in the owner's cart, for the header badge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unit_count(&self, owner: &CartOwner) -> Result<i64, RepositoryError> {
        const SUM: &str = "SELECT COALESCE(SUM(ci.quantity), 0)::BIGINT \
                           FROM cart_items ci JOIN carts c ON c.id = ci.cart_id";
        let count: i64 = match owner {
            CartOwner::User(user_id) => {
                sqlx::query_scalar(&format!("{SUM} WHERE c.user_id = $1"))
                    .bind(*user_id)
                    .fetch_one(self.pool)
                    .await?
            }
            CartOwner::Session(key) => {
                sqlx::query_scalar(&format!("{SUM} WHERE c.session_key = $1"))
                    .bind(key.as_str())
                    .fetch_one(self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Add `quantity` units of a product, incrementing an existing line.
    /// Returns the resulting line quantity (capped at the per-line limit).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError> {
        let quantity = i32::try_from(quantity).unwrap_or_else(|_| max_quantity());
        let new_quantity: i32 = sqlx::query_scalar(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (cart_id, product_id) DO UPDATE \
             SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $4), \
                 updated_at = NOW() \
             RETURNING quantity",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity)
        .bind(max_quantity())
        .fetch_one(self.pool)
        .await?;

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart)
            .execute(self.pool)
            .await?;

        u32::try_from(new_quantity)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity {new_quantity}")))
    }

    /// Apply a quantity change to an item of this cart.
    /// Returns false when the item is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn apply_update(
        &self,
        cart: CartId,
        item: CartItemId,
        update: QuantityUpdate,
    ) -> Result<bool, RepositoryError> {
        let result = match update {
            QuantityUpdate::Remove => {
                sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
                    .bind(item)
                    .bind(cart)
                    .execute(self.pool)
                    .await?
            }
            QuantityUpdate::Set(quantity) => {
                let quantity = i32::try_from(quantity).unwrap_or_else(|_| max_quantity());
                sqlx::query(
                    "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
                     WHERE id = $1 AND cart_id = $2",
                )
                .bind(item)
                .bind(cart)
                .bind(quantity)
                .execute(self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    /// Remove an item of this cart, returning the product name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the item is not in the cart.
    pub async fn remove_item(
        &self,
        cart: CartId,
        item: CartItemId,
    ) -> Result<String, RepositoryError> {
        let name: Option<String> = sqlx::query_scalar(
            "DELETE FROM cart_items ci USING products p \
             WHERE ci.id = $1 AND ci.cart_id = $2 AND p.id = ci.product_id \
             RETURNING p.name",
        )
        .bind(item)
        .bind(cart)
        .fetch_optional(self.pool)
        .await?;
        name.ok_or(RepositoryError::NotFound)
    }

    /// Fold an anonymous session cart into a user's cart and delete it.
    /// Returns the number of lines merged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// merged in that case.
    pub async fn merge_session_cart(
        &self,
        session_key: &str,
        user: UserId,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let session_cart: Option<CartId> = sqlx::query_scalar(
            "SELECT id FROM carts WHERE session_key = $1 FOR UPDATE",
        )
        .bind(session_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(session_cart) = session_cart else {
            return Ok(0);
        };

        let user_cart = get_or_create_on(&mut *tx, &CartOwner::User(user)).await?;

        let merged = sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity) \
             SELECT $1, product_id, quantity FROM cart_items WHERE cart_id = $2 \
             ON CONFLICT (cart_id, product_id) DO UPDATE \
             SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $3), \
                 updated_at = NOW()",
        )
        .bind(user_cart.id)
        .bind(session_cart)
        .bind(max_quantity())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(session_cart)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(merged)
    }
}
