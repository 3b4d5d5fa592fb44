//! Cart, order and review flows against a real database.
//!
//! These tests require:
//! - A PostgreSQL database at `TEST_DATABASE_URL`
//! - Migrations applied with `tn-cli migrate`
//!
//! Run with: `cargo test -p technova-integration-tests --test checkout_flow -- --ignored`

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;
use uuid::Uuid;

use technova_core::{
    CheckoutError, Email, OrderStatus, Price, ProductId, QuantityUpdate, Rating, ReviewId, UserId,
};
use technova_integration_tests::database_url;
use technova_storefront::db::reviews::ReviewSubmission;
use technova_storefront::db::users::NewUser;
use technova_storefront::db::{CartRepository, OrderRepository, ReviewRepository, UserRepository};
use technova_storefront::models::{CartOwner, CurrentUser};
use technova_storefront::services::cart::{CartService, CartServiceError};
use technova_storefront::services::checkout::{
    CheckoutForm, CheckoutService, CheckoutServiceError,
};

async fn connect() -> PgPool {
    PgPool::connect(&database_url()).await.unwrap()
}

/// A unique, active customer.
async fn customer(pool: &PgPool) -> CurrentUser {
    let tag = Uuid::new_v4().simple().to_string();
    let email = Email::parse(&format!("buyer-{tag}@example.com")).unwrap();
    let username = format!("buyer_{}", &tag[..12]);
    let user = UserRepository::new(pool)
        .create(&NewUser {
            username: &username,
            email: &email,
            first_name: "Test",
            last_name: "Buyer",
            password_hash: "not-a-real-hash",
            is_active: true,
            is_staff: false,
        })
        .await
        .unwrap();
    user.to_current_user()
}

/// A unique product in its own category; returns its id and slug.
async fn product(pool: &PgPool, cents: i64, stock: i32) -> (ProductId, String) {
    let tag = Uuid::new_v4().simple().to_string();
    let category_id: i32 = sqlx::query_scalar(
        "INSERT INTO categories (name, slug) VALUES ($1, $1) RETURNING id",
    )
    .bind(format!("cat-{tag}"))
    .fetch_one(pool)
    .await
    .unwrap();

    let slug = format!("phone-{tag}");
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO products (name, slug, category_id, price, stock_quantity) \
         VALUES ($1, $1, $2, $3, $4) RETURNING id",
    )
    .bind(&slug)
    .bind(category_id)
    .bind(Price::from_cents(cents))
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap();

    (ProductId::new(id), slug)
}

async fn stock_of(pool: &PgPool, id: ProductId) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Stored `(average_rating, review_count)` of a product.
async fn rating_of(pool: &PgPool, id: ProductId) -> (String, i32) {
    sqlx::query_as("SELECT average_rating::TEXT, review_count FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn review(pool: &PgPool, product_id: ProductId, user_id: UserId, stars: i64, approve: bool) {
    ReviewRepository::new(pool)
        .submit(&ReviewSubmission {
            product_id,
            user_id,
            rating: Rating::new(stars).unwrap(),
            title: "Solid phone",
            comment: "Battery lasts two days.",
            approve,
        })
        .await
        .unwrap();
}

fn form(user: &CurrentUser) -> CheckoutForm {
    CheckoutForm {
        email: user.email.as_str().to_owned(),
        shipping_address: "1 Main St".to_owned(),
        shipping_city: "Springfield".to_owned(),
        shipping_postal: "12345".to_owned(),
        same_as_shipping: Some("on".to_owned()),
        payment_method: "credit_card".to_owned(),
        ..CheckoutForm::default()
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_checkout_reserves_stock_and_cancel_restores_it() {
    let pool = connect().await;
    let user = customer(&pool).await;
    let (product_id, slug) = product(&pool, 49_999, 5).await;
    let owner = CartOwner::User(user.id);

    CartService::new(&pool).add(&owner, &slug, 2).await.unwrap();

    let order = CheckoutService::new(&pool)
        .place_order(&user, form(&user))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Price::from_cents(99_998));
    assert_eq!(stock_of(&pool, product_id).await, 3);

    let cart = CartService::new(&pool).view(Some(&owner)).await.unwrap();
    assert!(cart.totals.is_empty());

    let cancelled = OrderRepository::new(&pool)
        .cancel_for_user(user.id, &order.order_number)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&pool, product_id).await, 5);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_checkout_rejects_quantity_above_stock() {
    let pool = connect().await;
    let user = customer(&pool).await;
    let (product_id, slug) = product(&pool, 1_999, 1).await;

    CartService::new(&pool)
        .add(&CartOwner::User(user.id), &slug, 3)
        .await
        .unwrap();

    let err = CheckoutService::new(&pool)
        .place_order(&user, form(&user))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutServiceError::Checkout(CheckoutError::InsufficientStock { .. })
    ));
    assert_eq!(stock_of(&pool, product_id).await, 1);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_orders_are_private_to_their_owner() {
    let pool = connect().await;
    let buyer = customer(&pool).await;
    let (_, slug) = product(&pool, 2_500, 10).await;

    CartService::new(&pool)
        .add(&CartOwner::User(buyer.id), &slug, 1)
        .await
        .unwrap();
    let order = CheckoutService::new(&pool)
        .place_order(&buyer, form(&buyer))
        .await
        .unwrap();

    let stranger = UserId::new(buyer.id.as_i32() + 1_000_000);
    let found = OrderRepository::new(&pool)
        .get_for_user(stranger, &order.order_number)
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_order_items_keep_checkout_prices() {
    let pool = connect().await;
    let user = customer(&pool).await;
    let (phone_id, phone_slug) = product(&pool, 79_900, 10).await;
    let (_, case_slug) = product(&pool, 1_500, 10).await;
    let owner = CartOwner::User(user.id);

    CartService::new(&pool).add(&owner, &phone_slug, 1).await.unwrap();
    CartService::new(&pool).add(&owner, &case_slug, 2).await.unwrap();

    let order = CheckoutService::new(&pool)
        .place_order(&user, form(&user))
        .await
        .unwrap();
    assert_eq!(order.total_amount, Price::from_cents(82_900));

    sqlx::query("UPDATE products SET price = $2 WHERE id = $1")
        .bind(phone_id)
        .bind(Price::from_cents(99_900))
        .execute(&pool)
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    let items = orders.items(order.id).await.unwrap();
    assert_eq!(items.len(), 2);
    let phone = items.iter().find(|i| i.product_id == phone_id).unwrap();
    assert_eq!(phone.unit_price, Price::from_cents(79_900));
    assert_eq!(phone.product_name, phone_slug);

    let reloaded = orders
        .get_for_user(user.id, &order.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.total_amount, Price::from_cents(82_900));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_cancel_and_checkout_of_shared_products_do_not_deadlock() {
    let pool = connect().await;

    for _ in 0..5 {
        let first = customer(&pool).await;
        let second = customer(&pool).await;
        let (a, a_slug) = product(&pool, 1_000, 10).await;
        let (b, b_slug) = product(&pool, 2_000, 10).await;

        let first_cart = CartOwner::User(first.id);
        CartService::new(&pool).add(&first_cart, &b_slug, 1).await.unwrap();
        CartService::new(&pool).add(&first_cart, &a_slug, 1).await.unwrap();
        let order = CheckoutService::new(&pool)
            .place_order(&first, form(&first))
            .await
            .unwrap();

        let second_cart = CartOwner::User(second.id);
        CartService::new(&pool).add(&second_cart, &a_slug, 2).await.unwrap();
        CartService::new(&pool).add(&second_cart, &b_slug, 2).await.unwrap();

        let cancel_pool = pool.clone();
        let number = order.order_number.clone();
        let cancel = tokio::spawn(async move {
            OrderRepository::new(&cancel_pool)
                .update_status(&number, OrderStatus::Cancelled, None)
                .await
                .map(|o| o.status)
        });
        let checkout_pool = pool.clone();
        let buyer = second.clone();
        let checkout = tokio::spawn(async move {
            CheckoutService::new(&checkout_pool)
                .place_order(&buyer, form(&buyer))
                .await
                .map(|o| o.status)
        });

        assert_eq!(cancel.await.unwrap().unwrap(), OrderStatus::Cancelled);
        assert_eq!(checkout.await.unwrap().unwrap(), OrderStatus::Pending);
        assert_eq!(stock_of(&pool, a).await, 8);
        assert_eq!(stock_of(&pool, b).await, 8);
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_remove_update_deletes_the_cart_row() {
    let pool = connect().await;
    let user = customer(&pool).await;
    let (_, slug) = product(&pool, 3_000, 10).await;
    let owner = CartOwner::User(user.id);

    CartService::new(&pool).add(&owner, &slug, 2).await.unwrap();

    let carts = CartRepository::new(&pool);
    let cart = carts.find(&owner).await.unwrap().unwrap();
    let item = carts.items(cart.id).await.unwrap().remove(0);

    assert!(carts.apply_update(cart.id, item.id, QuantityUpdate::Remove).await.unwrap());
    assert!(carts.items(cart.id).await.unwrap().is_empty());
    assert!(!carts.apply_update(cart.id, item.id, QuantityUpdate::Remove).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_cart_items_of_another_cart_are_not_found() {
    let pool = connect().await;
    let owner = customer(&pool).await;
    let intruder = customer(&pool).await;
    let (_, slug) = product(&pool, 3_000, 10).await;
    let owner_cart = CartOwner::User(owner.id);
    let intruder_cart = CartOwner::User(intruder.id);

    CartService::new(&pool).add(&owner_cart, &slug, 2).await.unwrap();
    CartService::new(&pool).add(&intruder_cart, &slug, 1).await.unwrap();

    let carts = CartRepository::new(&pool);
    let cart = carts.find(&owner_cart).await.unwrap().unwrap();
    let item = carts.items(cart.id).await.unwrap().remove(0);

    let err = CartService::new(&pool)
        .remove(Some(&intruder_cart), item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CartServiceError::ItemNotFound));

    let changed = CartService::new(&pool)
        .update(&intruder_cart, &[(item.id, QuantityUpdate::Set(9))])
        .await
        .unwrap();
    assert_eq!(changed, 0);
    assert_eq!(carts.items(cart.id).await.unwrap()[0].quantity, 2);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_session_cart_merges_into_account_cart() {
    let pool = connect().await;
    let user = customer(&pool).await;
    let (shared, shared_slug) = product(&pool, 3_000, 20).await;
    let (only_session, _) = product(&pool, 500, 20).await;
    let account = CartOwner::User(user.id);
    let key = Uuid::new_v4().to_string();
    let visitor = CartOwner::Session(key.clone());

    CartService::new(&pool).add(&account, &shared_slug, 3).await.unwrap();

    let carts = CartRepository::new(&pool);
    let session_cart = carts.get_or_create(&visitor).await.unwrap();
    carts.add_item(session_cart.id, shared, 2).await.unwrap();
    carts.add_item(session_cart.id, only_session, 1).await.unwrap();

    assert_eq!(carts.merge_session_cart(&key, user.id).await.unwrap(), 2);

    let cart = carts.find(&account).await.unwrap().unwrap();
    let items = carts.items(cart.id).await.unwrap();
    let quantity_of = |id: ProductId| items.iter().find(|i| i.product_id == id).unwrap().quantity;
    assert_eq!(quantity_of(shared), 5);
    assert_eq!(quantity_of(only_session), 1);
    assert!(carts.find(&visitor).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_review_aggregate_follows_approved_reviews() {
    let pool = connect().await;
    let author = customer(&pool).await;
    let (product_id, _) = product(&pool, 10_000, 5).await;

    review(&pool, product_id, author.id, 5, true).await;
    assert_eq!(rating_of(&pool, product_id).await, ("5.00".to_owned(), 1));

    let pending = customer(&pool).await;
    review(&pool, product_id, pending.id, 1, false).await;
    assert_eq!(rating_of(&pool, product_id).await, ("5.00".to_owned(), 1));

    let id: ReviewId =
        sqlx::query_scalar("SELECT id FROM reviews WHERE product_id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(author.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let deleted = ReviewRepository::new(&pool)
        .delete_own(id, author.id)
        .await
        .unwrap();
    assert_eq!(deleted, Some(product_id));
    assert_eq!(rating_of(&pool, product_id).await, ("0.00".to_owned(), 0));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_concurrent_reviews_keep_the_aggregate_exact() {
    const AUTHORS: usize = 30;

    let pool = connect().await;
    let (product_id, _) = product(&pool, 10_000, 5).await;

    let mut authors = Vec::with_capacity(AUTHORS);
    for _ in 0..AUTHORS {
        authors.push(customer(&pool).await);
    }

    let writes: Vec<_> = authors
        .into_iter()
        .map(|author| {
            let pool = pool.clone();
            tokio::spawn(async move { review(&pool, product_id, author.id, 5, true).await })
        })
        .collect();
    for write in writes {
        write.await.unwrap();
    }

    let expected = i32::try_from(AUTHORS).unwrap();
    assert_eq!(rating_of(&pool, product_id).await, ("5.00".to_owned(), expected));
}
