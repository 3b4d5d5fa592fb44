//! Newsletter and contact forms against a real database.
//!
//! These tests require:
//! - A PostgreSQL database at `TEST_DATABASE_URL`
//! - Migrations applied with `tn-cli migrate`
//!
//! Run with: `cargo test -p technova-integration-tests --test site_forms -- --ignored`

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;
use uuid::Uuid;

use technova_core::Email;
use technova_integration_tests::database_url;
use technova_storefront::db::NewsletterRepository;
use technova_storefront::models::ContactSubject;
use technova_storefront::services::contact::{ContactError, ContactForm, ContactService};

async fn connect() -> PgPool {
    PgPool::connect(&database_url()).await.unwrap()
}

fn unique_email() -> Email {
    Email::parse(&format!("reader-{}@example.com", Uuid::new_v4().simple())).unwrap()
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_newsletter_subscribe_is_idempotent() {
    let pool = connect().await;
    let newsletter = NewsletterRepository::new(&pool);
    let email = unique_email();

    assert!(newsletter.subscribe(&email).await.unwrap());
    assert!(!newsletter.subscribe(&email).await.unwrap());

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscribers WHERE email = $1")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_unsubscribed_address_can_subscribe_again() {
    let pool = connect().await;
    let newsletter = NewsletterRepository::new(&pool);
    let email = unique_email();

    newsletter.subscribe(&email).await.unwrap();
    sqlx::query(
        "UPDATE newsletter_subscribers SET is_active = FALSE, unsubscribed_at = NOW() \
         WHERE email = $1",
    )
    .bind(&email)
    .execute(&pool)
    .await
    .unwrap();

    assert!(newsletter.subscribe(&email).await.unwrap());
    let active: bool =
        sqlx::query_scalar("SELECT is_active FROM newsletter_subscribers WHERE email = $1")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(active);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_contact_message_is_stored_unread() {
    let pool = connect().await;
    let email = unique_email();
    let form = ContactForm {
        name: "Ana Perez".to_owned(),
        email: email.as_str().to_owned(),
        phone: "+1 (809) 123-4567".to_owned(),
        subject: "billing".to_owned(),
        message: "I was charged twice for order TN-1.".to_owned(),
    };

    let id = ContactService::new(&pool).submit(&form).await.unwrap();

    let (subject, phone, is_read): (ContactSubject, String, bool) =
        sqlx::query_as("SELECT subject, phone, is_read FROM contact_messages WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(subject, ContactSubject::Billing);
    assert_eq!(phone, "+1 (809) 123-4567");
    assert!(!is_read);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_invalid_contact_message_is_not_stored() {
    let pool = connect().await;
    let email = unique_email();
    let form = ContactForm {
        name: "Ana Perez".to_owned(),
        email: email.as_str().to_owned(),
        subject: "general".to_owned(),
        message: "x".repeat(2001),
        ..ContactForm::default()
    };

    let err = ContactService::new(&pool).submit(&form).await.unwrap_err();
    assert!(matches!(err, ContactError::MessageTooLong));

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}
