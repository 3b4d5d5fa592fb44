//! Review route handlers.

use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use technova_core::ReviewId;

use crate::db::reviews::ReviewWrite;
use crate::error::add_breadcrumb;
use crate::middleware::RequireAuth;
use crate::routes::{redirect_error, redirect_success};
use crate::services::reviews::{ReviewInput, ReviewService, ReviewServiceError};
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    /// Kept as text so a missing or garbled value becomes a rating error
    /// instead of a 422.
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
}

/// Same-site page the form was posted from, or `fallback`.
fn back_to(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(axum::http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| url::Url::parse(referer).ok())
        .map(|url| url.path().to_owned())
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| fallback.to_owned())
}

/// Create or replace the user's review of a product.
#[instrument(skip(state, user, headers, form), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product): Path<String>,
    headers: HeaderMap,
    Form(form): Form<ReviewForm>,
) -> Redirect {
    let service = ReviewService::new(state.pool(), &state.config().store);
    let input = ReviewInput {
        // Unparsable input is reported as an out-of-range rating.
        rating: form.rating.trim().parse().unwrap_or(0),
        title: &form.title,
        comment: &form.comment,
    };

    match service.submit(&user, &product, input).await {
        Ok((product, write)) => {
            add_breadcrumb("review", "Review saved", Some(&[("product", product.slug.as_str())]));
            let code = if state.config().store.review_moderation {
                "review_pending"
            } else if write == ReviewWrite::Created {
                "review_created"
            } else {
                "review_updated"
            };
            redirect_success(&product.url(), code)
        }
        Err(ReviewServiceError::ProductNotFound) => redirect_error("/products", "product_not_found"),
        Err(e) => {
            if matches!(e, ReviewServiceError::Repository(_)) {
                tracing::error!("Failed to save review: {e}");
            }
            redirect_error(&back_to(&headers, "/products"), e.code())
        }
    }
}

/// Delete one of the user's own reviews.
#[instrument(skip(state, user, headers), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReviewId>,
    headers: HeaderMap,
) -> Redirect {
    let service = ReviewService::new(state.pool(), &state.config().store);
    let back = back_to(&headers, "/account");

    match service.delete_own(&user, id).await {
        Ok(()) => redirect_success(&back, "review_deleted"),
        Err(e) => {
            if matches!(e, ReviewServiceError::Repository(_)) {
                tracing::error!("Failed to delete review: {e}");
            }
            redirect_error(&back, e.code())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_back_to_keeps_only_the_path() {
        let mut headers = HeaderMap::new();
        assert_eq!(back_to(&headers, "/account"), "/account");

        headers.insert(
            "referer",
            HeaderValue::from_static("https://shop.technova.es/categories/laptops/xps-13?error=x"),
        );
        assert_eq!(back_to(&headers, "/account"), "/categories/laptops/xps-13");

        headers.insert("referer", HeaderValue::from_static("not a url"));
        assert_eq!(back_to(&headers, "/account"), "/account");
    }
}
