//! Reference data for a fresh database.

use technova_storefront::db::CatalogRepository;
use technova_storefront::db::catalog::NewCategory;

use super::{CommandError, connect};

/// Top-level categories every store starts with: `(name, slug, sort order)`.
pub const DEFAULT_CATEGORIES: [(&str, &str, i32); 4] = [
    ("Smartphones", "smartphones", 1),
    ("Laptops", "laptops", 2),
    ("Tablets", "tablets", 3),
    ("Audio & Video", "audio-video", 4),
];

/// Insert the default categories. Slugs that already exist are left
/// untouched, so the command can be re-run safely.
///
/// # Errors
///
/// Returns an error if the database is unreachable, an insert fails, or a
/// default name is already used by a category with another slug.
pub async fn categories() -> Result<(), CommandError> {
    let pool = connect().await?;
    let catalog = CatalogRepository::new(&pool);

    let (mut inserted, mut skipped) = (0_u32, 0_u32);
    for (name, slug, sort_order) in DEFAULT_CATEGORIES {
        let added = catalog
            .insert_category(NewCategory {
                name,
                slug,
                sort_order,
            })
            .await?;

        if added {
            inserted += 1;
        } else {
            tracing::debug!(slug, "Category already present");
            skipped += 1;
        }
    }

    tracing::info!(inserted, skipped, "Categories seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_category_slugs_are_url_safe_and_unique() {
        let mut slugs: Vec<&str> = DEFAULT_CATEGORIES.iter().map(|(_, slug, _)| *slug).collect();
        assert!(
            slugs
                .iter()
                .all(|s| s.chars().all(|c| c.is_ascii_lowercase() || c == '-'))
        );
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), DEFAULT_CATEGORIES.len());
    }
}
