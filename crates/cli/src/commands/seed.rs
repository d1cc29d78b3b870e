//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - title: Linen Shirt
//!     description: Relaxed fit
//!     price: "49.00"
//!     category: tops
//!     image_url: https://cdn.example.com/linen.png
//! ```
//!
//! Every entry is validated before the database is touched.

use std::path::Path;

use atelier_api::db::{PgProductStore, PgProfileStore, ProductStore, ProfileStore};
use atelier_api::models::NewProduct;
use atelier_core::{Money, ProfileId, Role};
use serde::Deserialize;
use tracing::{error, info};

use super::{CommandError, connect};

/// Top-level shape of a catalog seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// Validate every entry, returning the insertable products or one message
/// per bad entry.
fn validate(owner: ProfileId, file: CatalogFile) -> Result<Vec<NewProduct>, Vec<String>> {
    let mut products = Vec::with_capacity(file.products.len());
    let mut errors = Vec::new();

    for (index, entry) in file.products.into_iter().enumerate() {
        match NewProduct::new(
            owner,
            entry.title.as_deref(),
            entry.price,
            entry.category.as_deref(),
        ) {
            Ok(mut product) => {
                product.description = entry.description;
                product.image_url = entry.image_url;
                products.push(product);
            }
            Err(e) => errors.push(format!("products[{index}]: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Insert catalog products from `file_path`, owned by `owner`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, the owner is not a
/// designer or admin, or an insert fails.
pub async fn products(file_path: &str, owner: ProfileId) -> Result<(), CommandError> {
    info!(path = %file_path, "Loading catalog from file");

    let content = tokio::fs::read_to_string(Path::new(file_path))
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    info!(products = file.products.len(), "Parsed catalog");

    let products = validate(owner, file).map_err(|errors| {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        CommandError::Invalid(format!("{} validation errors found", errors.len()))
    })?;

    let pool = connect().await?;

    let profile = PgProfileStore::new(pool.clone())
        .get(owner)
        .await?
        .ok_or_else(|| CommandError::Invalid(format!("no profile {owner}")))?;
    if profile.role == Role::Customer {
        return Err(CommandError::Invalid(format!(
            "{owner} is a customer and cannot own products"
        )));
    }

    let store = PgProductStore::new(pool);
    let mut inserted = 0_usize;
    for product in products {
        let product = store.insert(product).await?;
        info!(product_id = %product.id, title = %product.title, "Product inserted");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn owner() -> ProfileId {
        ProfileId::new(Uuid::nil())
    }

    #[test]
    fn test_validate_accepts_complete_entries() {
        let file: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - title: Linen Shirt
    price: "49.00"
  - title: Wool Coat
    description: Heavy
    price: 120
    category: outerwear
    imageUrl: https://cdn.example.com/coat.png
"#,
        )
        .unwrap();

        let products = validate(owner(), file).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].category, "tops");
        assert_eq!(products[1].category, "outerwear");
        assert_eq!(products[1].description.as_deref(), Some("Heavy"));
        assert!(products[1].image_url.is_some());
    }

    #[test]
    fn test_validate_reports_every_bad_entry() {
        let file: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - price: "10.00"
  - title: Fine
    price: "5.00"
  - title: No price
"#,
        )
        .unwrap();

        let errors = validate(owner(), file).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("products[0]"));
        assert!(errors[1].starts_with("products[2]"));
    }

    #[test]
    fn test_negative_price_fails_to_parse() {
        let parsed = serde_yaml::from_str::<CatalogFile>(
            r#"
products:
  - title: Refund
    price: "-1.00"
"#,
        );
        assert!(parsed.is_err());
    }
}
