//! Catalog routes.
//!
//! Creation accepts either JSON with an `image_url`, or `multipart/form-data`
//! with an `image` file that is uploaded to the product bucket first.

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use atelier_core::access::ensure_owner_or_admin;
use atelier_core::{Money, ProductId, ProfileId};

use super::extract::{AppJson, AppPath, AppQuery};
use super::views::{ProductView, many};
use crate::error::{AppError, Result};
use crate::middleware::{AnyRole, Authorized, DesignerOrAdmin};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(body: UpdateProductRequest) -> Self {
        Self {
            title: body.title,
            description: body.description,
            price: body.price,
            category: body.category,
            image_url: body.image_url,
        }
    }
}

/// An image file from a multipart upload.
struct ImageUpload {
    bytes: Vec<u8>,
    extension: String,
    content_type: String,
}

/// Extension of `filename`, lowercased, or `png`.
fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "png".to_owned())
}

fn parse_price(raw: &str) -> Result<Money> {
    raw.trim()
        .parse::<Decimal>()
        .ok()
        .and_then(|d| Money::new(d).ok())
        .ok_or_else(|| AppError::InvalidRequest("price must be a non-negative number".to_string()))
}

async fn load(state: &AppState, id: ProductId) -> Result<Product> {
    state
        .stores()
        .products
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("not found".to_string()))
}

/// Read a multipart product form.
async fn from_multipart(
    owner: ProfileId,
    mut multipart: Multipart,
) -> Result<(NewProduct, Option<ImageUpload>)> {
    let mut title = None;
    let mut description = None;
    let mut price = None;
    let mut category = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or("image/png").to_owned();
                let bytes = field.bytes().await?;
                if !filename.is_empty() && !bytes.is_empty() {
                    image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        extension: extension_of(&filename),
                        content_type,
                    });
                }
            }
            "title" => title = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            "price" => price = Some(parse_price(&field.text().await?)?),
            "category" => category = Some(field.text().await?),
            _ => {}
        }
    }

    let mut product = NewProduct::new(owner, title.as_deref(), price, category.as_deref())?;
    product.description = description;
    Ok((product, image))
}

/// Active products, optionally filtered by category.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let products = state.stores().products.list_active(category).await?;
    Ok(Json(many(&products)))
}

/// One product, active or not.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<ProductView>> {
    let product = load(&state, id).await?;
    Ok(Json(ProductView::from(&product)))
}

/// Create a product from JSON or a multipart form.
///
/// # Errors
///
/// Returns 400 if the title or price is missing, 502 if the image upload fails.
pub async fn create(
    State(state): State<AppState>,
    caller: Authorized<DesignerOrAdmin>,
    request: Request,
) -> Result<(StatusCode, Json<ProductView>)> {
    let owner = caller.subject.id;
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let (mut new_product, image) = if is_multipart {
        let multipart = Multipart::from_request(request, &state).await?;
        from_multipart(owner, multipart).await?
    } else {
        let AppJson(body) = AppJson::<CreateProductRequest>::from_request(request, &state).await?;
        let mut product = NewProduct::new(
            owner,
            body.title.as_deref(),
            body.price,
            body.category.as_deref(),
        )?;
        product.description = body.description;
        product.image_url = body.image_url;
        (product, None)
    };

    if let Some(image) = image {
        let bucket = &state.config().storage.product_bucket;
        let path = format!("{}.{}", Uuid::new_v4(), image.extension);
        let url = state
            .blobs()
            .upload(bucket, &path, image.bytes, &image.content_type)
            .await?;
        tracing::info!(%bucket, %path, "Product image uploaded");
        new_product.image_url = Some(url);
        new_product.storage_path = Some(path);
    }

    let product = state.stores().products.insert(new_product).await?;
    tracing::info!(product_id = %product.id, owner = %owner, "Product created");
    Ok((StatusCode::CREATED, Json(ProductView::from(&product))))
}

/// Edit a product. Owner or admin.
///
/// # Errors
///
/// Returns 404 if missing, 403 for anyone else's product, 400 for a blank
/// title.
pub async fn update(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppPath(id): AppPath<ProductId>,
    AppJson(body): AppJson<UpdateProductRequest>,
) -> Result<Json<ProductView>> {
    let mut product = load(&state, id).await?;
    ensure_owner_or_admin(&caller.subject, product.owner, "product")?;

    ProductPatch::from(body).apply(&mut product)?;
    state.stores().products.update(&product).await?;

    tracing::info!(product_id = %id, actor = %caller.subject.id, "Product updated");
    Ok(Json(ProductView::from(&product)))
}

/// Take a product off sale. Owner or admin.
///
/// # Errors
///
/// Returns 404 if missing, 403 for anyone else's product.
pub async fn remove(
    State(state): State<AppState>,
    caller: Authorized<AnyRole>,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<Value>> {
    let product = load(&state, id).await?;
    ensure_owner_or_admin(&caller.subject, product.owner, "product")?;

    state.stores().products.deactivate(id).await?;
    tracing::info!(product_id = %id, actor = %caller.subject.id, "Product deactivated");
    Ok(Json(json!({ "message": "deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("shirt.JPG"), "jpg");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("noext"), "png");
        assert_eq!(extension_of("weird.p/ng"), "png");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(" 12.50 ").ok(), Money::from_cents(1250).ok());
        assert!(parse_price("-1").is_err());
        assert!(parse_price("free").is_err());
    }
}
