//! Product route handlers.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use souk_core::{Price, Product, ProductId};

use super::{JsonBody, MessageResponse, parse_id};
use crate::db::{NewProduct, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireOwner;
use crate::services::assets::is_allowed_image;
use crate::state::AppState;

const MISSING_FIELDS: &str = "All fields and image are required";

/// Response carrying a product.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

/// Body of `PUT /api/products/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub sold_out: bool,
}

/// An uploaded image held in memory until it is forwarded.
#[derive(Debug)]
struct ImageUpload {
    bytes: Vec<u8>,
    filename: String,
    content_type: String,
}

/// Fields collected from the create-product form.
#[derive(Debug, Default)]
struct ProductForm {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
    sold_out: bool,
    image: Option<ImageUpload>,
}

/// Checkbox-style booleans as browsers send them.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

async fn read_form(mut multipart: Multipart, max_upload_bytes: usize) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "price" => form.price = Some(field.text().await?),
            "soldOut" => form.sold_out = parse_flag(&field.text().await?),
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > max_upload_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "Image must be at most {max_upload_bytes} bytes"
                    )));
                }
                form.image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    filename,
                    content_type,
                });
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// List every product, newest first.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.products().await?;
    Ok(Json(products.as_ref().clone()))
}

/// Create a product from a multipart form and upload its image.
///
/// POST /api/products
#[instrument(skip(state, multipart))]
pub async fn create(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let form = read_form(multipart, state.config().max_upload_bytes).await?;

    let (Some(title), Some(description), Some(price), Some(image)) = (
        non_blank(form.title),
        non_blank(form.description),
        non_blank(form.price),
        form.image,
    ) else {
        return Err(AppError::BadRequest(MISSING_FIELDS.to_string()));
    };

    let price: Price = price
        .parse()
        .map_err(|e: souk_core::PriceError| AppError::BadRequest(e.to_string()))?;

    if !is_allowed_image(&image.content_type) {
        return Err(AppError::BadRequest(
            "Image must be a jpg, jpeg, png or webp file".to_string(),
        ));
    }

    let asset = state
        .assets()
        .upload(image.bytes, &image.filename, &image.content_type)
        .await?;

    let new_product = NewProduct {
        title,
        description,
        price,
        image_url: asset.url,
        asset_id: Some(asset.asset_id.clone()),
        sold_out: form.sold_out,
    };

    let product = match ProductRepository::new(state.pool()).create(&new_product).await {
        Ok(product) => product,
        Err(e) => {
            // Don't leave an orphaned image behind
            if let Err(cleanup) = state.assets().destroy(&asset.asset_id).await {
                tracing::warn!(asset_id = %asset.asset_id, error = %cleanup, "Failed to remove orphaned image");
            }
            return Err(e.into());
        }
    };

    state.invalidate_products().await;
    tracing::info!(product_id = %product.id, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product added successfully",
            product,
        }),
    ))
}

/// Toggle a product's sold-out flag.
///
/// PUT /api/products/{id}
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateProduct>,
) -> Result<Json<ProductResponse>> {
    let id: ProductId = parse_id(&id, "product")?;

    let product = ProductRepository::new(state.pool())
        .set_sold_out(id, body.sold_out)
        .await
        .map_err(not_found)?;

    state.invalidate_products().await;
    tracing::info!(product_id = %id, sold_out = body.sold_out, "Product sold-out flag changed");

    Ok(Json(ProductResponse {
        message: "Product updated successfully",
        product,
    }))
}

/// Delete a product and its stored image.
///
/// The image is removed first; if the asset host refuses, the product is
/// kept so the deletion can be retried.
///
/// DELETE /api/products/{id}
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id: ProductId = parse_id(&id, "product")?;
    let repo = ProductRepository::new(state.pool());

    let product = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if let Some(asset_id) = &product.asset_id
        && !state.assets().destroy(asset_id).await?
    {
        tracing::warn!(%asset_id, "Image was already gone from the asset host");
    }

    repo.delete(id).await.map_err(not_found)?;
    state.invalidate_products().await;
    tracing::info!(product_id = %id, "Product deleted");

    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

fn not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("on"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Mug ".to_string())), Some("Mug".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
