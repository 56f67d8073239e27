//! # Digital Products
//!
//! Ebooks, courses and templates sold through an external checkout link.
//! The ebook listing on the public site is `GET /api/products?kind=ebook`.
//!
//! ## Endpoints
//!
//! - `GET /api/products` — published products (`kind`, `featured` filters)
//! - `GET /api/products/:slug` — published product (counts a view)
//! - `GET|POST /api/admin/products` — all products / create
//! - `GET|PUT|DELETE /api/admin/products/:id` — read / replace / delete (admin)

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use folio_core::{Currency, ProductKind, ValidationError};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db::write_through;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::routes::content::{
    self, optional_link, resolve_references, ContentQuery, MetaFields, MetaInput, StatusFilter,
};
use crate::routes::Page;
use crate::state::{AppState, ProductRecord};

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Upper bound on prices, in minor units.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Create or replace a product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductInput {
    #[serde(flatten)]
    pub meta: MetaInput,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    /// `ebook`, `course`, `template` or `other` (default).
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "ebook")]
    pub kind: Option<ProductKind>,
    /// Price in minor units. Zero means free.
    #[serde(default)]
    pub price_cents: i64,
    /// Three-letter code, default `USD`.
    #[serde(default)]
    pub currency: Option<String>,
    /// External checkout link.
    #[serde(default)]
    pub purchase_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

struct ProductFields {
    meta: MetaFields,
    description: String,
    content: String,
    kind: ProductKind,
    price_cents: i64,
    currency: Currency,
    purchase_url: Option<String>,
    featured: bool,
}

impl ProductInput {
    fn validate(self) -> Result<ProductFields, ValidationError> {
        let meta = self.meta.validate()?;

        let description = self.description.trim().to_string();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::field(
                "description",
                format!("must not exceed {MAX_DESCRIPTION_LEN} characters"),
            ));
        }
        if !(0..=MAX_PRICE_CENTS).contains(&self.price_cents) {
            return Err(ValidationError::field(
                "price_cents",
                format!("must be between 0 and {MAX_PRICE_CENTS}"),
            ));
        }
        let currency = match content::non_blank(self.currency) {
            Some(code) => Currency::parse(&code)?,
            None => Currency::default(),
        };

        Ok(ProductFields {
            meta,
            description,
            content: self.content,
            kind: self.kind.unwrap_or(ProductKind::Other),
            price_cents: self.price_cents,
            currency,
            purchase_url: optional_link(self.purchase_url)?,
            featured: self.featured,
        })
    }
}

/// Product-specific listing filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KindFilter {
    /// `ebook`, `course`, `template` or `other`.
    #[param(value_type = Option<String>)]
    pub kind: Option<ProductKind>,
}

/// Public read endpoints.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/:slug", get(get_product))
}

/// Dashboard endpoints. Mounted behind the auth middleware.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/products",
            get(admin_list_products).post(create_product),
        )
        .route(
            "/api/admin/products/:id",
            get(admin_get_product)
                .put(update_product)
                .delete(delete_product),
        )
}

/// GET /api/products — List published products.
#[utoipa::path(
    get,
    path = "/api/products",
    params(ContentQuery, KindFilter),
    responses(
        (status = 200, description = "Published products", body = crate::routes::ProductPage),
        (status = 400, description = "Invalid query", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
    kind: Result<Query<KindFilter>, QueryRejection>,
) -> Result<Json<Page<ProductRecord>>, AppError> {
    let query = extract_query(query)?;
    let kind = extract_query(kind)?;
    Ok(Json(content::list_published(&state.products, &query, |p| {
        kind.kind.map_or(true, |k| p.kind == k)
    })?))
}

/// GET /api/products/:slug — Read a published product.
#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product found", body = ProductRecord),
        (status = 404, description = "Not found or not published", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductRecord>, AppError> {
    Ok(Json(
        content::view_published(&state, &state.products, &slug).await?,
    ))
}

/// GET /api/admin/products — List all products including drafts.
#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(ContentQuery, StatusFilter, KindFilter),
    responses(
        (status = 200, description = "Products", body = crate::routes::ProductPage),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
async fn admin_list_products(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
    status: Result<Query<StatusFilter>, QueryRejection>,
    kind: Result<Query<KindFilter>, QueryRejection>,
) -> Result<Json<Page<ProductRecord>>, AppError> {
    let query = extract_query(query)?;
    let status = extract_query(status)?;
    let kind = extract_query(kind)?;
    let items = state.products.filter(|p| {
        status.status.map_or(true, |s| p.meta.status == s)
            && kind.kind.map_or(true, |k| p.kind == k)
    });
    Ok(Json(content::query_page(
        items,
        &query,
        content::Order::Created,
    )?))
}

/// GET /api/admin/products/:id — Read any product.
#[utoipa::path(
    get,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = ProductRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
async fn admin_get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductRecord>, AppError> {
    Ok(Json(content::get_by_id(&state.products, &id)?))
}

/// POST /api/admin/products — Create a product.
#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductRecord>), AppError> {
    let fields = extract_json(body)?.validate()?;
    resolve_references::<ProductRecord>(&state, &fields.meta).await?;

    let now = Utc::now();
    let record = ProductRecord {
        id: Uuid::new_v4(),
        meta: fields.meta.into_new_meta(now)?,
        description: fields.description,
        content: fields.content,
        kind: fields.kind,
        price_cents: fields.price_cents,
        currency: fields.currency,
        purchase_url: fields.purchase_url,
        featured: fields.featured,
    };

    let record = state.products.insert_unique(record)?;
    write_through::inserted(state.db_pool.as_ref(), &state.products, &record).await?;

    tracing::info!(product_id = %record.id, slug = %record.meta.slug, kind = %record.kind, "product created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/admin/products/:id — Replace a product's editable fields.
#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductRecord),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ProductRecord>, AppError> {
    let fields = extract_json(body)?.validate()?;
    resolve_references::<ProductRecord>(&state, &fields.meta).await?;

    let now = Utc::now();
    let (previous, current) = state.products.update_unique(&id, |product| {
        fields.meta.apply_to(&mut product.meta, now);
        product.description = fields.description;
        product.content = fields.content;
        product.kind = fields.kind;
        product.price_cents = fields.price_cents;
        product.currency = fields.currency;
        product.purchase_url = fields.purchase_url;
        product.featured = fields.featured;
        Ok(())
    })?;
    write_through::updated(state.db_pool.as_ref(), &state.products, &previous, &current).await?;

    Ok(Json(current))
}

/// DELETE /api/admin/products/:id — Delete a product.
#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
async fn delete_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    content::delete_by_id(&state, &state.products, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
