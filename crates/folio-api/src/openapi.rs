//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented handler into one OpenAPI document,
//! served at `/openapi.json`. Admin endpoints declare the `bearer`
//! security scheme registered by [`BearerAuth`].

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio API",
        version = "0.1.0",
        description = "Content management and storefront backend: blog posts, portfolio projects, digital products, taxonomy, contact messages and image uploads."
    ),
    paths(
        // Auth
        crate::routes::auth::login,
        crate::routes::auth::register,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::list_users,
        // Posts
        crate::routes::posts::list_posts,
        crate::routes::posts::get_post,
        crate::routes::posts::admin_list_posts,
        crate::routes::posts::admin_get_post,
        crate::routes::posts::create_post,
        crate::routes::posts::update_post,
        crate::routes::posts::delete_post,
        // Projects
        crate::routes::projects::list_projects,
        crate::routes::projects::get_project,
        crate::routes::projects::admin_list_projects,
        crate::routes::projects::admin_get_project,
        crate::routes::projects::create_project,
        crate::routes::projects::update_project,
        crate::routes::projects::delete_project,
        // Products
        crate::routes::products::list_products,
        crate::routes::products::get_product,
        crate::routes::products::admin_list_products,
        crate::routes::products::admin_get_product,
        crate::routes::products::create_product,
        crate::routes::products::update_product,
        crate::routes::products::delete_product,
        // Taxonomy
        crate::routes::taxonomy::list_categories,
        crate::routes::taxonomy::create_category,
        crate::routes::taxonomy::update_category,
        crate::routes::taxonomy::delete_category,
        crate::routes::taxonomy::list_tags,
        crate::routes::taxonomy::create_tag,
        crate::routes::taxonomy::update_tag,
        crate::routes::taxonomy::delete_tag,
        // Messages
        crate::routes::messages::submit_message,
        crate::routes::messages::list_messages,
        crate::routes::messages::get_message,
        crate::routes::messages::mark_message,
        crate::routes::messages::delete_message,
        // Uploads & dashboard
        crate::routes::uploads::upload_image,
        crate::routes::dashboard::stats,
    ),
    components(schemas(
        // Records
        crate::state::ContentMeta,
        crate::state::PostRecord,
        crate::state::ProjectRecord,
        crate::state::ProductRecord,
        crate::state::MessageRecord,
        crate::state::CategoryRecord,
        crate::state::TagRecord,
        crate::state::UserProfile,
        crate::auth::Role,
        // Pages
        crate::routes::PostPage,
        crate::routes::ProjectPage,
        crate::routes::ProductPage,
        crate::routes::MessagePage,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Request / response DTOs
        crate::routes::auth::LoginInput,
        crate::routes::auth::LoginResponse,
        crate::routes::auth::RegisterInput,
        crate::routes::content::MetaInput,
        crate::routes::posts::PostInput,
        crate::routes::projects::ProjectInput,
        crate::routes::products::ProductInput,
        crate::routes::taxonomy::CategoryInput,
        crate::routes::taxonomy::TagInput,
        crate::routes::taxonomy::TagUsage,
        crate::routes::messages::ContactInput,
        crate::routes::messages::MarkReadInput,
        crate::routes::uploads::UploadResponse,
        crate::routes::dashboard::StatsResponse,
        crate::routes::dashboard::ContentStats,
        crate::routes::dashboard::MessageStats,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Login, sessions and users"),
        (name = "posts", description = "Blog posts"),
        (name = "projects", description = "Portfolio projects"),
        (name = "products", description = "Digital products"),
        (name = "taxonomy", description = "Categories and tags"),
        (name = "messages", description = "Contact form and inbox"),
        (name = "uploads", description = "Image uploads"),
        (name = "dashboard", description = "Admin statistics"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by admin endpoints.
pub struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_public_and_admin_paths() {
        let spec = ApiDoc::openapi();
        let paths = &spec.paths.paths;
        assert!(paths.contains_key("/api/posts"));
        assert!(paths.contains_key("/api/products/{slug}"));
        assert!(paths.contains_key("/api/admin/uploads"));
        assert!(paths.contains_key("/api/admin/stats"));
    }

    #[test]
    fn bearer_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components present");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
