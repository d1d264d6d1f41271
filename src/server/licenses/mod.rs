mod catalog;
mod generate;
mod licenses;
mod restrictions;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;
use crate::types::{LicenseDomain, LicenseSource};

pub fn license_router() -> Router<Arc<AppState>> {
    Router::new()
        // Restriction catalog
        .route(
            "/license/restriction/",
            get(restrictions::list_restrictions).post(restrictions::create_restriction),
        )
        .route(
            "/license/restriction/{id}",
            get(restrictions::get_restriction)
                .put(restrictions::update_restriction)
                .delete(restrictions::delete_restriction),
        )
        // Domain and source catalog
        .route(
            "/license/domain/",
            get(catalog::list::<LicenseDomain>).post(catalog::create::<LicenseDomain>),
        )
        .route(
            "/license/domain/{id}",
            get(catalog::get::<LicenseDomain>)
                .put(catalog::update::<LicenseDomain>)
                .delete(catalog::remove::<LicenseDomain>),
        )
        .route(
            "/license/source/",
            get(catalog::list::<LicenseSource>).post(catalog::create::<LicenseSource>),
        )
        .route(
            "/license/source/{id}",
            get(catalog::get::<LicenseSource>)
                .put(catalog::update::<LicenseSource>)
                .delete(catalog::remove::<LicenseSource>),
        )
        // Licenses
        .route(
            "/license/",
            get(licenses::list_licenses).post(licenses::create_license),
        )
        .route(
            "/license/{id}",
            get(licenses::get_license)
                .put(licenses::update_license)
                .delete(licenses::delete_license),
        )
        .route("/license/{id}/generate", get(generate::generate_license))
}
