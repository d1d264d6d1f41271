mod login;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn account_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login/access-token", post(login::login_access_token))
        .route("/users/me", get(users::read_user_me))
        .route("/users/", get(users::list_users))
        .route("/users/", post(users::create_user))
        .route("/users/{id}", get(users::read_user_by_id))
}
