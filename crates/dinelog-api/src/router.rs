use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::session::require_session;
use crate::state::AppState;
use crate::{auth, restaurants};

/// All routes, with write routes behind [`require_session`].
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/restaurant_list", get(restaurants::list_restaurants))
        .route("/restaurant/{website}", get(restaurants::get_restaurant))
        .route("/ratings", get(restaurants::rating_summaries));

    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/delete_account", post(auth::delete_account))
        .route("/restaurant", post(restaurants::submit_restaurant))
        .route("/restaurant_list", post(restaurants::update_rating))
        .route("/my_restaurants", get(restaurants::list_my_restaurants))
        .layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
