use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use dinelog_db::models::{NewRestaurant, UpsertOutcome};
use dinelog_types::api::{RateInput, RestaurantDetail, SubmitRestaurantRequest, UpdateRatingRequest};
use dinelog_types::models::Restaurant;

use crate::error::{ApiError, ApiResult};
use crate::session::AuthSession;
use crate::state::{AppState, blocking};

pub const MIN_RATE: f64 = 0.0;
pub const MAX_RATE: f64 = 5.0;

/// Accept finite ratings in `[MIN_RATE, MAX_RATE]`, given as a number or
/// numeric text.
pub fn parse_rate(input: &RateInput) -> ApiResult<f64> {
    let rate = input
        .value()
        .ok_or_else(|| ApiError::BadRequest("Rate must be a number".into()))?;

    if !rate.is_finite() || !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(ApiError::BadRequest(format!(
            "Rate must be between {} and {}",
            MIN_RATE, MAX_RATE
        )));
    }
    Ok(rate)
}

fn require_website(website: &str) -> ApiResult<String> {
    let website = website.trim();
    if website.is_empty() {
        return Err(ApiError::BadRequest("Website is required".into()));
    }
    Ok(website.to_string())
}

/// `POST /restaurant`: create the restaurant, or re-rate it if the website
/// is already in the ledger.
pub async fn submit_restaurant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Json(req): Json<SubmitRestaurantRequest>,
) -> ApiResult<impl IntoResponse> {
    let rate = parse_rate(&req.rate)?;
    let website = require_website(&req.website)?;

    let (outcome, row) = blocking(&state, move |s| {
        Ok(s.db.upsert_restaurant(NewRestaurant {
            website: &website,
            name: &req.name,
            address: &req.address,
            rate,
            comment: &req.comment,
            owner_user_id: auth.user_id,
        })?)
    })
    .await?;

    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(Restaurant::from(row))))
}

/// `GET /restaurant_list`
pub async fn list_restaurants(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = blocking(&state, |s| Ok(s.db.list_restaurants()?)).await?;

    debug!("Listing {} restaurants", rows.len());
    let restaurants: Vec<Restaurant> = rows.into_iter().map(Restaurant::from).collect();
    Ok(Json(restaurants))
}

/// `GET /my_restaurants`: rows whose latest submission came from the caller.
pub async fn list_my_restaurants(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<impl IntoResponse> {
    let rows = blocking(&state, move |s| {
        Ok(s.db.list_restaurants_owned_by(auth.user_id)?)
    })
    .await?;

    let restaurants: Vec<Restaurant> = rows.into_iter().map(Restaurant::from).collect();
    Ok(Json(restaurants))
}

/// `POST /restaurant_list`: re-rate a restaurant already in the list.
pub async fn update_rating(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Json(req): Json<UpdateRatingRequest>,
) -> ApiResult<impl IntoResponse> {
    let rate = parse_rate(&req.rate)?;
    let website = require_website(&req.website)?;

    let row = blocking(&state, move |s| {
        Ok(s.db.update_rating(&website, rate, &req.comment, auth.user_id)?)
    })
    .await?;

    Ok(Json(Restaurant::from(row)))
}

/// `GET /restaurant/{website}`
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(website): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (row, average_rating) = blocking(&state, move |s| {
        let row = s.db.get_restaurant(&website)?.ok_or(ApiError::NotFound)?;
        let average = s.db.average_rating(&website)?;
        Ok((row, average))
    })
    .await?;

    Ok(Json(RestaurantDetail {
        restaurant: Restaurant::from(row),
        average_rating,
    }))
}

/// `GET /ratings`
pub async fn rating_summaries(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let summaries = blocking(&state, |s| Ok(s.db.rating_summaries()?)).await?;
    Ok(Json(summaries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_accepts_numbers_and_text() {
        assert_eq!(parse_rate(&RateInput::Number(4.0)).unwrap(), 4.0);
        assert_eq!(parse_rate(&RateInput::Text(" 2.5 ".into())).unwrap(), 2.5);
        assert_eq!(parse_rate(&RateInput::Number(0.0)).unwrap(), 0.0);
        assert_eq!(parse_rate(&RateInput::Number(5.0)).unwrap(), 5.0);
    }

    #[test]
    fn test_parse_rate_rejects_out_of_range() {
        for bad in [
            RateInput::Number(-0.5),
            RateInput::Number(5.01),
            RateInput::Text("NaN".into()),
            RateInput::Text("inf".into()),
            RateInput::Text("four".into()),
        ] {
            assert!(matches!(parse_rate(&bad), Err(ApiError::BadRequest(_))), "{bad:?}");
        }
    }
}
