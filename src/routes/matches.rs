use crate::models::{ErrorResponse, MatchesResponse, PendingMatchesResponse};
use crate::routes::AppState;
use crate::services::{ExclusionStore, RemoteSync};
use actix_web::{web, HttpResponse, Responder};

/// Configure all match-related routes
pub fn configure<R: RemoteSync, S: ExclusionStore>(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/matches", web::get().to(list_matches::<R, S>))
        .route("/matches/pending", web::get().to(pending_matches::<R, S>));
}

/// GET /api/v1/matches
///
/// Household matches straight from the backend, most liked first.
async fn list_matches<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let Some(identity) = state.session.identity() else {
        return HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "No household".to_string(),
            message: "Household and user ids are not configured".to_string(),
            status_code: 503,
        });
    };

    match state.remote.fetch_matches(&identity.household_id).await {
        Ok(matches) => {
            tracing::info!(
                "Fetched {} matches for household {}",
                matches.len(),
                identity.household_id
            );
            HttpResponse::Ok().json(MatchesResponse { matches })
        }
        Err(e) => {
            tracing::error!("Failed to fetch matches for {}: {}", identity.household_id, e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Failed to fetch matches".to_string(),
                message: e.to_string(),
                status_code: 502,
            })
        }
    }
}

/// GET /api/v1/matches/pending
///
/// Drains matches raised by this session since the previous call.
async fn pending_matches<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    HttpResponse::Ok().json(PendingMatchesResponse {
        matches: state.inbox.drain(),
    })
}
