use crate::models::{ErrorResponse, LikesResponse};
use crate::routes::AppState;
use crate::services::{ExclusionStore, RemoteSync};
use actix_web::{web, HttpResponse, Responder};

/// Configure routes for the user's own decisions
pub fn configure<R: RemoteSync, S: ExclusionStore>(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/likes", web::get().to(list_likes::<R, S>))
        .route("/swipes/counts", web::get().to(swipe_counts::<R, S>));
}

/// GET /api/v1/likes
///
/// Local likes always answer; the backend listing is added when reachable.
async fn list_likes<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let local = state.session.local_likes();

    let remote = match state.session.identity() {
        Some(identity) => match state
            .remote
            .fetch_likes(&identity.household_id, &identity.user_id)
            .await
        {
            Ok(likes) => Some(likes),
            Err(e) => {
                tracing::warn!("Failed to fetch likes for {}: {}", identity.user_id, e);
                None
            }
        },
        None => None,
    };

    HttpResponse::Ok().json(LikesResponse { local, remote })
}

/// GET /api/v1/swipes/counts
async fn swipe_counts<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let Some(identity) = state.session.identity() else {
        return HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "No household".to_string(),
            message: "Household and user ids are not configured".to_string(),
            status_code: 503,
        });
    };

    match state
        .remote
        .fetch_counts(&identity.household_id, &identity.user_id)
        .await
    {
        Ok(counts) => HttpResponse::Ok().json(counts),
        Err(e) => {
            tracing::error!("Failed to fetch swipe counts for {}: {}", identity.user_id, e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Failed to fetch swipe counts".to_string(),
                message: e.to_string(),
                status_code: 502,
            })
        }
    }
}
