use crate::models::{
    ErrorResponse, FiltersRequest, HealthResponse, NameEntry, SetsResponse, StackQuery,
    StackResponse, StackUpdateResponse, SwipeResponse, UndoResponse,
};
use crate::routes::AppState;
use crate::services::{ExclusionStore, RemoteSync};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure stack and swipe routes
pub fn configure<R: RemoteSync, S: ExclusionStore>(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check::<R, S>))
        .route("/sets", web::get().to(list_sets::<R, S>))
        .route("/stack", web::get().to(get_stack::<R, S>))
        .route("/swipes/like", web::post().to(like::<R, S>))
        .route("/swipes/dismiss", web::post().to(dismiss::<R, S>))
        .route("/swipes/undo", web::post().to(undo::<R, S>))
        .route("/swipes", web::delete().to(reset_history::<R, S>))
        .route("/filters", web::put().to(apply_filters::<R, S>));
}

/// Health check endpoint
async fn health_check<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let stats = state.session.stats();

    let status = if stats.ended || state.catalog.is_empty() {
        "degraded"
    } else {
        "healthy"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        session_id: state.session.id(),
        catalog: state.catalog.len(),
        session: stats,
    })
}

/// GET /api/v1/sets
async fn list_sets<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    HttpResponse::Ok().json(SetsResponse {
        sets: state.catalog.all_set_metadata().to_vec(),
        languages: state.catalog.languages(),
        styles: state.catalog.styles(),
    })
}

/// GET /api/v1/stack?limit=20
///
/// Returns the top of the stack; `total` is the full stack size.
async fn get_stack<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
    query: web::Query<StackQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let stack = state.session.current_stack();
    let total = stack.len();

    HttpResponse::Ok().json(StackResponse {
        names: stack.into_iter().take(query.limit).collect(),
        total,
    })
}

fn swipe_response<R: RemoteSync, S: ExclusionStore>(
    state: &AppState<R, S>,
    swiped: Option<NameEntry>,
) -> HttpResponse {
    let stack = state.session.current_stack();

    HttpResponse::Ok().json(SwipeResponse {
        swiped,
        next: stack.first().cloned(),
        remaining: stack.len(),
    })
}

/// POST /api/v1/swipes/like
async fn like<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let swiped = state.session.like().await;
    if swiped.is_none() {
        tracing::debug!("Like with empty stack");
    }
    swipe_response(&state, swiped)
}

/// POST /api/v1/swipes/dismiss
async fn dismiss<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let swiped = state.session.dismiss().await;
    swipe_response(&state, swiped)
}

/// POST /api/v1/swipes/undo
async fn undo<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let undone = state.session.undo().await;

    HttpResponse::Ok().json(UndoResponse {
        undone,
        next: state.session.top(),
    })
}

/// DELETE /api/v1/swipes
///
/// Clears local swipe history; remote decisions stay as they are.
async fn reset_history<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
) -> impl Responder {
    let remaining = state.session.reset_history().await;
    HttpResponse::Ok().json(StackUpdateResponse { remaining })
}

/// PUT /api/v1/filters
///
/// Request body:
/// ```json
/// {
///   "languages": ["nl", "en"],
///   "styles": ["cute"],
///   "setIds": [],
///   "gender": "any",
///   "startsWith": "m",
///   "maxLength": 6
/// }
/// ```
async fn apply_filters<R: RemoteSync, S: ExclusionStore>(
    state: web::Data<AppState<R, S>>,
    req: web::Json<FiltersRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for filters request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let facets = match req.into_inner().into_facets() {
        Ok(facets) => facets,
        Err(e) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid facet".to_string(),
                message: e.to_string(),
                status_code: 400,
            });
        }
    };

    let remaining = state.session.apply_facets(facets);
    HttpResponse::Ok().json(StackUpdateResponse { remaining })
}
