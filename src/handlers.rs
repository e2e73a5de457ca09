use crate::{
    AppState,
    auth::{BearerClaims, require_permission},
    error::ApiError,
    models::{
        CreateDrinkRequest, DeleteDrinkResponse, DrinkDetail, DrinkDetailResponse,
        DrinkMenuResponse, DrinkSummary, UpdateDrinkRequest, recipe,
    },
};
use axum::{
    Json,
    extract::{Path, State},
};

// --- Listing Helpers ---

/// full_menu
///
/// Decodes every stored drink into the long projection. A row whose recipe
/// text fails to decode is logged and dropped from the listing rather than
/// failing the whole response.
async fn full_menu(state: &AppState) -> Vec<DrinkDetail> {
    state
        .repo
        .list_drinks()
        .await
        .iter()
        .filter_map(|drink| match drink.long() {
            Ok(detail) => Some(detail),
            Err(e) => {
                tracing::error!("undecodable recipe for drink {}: {}", drink.id, e);
                None
            }
        })
        .collect()
}

/// short_menu
///
/// Same as `full_menu` but with the public short projection.
async fn short_menu(state: &AppState) -> Vec<DrinkSummary> {
    state
        .repo
        .list_drinks()
        .await
        .iter()
        .filter_map(|drink| match drink.short() {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!("undecodable recipe for drink {}: {}", drink.id, e);
                None
            }
        })
        .collect()
}

// --- Handlers ---

/// get_drinks
///
/// [Public Route] Lists the menu in its short form: ingredient names and
/// colors, with `parts` omitted. Succeeds for every caller regardless of any
/// credential on the request.
#[utoipa::path(
    get,
    path = "/drinks",
    responses((status = 200, description = "Short-form menu", body = DrinkMenuResponse))
)]
pub async fn get_drinks(State(state): State<AppState>) -> Json<DrinkMenuResponse> {
    let drinks = short_menu(&state).await;
    Json(DrinkMenuResponse {
        success: true,
        drinks,
    })
}

/// get_drinks_detail
///
/// [Protected Route] Lists the menu with full recipes.
/// Requires the `get:drinks-detail` permission.
#[utoipa::path(
    get,
    path = "/drinks-detail",
    responses(
        (status = 200, description = "Long-form menu", body = DrinkDetailResponse),
        (status = 401, description = "Credential failure"),
        (status = 403, description = "Permission not granted")
    )
)]
pub async fn get_drinks_detail(
    BearerClaims(claims): BearerClaims,
    State(state): State<AppState>,
) -> Result<Json<DrinkDetailResponse>, ApiError> {
    require_permission("get:drinks-detail", &claims)?;

    Ok(Json(DrinkDetailResponse {
        success: true,
        drinks: full_menu(&state).await,
    }))
}

/// create_drink
///
/// [Protected Route] Inserts a new drink and returns the full long-form
/// listing. Requires the `post:drinks` permission.
///
/// 422 when the title or recipe is missing or empty, and when the store
/// rejects the insert (duplicate title).
#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    responses(
        (status = 200, description = "Created; full menu", body = DrinkDetailResponse),
        (status = 422, description = "Missing/empty fields or duplicate title")
    )
)]
pub async fn create_drink(
    BearerClaims(claims): BearerClaims,
    State(state): State<AppState>,
    Json(payload): Json<CreateDrinkRequest>,
) -> Result<Json<DrinkDetailResponse>, ApiError> {
    require_permission("post:drinks", &claims)?;

    let title = payload
        .title
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unprocessable)?;
    let ingredients = payload
        .recipe
        .filter(|r| !r.is_empty())
        .ok_or(ApiError::Unprocessable)?;
    let encoded = recipe::encode(&ingredients).map_err(|_| ApiError::Unprocessable)?;

    if let Err(e) = state.repo.insert_drink(&title, &encoded).await {
        tracing::error!("insert_drink {:?} failed: {:?}", title, e);
        return Err(ApiError::Unprocessable);
    }

    Ok(Json(DrinkDetailResponse {
        success: true,
        drinks: full_menu(&state).await,
    }))
}

/// update_drink
///
/// [Protected Route] Replaces a drink's recipe in place and returns the full
/// long-form listing. Requires the `patch:drinks` permission.
///
/// 404 when the id does not exist. Store failures on this path map to 401,
/// unlike the create and delete paths which map to 422; the asymmetry is
/// part of the API contract.
#[utoipa::path(
    patch,
    path = "/drinks/{id}",
    params(("id" = i32, Path, description = "Drink ID")),
    request_body = UpdateDrinkRequest,
    responses(
        (status = 200, description = "Updated; full menu", body = DrinkDetailResponse),
        (status = 404, description = "No drink with that id")
    )
)]
pub async fn update_drink(
    BearerClaims(claims): BearerClaims,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDrinkRequest>,
) -> Result<Json<DrinkDetailResponse>, ApiError> {
    require_permission("patch:drinks", &claims)?;

    // An absent or empty patch recipe keeps the stored one.
    let encoded = payload
        .recipe
        .filter(|r| !r.is_empty())
        .map(|r| recipe::encode(&r))
        .transpose()
        .map_err(|_| ApiError::Unauthorized)?;

    match state.repo.update_drink_recipe(id, encoded.as_deref()).await {
        Ok(Some(_)) => Ok(Json(DrinkDetailResponse {
            success: true,
            drinks: full_menu(&state).await,
        })),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!("update_drink {} failed: {:?}", id, e);
            Err(ApiError::Unauthorized)
        }
    }
}

/// delete_drink
///
/// [Protected Route] Removes a drink and echoes the deleted id.
/// Requires the `delete:drinks` permission.
///
/// 404 when the id does not exist; other store failures map to 422.
#[utoipa::path(
    delete,
    path = "/drinks/{id}",
    params(("id" = i32, Path, description = "Drink ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteDrinkResponse),
        (status = 404, description = "No drink with that id")
    )
)]
pub async fn delete_drink(
    BearerClaims(claims): BearerClaims,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteDrinkResponse>, ApiError> {
    require_permission("delete:drinks", &claims)?;

    match state.repo.delete_drink(id).await {
        Ok(true) => Ok(Json(DeleteDrinkResponse {
            success: true,
            delete: id,
        })),
        Ok(false) => Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!("delete_drink {} failed: {:?}", id, e);
            Err(ApiError::Unprocessable)
        }
    }
}

/// not_found
///
/// Fallback for unmatched routes: renders the 404 envelope so every error
/// response on the API shares the same shape.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
