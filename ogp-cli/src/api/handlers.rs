use super::{ApiError, AppState};
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ogp_core::registry::{GameListing, SubmittedGame, UserGames};
use ogp_core::types::PlatformUser;
use ogp_core::{GameQuery, GameSubmission, GameUpdate, ImageUpload, ScoreSubmission};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

type ApiResult<T> = std::result::Result<Json<Envelope<T>>, ApiError>;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    limit: Option<u32>,
    offset: Option<u32>,
    include_extra: Option<bool>,
    user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    limit: Option<u32>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn platform_user(State(state): State<AppState>) -> ApiResult<PlatformUser> {
    ok(state.registry.platform_user().await?)
}

/// `multipart/form-data` with a `data` JSON part, an `image` file and an
/// optional `coverImage` file.
pub async fn submit_game(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<(StatusCode, Json<Envelope<SubmittedGame>>), ApiError> {
    let mut submission: Option<GameSubmission> = None;
    let mut image = None;
    let mut cover_image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "data" => {
                let text = field.text().await?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::bad_request(format!("Invalid game data: {}", e)))?;
                submission = Some(parsed);
            }
            "image" => image = read_upload(field).await?,
            "coverImage" => cover_image = read_upload(field).await?,
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let submission = submission.ok_or_else(|| ApiError::bad_request("Missing game data"))?;
    let submitted = state
        .registry
        .submit_game(submission, image, cover_image)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            data: submitted,
        }),
    ))
}

/// An empty file part counts as no upload.
async fn read_upload(field: Field<'_>) -> std::result::Result<Option<ImageUpload>, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await?;

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(ImageUpload::new(file_name, content_type, bytes.to_vec())))
}

pub async fn list_games(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<GameListing> {
    let defaults = GameQuery::default();
    let query = GameQuery {
        limit: params.limit.unwrap_or(defaults.limit),
        offset: params.offset.unwrap_or(defaults.offset),
        include_extra: params.include_extra.unwrap_or(defaults.include_extra),
        collaborator: None,
    };

    ok(state
        .registry
        .list_games(query, params.user_email.as_deref())
        .await?)
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> ApiResult<Value> {
    ok(state.registry.game(&game_id).await?)
}

pub async fn update_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(update): Json<GameUpdate>,
) -> ApiResult<Value> {
    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let updated_id = state.registry.update_game(&game_id, update).await?;
    ok(json!({ "gameId": updated_id }))
}

pub async fn delete_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> ApiResult<Value> {
    state.registry.delete_game(&game_id).await?;
    ok(json!({ "gameId": game_id, "deleted": true }))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Query(params): Query<LeaderboardParams>,
) -> ApiResult<Value> {
    ok(state.registry.leaderboard(&game_id, params.limit).await?)
}

pub async fn record_score(
    State(state): State<AppState>,
    Json(score): Json<ScoreSubmission>,
) -> ApiResult<Value> {
    state.registry.record_score(&score).await?;
    ok(json!({
        "gameId": score.game_id,
        "playerEmail": score.player_email,
        "score": score.score,
        "sessionId": score.session_id,
    }))
}

pub async fn user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<UserGames> {
    ok(state.registry.user(&email).await?)
}
