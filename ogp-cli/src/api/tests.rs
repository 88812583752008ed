use super::*;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ogp_core::types::{GameRegistration, PlatformUser};
use ogp_core::{
    AssetStore, GameQuery, GameTemplate, GameUpdate, PlatformApi, RegisteredGame, Result,
    ServerConfig, Storage,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const BOUNDARY: &str = "ogp-test-boundary";

#[derive(Default)]
struct FakePlatform {
    registrations: Mutex<Vec<GameRegistration>>,
    updates: Mutex<Vec<String>>,
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn me(&self) -> Result<PlatformUser> {
        Ok(PlatformUser {
            id: "platform-1".to_string(),
            email: None,
            username: None,
            extra: Default::default(),
        })
    }

    async fn register_game(&self, registration: &GameRegistration) -> Result<RegisteredGame> {
        self.registrations.lock().push(registration.clone());
        Ok(RegisteredGame {
            id: "game-1".to_string(),
            image_url: None,
            cover_image: None,
            org_rewards_split: Some(registration.org_rewards_split.clone()),
            extra: Default::default(),
        })
    }

    async fn my_games(&self, query: &GameQuery) -> Result<Value> {
        Ok(json!({
            "limit": query.limit,
            "offset": query.offset,
            "collaborator": query.collaborator,
        }))
    }

    async fn game(&self, game_id: &str) -> Result<Value> {
        Ok(json!({ "id": game_id }))
    }

    async fn update_game(&self, game_id: &str, _update: &GameUpdate) -> Result<String> {
        self.updates.lock().push(game_id.to_string());
        Ok(game_id.to_string())
    }

    async fn leaderboard(&self, game_id: &str, limit: u32) -> Result<Value> {
        Ok(json!({ "gameId": game_id, "limit": limit }))
    }

    async fn add_points(&self, _game_id: &str, _user_id: &str, _points: i64) -> Result<()> {
        Ok(())
    }
}

struct FakeAssets;

#[async_trait]
impl AssetStore for FakeAssets {
    async fn put(&self, key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        Ok(format!("https://cdn.example.com/{}", key))
    }
}

async fn test_app() -> (TempDir, Router, Arc<FakePlatform>) {
    let dir = tempdir().unwrap();
    let storage = Arc::new(Storage::new(&dir.path().join("games.db")).await.unwrap());

    let mut config = ServerConfig::new(dir.path());
    config.api_key = "pk_test".to_string();
    config.secret_key = "sk_test".to_string();

    let platform = Arc::new(FakePlatform::default());
    let registry = GameRegistry::new(
        &config,
        platform.clone(),
        Arc::new(FakeAssets),
        storage,
        GameTemplate::builtin(),
    );

    let app = router(
        AppState {
            registry: Arc::new(registry),
        },
        None,
    );
    (dir, app, platform)
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// One multipart part: field name, optional (file name, content type), bytes.
type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

fn multipart(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((file_name, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: {}\r\n\r\n",
                    name, file_name, content_type
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/games/submit")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn game_data() -> Vec<u8> {
    json!({
        "name": "Sky Jumper",
        "description": "Jump between clouds",
        "pointsPerJump": 10,
        "lives": 3,
        "platform": "web",
        "userEmail": "dev@example.com",
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn test_health() {
    let (_dir, app, _) = test_app().await;

    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_submit_returns_created() {
    let (_dir, app, platform) = test_app().await;
    let data = game_data();

    let res = app
        .oneshot(multipart(&[
            ("data", None, &data),
            ("image", Some(("icon.png", "image/png")), &[1, 2, 3]),
            ("coverImage", Some(("cover.jpg", "image/jpeg")), &[4, 5]),
        ]))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["game"]["id"], "game-1");
    assert!(body["data"]["gameUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://cdn.example.com/demo-games/"));

    let registrations = platform.registrations.lock();
    assert_eq!(registrations[0].image, "data:image/png;base64,AQID");
    assert_eq!(
        registrations[0].cover_image.as_deref(),
        Some("data:image/jpeg;base64,BAU=")
    );
}

#[tokio::test]
async fn test_empty_image_part_is_missing() {
    let (_dir, app, platform) = test_app().await;
    let data = game_data();

    let res = app
        .oneshot(multipart(&[
            ("data", None, &data),
            ("image", Some(("", "application/octet-stream")), &[]),
        ]))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert!(body["details"]
        .as_array()
        .unwrap()
        .contains(&json!("image is required")));
    assert!(platform.registrations.lock().is_empty());
}

#[tokio::test]
async fn test_submit_requires_data() {
    let (_dir, app, _) = test_app().await;

    let res = app
        .oneshot(multipart(&[(
            "image",
            Some(("icon.png", "image/png")),
            &[1, 2, 3],
        )]))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_update_rejected() {
    let (_dir, app, platform) = test_app().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/games/game-1")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(platform.updates.lock().is_empty());
}

#[tokio::test]
async fn test_list_query_mapping() {
    let (_dir, app, _) = test_app().await;

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/games?userEmail=dev@example.com&limit=5&offset=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let games = &body["data"]["games"];
    assert_eq!(games["collaborator"], "email:dev@example.com");
    assert_eq!(games["limit"], 5);
    assert_eq!(games["offset"], 10);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (_dir, app, _) = test_app().await;

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/users/ghost@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
}
