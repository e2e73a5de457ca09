use async_trait::async_trait;
use drinks_api::{
    AppConfig, AppState, create_router,
    auth::{AuthError, Claims, TokenVerifier, VerifierState},
    models::Drink,
    repository::{Repository, RepositoryState},
};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

// --- In-Memory Repository ---

#[derive(Default)]
struct MemoryTable {
    rows: Vec<Drink>,
    next_id: i32,
}

/// Drop-in repository backed by a Vec, mirroring the store contract: unique
/// titles, `None`/`false` for unknown ids, recipe kept as encoded text.
struct MemoryRepository {
    inner: Mutex<MemoryTable>,
}

impl MemoryRepository {
    fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryTable {
                rows: vec![],
                next_id: 1,
            }),
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_drinks(&self) -> Vec<Drink> {
        self.inner.lock().unwrap().rows.clone()
    }

    async fn insert_drink(&self, title: &str, recipe: &str) -> Result<Drink, sqlx::Error> {
        let mut table = self.inner.lock().unwrap();
        if table.rows.iter().any(|d| d.title == title) {
            // Same failure class a unique constraint violation produces.
            return Err(sqlx::Error::Protocol("duplicate title".into()));
        }
        let drink = Drink {
            id: table.next_id,
            title: title.to_string(),
            recipe: recipe.to_string(),
        };
        table.next_id += 1;
        table.rows.push(drink.clone());
        Ok(drink)
    }

    async fn update_drink_recipe(
        &self,
        id: i32,
        recipe: Option<&str>,
    ) -> Result<Option<Drink>, sqlx::Error> {
        let mut table = self.inner.lock().unwrap();
        let Some(row) = table.rows.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if let Some(recipe) = recipe {
            row.recipe = recipe.to_string();
        }
        Ok(Some(row.clone()))
    }

    async fn delete_drink(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut table = self.inner.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|d| d.id != id);
        Ok(table.rows.len() < before)
    }

    async fn reset_schema(&self) -> Result<(), sqlx::Error> {
        let mut table = self.inner.lock().unwrap();
        table.rows.clear();
        table.next_id = 1;
        Ok(())
    }
}

// --- Static Token Verifier ---

/// Maps fixed opaque tokens to claim sets, standing in for the JWKS-backed
/// verifier. Unknown tokens fail the way an undecodable credential would.
struct StaticVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticVerifier {
    fn with_fixtures() -> Self {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        let claims = |permissions: Option<Vec<&str>>| Claims {
            sub: "auth0|tester".to_string(),
            exp,
            permissions: permissions.map(|p| p.into_iter().map(String::from).collect()),
        };

        let mut tokens = HashMap::new();
        tokens.insert(
            "barista-token".to_string(),
            claims(Some(vec!["get:drinks-detail"])),
        );
        tokens.insert(
            "manager-token".to_string(),
            claims(Some(vec![
                "get:drinks-detail",
                "post:drinks",
                "patch:drinks",
                "delete:drinks",
            ])),
        );
        tokens.insert(
            "shopkeeper-token".to_string(),
            claims(Some(vec!["post:drinks"])),
        );
        // A verified token whose payload has no permissions field at all.
        tokens.insert("legacy-token".to_string(), claims(None));
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(AuthError::invalid_header)
    }
}

// --- Test Harness ---

struct TestApp {
    address: String,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let verifier = Arc::new(StaticVerifier::with_fixtures()) as VerifierState;
    let config = AppConfig::default();

    let state = AppState {
        repo,
        verifier,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

async fn post_drink(
    client: &reqwest::Client,
    app: &TestApp,
    token: &str,
    body: Value,
) -> reqwest::Response {
    client
        .post(format!("{}/drinks", app.address))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("post fail")
}

fn water_body() -> Value {
    json!({
        "title": "Water",
        "recipe": [{"name": "water", "color": "blue", "parts": 1}]
    })
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_public_menu_is_short_form() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = post_drink(&client, &app, "manager-token", water_body()).await;
    assert_eq!(created.status(), 200);

    let response = client
        .get(format!("{}/drinks", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));

    let drinks = body["drinks"].as_array().unwrap();
    assert!(!drinks.is_empty());
    for drink in drinks {
        for ingredient in drink["recipe"].as_array().unwrap() {
            let fields = ingredient.as_object().unwrap();
            assert!(fields.contains_key("name"));
            assert!(fields.contains_key("color"));
            assert!(
                !fields.contains_key("parts"),
                "short form must omit parts: {ingredient}"
            );
        }
    }
}

#[tokio::test]
async fn test_public_menu_ignores_authorization_header() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // A garbage credential must not affect the public listing.
    let response = client
        .get(format!("{}/drinks", app.address))
        .header("Authorization", "Bearer not.a.token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn test_detail_without_credential_is_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/drinks-detail", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!(401));
    assert_eq!(body["message"], json!("missing header"));
}

#[tokio::test]
async fn test_detail_with_unknown_token_is_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/drinks-detail", app.address))
        .bearer_auth("forged-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_detail_without_scope_is_403() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/drinks-detail", app.address))
        .bearer_auth("shopkeeper-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("unauthorized"));
}

#[tokio::test]
async fn test_detail_without_permissions_field_is_400() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/drinks-detail", app.address))
        .bearer_auth("legacy-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("invalid claims"));
}

#[tokio::test]
async fn test_create_with_empty_title_is_422() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = json!({
        "title": "",
        "recipe": [{"name": "espresso", "color": "brown", "parts": 2}]
    });
    let response = post_drink(&client, &app, "manager-token", body).await;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!(422));
    assert_eq!(body["message"], json!("unprocessable"));
}

#[tokio::test]
async fn test_create_without_recipe_is_422() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = post_drink(&client, &app, "manager-token", json!({"title": "Flat White"})).await;

    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn test_create_duplicate_title_is_422() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let first = post_drink(&client, &app, "manager-token", water_body()).await;
    assert_eq!(first.status(), 200);

    let second = post_drink(&client, &app, "manager-token", water_body()).await;
    assert_eq!(second.status(), 422);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_create_without_scope_is_403() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = post_drink(&client, &app, "barista-token", water_body()).await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_patch_unknown_id_is_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .patch(format!("{}/drinks/9999", app.address))
        .bearer_auth("manager-token")
        .json(&json!({"recipe": [{"name": "milk", "color": "white", "parts": 1}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("resource not found"));
}

#[tokio::test]
async fn test_patch_replaces_recipe() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = post_drink(&client, &app, "manager-token", water_body()).await;
    let created: Value = created.json().await.unwrap();
    let id = created["drinks"][0]["id"].as_i64().unwrap();

    let response = client
        .patch(format!("{}/drinks/{}", app.address, id))
        .bearer_auth("manager-token")
        .json(&json!({"recipe": [{"name": "sparkling water", "color": "blue", "parts": 3}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let patched = body["drinks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_i64() == Some(id))
        .expect("patched drink listed");
    assert_eq!(patched["recipe"][0]["name"], json!("sparkling water"));
    assert_eq!(patched["recipe"][0]["parts"], json!(3));
}

#[tokio::test]
async fn test_patch_without_recipe_keeps_stored_one() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = post_drink(&client, &app, "manager-token", water_body()).await;
    let created: Value = created.json().await.unwrap();
    let id = created["drinks"][0]["id"].as_i64().unwrap();

    let response = client
        .patch(format!("{}/drinks/{}", app.address, id))
        .bearer_auth("manager-token")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let drink = body["drinks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_i64() == Some(id))
        .unwrap();
    assert_eq!(drink["recipe"][0]["parts"], json!(1));
}

#[tokio::test]
async fn test_delete_roundtrip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = post_drink(&client, &app, "manager-token", water_body()).await;
    let created: Value = created.json().await.unwrap();
    let id = created["drinks"][0]["id"].as_i64().unwrap();

    let response = client
        .delete(format!("{}/drinks/{}", app.address, id))
        .bearer_auth("manager-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["delete"], json!(id));

    // The long-form listing must no longer carry the id.
    let detail = client
        .get(format!("{}/drinks-detail", app.address))
        .bearer_auth("barista-token")
        .send()
        .await
        .unwrap();
    let detail: Value = detail.json().await.unwrap();
    assert!(
        detail["drinks"]
            .as_array()
            .unwrap()
            .iter()
            .all(|d| d["id"].as_i64() != Some(id))
    );

    // A second delete of the same id is a 404.
    let again = client
        .delete(format!("{}/drinks/{}", app.address, id))
        .bearer_auth("manager-token")
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 404);
}

#[tokio::test]
async fn test_water_roundtrip_projections() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = post_drink(&client, &app, "manager-token", water_body()).await;
    assert_eq!(created.status(), 200);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["success"], json!(true));
    let id = created["drinks"][0]["id"].as_i64().unwrap();

    // Long form reproduces the stored proportions.
    let detail = client
        .get(format!("{}/drinks-detail", app.address))
        .bearer_auth("barista-token")
        .send()
        .await
        .unwrap();
    let detail: Value = detail.json().await.unwrap();
    let drink = detail["drinks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_i64() == Some(id))
        .expect("created drink listed in detail");
    assert_eq!(drink["title"], json!("Water"));
    assert_eq!(drink["recipe"][0]["parts"], json!(1));

    // Short form for the same id omits the proportions.
    let menu = client
        .get(format!("{}/drinks", app.address))
        .send()
        .await
        .unwrap();
    let menu: Value = menu.json().await.unwrap();
    let drink = menu["drinks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_i64() == Some(id))
        .expect("created drink listed in menu");
    assert_eq!(drink["recipe"][0]["name"], json!("water"));
    assert!(drink["recipe"][0].get("parts").is_none());
}

#[tokio::test]
async fn test_unmatched_route_gets_404_envelope() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/cocktails", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!(404));
    assert_eq!(body["message"], json!("resource not found"));
}
