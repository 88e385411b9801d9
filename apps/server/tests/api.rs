use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use fauna::domain::config::ApiConfig;
use fauna_server::Server;
use serde_json::{Value, json};
use tower::ServiceExt;

const SEED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../crates/features/spawns/fixtures/seed.json");

async fn app() -> Router {
    let mut config = ApiConfig::default();
    config.spawns.seed_file = Some(SEED.into());
    config.spawns.sweep_interval_secs = 0;

    let server = Server::builder().config(config).build().await.expect("server");
    fauna_server::app(server.state().clone()).expect("router")
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()));
    (status, value)
}

#[tokio::test]
async fn system_routes_answer() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("pong"));

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
}

#[tokio::test]
async fn nearby_orders_by_distance() {
    let app = app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/branches/nearby",
        Some(json!({"lat": "19.4326", "long": -99.1332, "maxDistance": 7000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let ids: Vec<_> = body["payload"].as_array().unwrap().iter().map(|b| b["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["zocalo", "chapultepec"]);
    assert_eq!(body["payload"][0]["distance"], json!(0.0));
    assert_eq!(body["payload"][0]["capacity"], 3);
}

#[tokio::test]
async fn nearby_reports_every_bad_field() {
    let app = app().await;

    let (status, body) =
        call(&app, Method::POST, "/api/branches/nearby", Some(json!({"longitude": "east", "maxDistance": -1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");

    let fields: Vec<_> = body["payload"].as_array().unwrap().iter().map(|i| i["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"longitude"), "{body}");

    let (status, body) = call(&app, Method::POST, "/api/branches/nearby", Some(json!({"longitude": 0.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["payload"][0]["field"], "latitude");
}

#[tokio::test]
async fn branch_spawns_fill_to_capacity() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/branches/zocalo/spawns", None).await;
    assert_eq!(status, StatusCode::OK);
    let spawns = body["payload"].as_array().unwrap().clone();
    assert_eq!(spawns.len(), 3);
    assert!(spawns.iter().all(|s| s["branchId"] == "zocalo"));
    assert!(spawns.iter().all(|s| ["coyote", "roadrunner", "axolotl", "heron", "deer", "owl"]
        .contains(&s["speciesId"].as_str().unwrap())));

    // A second read returns the same live pool.
    let (_, again) = call(&app, Method::GET, "/api/branches/zocalo/spawns", None).await;
    let mut first: Vec<_> = spawns.iter().map(|s| s["id"].clone()).collect();
    let mut second: Vec<_> = again["payload"].as_array().unwrap().iter().map(|s| s["id"].clone()).collect();
    first.sort_by_key(ToString::to_string);
    second.sort_by_key(ToString::to_string);
    assert_eq!(first, second);

    let (status, body) = call(&app, Method::GET, "/api/branches/atlantis/spawns", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"status": "fail", "payload": [{"message": "Branch not found"}]}));
}

#[tokio::test]
async fn claim_list_and_release() {
    let app = app().await;

    let (_, spawns) = call(&app, Method::GET, "/api/branches/coyoacan/spawns", None).await;
    let spawn_id = spawns["payload"][0]["id"].as_str().unwrap().to_owned();

    let (status, claimed) =
        call(&app, Method::POST, "/api/bag/claim", Some(json!({"player": "p1", "animalBranch": spawn_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["payload"]["spawnId"], spawn_id.as_str());
    assert_eq!(claimed["payload"]["delivered"], false);
    let entry_id = claimed["payload"]["id"].as_str().unwrap().to_owned();

    let (status, body) =
        call(&app, Method::POST, "/api/bag/claim", Some(json!({"player": "p2", "spawnInstanceId": spawn_id}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["payload"][0]["message"], "Spawn already claimed");

    let (status, bag) = call(&app, Method::POST, "/api/bag", Some(json!({"player": "p1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let views = bag["payload"].as_array().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["id"], entry_id.as_str());
    assert_eq!(views[0]["branch"]["id"], "coyoacan");
    assert_eq!(views[0]["habitat"]["id"], "forest");

    let uri = format!("/api/bag/{entry_id}/release");
    let (status, released) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["payload"]["delivered"], true);

    let (status, again) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["payload"], released["payload"]);

    let (status, _) = call(&app, Method::POST, "/api/bag/missing/release", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn legacy_paths_reach_the_same_handlers() {
    let app = app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/branches-nearby",
        Some(json!({"lat": 19.4326, "long": -99.1332, "maxDistance": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"][0]["id"], "zocalo");

    let (status, spawns) = call(&app, Method::GET, "/api/branches/xochimilco/animals", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, current) = call(&app, Method::GET, "/api/branches/xochimilco/spawns", None).await;
    assert_eq!(spawns["payload"].as_array().map(Vec::len), current["payload"].as_array().map(Vec::len));

    let spawn_id = spawns["payload"][0]["id"].as_str().unwrap().to_owned();
    let (status, claimed) =
        call(&app, Method::POST, "/api/bag/add-animal", Some(json!({"player": "p1", "animalBranch": spawn_id}))).await;
    assert_eq!(status, StatusCode::OK);
    let entry_id = claimed["payload"]["id"].as_str().unwrap().to_owned();

    let (status, released) = call(&app, Method::POST, &format!("/api/animal-release/{entry_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["payload"]["delivered"], true);

    let (status, body) = call(&app, Method::GET, "/api/branches/atlantis/animals", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn claim_validates_and_rejects_unknown_spawns() {
    let app = app().await;

    let (status, body) = call(&app, Method::POST, "/api/bag/claim", Some(json!({"spawnInstanceId": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["payload"][0]["field"], "player");

    let (status, body) =
        call(&app, Method::POST, "/api/bag/claim", Some(json!({"player": "p1", "spawnInstanceId": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["payload"][0]["message"], "Spawn not found");

    let (status, body) = call(&app, Method::POST, "/api/bag", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["payload"][0]["field"], "player");
}

#[tokio::test]
async fn malformed_json_uses_fail_envelope() {
    let app = app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/bag")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn signup_and_login() {
    let app = app().await;
    let signup = json!({
        "firstName": "Ana",
        "lastName": "Lopez",
        "email": "ana@example.com",
        "password": "s3cret-pass",
    });

    let (status, body) = call(&app, Method::POST, "/api/players/signup", Some(signup.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"]["email"], "ana@example.com");
    assert!(body["payload"].get("passwordHash").is_none());

    let (status, _) = call(&app, Method::POST, "/api/players/signup", Some(signup)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/players/login",
        Some(json!({"email": "ana@example.com", "password": "s3cret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"]["firstName"], "Ana");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/players/login",
        Some(json!({"email": "ana@example.com", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn docs_are_served() {
    let app = app().await;
    let request = Request::builder().uri("/api").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
