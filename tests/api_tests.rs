//! HTTP-level tests driving the full router against an in-memory database.

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use showcase::config::Config;
use showcase::db::Database;
use showcase::{AppState, build_app};

async fn test_app() -> Router {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_SECRET", "integration-secret"),
        ("BCRYPT_COST", "4"),
        ("STATIC_DIR", "./does-not-exist"),
        ("RECOMMENDATION_SEED", "7"),
    ]);
    let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    let db = Database::connect_in_memory().await.unwrap();
    db.seed().await.unwrap();
    build_app(AppState::new(config, db))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, json)
}

async fn register(app: &Router, username: &str) -> (String, Value) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (body["accessToken"].as_str().unwrap().to_string(), body)
}

async fn show_id(app: &Router, title: &str) -> String {
    let (_, body) = send(
        app,
        "GET",
        &format!("/api/shows/search?q={}", title.replace(' ', "%20")),
        None,
        None,
    )
    .await;
    body[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoints() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn list_shows_paginates() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/shows?page=2&pageSize=5", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pageSize"], 5);
    let total = body["totalCount"].as_u64().unwrap();
    assert_eq!(body["totalPages"].as_u64().unwrap(), total.div_ceil(5));
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn page_past_the_end_is_empty_with_totals() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/shows?page=50&pageSize=10", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert!(body["totalCount"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn list_shows_filters_and_sorts() {
    let app = test_app().await;
    let (_, body) = send(
        &app,
        "GET",
        "/api/shows?genre=comedy&type=animation&sortBy=rating&sortOrder=desc",
        None,
        None,
    )
    .await;

    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["BoJack Horseman", "Archer"]);

    let (status, body) = send(&app, "GET", "/api/shows?minRating=high", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn show_detail_and_related_lists() {
    let app = test_app().await;
    let id = show_id(&app, "Breaking Bad").await;

    let (status, detail) = send(&app, "GET", &format!("/api/shows/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["seasonCount"], 2);
    assert_eq!(detail["featuredCast"].as_array().unwrap().len(), 2);

    let (_, episodes) = send(&app, "GET", &format!("/api/shows/{}/episodes", id), None, None).await;
    assert_eq!(episodes[0]["title"], "Pilot");

    let (_, cast) = send(&app, "GET", &format!("/api/shows/{}/cast", id), None, None).await;
    assert_eq!(cast.as_array().unwrap().len(), 4);

    let (_, genres) = send(&app, "GET", "/api/genres", None, None).await;
    assert!(genres.as_array().unwrap().contains(&json!("Drama")));

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/shows/{}", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, "GET", "/api/shows/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_as_you_type() {
    let app = test_app().await;
    let (_, body) = send(&app, "GET", "/api/shows/search?q=the", None, None).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles[0], "The Great British Bake Off");
    assert!(titles.contains(&"The Office"));

    let (_, body) = send(&app, "GET", "/api/shows/search?q=", None, None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn auth_flow() {
    let app = test_app().await;
    let (token, body) = register(&app, "walter").await;
    assert_eq!(body["user"]["role"], "admin");

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "walter");

    let (status, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "walter@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let refresh = login["refreshToken"].as_str().unwrap();
    let (status, rotated) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(rotated["accessToken"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_validation_and_conflicts() {
    let app = test_app().await;
    register(&app, "walter").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "Walter", "email": "new@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "x", "email": "x@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "jesse" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn catalog_mutations_require_admin() {
    let app = test_app().await;
    let (admin, _) = register(&app, "walter").await;
    let (member, _) = register(&app, "jesse").await;
    let new_show = json!({ "title": "Halt and Catch Fire", "genres": ["Drama"], "rating": 8.4 });

    let (status, _) = send(&app, "POST", "/api/shows", None, Some(new_show.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/shows", Some(&member), Some(new_show.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&app, "POST", "/api/shows", Some(&admin), Some(new_show)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/shows/{}", id),
        Some(&admin),
        Some(json!({ "status": "Ended" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Ended");
    assert_eq!(updated["title"], "Halt and Catch Fire");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/shows/{}/episodes", id),
        Some(&admin),
        Some(json!({ "season": 1, "number": 1, "title": "I/O" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, actor) = send(
        &app,
        "POST",
        "/api/actors",
        Some(&admin),
        Some(json!({ "name": "Lee Pace", "country": "United States" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let actor_id = actor["id"].as_str().unwrap();

    let (status, cast) = send(
        &app,
        "PUT",
        &format!("/api/shows/{}/cast/{}", id, actor_id),
        Some(&admin),
        Some(json!({ "character": "Joe MacMillan", "featured": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cast[0]["character"], "Joe MacMillan");

    let (_, credits) = send(&app, "GET", &format!("/api/actors/{}", actor_id), None, None).await;
    assert_eq!(credits["credits"][0]["title"], "Halt and Catch Fire");

    let (status, _) = send(&app, "DELETE", &format!("/api/shows/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/shows/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn actors_list() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        "GET",
        "/api/actors?country=united%20kingdom&sortBy=birthday&sortOrder=desc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Emily Watson", "Jared Harris", "David Attenborough"]);
}

#[tokio::test]
async fn favorites_and_recommendations() {
    let app = test_app().await;
    let (token, _) = register(&app, "marie").await;
    let bb = show_id(&app, "Breaking Bad").await;
    let bcs = show_id(&app, "Better Call Saul").await;

    for id in [&bb, &bb, &bcs] {
        let (status, _) = send(&app, "PUT", &format!("/api/favorites/{}", id), Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/favorites/{}", uuid::Uuid::new_v4()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = send(&app, "GET", "/api/favorites?pageSize=1", Some(&token), None).await;
    assert_eq!(page["totalCount"], 2);
    assert_eq!(page["items"][0]["title"], "Better Call Saul");

    let (_, ids) = send(&app, "GET", "/api/favorites/ids", Some(&token), None).await;
    assert_eq!(ids, json!([bcs, bb]));

    let (status, recs) = send(&app, "GET", "/api/recommendations?count=3", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let recs = recs.as_array().unwrap();
    assert_eq!(recs.len(), 3);
    for rec in recs {
        assert_ne!(rec["id"], json!(bb));
        assert_ne!(rec["id"], json!(bcs));
        assert!(rec["reason"].is_string());
    }

    let (status, _) = send(&app, "DELETE", &format!("/api/favorites/{}", bb), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/favorites/{}", bb), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/recommendations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_export_and_anonymize() {
    let app = test_app().await;
    let (token, _) = register(&app, "hank").await;
    let id = show_id(&app, "Chernobyl").await;
    send(&app, "PUT", &format!("/api/favorites/{}", id), Some(&token), None).await;

    let request = Request::builder()
        .uri("/api/account/favorites.csv")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("title,type,genres,rating,premiered,favorited_at"));
    assert!(lines.next().unwrap().starts_with("Chernobyl,Scripted,Drama|History|Thriller,9.1,2019-05-06,"));

    let (status, export) = send(&app, "GET", "/api/account/export", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["profile"]["email"], "hank@example.com");
    assert_eq!(export["favorites"][0]["title"], "Chernobyl");
    assert!(export["profile"].get("passwordHash").is_none());

    let (status, _) = send(&app, "DELETE", "/api/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "hank", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The username is free again
    register(&app, "hank").await;
}
