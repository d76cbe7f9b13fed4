use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use libris_app::modules;
use libris_kernel::settings::{Settings, StoreBackend};
use libris_kernel::ModuleRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let mut settings = Settings::default();
    settings.database.backend = StoreBackend::Memory;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings, None);
    libris_http::build_router(&registry, &settings)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_book(body: Value) -> Request<Body> {
    Request::post("/api/books")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn added_book_can_be_fetched() {
    let app = app();

    let (status, created) = send(
        &app,
        post_book(json!({
            "title": "Guards! Guards!",
            "publicationYear": 1989,
            "publisher": { "name": "Victor Gollancz" },
            "location": { "type": "shelf", "value": "F-12" },
            "authors": [{ "firstName": "Terry", "lastName": "Pratchett" }],
            "tags": [{ "name": "watch" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["location"]["type"], "shelf");
    assert!(created["authors"][0]["id"].is_string());

    let (status, fetched) = send(&app, get(&format!("/api/books/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn second_book_reuses_known_publisher_and_author() {
    let app = app();
    let book = |title: &str| {
        json!({
            "title": title,
            "publisher": { "name": "Victor Gollancz" },
            "authors": [{ "firstName": "Terry", "lastName": "Pratchett" }]
        })
    };

    let (_, first) = send(&app, post_book(book("Mort"))).await;
    let (status, second) = send(&app, post_book(book("Reaper Man"))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["publisher"], first["publisher"]);
    assert_eq!(second["authors"], first["authors"]);
}

#[tokio::test]
async fn unnamed_publishers_are_never_merged() {
    let app = app();
    let book = |title: &str| json!({ "title": title, "publisher": { "name": "" } });

    let (status, first) = send(&app, post_book(book("Strata"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = send(&app, post_book(book("The Dark Side of the Sun"))).await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(second["publisher"]["name"], "");
    assert_ne!(second["publisher"]["id"], first["publisher"]["id"]);
}

#[tokio::test]
async fn missing_book_is_not_found() {
    let app = app();

    let (status, body) = send(&app, get("/api/books/0192a7a4-5b8e-7c3d-9f00-000000000000")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let app = app();

    let (status, body) = send(&app, post_book(json!({ "title": "   " }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"][0]["field"], "title");

    let (_, count) = send(&app, get("/api/books/count")).await;
    assert_eq!(count, json!({ "count": 0 }));
}

#[tokio::test]
async fn unknown_author_id_is_a_bad_request() {
    let app = app();

    let (status, _) = send(
        &app,
        post_book(json!({
            "title": "Thud!",
            "authors": [{
                "id": "0192a7a4-5b8e-7c3d-9f00-000000000001",
                "firstName": "Nobody",
                "lastName": "Known"
            }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn removed_book_is_gone() {
    let app = app();
    let (_, created) = send(&app, post_book(json!({ "title": "Eric" }))).await;
    let uri = format!("/api/books/{}", created["id"].as_str().unwrap());

    let (status, _) = send(&app, Request::delete(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Removing again is a no-op.
    let (status, _) = send(&app, Request::delete(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn listing_pages_in_title_order() {
    let app = app();
    for title in ["Sourcery", "Mort", "Pyramids", "Eric", "Jingo"] {
        send(&app, post_book(json!({ "title": title }))).await;
    }

    let titles = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|book| book["title"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, body) = send(&app, get("/api/books")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["Eric", "Jingo", "Mort", "Pyramids", "Sourcery"]);

    let (_, body) = send(&app, get("/api/books?resultsPerPage=2&offset=1&orderBy=desc")).await;
    assert_eq!(titles(&body), ["Pyramids", "Mort"]);

    let (_, count) = send(&app, get("/api/books/count")).await;
    assert_eq!(count, json!({ "count": 5 }));
}

#[tokio::test]
async fn zero_page_size_is_rejected() {
    let app = app();

    let (status, _) = send(&app, get("/api/books?resultsPerPage=0")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn openapi_lists_book_routes() {
    let app = app();

    let (status, doc) = send(&app, get("/docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/books"]["post"].is_object());
    assert!(doc["paths"]["/api/books/{id}"]["delete"].is_object());
    assert!(doc["paths"]["/api/books/count"]["get"].is_object());
}
