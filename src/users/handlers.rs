use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{Method, Uri},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    error::UserError,
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{CreateUserRequest, HealthResponse, LoginRequest, SearchParams, UpdateUserRequest},
        repo_types::PublicUser,
        services,
        validation::{parse_user_id, validate_create, validate_login, validate_update},
    },
};

/// Wrong methods on a known path get the same 404 envelope as unknown paths.
pub fn user_routes() -> Router<AppState> {
    let by_id = || {
        get(get_user)
            .put(update_user)
            .delete(delete_user)
            .fallback(route_not_found)
    };
    let search = || get(search_users).fallback(route_not_found);

    Router::new()
        .route(
            "/users",
            get(list_users).post(create_user).fallback(route_not_found),
        )
        .route("/users/search", search())
        .route("/search", search())
        .route("/users/:id", by_id())
        .route("/user/:id", by_id())
}

pub fn login_routes() -> Router<AppState> {
    let login_route = || post(login).fallback(route_not_found);
    Router::new()
        .route("/login", login_route())
        .route("/users/login", login_route())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "User Management System",
        status: "healthy",
        timestamp: OffsetDateTime::now_utc(),
    })
}

pub async fn route_not_found(method: Method, uri: Uri) -> UserError {
    UserError::NotFound(format!("Route {} {} not found", method, uri))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<PublicUser>>, UserError> {
    let users = services::list_users(&state.db).await?;
    let count = users.len();
    Ok(ApiResponse::ok(users).with_count(count))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<PublicUser>, UserError> {
    let id = parse_user_id(&id)?;
    let user = services::get_user(&state.db, id).await?;
    Ok(ApiResponse::ok(user))
}

#[instrument(skip(state, params))]
pub async fn search_users(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<PublicUser>>, UserError> {
    let Query(params) = params?;
    let result = services::search_users(&state.db, params.name.as_deref().unwrap_or("")).await?;
    Ok(ApiResponse::ok(result.users)
        .with_count(result.count)
        .with_search_term(result.term))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<PublicUser>, UserError> {
    let Json(payload) = payload?;
    let new_user = validate_create(payload)?;
    let user = services::create_user(&state.db, new_user).await?;
    Ok(ApiResponse::created(user).with_message("User created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, UserError> {
    let id = parse_user_id(&id)?;
    let Json(payload) = payload?;
    let patch = validate_update(payload)?;
    services::update_user(&state.db, id, patch).await?;
    Ok(ApiResponse::message("User updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, UserError> {
    let id = parse_user_id(&id)?;
    services::delete_user(&state.db, id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<PublicUser>, UserError> {
    let Json(payload) = payload?;
    let (email, password) = validate_login(payload)?;
    let user = services::authenticate(&state.db, &email, &password).await?;
    Ok(ApiResponse::ok(user).with_message("Login successful"))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, db::test_pool, state::AppState};

    async fn app() -> axum::Router {
        build_app(AppState::for_tests(test_pool().await))
    }

    async fn call(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
            None => Body::empty(),
        };
        let res = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create(app: &axum::Router, name: &str, email: &str, password: &str) -> i64 {
        let (s, body) = call(
            app,
            "POST",
            "/users",
            Some(json!({"name": name, "email": email, "password": password})),
        )
        .await;
        assert_eq!(s, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let app = app().await;
        let (s, body) = call(&app, "GET", "/", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn create_then_get_hides_password() {
        let app = app().await;
        let id = create(&app, "Ann", "ann@x.com", "secret1").await;

        let (s, body) = call(&app, "GET", &format!("/users/{id}"), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Ann");
        assert_eq!(body["data"]["email"], "ann@x.com");
        assert!(body["data"].get("password_hash").is_none());
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn create_validation_failure_lists_fields() {
        let app = app().await;
        let (s, body) = call(
            &app,
            "POST",
            "/users",
            Some(json!({"name": "", "email": "nope", "password": "123"})),
        )
        .await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Validation Failed");
        assert_eq!(body["details"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn malformed_json_gets_envelope() {
        let app = app().await;
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Bad Request");
    }

    #[tokio::test]
    async fn duplicate_email_is_409() {
        let app = app().await;
        create(&app, "Ann", "ann@x.com", "secret1").await;
        let (s, body) = call(
            &app,
            "POST",
            "/users",
            Some(json!({"name": "Other", "email": "ann@x.com", "password": "secret2"})),
        )
        .await;
        assert_eq!(s, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");

        let (_, list) = call(&app, "GET", "/users", None).await;
        assert_eq!(list["count"], 1);
    }

    #[tokio::test]
    async fn bad_and_unknown_ids() {
        let app = app().await;
        let (s, body) = call(&app, "GET", "/users/abc", None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User ID must be a positive integer");

        let (s, body) = call(&app, "GET", "/users/0", None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST, "{body}");

        let (s, body) = call(&app, "GET", "/users/99", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No user found with ID 99");
    }

    #[tokio::test]
    async fn update_and_delete_flow() {
        let app = app().await;
        let id = create(&app, "Ann", "ann@x.com", "secret1").await;

        let (s, _) = call(&app, "PUT", &format!("/users/{id}"), Some(json!({}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);

        let (s, body) = call(
            &app,
            "PUT",
            &format!("/users/{id}"),
            Some(json!({"name": "Annie"})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["message"], "User updated successfully");

        let (_, body) = call(&app, "GET", &format!("/users/{id}"), None).await;
        assert_eq!(body["data"]["name"], "Annie");
        assert_eq!(body["data"]["email"], "ann@x.com");

        let (s, _) = call(&app, "DELETE", &format!("/users/{id}"), None).await;
        assert_eq!(s, StatusCode::OK);
        let (s, _) = call(&app, "GET", &format!("/users/{id}"), None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        let (s, _) = call(&app, "DELETE", &format!("/users/{id}"), None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_returns_matches_and_count() {
        let app = app().await;
        create(&app, "John Doe", "john@example.com", "password123").await;
        create(&app, "Jane Smith", "jane@example.com", "secret456").await;
        create(&app, "Bob Johnson", "bob@example.com", "qwerty789").await;

        let (s, body) = call(&app, "GET", "/users/search?name=jo", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["searchTerm"], "jo");

        let (s, body) = call(&app, "GET", "/users/search?q=SMITH", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "Jane Smith");

        let (s, _) = call(&app, "GET", "/users/search?name=j", None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        let (s, _) = call(&app, "GET", "/users/search", None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_scenario() {
        let app = app().await;
        let id = create(&app, "Ann", "ann@x.com", "secret1").await;

        let (s, body) = call(
            &app,
            "POST",
            "/login",
            Some(json!({"email": "ann@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["data"]["id"], id);
        assert!(body["data"].get("password_hash").is_none());

        let (s, wrong) = call(
            &app,
            "POST",
            "/login",
            Some(json!({"email": "ann@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);

        let (s, unknown) = call(
            &app,
            "POST",
            "/users/login",
            Some(json!({"email": "ghost@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);

        let (s, _) = call(
            &app,
            "PUT",
            &format!("/users/{id}"),
            Some(json!({"email": "ann2@x.com"})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);

        let (s, _) = call(
            &app,
            "POST",
            "/login",
            Some(json!({"email": "ann@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(s, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_method_on_known_path_is_enveloped_404() {
        let app = app().await;
        for (method, uri) in [
            ("PATCH", "/users/1"),
            ("GET", "/users/login"),
            ("DELETE", "/users"),
            ("POST", "/users/search"),
            ("GET", "/login"),
        ] {
            let (s, body) = call(&app, method, uri, None).await;
            assert_eq!(s, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(body["success"], false, "{method} {uri}");
            assert_eq!(body["message"], format!("Route {method} {uri} not found"));
        }
    }

    #[tokio::test]
    async fn singular_user_path_and_bare_search_are_served() {
        let app = app().await;
        let id = create(&app, "John Doe", "john@example.com", "password123").await;

        let (s, body) = call(&app, "GET", &format!("/user/{id}"), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["data"]["name"], "John Doe");

        let (s, _) = call(
            &app,
            "PUT",
            &format!("/user/{id}"),
            Some(json!({"name": "Johnny"})),
        )
        .await;
        assert_eq!(s, StatusCode::OK);

        let (s, body) = call(&app, "GET", "/search?name=john", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["name"], "Johnny");

        let (s, _) = call(&app, "DELETE", &format!("/user/{id}"), None).await;
        assert_eq!(s, StatusCode::OK);
        let (s, _) = call(&app, "GET", &format!("/users/{id}"), None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_enveloped_404() {
        let app = app().await;
        let (s, body) = call(&app, "GET", "/nowhere", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route GET /nowhere not found");
    }
}
