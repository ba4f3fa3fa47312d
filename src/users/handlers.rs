use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::AppResult,
    state::AppState,
    users::dto::{CreateUserRequest, ListParams, UpdateUserRequest, UserResponse},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/:user_id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let Json(payload) = payload?;
    let user = state.users.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let Query(p) = params?;
    let users = state.users.list(p.skip, p.limit).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = user_id?;
    let user = state.users.get_by_id(user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = user_id?;
    let Json(payload) = payload?;
    let user = state.users.update(user_id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = user_id?;
    let user = state.users.soft_delete(user_id).await?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(app: &Router, email: &str) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/users/",
            Some(json!({"email": email, "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn create_returns_201_without_password() {
        let app = build_app(AppState::fake());
        let body = create(&app, "alice@example.com").await;
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["is_active"], true);
        assert_eq!(body["is_verified"], false);
        assert!(body["user_id"].as_i64().is_some());
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_400() {
        let app = build_app(AppState::fake());
        create(&app, "alice@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"email": "alice@example.com", "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn invalid_input_is_422() {
        let app = build_app(AppState::fake());

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"email": "alice@example.com", "password": "short"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "password");

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/",
            Some(json!({"email": "nope", "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "email");

        let (status, _) = send(&app, Method::POST, "/users/", Some(json!({"email": 5}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn list_honours_skip_and_limit() {
        let app = build_app(AppState::fake());
        for email in ["alice@example.com", "bob@example.com", "charlie@example.com"] {
            create(&app, email).await;
        }

        let (status, body) = send(&app, Method::GET, "/users/?skip=0&limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let emails: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["email"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(emails, ["alice@example.com", "bob@example.com"]);

        let (_, body) = send(&app, Method::GET, "/users", None).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) = send(&app, Method::GET, "/users/?limit=abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, Method::GET, "/users/?skip=-1", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn get_unknown_is_404_and_bad_id_is_422() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, Method::GET, "/users/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");

        let (status, _) = send(&app, Method::GET, "/users/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn patch_applies_only_present_fields() {
        let app = build_app(AppState::fake());
        create(&app, "alice@example.com").await;
        let bob = create(&app, "bob@example.com").await;
        let uri = format!("/users/{}", bob["user_id"]);

        let (status, body) =
            send(&app, Method::PATCH, &uri, Some(json!({"is_verified": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_verified"], true);
        assert_eq!(body["is_active"], true);
        assert_eq!(body["email"], "bob@example.com");
        assert_eq!(body["created_at"], bob["created_at"]);

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/users/9999",
            Some(json!({"is_verified": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"password": "x"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({"email": "alice@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_is_soft() {
        let app = build_app(AppState::fake());
        let alice = create(&app, "alice@example.com").await;
        let uri = format!("/users/{}", alice["user_id"]);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);
        assert_eq!(body["email"], "alice@example.com");

        let (status, _) = send(&app, Method::DELETE, "/users/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
