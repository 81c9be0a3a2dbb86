//! Import submission and polling endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthenticatedUser;
use crate::queue::{GenerateEmbeddingPayload, ProcessRecipePayload, TaskKind, TaskSubmitter};
use crate::store::dao::ImportStore;
use crate::store::models::{ImportJob, NewImportJob};

#[derive(Debug, Deserialize)]
pub(crate) struct ImportRecipeRequest {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportRecipeResponse {
    job_id: Uuid,
    url: String,
}

pub(crate) async fn import_recipe(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(request): Json<ImportRecipeRequest>,
) -> Result<(StatusCode, Json<ImportRecipeResponse>), (StatusCode, String)> {
    if request.url.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "URL is required".to_string()));
    }

    let job_id = Uuid::new_v4();
    state
        .store()
        .create_import_job(NewImportJob {
            id: job_id,
            user_id,
            url: request.url.clone(),
        })
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "failed to create import job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create import job".to_string(),
            )
        })?;

    let payload = ProcessRecipePayload {
        job_id,
        url: request.url.clone(),
        user_id,
    };
    state
        .queue()
        .submit(
            TaskKind::ProcessRecipe,
            serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
        )
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "failed to enqueue import task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to enqueue task".to_string(),
            )
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ImportRecipeResponse {
            job_id,
            url: request.url,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobStatusQuery {
    #[serde(default)]
    job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JobStatusResponse {
    id: Uuid,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<ImportJob> for JobStatusResponse {
    fn from(job: ImportJob) -> Self {
        Self {
            id: job.id,
            status: job.status.as_str(),
            progress_step: job.progress_step,
            error: job.error,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

pub(crate) async fn job_status(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Query(query): Query<JobStatusQuery>,
) -> Result<Json<JobStatusResponse>, (StatusCode, String)> {
    let job_id = query
        .job_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "job_id is required".to_string()))?;
    let job_id = Uuid::parse_str(job_id)
        .map_err(|_| (StatusCode::BAD_REQUEST, "job_id is invalid".to_string()))?;

    let job = state
        .store()
        .get_import_job(job_id)
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "failed to load import job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load job".to_string(),
            )
        })?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;

    if job.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
    }

    Ok(Json(job.into()))
}

#[derive(Debug, Serialize)]
pub(crate) struct UserImportStatusResponse {
    jobs: Vec<JobStatusResponse>,
}

pub(crate) async fn user_import_status(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<UserImportStatusResponse>, (StatusCode, String)> {
    let jobs = state
        .store()
        .get_import_jobs_by_user(user_id)
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "failed to list import jobs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch jobs".to_string(),
            )
        })?;

    Ok(Json(UserImportStatusResponse {
        jobs: jobs.into_iter().map(JobStatusResponse::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateEmbeddingRequest {
    #[serde(default)]
    recipe_id: String,
}

pub(crate) async fn generate_embedding(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(_user_id)): Extension<AuthenticatedUser>,
    Json(request): Json<GenerateEmbeddingRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if request.recipe_id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "recipe_id is required".to_string()));
    }
    let recipe_id = Uuid::parse_str(&request.recipe_id)
        .map_err(|_| (StatusCode::BAD_REQUEST, "recipe_id is invalid".to_string()))?;

    let payload = GenerateEmbeddingPayload { recipe_id };
    state
        .queue()
        .submit(
            TaskKind::GenerateEmbedding,
            serde_json::to_value(&payload).unwrap_or_else(|_| json!({})),
        )
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "failed to enqueue embedding task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to enqueue task".to_string(),
            )
        })?;

    Ok(Json(json!({"status": "queued"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    use crate::app::AppState;
    use crate::auth::AuthConfig;
    use crate::observability::Telemetry;
    use crate::queue::TaskSubmitter;
    use crate::store::dao::mock::RecordingStore;

    struct RecordingSubmitter {
        submitted: Mutex<Vec<(TaskKind, serde_json::Value)>>,
    }

    #[async_trait]
    impl TaskSubmitter for RecordingSubmitter {
        async fn submit(&self, kind: TaskKind, payload: serde_json::Value) -> anyhow::Result<Uuid> {
            self.submitted.lock().unwrap().push((kind, payload));
            Ok(Uuid::new_v4())
        }
    }

    struct TestApp {
        store: Arc<RecordingStore>,
        submitter: Arc<RecordingSubmitter>,
        router: axum::Router,
        secret: String,
        issuer: String,
    }

    fn test_app() -> TestApp {
        let store = Arc::new(RecordingStore::new());
        let submitter = Arc::new(RecordingSubmitter {
            submitted: Mutex::new(Vec::new()),
        });
        let secret = "test-secret".to_string();
        let issuer = "https://project.supabase.co/auth/v1".to_string();

        let state = AppState::for_parts(
            store.clone(),
            submitter.clone(),
            AuthConfig {
                jwt_secret: secret.clone(),
                issuer: issuer.clone(),
            },
            Telemetry::new().expect("telemetry builds"),
        );

        TestApp {
            store,
            submitter,
            router: crate::api::router(state),
            secret,
            issuer,
        }
    }

    fn token_for(app: &TestApp, user_id: Uuid) -> String {
        encode(
            &Header::default(),
            &serde_json::json!({
                "sub": user_id.to_string(),
                "iss": app.issuer,
                "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
            }),
            &EncodingKey::from_secret(app.secret.as_bytes()),
        )
        .expect("token signs")
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = test_app();
        let response = app
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn import_without_token_is_unauthorized() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/recipe",
                None,
                serde_json::json!({"url": "https://www.instagram.com/p/C_abc/"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn import_creates_a_job_and_enqueues_a_task() {
        let app = test_app();
        let user_id = Uuid::new_v4();
        let token = token_for(&app, user_id);

        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/recipe",
                Some(&token),
                serde_json::json!({"url": "https://www.instagram.com/p/C_abc/"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), 202);

        let state = app.store.state.lock().unwrap();
        assert_eq!(state.jobs.len(), 1);
        let job = state.jobs.values().next().unwrap();
        assert_eq!(job.user_id, user_id);

        let submitted = app.submitter.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, TaskKind::ProcessRecipe);
        assert_eq!(
            submitted[0].1["url"],
            serde_json::json!("https://www.instagram.com/p/C_abc/")
        );
    }

    #[tokio::test]
    async fn empty_url_is_a_bad_request() {
        let app = test_app();
        let token = token_for(&app, Uuid::new_v4());

        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/recipe",
                Some(&token),
                serde_json::json!({"url": ""}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert!(app.submitter.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn job_status_hides_other_users_jobs() {
        let app = test_app();
        let owner = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        app.store
            .seed_job(job_id, owner, "https://www.instagram.com/p/C_abc/");

        let stranger_token = token_for(&app, Uuid::new_v4());
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/recipe-status?job_id={job_id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {stranger_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        let owner_token = token_for(&app, owner);
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/recipe-status?job_id={job_id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {owner_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn missing_job_id_is_a_bad_request_and_unknown_is_not_found() {
        let app = test_app();
        let token = token_for(&app, Uuid::new_v4());

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/recipe-status")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/recipe-status?job_id={}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn generate_embedding_enqueues_a_task() {
        let app = test_app();
        let token = token_for(&app, Uuid::new_v4());
        let recipe_id = Uuid::new_v4();

        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/generate-embedding",
                Some(&token),
                serde_json::json!({"recipe_id": recipe_id.to_string()}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let submitted = app.submitter.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, TaskKind::GenerateEmbedding);
    }
}
