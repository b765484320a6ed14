use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{DefaultPolicyEvaluator, ProjectAccess, SqliteMembershipResolver};
use crate::errors::AppError;
use crate::gateway::ProjectResource;
use crate::jwt::JwtConfig;
use crate::models::budget::Budget;
use crate::models::result::ProjectResult;
use crate::models::risk::Risk;
use crate::models::task::Task;
use crate::routes::{auth, health, memberships, projects, resources};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub access: ProjectAccess,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        let access = ProjectAccess::new(
            Arc::new(SqliteMembershipResolver::new(pool.clone())),
            Arc::new(DefaultPolicyEvaluator::new()),
        );

        Self {
            pool,
            jwt: Arc::new(jwt),
            access,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    Ok(router(AppState::new(pool, jwt_config)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:project_id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        );

    let member_routes = Router::new()
        .route("/", get(memberships::list_members).post(memberships::add_member))
        .route(
            "/:user_id",
            get(memberships::get_member)
                .put(memberships::update_member)
                .delete(memberships::remove_member),
        );

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/projects", project_routes)
        .nest("/projects/:project_id/members", member_routes)
        .nest(&collection_path::<Task>(), resources::routes::<Task>())
        .nest(&collection_path::<Budget>(), resources::routes::<Budget>())
        .nest(&collection_path::<Risk>(), resources::routes::<Risk>())
        .nest(&collection_path::<ProjectResult>(), resources::routes::<ProjectResult>())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn collection_path<R: ProjectResource>() -> String {
    format!("/projects/:project_id/{}", R::KIND.collection())
}
