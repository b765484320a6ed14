#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

use project_hub::app::{router, AppState};
use project_hub::jwt::JwtConfig;
use project_hub::models::user::AccountFlags;

const SECRET: &str = "test-secret";

pub const LEADER: AccountFlags = AccountFlags {
    is_manager: false,
    is_leader: true,
    is_participant: false,
};

pub const PARTICIPANT: AccountFlags = AccountFlags {
    is_manager: false,
    is_leader: false,
    is_participant: true,
};

pub const MANAGER: AccountFlags = AccountFlags {
    is_manager: true,
    is_leader: false,
    is_participant: false,
};

pub const NOBODY: AccountFlags = AccountFlags {
    is_manager: false,
    is_leader: false,
    is_participant: false,
};

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    jwt: JwtConfig,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let opts = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;

        let migrator =
            sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
        migrator.run(&pool).await?;

        let jwt = JwtConfig::new(SECRET, 24);
        let app = router(AppState::new(pool.clone(), jwt.clone()));

        Ok(Self {
            app,
            pool,
            jwt,
            _dir: dir,
        })
    }

    /// Inserts a user directly with the given flags; password hashing is
    /// skipped since these users never log in.
    pub async fn user(&self, name: &str, flags: AccountFlags) -> Result<TestUser> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, is_manager, is_leader, is_participant, created_at, updated_at) \
             VALUES (?, ?, ?, 'unused', ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(format!("{}@example.com", name.to_lowercase()))
        .bind(flags.is_manager)
        .bind(flags.is_leader)
        .bind(flags.is_participant)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(TestUser {
            id,
            token: self.jwt.encode(id)?,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Creates a project as `leader` and returns its id.
    pub async fn project(&self, leader: &TestUser, name: &str) -> Result<Uuid> {
        let (status, body) = self
            .post("/projects", leader, serde_json::json!({ "name": name }))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "project create failed: {body}");
        id_of(&body)
    }

    pub async fn add_member(&self, project_id: Uuid, leader: &TestUser, member: &TestUser, role: &str) -> Result<()> {
        let (status, body) = self
            .post(
                &format!("/projects/{project_id}/members"),
                leader,
                serde_json::json!({ "user_id": member.id, "role": role }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "add member failed: {body}");
        Ok(())
    }

    pub async fn count(&self, table: &str, project_id: Uuid) -> Result<i64> {
        let sql = format!("SELECT COUNT(1) FROM {table} WHERE project_id = ?");
        Ok(sqlx::query_scalar(&sql).bind(project_id).fetch_one(&self.pool).await?)
    }
}

pub fn id_of(body: &Value) -> Result<Uuid> {
    let raw = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("response has no id: {body}"))?;
    Ok(raw.parse()?)
}
