use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::ResourceKind;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::logout,
		routes::health::health,
		routes::projects::list_projects,
		routes::projects::create_project,
		routes::projects::get_project,
		routes::projects::update_project,
		routes::projects::delete_project,
		routes::memberships::list_members,
		routes::memberships::add_member,
		routes::memberships::get_member,
		routes::memberships::update_member,
		routes::memberships::remove_member
	),
	components(
		schemas(
			models::user::AccountFlags,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::project::Project,
			models::project::ProjectCreateRequest,
			models::project::ProjectUpdateRequest,
			models::membership::MembershipRole,
			models::membership::Membership,
			models::membership::MembershipCreateRequest,
			models::membership::MembershipUpdateRequest,
			models::task::TaskStatus,
			models::task::Task,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::budget::Budget,
			models::budget::BudgetCreateRequest,
			models::budget::BudgetUpdateRequest,
			models::risk::Risk,
			models::risk::RiskCreateRequest,
			models::risk::RiskUpdateRequest,
			models::result::ProjectResult,
			models::result::ResultCreateRequest,
			models::result::ResultUpdateRequest,
			routes::auth::MessageResponse,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Auth", description = "Authentication endpoints"),
		(name = "Health", description = "Service health"),
		(name = "Projects", description = "Projects and their lifecycle"),
		(name = "Members", description = "Project membership and roles"),
		(name = "Tasks", description = "Project tasks"),
		(name = "Budgets", description = "Yearly project budgets"),
		(name = "Risks", description = "Project risks"),
		(name = "Results", description = "Project results")
	)
)]
pub struct ApiDoc;

/// Project-owned collections served by the generic resource handlers, which
/// cannot carry `#[utoipa::path]` themselves.
struct Collection {
	kind: ResourceKind,
	tag: &'static str,
	schema: &'static str,
	create: &'static str,
	update: &'static str,
}

const COLLECTIONS: [Collection; 4] = [
	Collection { kind: ResourceKind::Task, tag: "Tasks", schema: "Task", create: "TaskCreateRequest", update: "TaskUpdateRequest" },
	Collection { kind: ResourceKind::Budget, tag: "Budgets", schema: "Budget", create: "BudgetCreateRequest", update: "BudgetUpdateRequest" },
	Collection { kind: ResourceKind::Risk, tag: "Risks", schema: "Risk", create: "RiskCreateRequest", update: "RiskUpdateRequest" },
	Collection { kind: ResourceKind::Result, tag: "Results", schema: "ProjectResult", create: "ResultCreateRequest", update: "ResultUpdateRequest" },
];

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_collection_paths(&mut doc)?;
	normalize_path_operations(&mut doc);
	ensure_security_components(&mut doc)?;
	ensure_global_security(&mut doc)?;
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn child_object<'a>(parent: &'a mut Map<String, Value>, key: &str) -> anyhow::Result<&'a mut Map<String, Value>> {
	parent
		.entry(key)
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("`{key}` must be an object"))
}

fn ensure_collection_paths(doc: &mut Value) -> anyhow::Result<()> {
	let paths = child_object(root_object(doc)?, "paths")?;

	for collection in &COLLECTIONS {
		for (path, value) in collection_paths(collection) {
			if let Some(existing) = paths.get_mut(path.as_str()) {
				merge_values(existing, &value);
			} else {
				paths.insert(path, value);
			}
		}
	}
	Ok(())
}

fn collection_paths(collection: &Collection) -> Map<String, Value> {
	let Collection { kind, tag, schema, create, update } = collection;
	let name = kind.as_str();
	let item_ref = json!({"$ref": format!("#/components/schemas/{schema}")});
	let project_param = json!({"name": "project_id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}});
	let id_param = json!({"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}});

	let mut paths = Map::new();

	paths.insert(
		format!("/projects/{{project_id}}/{}", kind.collection()),
		json!({
			"get": {
				"tags": [tag],
				"summary": format!("List the project's {}s", name),
				"parameters": [project_param.clone()],
				"responses": {
					"200": {"description": format!("{name} list"), "content": {"application/json": {"schema": {"type": "array", "items": item_ref.clone()}}}},
					"403": {"description": "No access to this project"},
					"404": {"description": "Project not found"}
				}
			},
			"post": {
				"tags": [tag],
				"summary": format!("Create a {}", name),
				"parameters": [project_param.clone()],
				"requestBody": {"content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{create}")}}}},
				"responses": {
					"201": {"description": format!("{name} created"), "content": {"application/json": {"schema": item_ref.clone()}}},
					"400": {"description": "Invalid payload"},
					"403": {"description": "Caller is not a leader of this project"},
					"404": {"description": "Project not found"},
					"409": {"description": "Uniqueness conflict"}
				}
			}
		}),
	);

	paths.insert(
		format!("/projects/{{project_id}}/{}/{{id}}", kind.collection()),
		json!({
			"get": {
				"tags": [tag],
				"parameters": [project_param.clone(), id_param.clone()],
				"responses": {
					"200": {"description": format!("{name} detail"), "content": {"application/json": {"schema": item_ref.clone()}}},
					"403": {"description": "No access to this project"},
					"404": {"description": format!("Project or {name} not found")}
				}
			},
			"put": {
				"tags": [tag],
				"parameters": [project_param.clone(), id_param.clone()],
				"requestBody": {"content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{update}")}}}},
				"responses": {
					"200": {"description": format!("{name} updated"), "content": {"application/json": {"schema": item_ref}}},
					"400": {"description": "Invalid payload"},
					"403": {"description": "Caller is not a leader of this project"},
					"404": {"description": format!("Project or {name} not found")},
					"409": {"description": "Uniqueness conflict"}
				}
			},
			"delete": {
				"tags": [tag],
				"parameters": [project_param, id_param],
				"responses": {
					"204": {"description": format!("{name} deleted")},
					"403": {"description": "Caller is not a leader of this project"},
					"404": {"description": format!("Project or {name} not found")}
				}
			}
		}),
	);

	paths
}

fn normalize_path_operations(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		let snapshot = paths.clone();
		for (path, item) in snapshot {
			if let Some(ops) = item.as_object() {
				let mut normalized = Map::new();
				for (method, val) in ops {
					let key = method.to_lowercase();
					if let Some(existing) = normalized.get_mut(&key) {
						merge_values(existing, val);
					} else {
						normalized.insert(key, val.clone());
					}
				}
				paths.insert(path, Value::Object(normalized));
			}
		}
	}
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = child_object(root_object(doc)?, "components")?;
	let schemes = child_object(components, "securitySchemes")?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	Ok(())
}

fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

fn merge_values(target: &mut Value, addition: &Value) {
	match (target, addition) {
		(Value::Object(dest), Value::Object(src)) => {
			for (key, value) in src {
				if let Some(existing) = dest.get_mut(key) {
					merge_values(existing, value);
				} else {
					dest.insert(key.clone(), value.clone());
				}
			}
		}
		(Value::Array(dest), Value::Array(src)) => {
			for item in src {
				if !dest.contains(item) {
					dest.push(item.clone());
				}
			}
		}
		_ => {}
	}
}
