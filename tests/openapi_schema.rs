use serde_json::Value;

fn schema_properties<'a>(doc: &'a Value, name: &str) -> &'a serde_json::Map<String, Value> {
    doc.get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.get(name))
        .and_then(|t| t.get("properties"))
        .and_then(Value::as_object)
        .unwrap_or_else(|| panic!("components.schemas.{name}.properties must exist"))
}

#[test]
fn openapi_documents_child_entity_fields() -> anyhow::Result<()> {
    // Build the OpenAPI document the same way the server does
    let doc = project_hub::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let task = schema_properties(&v, "Task");
    for key in ["project_id", "start_date", "end_date", "status", "assignees"] {
        assert!(task.contains_key(key), "OpenAPI Task schema missing '{}'", key);
    }

    let budget = schema_properties(&v, "Budget");
    assert!(budget.contains_key("year"));
    assert!(budget.contains_key("amount"));
    assert!(!budget.contains_key("amount_cents"), "storage detail leaked into the schema");

    let membership = schema_properties(&v, "Membership");
    for key in ["project_id", "user_id", "role", "date_added"] {
        assert!(membership.contains_key(key), "OpenAPI Membership schema missing '{}'", key);
    }

    Ok(())
}

#[test]
fn openapi_lists_every_project_scoped_route() -> anyhow::Result<()> {
    let doc = project_hub::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;
    let paths = v.get("paths").and_then(Value::as_object).expect("paths must exist");

    for path in [
        "/projects",
        "/projects/{project_id}",
        "/projects/{project_id}/members",
        "/projects/{project_id}/members/{user_id}",
        "/projects/{project_id}/tasks",
        "/projects/{project_id}/budgets/{id}",
        "/projects/{project_id}/risks",
        "/projects/{project_id}/results/{id}",
    ] {
        assert!(paths.contains_key(path), "missing path {path}");
    }

    let schemes = v
        .pointer("/components/securitySchemes/bearerAuth/scheme")
        .and_then(Value::as_str);
    assert_eq!(schemes, Some("bearer"));

    Ok(())
}
