mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp, LEADER, NOBODY, PARTICIPANT};

#[tokio::test]
async fn duplicate_membership_is_a_conflict() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let bob = t.user("Bob", PARTICIPANT).await?;
    let p1 = t.project(&alice, "P1").await?;

    t.add_member(p1, &alice, &bob, "participant").await?;
    let (status, body) = t
        .post(
            &format!("/projects/{p1}/members"),
            &alice,
            json!({ "user_id": bob.id, "role": "participant" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // creator re-adding themselves collides with the leader row from creation
    let (status, _) = t
        .post(
            &format!("/projects/{p1}/members"),
            &alice,
            json!({ "user_id": alice.id, "role": "leader" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(t.count("project_memberships", p1).await?, 2);
    Ok(())
}

#[tokio::test]
async fn role_must_be_admitted_by_account_flags() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let bob = t.user("Bob", PARTICIPANT).await?;
    let eve = t.user("Eve", NOBODY).await?;
    let p1 = t.project(&alice, "P1").await?;

    let (status, body) = t
        .post(&format!("/projects/{p1}/members"), &alice, json!({ "user_id": bob.id, "role": "leader" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "role");

    let (status, _) = t
        .post(&format!("/projects/{p1}/members"), &alice, json!({ "user_id": eve.id, "role": "participant" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .post(
            &format!("/projects/{p1}/members"),
            &alice,
            json!({ "user_id": uuid::Uuid::new_v4(), "role": "participant" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t
        .post(&format!("/projects/{p1}/members"), &alice, json!({ "user_id": bob.id, "role": "owner" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    assert_eq!(t.count("project_memberships", p1).await?, 1);
    Ok(())
}

#[tokio::test]
async fn participants_cannot_manage_members() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let bob = t.user("Bob", PARTICIPANT).await?;
    let cara = t.user("Cara", PARTICIPANT).await?;
    let p1 = t.project(&alice, "P1").await?;
    t.add_member(p1, &alice, &bob, "participant").await?;

    let (status, _) = t
        .post(&format!("/projects/{p1}/members"), &bob, json!({ "user_id": cara.id, "role": "participant" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.delete(&format!("/projects/{p1}/members/{}", alice.id), &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, member) = t.get(&format!("/projects/{p1}/members/{}", bob.id), &bob).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["role"], "participant");

    Ok(())
}

#[tokio::test]
async fn last_leader_cannot_be_removed_or_demoted() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let lena = t.user("Lena", LEADER).await?;
    let p1 = t.project(&alice, "P1").await?;

    let (status, _) = t
        .put(&format!("/projects/{p1}/members/{}", alice.id), &alice, json!({ "role": "participant" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = t.delete(&format!("/projects/{p1}/members/{}", alice.id), &alice).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // with a second leader in place the first can step down
    t.add_member(p1, &alice, &lena, "leader").await?;
    let (status, member) = t
        .put(&format!("/projects/{p1}/members/{}", alice.id), &alice, json!({ "role": "participant" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["role"], "participant");

    // alice is now read-only on p1
    let (status, _) = t.put(&format!("/projects/{p1}"), &alice, json!({ "name": "Renamed" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.delete(&format!("/projects/{p1}/members/{}", alice.id), &lena).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t.get(&format!("/projects/{p1}"), &alice).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn promoting_a_participant_only_account_is_rejected() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let bob = t.user("Bob", PARTICIPANT).await?;
    let p1 = t.project(&alice, "P1").await?;
    t.add_member(p1, &alice, &bob, "participant").await?;

    let (status, body) = t
        .put(&format!("/projects/{p1}/members/{}", bob.id), &alice, json!({ "role": "leader" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "role");

    let role: String = sqlx::query_scalar("SELECT role FROM project_memberships WHERE project_id = ? AND user_id = ?")
        .bind(p1)
        .bind(bob.id)
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(role, "participant");

    Ok(())
}

#[tokio::test]
async fn unknown_membership_is_not_found() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let bob = t.user("Bob", PARTICIPANT).await?;
    let p1 = t.project(&alice, "P1").await?;

    let (status, _) = t.get(&format!("/projects/{p1}/members/{}", bob.id), &alice).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.delete(&format!("/projects/{p1}/members/{}", bob.id), &alice).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn removing_a_member_unassigns_their_tasks() -> Result<()> {
    let t = TestApp::spawn().await?;
    let alice = t.user("Alice", LEADER).await?;
    let bob = t.user("Bob", PARTICIPANT).await?;
    let p1 = t.project(&alice, "P1").await?;
    let p2 = t.project(&alice, "P2").await?;
    t.add_member(p1, &alice, &bob, "participant").await?;
    t.add_member(p2, &alice, &bob, "participant").await?;

    let (_, task) = t
        .post(&format!("/projects/{p1}/tasks"), &alice, json!({ "name": "T", "assignees": [alice.id, bob.id] }))
        .await?;
    let task_uri = format!("/projects/{p1}/tasks/{}", id_of(&task)?);
    let (_, other) = t
        .post(&format!("/projects/{p2}/tasks"), &alice, json!({ "name": "Elsewhere", "assignees": [bob.id] }))
        .await?;
    let other_uri = format!("/projects/{p2}/tasks/{}", id_of(&other)?);

    let (status, _) = t.delete(&format!("/projects/{p1}/members/{}", bob.id), &alice).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, reread) = t.get(&task_uri, &alice).await?;
    assert_eq!(reread["assignees"], json!([alice.id]));

    // unrelated edits keep working after the member is gone
    let (status, renamed) = t.put(&task_uri, &alice, json!({ "name": "Renamed" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Renamed");

    // assignments in other projects are untouched
    let (_, elsewhere) = t.get(&other_uri, &alice).await?;
    assert_eq!(elsewhere["assignees"], json!([bob.id]));

    Ok(())
}
