//! HTTP API tests against an in-process router.

mod common;

use std::path::Path;

use axum::http::{Method, StatusCode, header};
use chrono::Utc;
use git2::{Oid, Repository, Signature};
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

use common::{ADMIN_EMAIL, ADMIN_PASSWORD, TestApp};
use railgen::license::{LicenseContext, TemplateStore, TemplateVersion, render};
use railgen::server::RateLimits;
use railgen::store::Store;

fn license_body(restriction_ids: &[i64]) -> serde_json::Value {
    json!({
        "name": "my-model",
        "license": "OpenRAIL",
        "model": true,
        "sourcecode": true,
        "restriction_ids": restriction_ids,
    })
}

const OPENRAIL_TEMPLATE: &str = "templates/OpenRAIL-AMS.jinja";

/// Writes the OpenRAIL template into the work tree and commits it.
fn commit_template(repo: &Repository, root: &Path, content: &str) -> Oid {
    std::fs::create_dir_all(root.join("templates")).unwrap();
    std::fs::write(root.join(OPENRAIL_TEMPLATE), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(OPENRAIL_TEMPLATE)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, "update template", &tree, &parents)
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_login_issues_usable_token() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/v1/login/access-token",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = response.data();
    assert_eq!(data["token_type"], "bearer");
    let token = data["access_token"].as_str().unwrap().to_string();
    assert!(token.starts_with("rail_"));

    let me = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["email"], ADMIN_EMAIL);
    assert!(me.data().get("hashed_password").is_none());
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/v1/login/access-token",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "nope" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.json()["data"].is_null());
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app.get("/api/v1/users/me", Some("rail_nothing_here")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn test_regular_user_cannot_manage_catalog() {
    let app = TestApp::new();
    app.admin_post(
        "/api/v1/users/",
        json!({ "email": "user@example.com", "password": "hunter22" }),
    )
    .await;

    let login = app
        .post(
            "/api/v1/login/access-token",
            None,
            json!({ "email": "user@example.com", "password": "hunter22" }),
        )
        .await;
    let token = login.data()["access_token"].as_str().unwrap().to_string();

    let response = app
        .post("/api/v1/license/domain/", Some(&token), json!({ "name": "Health" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "The user doesn't have enough privileges");

    let anonymous = app
        .post("/api/v1/license/domain/", None, json!({ "name": "Health" }))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_user_email_conflicts() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/v1/users/",
            Some(&app.admin_token),
            json!({ "email": ADMIN_EMAIL, "password": "other" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unapproved_restrictions_hidden_from_anonymous() {
    let app = TestApp::new();
    let approved = app.seed_restrictions("Privacy", &["no tracking"], true).await;
    let pending = app.seed_restrictions("Safety", &["no weapons"], false).await;

    let public = app.get("/api/v1/license/restriction/", None).await;
    assert_eq!(public.status, StatusCode::OK);
    let ids: Vec<i64> = public
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, approved);

    let hidden = app
        .get(&format!("/api/v1/license/restriction/{}", pending[0]), None)
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let admin = app
        .get(
            "/api/v1/license/restriction/?approved=false",
            Some(&app.admin_token),
        )
        .await;
    let ids: Vec<i64> = admin
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, pending);
}

#[tokio::test]
async fn test_create_license_validation() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;

    let mut no_artifacts = license_body(&ids);
    no_artifacts["model"] = json!(false);
    no_artifacts["sourcecode"] = json!(false);
    let response = app.post("/api/v1/license/", None, no_artifacts).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.post("/api/v1/license/", None, license_body(&[])).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post("/api/v1/license/", None, license_body(&[ids[0], 9999]))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.error().starts_with("One or more restrictions not found"));

    let mut unknown_family = license_body(&ids);
    unknown_family["license"] = json!("CreativeRAIL");
    let response = app.post("/api/v1/license/", None, unknown_family).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_license_rejects_unapproved_restriction() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Safety", &["no weapons"], false).await;

    let response = app.post("/api/v1/license/", None, license_body(&ids)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_license_keeps_restriction_order() {
    let app = TestApp::new();
    let privacy = app
        .seed_restrictions("Privacy", &["no tracking", "no profiling"], true)
        .await;
    let safety = app.seed_restrictions("Safety", &["no weapons"], true).await;

    let requested = vec![privacy[1], safety[0], privacy[0], privacy[1]];
    let created = app
        .post("/api/v1/license/", None, license_body(&requested))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.data()["id"].as_str().unwrap().to_string();
    assert_eq!(created.data()["template_version"], "head");

    let fetched = app.get(&format!("/api/v1/license/{id}"), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    let ids: Vec<i64> = fetched.data()["restrictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![privacy[1], safety[0], privacy[0]]);
    assert_eq!(fetched.data()["license"], "OpenRAIL");
}

#[tokio::test]
async fn test_license_id_must_be_uuid() {
    let app = TestApp::new();
    let response = app.get("/api/v1/license/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .get(&format!("/api/v1/license/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_license_management_requires_superuser() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;
    let created = app.post("/api/v1/license/", None, license_body(&ids)).await;
    let id = created.data()["id"].as_str().unwrap().to_string();

    let anonymous = app
        .request(Method::DELETE, &format!("/api/v1/license/{id}"), None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let listed = app.get("/api/v1/license/", Some(&app.admin_token)).await;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let updated = app
        .request(
            Method::PUT,
            &format!("/api/v1/license/{id}"),
            Some(&app.admin_token),
            Some(json!({ "name": "renamed", "model": false, "sourcecode": false })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::UNPROCESSABLE_ENTITY);

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/v1/license/{id}"),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app.get(&format!("/api/v1/license/{id}"), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_markdown_matches_render() {
    let app = TestApp::new();
    let privacy = app
        .seed_restrictions("Privacy", &["no tracking", "no profiling"], true)
        .await;
    let safety = app.seed_restrictions("Safety", &["no weapons"], true).await;

    let created = app
        .post(
            "/api/v1/license/",
            None,
            license_body(&[privacy[0], safety[0], privacy[1]]),
        )
        .await;
    let id = created.data()["id"].as_str().unwrap().to_string();

    let response = app
        .get(&format!("/api/v1/license/{id}/generate"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"my-model-OpenRAIL.md\""
    );

    let uuid = Uuid::parse_str(&id).unwrap();
    let license = app.store.licenses().get(&uuid).unwrap().unwrap();
    let clauses = app.store.license_clauses(&uuid).unwrap();
    let source = app
        .state
        .templates
        .load(license.family, TemplateVersion::Head)
        .unwrap();
    let expected = render(&source, &LicenseContext::for_license(&license, clauses)).unwrap();
    assert_eq!(response.text(), expected);

    let text = response.text();
    let privacy_at = text.find("### Privacy").unwrap();
    let safety_at = text.find("### Safety").unwrap();
    assert!(privacy_at < safety_at);
    assert!(text.contains("a. no tracking"));
    assert!(text.contains("b. no profiling"));
    assert!(text.contains("a. no weapons"));
    assert!(text.contains("Model, Source Code"));
}

#[tokio::test]
async fn test_generate_falls_back_to_family_filename() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;

    let mut body = license_body(&ids);
    body["name"] = json!("what?");
    let created = app.post("/api/v1/license/", None, body).await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.data()["id"].as_str().unwrap().to_string();

    let response = app
        .get(&format!("/api/v1/license/{id}/generate"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"OpenRAIL.md\""
    );
}

#[tokio::test]
async fn test_generate_without_history_rejects_revision() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;
    let created = app.post("/api/v1/license/", None, license_body(&ids)).await;
    let id = created.data()["id"].as_str().unwrap().to_string();

    let response = app
        .get(
            &format!("/api/v1/license/{id}/generate?git_sha=0123abcd"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error(), "Template history is not available");
}

#[tokio::test]
async fn test_generate_rejects_unknown_media_type() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;
    let created = app.post("/api/v1/license/", None, license_body(&ids)).await;
    let id = created.data()["id"].as_str().unwrap().to_string();

    let response = app
        .get(
            &format!("/api/v1/license/{id}/generate?media_type=image/png"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_generate_unsupported_family_is_server_error() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    app.store
        .connection()
        .execute(
            "INSERT INTO license (id, timestamp, name, license, model, git_commit_hash)
             VALUES (?1, ?2, 'legacy', 'CreativeRAIL', 1, 'head')",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )
        .unwrap();

    let response = app
        .get(&format!("/api/v1/license/{id}/generate"), None)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_license_creation_is_rate_limited() {
    let app = TestApp::with_limits(RateLimits::new(true, Vec::new()));
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;

    let first = app.post("/api/v1/license/", None, license_body(&ids)).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.post("/api/v1/license/", None, license_body(&ids)).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_generation_is_rate_limited() {
    let app = TestApp::with_limits(RateLimits::new(true, Vec::new()));
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;
    let created = app.post("/api/v1/license/", None, license_body(&ids)).await;
    let id = created.data()["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/license/{id}/generate");

    for _ in 0..5 {
        assert_eq!(app.get(&uri, None).await.status, StatusCode::OK);
    }
    assert_eq!(app.get(&uri, None).await.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_catalog_conflicts() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;
    let restriction = app
        .get(&format!("/api/v1/license/restriction/{}", ids[0]), None)
        .await
        .data();
    let domain_id = restriction["domain_id"].as_i64().unwrap();

    let duplicate = app
        .post(
            "/api/v1/license/domain/",
            Some(&app.admin_token),
            json!({ "name": "Privacy" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let in_use = app
        .request(
            Method::DELETE,
            &format!("/api/v1/license/domain/{domain_id}"),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(in_use.status, StatusCode::CONFLICT);

    let domains = app.get("/api/v1/license/domain/", None).await;
    assert_eq!(domains.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restriction_references_must_exist() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/v1/license/restriction/",
            Some(&app.admin_token),
            json!({ "text": "no tracking", "domain_id": 41, "source_id": 42 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_uses_recorded_template_revision() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    let first = commit_template(&repo, temp.path(), "OLD {{ SHORT_ARTIFACT_NAME }}");

    let templates =
        TemplateStore::new(temp.path().join("templates")).with_history(temp.path(), "templates");
    let app = TestApp::with_templates(templates);
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;

    let created = app.post("/api/v1/license/", None, license_body(&ids)).await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.data()["template_version"], first.to_string());
    let id = created.data()["id"].as_str().unwrap().to_string();

    let second = commit_template(&repo, temp.path(), "NEW {{ SHORT_ARTIFACT_NAME }}");
    assert_ne!(first, second);

    let recorded = app
        .get(&format!("/api/v1/license/{id}/generate"), None)
        .await;
    assert_eq!(recorded.status, StatusCode::OK);
    assert_eq!(recorded.text(), "OLD MS");

    let latest = app
        .get(&format!("/api/v1/license/{id}/generate?git_sha=head"), None)
        .await;
    assert_eq!(latest.status, StatusCode::OK);
    assert_eq!(latest.text(), "NEW MS");

    let pinned = app
        .get(
            &format!("/api/v1/license/{id}/generate?git_sha={second}"),
            None,
        )
        .await;
    assert_eq!(pinned.text(), "NEW MS");

    let unknown = app
        .get(
            &format!("/api/v1/license/{id}/generate?git_sha=0badc0de"),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_data_flag_licenses_without_listing_data() {
    let app = TestApp::new();
    let ids = app.seed_restrictions("Privacy", &["no tracking"], true).await;

    let mut body = license_body(&ids);
    body["sourcecode"] = json!(false);
    body["data"] = json!(true);
    let created = app.post("/api/v1/license/", None, body).await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.data()["id"].as_str().unwrap().to_string();

    let text = app
        .get(&format!("/api/v1/license/{id}/generate"), None)
        .await
        .text();
    assert!(text.contains("(M)"));
    assert!(!text.contains("Model, Data"));

    let mut data_only = license_body(&ids);
    data_only["model"] = json!(false);
    data_only["sourcecode"] = json!(false);
    data_only["data"] = json!(true);
    let created = app.post("/api/v1/license/", None, data_only).await;
    assert_eq!(created.status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_numeric_ids_are_unprocessable() {
    let app = TestApp::new();

    for uri in [
        "/api/v1/license/domain/abc",
        "/api/v1/license/source/abc",
        "/api/v1/license/restriction/abc",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert!(response.json()["data"].is_null());
        assert!(!response.error().is_empty());
    }

    let response = app
        .request(
            Method::DELETE,
            "/api/v1/license/restriction/1.5",
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/api/v1/users/me2", Some(&app.admin_token)).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}
