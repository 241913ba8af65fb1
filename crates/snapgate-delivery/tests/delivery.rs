//! Gate, serve and view counting over the deterministic environment

use assert_matches::assert_matches;
use snapgate_core::{RetryPolicy, SnapError, SnapshotStatus, DAY_MS};
use snapgate_delivery::{CommentRequest, Delivery, GatedDelivery, Viewer};
use snapgate_effects::FaultInjectingKvStore;
use snapgate_lifecycle::{CreateSnapshot, FinalizeSnapshot, UploadRequest};
use snapgate_store::MetadataStore;
use snapgate_testkit::{fast_hasher, html_of_len, TestEnvironment};
use std::sync::Arc;

const OWNER: &str = "user-1";
const PAGE: &[u8] = b"<!doctype html><h1>hello</h1>";
const STYLE: &[u8] = b"body { color: red }";

fn viewer<'a>(gate_token: Option<&'a str>, client_ip: &'a str) -> Viewer<'a> {
    Viewer {
        gate_token,
        client_ip,
        user_agent: "Mozilla/5.0",
    }
}

async fn views(env: &TestEnvironment, id: &snapgate_core::SnapshotId) -> u64 {
    env.lifecycle
        .get_snapshot(OWNER, id)
        .await
        .unwrap()
        .summary
        .views
}

#[tokio::test]
async fn example_scenario() {
    let env = TestEnvironment::new();
    let start = env.now_ms();

    let created = env
        .lifecycle
        .create(
            OWNER,
            CreateSnapshot {
                expiry_days: Some(7),
                ..CreateSnapshot::default()
            },
        )
        .await
        .unwrap();
    let auth = env
        .lifecycle
        .authorize_upload(
            OWNER,
            &created.id,
            UploadRequest {
                path: "index.html".to_string(),
                content_type: "text/html".to_string(),
                size: 200,
            },
        )
        .await
        .unwrap();
    let body = html_of_len(200);
    env.upload(&created.id, "index.html", &auth.content_type, &body)
        .await;

    let summary = env
        .lifecycle
        .finalize(
            OWNER,
            &created.id,
            FinalizeSnapshot {
                total_bytes: 200,
                files: vec![snapgate_core::FileEntry {
                    name: "index.html".to_string(),
                    size: 200,
                    content_type: "text/html".to_string(),
                    hash: String::new(),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.status, SnapshotStatus::Active);
    assert_eq!(summary.expires_at, start + 7 * DAY_MS);

    let err = env
        .delivery
        .gate_check(created.id.as_str(), "not-the-password")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");

    let pass = env
        .delivery
        .gate_check(created.id.as_str(), &created.password)
        .await
        .unwrap();
    assert_eq!(pass.cookie_name, format!("snapgate_gate_{}", created.id));
    assert_eq!(pass.max_age_secs, 3600);

    let asset = env.fetch(&created.id, "", Some(&pass.token)).await;
    assert_eq!(asset.body, body);
    assert_eq!(asset.content_type, "text/html");
    assert_eq!(views(&env, &created.id).await, 1);
}

#[tokio::test]
async fn closed_gate_never_returns_asset_bodies() {
    let env = TestEnvironment::new();
    let created = env
        .publish(
            OWNER,
            &[
                ("index.html", "text/html", PAGE),
                ("style.css", "text/css", STYLE),
            ],
        )
        .await;
    let id = created.id.as_str();

    let index = env.delivery.serve(id, "", viewer(None, "1.1.1.1")).await.unwrap();
    assert_matches!(index, Delivery::PasswordPrompt(page) if page.contains("/gate"));

    for path in ["style.css", "anything", "missing/deep.js"] {
        let err = env
            .delivery
            .serve(id, path, viewer(None, "1.1.1.1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unauthorized", "{path}");
    }

    let err = env
        .delivery
        .serve(id, "style.css", viewer(Some("forged.token"), "1.1.1.1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized");
    assert_eq!(views(&env, &created.id).await, 0);
}

#[tokio::test]
async fn gate_tokens_are_scoped_to_one_snapshot_and_expire() {
    let env = TestEnvironment::new();
    let first = env
        .publish(OWNER, &[("style.css", "text/css", STYLE)])
        .await;
    let second = env
        .publish(OWNER, &[("style.css", "text/css", STYLE)])
        .await;
    let token = env.gate_token(&first.id, &first.password).await;

    assert_eq!(env.fetch(&first.id, "style.css", Some(&token)).await.body, STYLE);
    let err = env
        .delivery
        .serve(second.id.as_str(), "style.css", viewer(Some(&token), "1.1.1.1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized");

    env.clock.advance_secs(3601);
    let err = env
        .delivery
        .serve(first.id.as_str(), "style.css", viewer(Some(&token), "1.1.1.1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized");
}

#[tokio::test]
async fn producer_sessions_do_not_open_gates() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("style.css", "text/css", STYLE)])
        .await;
    let session = env.sessions.issue(OWNER).unwrap();

    let err = env
        .delivery
        .serve(created.id.as_str(), "style.css", viewer(Some(&session), "1.1.1.1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unauthorized");
}

#[tokio::test]
async fn public_snapshots_skip_the_gate() {
    let env = TestEnvironment::new();
    let created = env
        .publish_with(
            OWNER,
            CreateSnapshot {
                is_public: true,
                ..CreateSnapshot::default()
            },
            &[("index.html", "text/html", PAGE)],
        )
        .await;

    let asset = env.fetch(&created.id, "index.html", None).await;
    assert_eq!(asset.body, PAGE);
    assert_eq!(views(&env, &created.id).await, 1);
}

#[tokio::test]
async fn views_count_once_per_viewer_per_day() {
    let env = TestEnvironment::new();
    let created = env
        .publish(
            OWNER,
            &[
                ("index.html", "text/html", PAGE),
                ("style.css", "text/css", STYLE),
            ],
        )
        .await;
    let token = env.gate_token(&created.id, &created.password).await;
    let id = created.id.as_str();

    for _ in 0..3 {
        env.delivery
            .serve(id, "", viewer(Some(&token), "10.0.0.1"))
            .await
            .unwrap();
    }
    // Sub-assets never count
    env.delivery
        .serve(id, "style.css", viewer(Some(&token), "10.0.0.2"))
        .await
        .unwrap();
    assert_eq!(views(&env, &created.id).await, 1);

    env.delivery
        .serve(id, "index.html", viewer(Some(&token), "10.0.0.2"))
        .await
        .unwrap();
    assert_eq!(views(&env, &created.id).await, 2);

    env.advance_days(1);
    let token = env.gate_token(&created.id, &created.password).await;
    env.delivery
        .serve(id, "", viewer(Some(&token), "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(views(&env, &created.id).await, 3);
}

#[tokio::test]
async fn failed_view_increment_keeps_the_viewer_countable() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let token = env.gate_token(&created.id, &created.password).await;
    let id = created.id.as_str();

    let kv = Arc::new(FaultInjectingKvStore::new(env.kv.clone()));
    let delivery = GatedDelivery::from_config(
        &env.config,
        MetadataStore::new(kv.clone(), RetryPolicy::none()),
        env.objects.clone(),
        env.comments.clone(),
        fast_hasher(),
        Arc::new(env.clock.clone()),
    );

    kv.fail_puts_under("views:");
    let err = delivery
        .serve(id, "", viewer(Some(&token), "10.0.0.9"))
        .await
        .unwrap_err();
    assert_matches!(err, SnapError::Internal { .. });
    assert_eq!(views(&env, &created.id).await, 0);

    kv.heal();
    delivery
        .serve(id, "", viewer(Some(&token), "10.0.0.9"))
        .await
        .unwrap();
    assert_eq!(views(&env, &created.id).await, 1);
}

#[tokio::test]
async fn views_survive_a_revoke_and_never_undo_it() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let token = env.gate_token(&created.id, &created.password).await;
    env.delivery
        .serve(created.id.as_str(), "", viewer(Some(&token), "10.0.0.1"))
        .await
        .unwrap();
    env.lifecycle.rotate_password(OWNER, &created.id).await.unwrap();
    env.delivery
        .serve(created.id.as_str(), "", viewer(Some(&token), "10.0.0.2"))
        .await
        .unwrap();

    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.views, 2);
    assert_ne!(detail.password.as_deref(), Some(created.password.as_str()));

    env.lifecycle.revoke(OWNER, &created.id).await.unwrap();
    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.status, SnapshotStatus::Expired);
    assert_eq!(detail.summary.views, 2);
}

#[tokio::test]
async fn traversal_is_rejected_when_serving() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let token = env.gate_token(&created.id, &created.password).await;

    for path in ["../index.html", "a/../index.html", "..", "/index.html"] {
        let err = env
            .delivery
            .serve(created.id.as_str(), path, viewer(Some(&token), "1.1.1.1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "bad_request", "{path}");
    }
}

#[tokio::test]
async fn unlisted_files_and_unknown_snapshots_are_not_found() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    // Present in the bucket but not in the manifest
    env.upload(&created.id, "secret.txt", "text/plain", b"hidden")
        .await;
    let token = env.gate_token(&created.id, &created.password).await;

    let err = env
        .delivery
        .serve(created.id.as_str(), "secret.txt", viewer(Some(&token), "1.1.1.1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");

    for id in ["unknownSnapshot0", "not a valid id"] {
        let err = env.delivery.gate_check(id, "pw").await.unwrap_err();
        assert_eq!(err.code(), "not_found", "{id}");
    }
}

#[tokio::test]
async fn creating_snapshots_are_invisible_and_expired_ones_are_gone() {
    let env = TestEnvironment::new();
    let pending = env
        .lifecycle
        .create(OWNER, CreateSnapshot::default())
        .await
        .unwrap();
    let err = env
        .delivery
        .gate_check(pending.id.as_str(), &pending.password)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");

    let live = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let token = env.gate_token(&live.id, &live.password).await;
    env.lifecycle.revoke(OWNER, &live.id).await.unwrap();

    let err = env
        .delivery
        .serve(live.id.as_str(), "", viewer(Some(&token), "1.1.1.1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "gone");
    let err = env
        .delivery
        .gate_check(live.id.as_str(), &live.password)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "gone");
}

#[tokio::test]
async fn rotated_passwords_replace_the_old_one() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let rotated = env
        .lifecycle
        .rotate_password(OWNER, &created.id)
        .await
        .unwrap();

    let err = env
        .delivery
        .gate_check(created.id.as_str(), &created.password)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");
    assert!(env
        .delivery
        .gate_check(created.id.as_str(), &rotated.password)
        .await
        .is_ok());
}

#[tokio::test]
async fn comments_sit_behind_the_gate() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let id = created.id.as_str();

    let err = env.delivery.list_comments(id, None).await.unwrap_err();
    assert_eq!(err.code(), "unauthorized");

    let token = env.gate_token(&created.id, &created.password).await;
    let first = env
        .delivery
        .append_comment(
            id,
            Some(&token),
            CommentRequest {
                author: None,
                body: "  looks good  ".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(first.seq, 1);
    assert_eq!(first.author, "anonymous");
    assert_eq!(first.body, "looks good");

    let second = env
        .delivery
        .append_comment(
            id,
            Some(&token),
            CommentRequest {
                author: Some("Reviewer".to_string()),
                body: "ship it".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(second.seq, 2);

    let listed = env.delivery.list_comments(id, Some(&token)).await.unwrap();
    assert_eq!(listed, vec![first, second]);

    for body in [String::new(), "   ".to_string(), "x".repeat(2001)] {
        let err = env
            .delivery
            .append_comment(id, Some(&token), CommentRequest { author: None, body })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "bad_request");
    }
}
