//! Snapshot state machine, quota and caps

use assert_matches::assert_matches;
use snapgate_core::{
    FileEntry, PlanTier, SnapError, SnapshotId, SnapshotStatus, DAY_MS, MAX_ACTIVE_SNAPSHOTS,
};
use snapgate_lifecycle::{CreateSnapshot, ExtendSnapshot, FinalizeSnapshot, UploadRequest};
use snapgate_testkit::TestEnvironment;

const OWNER: &str = "user-1";
const PAGE: &[u8] = b"<!doctype html><h1>hello</h1>";

fn html_entry(name: &str, size: u64) -> FileEntry {
    FileEntry {
        name: name.to_string(),
        size,
        content_type: "text/html".to_string(),
        hash: String::new(),
    }
}

fn create_days(days: u64) -> CreateSnapshot {
    CreateSnapshot {
        expiry_days: Some(days),
        ..CreateSnapshot::default()
    }
}

#[tokio::test]
async fn create_clamps_expiry_and_generates_a_password() {
    let env = TestEnvironment::new();
    let now = env.now_ms();

    let created = env.lifecycle.create(OWNER, create_days(30)).await.unwrap();
    assert_eq!(created.expiry_days, 7);
    assert_eq!(created.expires_at, now + 7 * DAY_MS);
    assert_eq!(created.password.len(), 18);
    assert_eq!(created.caps, PlanTier::Free.caps());

    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.status, SnapshotStatus::Creating);
    assert_eq!(detail.password.as_deref(), Some(created.password.as_str()));

    let floor = env.lifecycle.create(OWNER, create_days(0)).await.unwrap();
    assert_eq!(floor.expiry_days, 1);
}

#[tokio::test]
async fn caller_chosen_passwords_are_bounded() {
    let env = TestEnvironment::new();

    let chosen = env
        .lifecycle
        .create(
            OWNER,
            CreateSnapshot {
                password: Some("  hunter22  ".to_string()),
                ..CreateSnapshot::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(chosen.password, "hunter22");

    let err = env
        .lifecycle
        .create(
            OWNER,
            CreateSnapshot {
                password: Some("abc".to_string()),
                ..CreateSnapshot::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "bad_request");

    let blank = env
        .lifecycle
        .create(
            OWNER,
            CreateSnapshot {
                password: Some("   ".to_string()),
                ..CreateSnapshot::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(blank.password.len(), 18);
}

#[tokio::test]
async fn eleventh_active_snapshot_exceeds_the_quota() {
    let env = TestEnvironment::new();
    let mut ids = Vec::new();
    for _ in 0..MAX_ACTIVE_SNAPSHOTS {
        let created = env
            .publish(OWNER, &[("index.html", "text/html", PAGE)])
            .await;
        ids.push(created.id);
    }
    assert_eq!(env.lifecycle.list_owner_snapshots(OWNER).await.unwrap().len(), 10);

    let err = env
        .lifecycle
        .create(OWNER, CreateSnapshot::default())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        SnapError::QuotaExceeded {
            active: 10,
            limit: 10
        }
    );

    // Other owners are unaffected
    assert!(env
        .lifecycle
        .create("user-2", CreateSnapshot::default())
        .await
        .is_ok());

    // Revoking frees a slot
    env.lifecycle.revoke(OWNER, &ids[0]).await.unwrap();
    assert!(env
        .lifecycle
        .create(OWNER, CreateSnapshot::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn pending_snapshots_cannot_finalize_past_the_quota() {
    let env = TestEnvironment::new();
    let mut pending = Vec::new();
    for _ in 0..MAX_ACTIVE_SNAPSHOTS + 5 {
        let created = env
            .lifecycle
            .create(OWNER, CreateSnapshot::default())
            .await
            .unwrap();
        pending.push(created.id);
    }

    let manifest = || FinalizeSnapshot {
        total_bytes: 10,
        files: vec![html_entry("index.html", 10)],
    };
    for id in &pending[..MAX_ACTIVE_SNAPSHOTS] {
        env.lifecycle.finalize(OWNER, id, manifest()).await.unwrap();
    }
    for id in &pending[MAX_ACTIVE_SNAPSHOTS..] {
        let err = env
            .lifecycle
            .finalize(OWNER, id, manifest())
            .await
            .unwrap_err();
        assert_matches!(
            err,
            SnapError::QuotaExceeded {
                active: 10,
                limit: 10
            }
        );
        let detail = env.lifecycle.get_snapshot(OWNER, id).await.unwrap();
        assert_eq!(detail.summary.status, SnapshotStatus::Creating);
    }
    assert_eq!(
        env.lifecycle.list_owner_snapshots(OWNER).await.unwrap().len(),
        MAX_ACTIVE_SNAPSHOTS
    );

    // Replaying an already active snapshot does not need a new slot
    env.lifecycle
        .finalize(OWNER, &pending[0], manifest())
        .await
        .unwrap();

    env.lifecycle.revoke(OWNER, &pending[1]).await.unwrap();
    let last = &pending[MAX_ACTIVE_SNAPSHOTS];
    let summary = env.lifecycle.finalize(OWNER, last, manifest()).await.unwrap();
    assert_eq!(summary.status, SnapshotStatus::Active);
    assert_eq!(
        env.lifecycle.list_owner_snapshots(OWNER).await.unwrap().len(),
        MAX_ACTIVE_SNAPSHOTS
    );
}

#[tokio::test]
async fn naturally_expired_snapshots_leave_the_quota() {
    let env = TestEnvironment::new();
    for _ in 0..MAX_ACTIVE_SNAPSHOTS {
        env.publish_with(
            OWNER,
            create_days(1),
            &[("index.html", "text/html", PAGE)],
        )
        .await;
    }
    assert!(env
        .lifecycle
        .create(OWNER, CreateSnapshot::default())
        .await
        .is_err());

    env.advance_days(2);
    assert!(env
        .lifecycle
        .create(OWNER, CreateSnapshot::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn upload_authorization_enforces_the_file_cap() {
    let env = TestEnvironment::new();
    let created = env.lifecycle.create(OWNER, CreateSnapshot::default()).await.unwrap();
    let cap = created.caps.max_file_bytes;

    let upload = |size| UploadRequest {
        path: "assets/video.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        size,
    };

    let ok = env
        .lifecycle
        .authorize_upload(OWNER, &created.id, upload(cap))
        .await
        .unwrap();
    assert_eq!(ok.method, "PUT");
    assert_eq!(ok.key, format!("snap/{}/assets/video.mp4", created.id));
    assert_eq!(ok.expires_in, 900);
    assert!(ok.url.starts_with(&format!(
        "https://acct.r2.cloudflarestorage.com/snapshots/snap/{}/assets/video.mp4?",
        created.id
    )));
    assert!(ok.url.contains("X-Amz-Signature="));

    let err = env
        .lifecycle
        .authorize_upload(OWNER, &created.id, upload(cap + 1))
        .await
        .unwrap_err();
    assert_matches!(err, SnapError::FileTooLarge { size, limit } if size == cap + 1 && limit == cap);
}

#[tokio::test]
async fn upload_authorization_rejects_traversal_and_unlisted_types() {
    let env = TestEnvironment::new();
    let created = env.lifecycle.create(OWNER, CreateSnapshot::default()).await.unwrap();

    for path in ["../other/index.html", "a/../../b.js", "/etc/passwd"] {
        let err = env
            .lifecycle
            .authorize_upload(
                OWNER,
                &created.id,
                UploadRequest {
                    path: path.to_string(),
                    content_type: "text/html".to_string(),
                    size: 10,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "bad_request", "{path}");
    }

    let err = env
        .lifecycle
        .authorize_upload(
            OWNER,
            &created.id,
            UploadRequest {
                path: "setup.exe".to_string(),
                content_type: "application/x-msdownload".to_string(),
                size: 10,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "type_not_allowed");
}

#[tokio::test]
async fn finalized_snapshots_accept_no_more_uploads() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;

    let err = env
        .lifecycle
        .authorize_upload(
            OWNER,
            &created.id,
            UploadRequest {
                path: "index.html".to_string(),
                content_type: "text/html".to_string(),
                size: 20 * 1024 * 1024,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "bad_request");

    let err = env
        .lifecycle
        .store_file(
            OWNER,
            &created.id,
            "index.html",
            "text/html",
            vec![b'x'; 20 * 1024 * 1024],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "bad_request");

    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.total_bytes, PAGE.len() as u64);
    let token = env.gate_token(&created.id, &created.password).await;
    let served = env.fetch(&created.id, "index.html", Some(&token)).await;
    assert_eq!(served.body, PAGE);
}

#[tokio::test]
async fn store_file_records_a_manifest_entry_while_creating() {
    let env = TestEnvironment::new();
    let created = env
        .lifecycle
        .create(OWNER, CreateSnapshot::default())
        .await
        .unwrap();
    let entry = env
        .lifecycle
        .store_file(OWNER, &created.id, "index.html", "text/html", PAGE.to_vec())
        .await
        .unwrap();
    assert_eq!(entry.name, "index.html");
    assert_eq!(entry.size, PAGE.len() as u64);
    assert_eq!(entry.hash.len(), 64);

    let summary = env
        .lifecycle
        .finalize(
            OWNER,
            &created.id,
            FinalizeSnapshot {
                total_bytes: entry.size,
                files: vec![entry],
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.status, SnapshotStatus::Active);
}

#[tokio::test]
async fn finalize_enforces_the_bundle_cap_and_manifest_shape() {
    let env = TestEnvironment::new();
    let created = env.lifecycle.create(OWNER, CreateSnapshot::default()).await.unwrap();
    let bundle_cap = created.caps.max_bundle_bytes;

    let finalize = |total_bytes, files| {
        env.lifecycle
            .finalize(OWNER, &created.id, FinalizeSnapshot { total_bytes, files })
    };

    let err = finalize(bundle_cap + 1, vec![html_entry("index.html", bundle_cap + 1)])
        .await
        .unwrap_err();
    assert_matches!(err, SnapError::BundleTooLarge { .. });

    let err = finalize(0, Vec::new()).await.unwrap_err();
    assert_eq!(err.code(), "bad_request");

    let err = finalize(100, vec![html_entry("index.html", 99)])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "bad_request");

    let err = finalize(
        20,
        vec![html_entry("index.html", 10), html_entry("index.html", 10)],
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "bad_request");

    let err = finalize(10, vec![html_entry("../index.html", 10)])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "bad_request");

    // Nothing above changed the record
    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.status, SnapshotStatus::Creating);
    assert!(env.lifecycle.list_owner_snapshots(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn finalize_activates_and_lists_the_snapshot() {
    let env = TestEnvironment::new();
    let now = env.now_ms();
    let created = env.lifecycle.create(OWNER, create_days(7)).await.unwrap();

    let summary = env
        .lifecycle
        .finalize(
            OWNER,
            &created.id,
            FinalizeSnapshot {
                total_bytes: 200,
                files: vec![html_entry("index.html", 200)],
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.status, SnapshotStatus::Active);
    assert_eq!(summary.expires_at, now + 7 * DAY_MS);
    assert_eq!(summary.total_bytes, 200);
    assert_eq!(summary.file_count, 1);

    let listed = env.lifecycle.list_owner_snapshots(OWNER).await.unwrap();
    assert_eq!(listed, vec![summary]);
}

#[tokio::test]
async fn finalize_replay_keeps_the_last_manifest() {
    let env = TestEnvironment::new();
    let created = env.lifecycle.create(OWNER, CreateSnapshot::default()).await.unwrap();

    for files in [
        vec![html_entry("index.html", 10)],
        vec![html_entry("index.html", 5), html_entry("about.html", 7)],
    ] {
        let total_bytes = files.iter().map(|f| f.size).sum();
        env.lifecycle
            .finalize(OWNER, &created.id, FinalizeSnapshot { total_bytes, files })
            .await
            .unwrap();
    }

    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.total_bytes, 12);
    assert_eq!(detail.files.len(), 2);
    // Listed once despite two registrations
    assert_eq!(env.lifecycle.list_owner_snapshots(OWNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn non_owners_cannot_tell_a_snapshot_exists() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;
    let unknown = SnapshotId::parse("doesNotExist0000").unwrap();

    for id in [&created.id, &unknown] {
        let errors = [
            env.lifecycle.get_snapshot("intruder", id).await.unwrap_err(),
            env.lifecycle
                .extend("intruder", id, ExtendSnapshot { days: 1 })
                .await
                .unwrap_err(),
            env.lifecycle.revoke("intruder", id).await.unwrap_err(),
            env.lifecycle.rotate_password("intruder", id).await.unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err, SnapError::not_found("snapshot not found"));
        }
    }

    // The owner's snapshot is untouched
    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.status, SnapshotStatus::Active);
}

#[tokio::test]
async fn extend_never_passes_the_plan_lifetime() {
    let env = TestEnvironment::new();
    let start = env.now_ms();
    let created = env
        .publish_with(OWNER, create_days(2), &[("index.html", "text/html", PAGE)])
        .await;

    let extended = env
        .lifecycle
        .extend(OWNER, &created.id, ExtendSnapshot { days: 3 })
        .await
        .unwrap();
    assert_eq!(extended.expires_at, start + 5 * DAY_MS);

    let extended = env
        .lifecycle
        .extend(OWNER, &created.id, ExtendSnapshot { days: 30 })
        .await
        .unwrap();
    assert_eq!(extended.expires_at, start + 7 * DAY_MS);

    let extended = env
        .lifecycle
        .extend(OWNER, &created.id, ExtendSnapshot { days: 0 })
        .await
        .unwrap();
    assert_eq!(extended.expires_at, start + 7 * DAY_MS);
}

#[tokio::test]
async fn pro_plan_extends_further() {
    let env = TestEnvironment::with_plan(PlanTier::Pro);
    let start = env.now_ms();
    let created = env
        .publish_with(OWNER, create_days(7), &[("index.html", "text/html", PAGE)])
        .await;
    assert_eq!(created.caps.max_days, 30);

    let extended = env
        .lifecycle
        .extend(OWNER, &created.id, ExtendSnapshot { days: 5 })
        .await
        .unwrap();
    assert_eq!(extended.expires_at, start + 12 * DAY_MS);
}

#[tokio::test]
async fn nothing_leaves_expired() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;

    let revoked = env.lifecycle.revoke(OWNER, &created.id).await.unwrap();
    assert_eq!(revoked.status, SnapshotStatus::Expired);
    assert!(revoked.expires_at < env.now_ms());

    let gone = [
        env.lifecycle.revoke(OWNER, &created.id).await.unwrap_err(),
        env.lifecycle
            .extend(OWNER, &created.id, ExtendSnapshot { days: 1 })
            .await
            .unwrap_err(),
        env.lifecycle
            .rotate_password(OWNER, &created.id)
            .await
            .unwrap_err(),
        env.lifecycle
            .finalize(
                OWNER,
                &created.id,
                FinalizeSnapshot {
                    total_bytes: 10,
                    files: vec![html_entry("index.html", 10)],
                },
            )
            .await
            .unwrap_err(),
    ];
    for err in gone {
        assert_eq!(err.code(), "gone");
    }

    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.summary.status, SnapshotStatus::Expired);
    assert!(env.lifecycle.list_owner_snapshots(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn creating_snapshots_can_be_revoked() {
    let env = TestEnvironment::new();
    let created = env.lifecycle.create(OWNER, CreateSnapshot::default()).await.unwrap();

    let revoked = env.lifecycle.revoke(OWNER, &created.id).await.unwrap();
    assert_eq!(revoked.status, SnapshotStatus::Expired);

    let err = env
        .lifecycle
        .authorize_upload(
            OWNER,
            &created.id,
            UploadRequest {
                path: "index.html".to_string(),
                content_type: "text/html".to_string(),
                size: 1,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "gone");
}

#[tokio::test]
async fn listing_applies_lazy_expiry() {
    let env = TestEnvironment::new();
    env.publish(OWNER, &[("index.html", "text/html", PAGE)]).await;

    env.advance_days(8);
    let listed = env.lifecycle.list_owner_snapshots(OWNER).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, SnapshotStatus::Expired);
}

#[tokio::test]
async fn rotation_replaces_the_password() {
    let env = TestEnvironment::new();
    let created = env
        .publish(OWNER, &[("index.html", "text/html", PAGE)])
        .await;

    let rotated = env
        .lifecycle
        .rotate_password(OWNER, &created.id)
        .await
        .unwrap();
    assert_ne!(rotated.password, created.password);
    assert_eq!(rotated.password.len(), 18);

    let detail = env.lifecycle.get_snapshot(OWNER, &created.id).await.unwrap();
    assert_eq!(detail.password, Some(rotated.password));
}

#[tokio::test]
async fn producer_sessions_identify_the_owner() {
    let env = TestEnvironment::new();
    let token = env.sessions.issue(OWNER).unwrap();
    assert_eq!(env.sessions.authenticate(&token).unwrap(), OWNER);

    env.advance_days(31);
    assert_eq!(
        env.sessions.authenticate(&token).unwrap_err().code(),
        "unauthorized"
    );
}
