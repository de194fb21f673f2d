//! Emote version graph against the in-memory store

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use emotebase_core::document::from_document;
use emotebase_core::effects::CancelHandle;
use emotebase_core::{Collection, EmoteError, EngineConfig, ObjectId, RequestContext};
use emotebase_mutations::{CreateVersionOptions, EntityKey};
use emotebase_structures::{
    Emote, EmoteStatus, EmoteVersioning, EventType, FieldValue, RolePermission, User,
    UserEditorPermission,
};
use emotebase_testkit::{
    emote_editor, grant_editor, init_test_tracing, mutation_by, user_with, EngineFixture, StoreOp,
};
use proptest::prelude::*;

async fn stored(fixture: &EngineFixture, id: ObjectId) -> Emote {
    let doc = fixture
        .store
        .get(Collection::Emotes, id)
        .await
        .expect("emote is stored");
    from_document(doc).expect("emote decodes")
}

fn version_of(name: &str, parent: &Emote, diverged: bool) -> Emote {
    Emote {
        parent_id: Some(parent.id),
        versioning: Some(EmoteVersioning {
            tag: name.to_string(),
            diverged,
            timestamp: chrono::Utc::now(),
        }),
        ..Emote::new(name).owned_by(parent.owner_id.unwrap_or_default())
    }
}

fn update() -> CreateVersionOptions {
    CreateVersionOptions {
        tag: "v2".to_string(),
        diverges: false,
    }
}

/// Owner, the lineage's current emote and a fresh upload, all stored
async fn lineage() -> (EngineFixture, User, Emote, Emote) {
    init_test_tracing();
    let fixture = EngineFixture::new();
    let owner = emote_editor("owner");
    fixture.seed_user(&owner).await;
    let current = Emote::new("current").owned_by(owner.id);
    let upload = Emote::new("upload").owned_by(owner.id);
    fixture.seed_emote(&current).await;
    fixture.seed_emote(&upload).await;
    (fixture, owner, current, upload)
}

#[tokio::test]
async fn test_update_promotes_new_version() {
    let (fixture, owner, current, upload) = lineage().await;
    let sibling = version_of("sibling", &current, false);
    fixture.seed_emote(&sibling).await;

    let mut mutation = mutation_by(&upload, &owner);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap();

    let promoted = stored(&fixture, upload.id).await;
    let demoted = stored(&fixture, current.id).await;
    assert!(promoted.is_current());
    assert_eq!(demoted.parent_id, Some(upload.id));
    assert!(demoted.versioning.is_none());
    assert_eq!(stored(&fixture, sibling.id).await.parent_id, Some(upload.id));
    assert!(mutation.builder.emote().is_current());

    // The upload ends with no lineage fields, as it started; only the demotion
    // of the old current is reported.
    let records = fixture.sink.records_for(EventType::UpdateEmote).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, current.id);
    let parent = records[0].field("parent_id").expect("parent_id recorded");
    assert_eq!(parent.old_value, FieldValue::Null);
    assert_eq!(parent.new_value, FieldValue::id(Some(upload.id)));
    assert!(fixture.mutate.locks().is_empty());
}

#[tokio::test]
async fn test_concurrent_updates_leave_one_current_version() {
    let (fixture, owner, current, first) = lineage().await;
    let second = Emote::new("second").owned_by(owner.id);
    fixture.seed_emote(&second).await;
    fixture.seed_emote(&version_of("sibling", &current, false)).await;

    // Both writers resolve `current` as the root before either can lock it.
    let held = fixture
        .mutate
        .locks()
        .acquire(EntityKey::emote(current.id))
        .await;
    let ctx = RequestContext::background();
    let mut a = mutation_by(&first, &owner);
    let mut b = mutation_by(&second, &owner);
    let (ra, rb, ()) = tokio::join!(
        fixture.mutate.to_version(&ctx, &mut a, &current, update()),
        fixture.mutate.to_version(&ctx, &mut b, &current, update()),
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(held);
        },
    );
    ra.unwrap();
    rb.unwrap();

    let emotes = all_emotes(&fixture).await;
    let currents: Vec<ObjectId> = emotes
        .values()
        .filter(|e| e.is_current())
        .map(|e| e.id)
        .collect();
    assert_eq!(currents.len(), 1);
    for id in emotes.keys() {
        assert_eq!(chain_end(&emotes, *id), Some(currents[0]));
    }
    assert!(fixture.mutate.locks().is_empty());
}

#[tokio::test]
async fn test_writer_waits_for_held_emote_lock() {
    let (fixture, owner, current, upload) = lineage().await;
    let held = fixture
        .mutate
        .locks()
        .acquire(EntityKey::emote(upload.id))
        .await;
    let store = &fixture.store;

    let mut mutation = mutation_by(&upload, &owner);
    let ctx = RequestContext::background();
    let (result, writes_while_held) = tokio::join!(
        fixture
            .mutate
            .to_version(&ctx, &mut mutation, &current, update()),
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let writes = store.writes();
            drop(held);
            writes
        },
    );

    result.unwrap();
    assert_eq!(writes_while_held, 0);
    assert!(stored(&fixture, upload.id).await.is_current());
}

#[tokio::test]
async fn test_replayed_promotion_publishes_nothing() {
    let (fixture, owner, current, upload) = lineage().await;
    let ctx = RequestContext::background();
    let mut mutation = mutation_by(&upload, &owner);
    fixture
        .mutate
        .to_version(&ctx, &mut mutation, &current, update())
        .await
        .unwrap();
    let published = fixture.sink.records().await.len();

    let mut again = mutation_by(&stored(&fixture, upload.id).await, &owner);
    fixture
        .mutate
        .set_current_version(&ctx, &mut again, &current)
        .await
        .unwrap();

    assert_eq!(fixture.sink.records().await.len(), published);
    assert!(again.builder.emote().is_current());
}

#[tokio::test]
async fn test_divergent_version_leaves_lineage_alone() {
    let (fixture, owner, current, upload) = lineage().await;
    let sibling = version_of("sibling", &current, false);
    fixture.seed_emote(&sibling).await;

    let mut mutation = mutation_by(&upload, &owner);
    let opts = CreateVersionOptions {
        tag: "fork".to_string(),
        diverges: true,
    };
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, opts)
        .await
        .unwrap();

    let fork = stored(&fixture, upload.id).await;
    assert_eq!(fork.parent_id, Some(current.id));
    assert!(fork.is_diverged());
    assert!(stored(&fixture, current.id).await.is_current());
    assert_eq!(stored(&fixture, sibling.id).await.parent_id, Some(current.id));

    let records = fixture.sink.records_for(EventType::UpdateEmote).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, upload.id);
    assert_eq!(records[0].added.len(), 2);
    assert!(records[0].field("versioning").is_some());
}

#[tokio::test]
async fn test_version_of_a_version_promotes_against_root() {
    let (fixture, owner, current, upload) = lineage().await;
    let older = version_of("older", &current, false);
    fixture.seed_emote(&older).await;

    let mut mutation = mutation_by(&upload, &owner);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &older, update())
        .await
        .unwrap();

    assert!(stored(&fixture, upload.id).await.is_current());
    assert_eq!(stored(&fixture, current.id).await.parent_id, Some(upload.id));
    assert_eq!(stored(&fixture, older.id).await.parent_id, Some(upload.id));
}

#[tokio::test]
async fn test_emote_cannot_version_itself() {
    let (fixture, owner, current, _) = lineage().await;

    let mut mutation = mutation_by(&current, &owner);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::InvalidRequest { .. }));
    assert_eq!(fixture.store.writes(), 0);
}

#[tokio::test]
async fn test_lineage_cycle_is_rejected_before_writing() {
    let (fixture, owner, current, upload) = lineage().await;
    // `current` claims to be a version of `upload`, so versioning `upload`
    // under it would close a loop.
    let looped = version_of("current", &upload, false);
    let looped = Emote { id: current.id, ..looped };
    let mut mutation = mutation_by(&upload, &owner);

    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &looped, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::InvalidRequest { .. }));
    assert_eq!(fixture.store.writes(), 0);
}

#[tokio::test]
async fn test_lineage_deeper_than_configured_is_rejected() {
    init_test_tracing();
    let fixture = EngineFixture::with_config(EngineConfig {
        max_lineage_depth: 2,
        ..EngineConfig::default()
    });
    let owner = emote_editor("owner");
    fixture.seed_user(&owner).await;
    let root = Emote::new("root").owned_by(owner.id);
    fixture.seed_emote(&root).await;
    let mut parent = root.clone();
    for depth in 0..3 {
        let next = version_of(&format!("v{depth}"), &parent, false);
        fixture.seed_emote(&next).await;
        parent = next;
    }
    let upload = Emote::new("upload").owned_by(owner.id);
    fixture.seed_emote(&upload).await;

    let mut mutation = mutation_by(&upload, &owner);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &parent, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::InvalidRequest { .. }));
    assert_eq!(fixture.store.writes(), 0);
}

#[tokio::test]
async fn test_missing_capability_writes_nothing() {
    let (fixture, owner, current, upload) = lineage().await;
    let mut powerless = owner.clone();
    powerless.roles.clear();

    let mut mutation = mutation_by(&upload, &powerless);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::InsufficientPrivilege { .. }));
    assert_eq!(fixture.store.writes(), 0);
    assert!(fixture.sink.records().await.is_empty());
}

#[tokio::test]
async fn test_stranger_cannot_version_owned_emote() {
    let (fixture, _, current, upload) = lineage().await;
    let stranger = emote_editor("stranger");

    let mut mutation = mutation_by(&upload, &stranger);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::InsufficientPrivilege { .. }));
    assert_eq!(fixture.store.writes(), 0);
    assert!(fixture.mutate.locks().is_empty());
}

#[tokio::test]
async fn test_owner_lookup_failure_is_internal() {
    let (fixture, _, current, upload) = lineage().await;
    let stranger = emote_editor("stranger");
    fixture.store.fail_on(Collection::Users, StoreOp::FindOne).await;

    let mut mutation = mutation_by(&upload, &stranger);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::InternalServerError { .. }));
    assert_eq!(fixture.store.writes(), 0);
    assert!(fixture.sink.records().await.is_empty());
}

#[tokio::test]
async fn test_listed_editor_may_version_owned_emote() {
    init_test_tracing();
    let fixture = EngineFixture::new();
    let editor = emote_editor("editor");
    let mut owner = emote_editor("owner");
    grant_editor(&mut owner, &editor, UserEditorPermission::MANAGE_OWNED_EMOTES);
    fixture.seed_user(&owner).await;
    let current = Emote::new("current").owned_by(owner.id);
    let upload = Emote::new("upload").owned_by(owner.id);
    fixture.seed_emote(&current).await;
    fixture.seed_emote(&upload).await;

    let mut mutation = mutation_by(&upload, &editor);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap();

    assert!(stored(&fixture, upload.id).await.is_current());
}

#[tokio::test]
async fn test_moderator_overrides_ownership() {
    let (fixture, _, current, upload) = lineage().await;
    let moderator = user_with(
        "moderator",
        RolePermission::EDIT_EMOTE | RolePermission::EDIT_ANY_EMOTE,
    );

    let mut mutation = mutation_by(&upload, &moderator);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap();

    assert!(stored(&fixture, upload.id).await.is_current());
}

#[tokio::test]
async fn test_applied_mutation_is_tainted() {
    let (fixture, owner, current, upload) = lineage().await;
    let mut mutation = mutation_by(&upload, &owner);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap();
    let writes = fixture.store.writes();

    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::TaintedObject { .. }));
    assert_eq!(fixture.store.writes(), writes);
}

#[tokio::test]
async fn test_unsaved_target_is_incomplete() {
    let (fixture, owner, current, _) = lineage().await;
    let unsaved = Emote::new("unsaved").owned_by(owner.id);

    let mut mutation = mutation_by(&unsaved, &owner);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::IncompleteMutation { .. }));
    assert!(stored(&fixture, current.id).await.is_current());
}

#[tokio::test]
async fn test_cancelled_request_writes_nothing() {
    let (fixture, owner, current, upload) = lineage().await;
    let handle = Arc::new(CancelHandle::new());
    handle.cancel();
    let ctx = RequestContext::with_cancellation(handle);

    let mut mutation = mutation_by(&upload, &owner);
    let err = fixture
        .mutate
        .to_version(&ctx, &mut mutation, &current, update())
        .await
        .unwrap_err();

    assert!(matches!(err, EmoteError::Cancelled { .. }));
    assert_eq!(fixture.store.writes(), 0);
}

#[tokio::test]
async fn test_cancelled_while_waiting_for_lock_writes_nothing() {
    let (fixture, owner, current, upload) = lineage().await;
    let handle = Arc::new(CancelHandle::new());
    let ctx = RequestContext::with_cancellation(handle.clone());
    let held = fixture
        .mutate
        .locks()
        .acquire(EntityKey::emote(current.id))
        .await;

    let mut mutation = mutation_by(&upload, &owner);
    let (result, ()) = tokio::join!(
        fixture.mutate.to_version(&ctx, &mut mutation, &current, update()),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        },
    );

    assert!(matches!(result, Err(EmoteError::Cancelled { .. })));
    assert_eq!(fixture.store.writes(), 0);
    drop(held);
    assert!(fixture.mutate.locks().is_empty());
}

#[tokio::test]
async fn test_failed_promotion_is_repaired_by_set_current_version() {
    let (fixture, owner, current, upload) = lineage().await;
    fixture
        .store
        .fail_on(Collection::Emotes, StoreOp::UpdateOne)
        .await;

    let mut mutation = mutation_by(&upload, &owner);
    let err = fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap_err();
    assert!(matches!(err, EmoteError::InternalServerError { .. }));
    assert_eq!(stored(&fixture, upload.id).await.parent_id, Some(current.id));
    assert!(fixture.mutate.locks().is_empty());

    fixture
        .store
        .heal(Collection::Emotes, StoreOp::UpdateOne)
        .await;
    let mut retry = mutation_by(&stored(&fixture, upload.id).await, &owner);
    fixture
        .mutate
        .set_current_version(&RequestContext::background(), &mut retry, &current)
        .await
        .unwrap();

    assert!(stored(&fixture, upload.id).await.is_current());
    assert_eq!(stored(&fixture, current.id).await.parent_id, Some(upload.id));
}

#[tokio::test]
async fn test_sink_failure_does_not_undo_mutation() {
    let (fixture, owner, current, upload) = lineage().await;
    fixture.sink.fail_publishes();

    let mut mutation = mutation_by(&upload, &owner);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap();

    assert!(stored(&fixture, upload.id).await.is_current());
}

#[tokio::test]
async fn test_disabled_versions_are_not_reparented() {
    let (fixture, owner, current, upload) = lineage().await;
    let disabled = Emote {
        status: EmoteStatus::Disabled,
        ..version_of("disabled", &current, false)
    };
    fixture.seed_emote(&disabled).await;

    let mut mutation = mutation_by(&upload, &owner);
    fixture
        .mutate
        .to_version(&RequestContext::background(), &mut mutation, &current, update())
        .await
        .unwrap();

    assert_eq!(stored(&fixture, disabled.id).await.parent_id, Some(current.id));
}

/// Snapshot of every emote's lineage fields, ordered by id
async fn lineage_snapshot(fixture: &EngineFixture) -> Vec<(ObjectId, Option<ObjectId>, bool)> {
    let mut rows: Vec<_> = fixture
        .store
        .documents(Collection::Emotes)
        .await
        .into_iter()
        .map(|doc| from_document::<Emote>(doc).expect("emote decodes"))
        .map(|e| (e.id, e.parent_id, e.versioning.is_some()))
        .collect();
    rows.sort();
    rows
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime builds")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: promotion applied once or many times leaves the same lineage
    #[test]
    fn promotion_is_idempotent(siblings in 0usize..5, repeats in 1usize..4) {
        let (once, many) = runtime().block_on(async {
            let (fixture, owner, current, upload) = lineage().await;
            for n in 0..siblings {
                fixture.seed_emote(&version_of(&format!("s{n}"), &current, false)).await;
            }
            let ctx = RequestContext::background();
            let mut mutation = mutation_by(&upload, &owner);
            fixture.mutate.to_version(&ctx, &mut mutation, &current, update()).await.unwrap();
            let once = lineage_snapshot(&fixture).await;

            for _ in 0..repeats {
                let mut again = mutation_by(&stored(&fixture, upload.id).await, &owner);
                fixture.mutate.set_current_version(&ctx, &mut again, &current).await.unwrap();
            }
            (once, lineage_snapshot(&fixture).await)
        });

        prop_assert_eq!(once, many);
    }

    /// Property: any sequence of version operations keeps every parent
    /// chain acyclic and ending at a current version
    #[test]
    fn lineages_stay_acyclic(ops in prop::collection::vec(lineage_op(), 1..12)) {
        let emotes = runtime().block_on(async {
            let (fixture, owner, current, upload) = lineage().await;
            let mut ids = vec![current.id, upload.id];
            for n in 2..POOL {
                let emote = Emote::new(&format!("e{n}")).owned_by(owner.id);
                fixture.seed_emote(&emote).await;
                ids.push(emote.id);
            }

            let ctx = RequestContext::background();
            for op in ops {
                let result = match op {
                    LineageOp::Version { target, parent, diverges } => {
                        let target = stored(&fixture, ids[target]).await;
                        let parent = stored(&fixture, ids[parent]).await;
                        let opts = CreateVersionOptions { tag: "p".into(), diverges };
                        let mut mutation = mutation_by(&target, &owner);
                        fixture.mutate.to_version(&ctx, &mut mutation, &parent, opts).await
                    }
                    LineageOp::Promote { target, previous } => {
                        let target = stored(&fixture, ids[target]).await;
                        let previous = stored(&fixture, ids[previous]).await;
                        let mut mutation = mutation_by(&target, &owner);
                        fixture
                            .mutate
                            .set_current_version(&ctx, &mut mutation, &previous)
                            .await
                    }
                };
                if let Err(err) = result {
                    assert!(matches!(err, EmoteError::InvalidRequest { .. }), "{err}");
                }
            }
            all_emotes(&fixture).await
        });

        for id in emotes.keys() {
            let end = chain_end(&emotes, *id);
            prop_assert!(end.is_some(), "chain from {} loops", id);
            prop_assert!(emotes[&end.unwrap()].is_current());
        }
    }
}

const POOL: usize = 5;

#[derive(Debug, Clone)]
enum LineageOp {
    Version { target: usize, parent: usize, diverges: bool },
    Promote { target: usize, previous: usize },
}

fn lineage_op() -> impl Strategy<Value = LineageOp> {
    prop_oneof![
        (0..POOL, 0..POOL, any::<bool>()).prop_map(|(target, parent, diverges)| {
            LineageOp::Version { target, parent, diverges }
        }),
        (0..POOL, 0..POOL).prop_map(|(target, previous)| LineageOp::Promote { target, previous }),
    ]
}

async fn all_emotes(fixture: &EngineFixture) -> HashMap<ObjectId, Emote> {
    fixture
        .store
        .documents(Collection::Emotes)
        .await
        .into_iter()
        .map(|doc| from_document::<Emote>(doc).expect("emote decodes"))
        .map(|e| (e.id, e))
        .collect()
}

/// Follow `parent_id` links from `id`; `None` when they loop or dangle
fn chain_end(emotes: &HashMap<ObjectId, Emote>, id: ObjectId) -> Option<ObjectId> {
    let mut seen = BTreeSet::new();
    let mut node = emotes.get(&id)?;
    while let Some(parent) = node.parent_id {
        if !seen.insert(node.id) {
            return None;
        }
        node = emotes.get(&parent)?;
    }
    Some(node.id)
}
