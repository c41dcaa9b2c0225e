//! End-to-end engine scenarios over in-memory collaborators.

use std::sync::Arc;

use artfill_config::{EngineConfig, LibrarySelection, RunOptions};
use artfill_core::ArtworkEngine;
use artfill_core::providers::ProviderRegistry;
use artfill_core::storage::MemoryStore;
use artfill_core::testing::{
    ManualClock, MemoryMediaServer, ScriptedProvider, ScriptedResponse,
    movie, movie_library, poster_candidate,
};

async fn engine_with(
    config: EngineConfig,
    providers: Vec<Arc<ScriptedProvider>>,
    media: Arc<MemoryMediaServer>,
) -> ArtworkEngine {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }
    ArtworkEngine::new(
        config,
        media,
        registry,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
    )
    .await
    .unwrap()
}

fn posters_only() -> RunOptions {
    RunOptions {
        include_backgrounds: false,
        ..RunOptions::default()
    }
}

fn serial() -> EngineConfig {
    EngineConfig {
        parallelism: 1,
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn second_run_issues_zero_provider_queries() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha"), movie("m2", "Beta")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine = engine_with(
        EngineConfig::default(),
        vec![tmdb.clone()],
        media.clone(),
    )
    .await;

    let stats = engine.run(posters_only()).await.unwrap();
    assert_eq!(stats.items_scanned, 2);
    assert_eq!(stats.applied, 2);
    assert_eq!(media.uploads().len(), 2);
    let calls_after_first = tmdb.calls();

    let stats = engine.run(posters_only()).await.unwrap();
    assert_eq!(stats.applied, 0);
    assert_eq!(stats.keys_skipped, 2);
    assert_eq!(tmdb.calls(), calls_after_first);
    assert_eq!(media.uploads().len(), 2);
}

#[tokio::test]
async fn auth_failed_provider_is_skipped_for_the_rest_of_the_run() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![
            movie("m1", "Alpha"),
            movie("m2", "Beta"),
            movie("m3", "Gamma"),
        ],
    );
    let tmdb = Arc::new(ScriptedProvider::new(
        "tmdb",
        ScriptedResponse::Auth,
    ));
    let fanart = Arc::new(ScriptedProvider::always(
        "fanart",
        vec![poster_candidate("fanart", "https://img/f.jpg", 1000, 1500)],
    ));
    let engine = engine_with(
        serial(),
        vec![tmdb.clone(), fanart.clone()],
        media.clone(),
    )
    .await;

    let stats = engine.run(posters_only()).await.unwrap();
    assert_eq!(stats.applied, 3);
    // First item hits the bad key; the cooldown keeps every later item
    // away from it.
    assert_eq!(tmdb.calls(), 1);
    assert_eq!(fanart.calls(), 3);

    let status = engine.run_status();
    let tmdb_usage = status
        .providers
        .iter()
        .find(|usage| usage.name == "tmdb")
        .unwrap();
    assert!(tmdb_usage.cooldown_until.is_some());
}

#[tokio::test]
async fn approval_workflow_applies_and_archives() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha"), movie("m2", "Beta")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb], media.clone()).await;
    let options = RunOptions {
        final_approval: true,
        ..posters_only()
    };

    let stats = engine.run(options).await.unwrap();
    assert_eq!(stats.proposals_created, 2);
    assert!(media.uploads().is_empty());

    let pending = engine.list_pending_proposals();
    assert_eq!(pending.len(), 2);
    engine.decide(pending[0].id, true).await.unwrap();
    engine.decide(pending[1].id, false).await.unwrap();

    let summary = engine.apply_approved().await.unwrap();
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.declined, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(media.uploads().len(), 1);
    assert!(engine.list_pending_proposals().is_empty());

    let stats = engine.history().statistics().await.unwrap();
    assert_eq!(stats.total_applied, 1);
    assert_eq!(stats.declined, 1);
}

#[tokio::test]
async fn repeated_dry_runs_reuse_the_cached_preview() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb.clone()], media.clone()).await;
    let options = RunOptions {
        dry_run: true,
        ..posters_only()
    };

    let first = engine.run(options.clone()).await.unwrap();
    assert_eq!(first.dry_run_decisions, 1);

    // The preview is cached, so the second dry run answers without a
    // single new provider query.
    let second = engine.run(options).await.unwrap();
    assert_eq!(second.dry_run_decisions, 0);
    assert_eq!(second.keys_skipped, 1);
    assert_eq!(tmdb.calls(), 1);
    assert!(media.uploads().is_empty());
    assert!(engine.list_pending_proposals().is_empty());

    // A later real run is not short-circuited by the preview.
    let real = engine.run(posters_only()).await.unwrap();
    assert_eq!(real.applied, 1);
    assert_eq!(media.uploads().len(), 1);
}

#[tokio::test]
async fn declined_proposal_does_not_bury_the_key() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb.clone()], media.clone()).await;
    let options = RunOptions {
        final_approval: true,
        ..posters_only()
    };

    engine.run(options.clone()).await.unwrap();
    let pending = engine.list_pending_proposals();
    assert_eq!(pending.len(), 1);
    engine.decide(pending[0].id, false).await.unwrap();
    let summary = engine.apply_approved().await.unwrap();
    assert_eq!(summary.declined, 1);

    // The slot is still empty, so a later run proposes again instead of
    // treating the key as resolved.
    let stats = engine.run(options).await.unwrap();
    assert_eq!(stats.keys_skipped, 0);
    assert_eq!(stats.proposals_created, 1);
    assert_eq!(tmdb.calls(), 2);
    assert_eq!(engine.list_pending_proposals().len(), 1);
}

#[tokio::test]
async fn better_proportioned_poster_wins() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![
            poster_candidate("tmdb", "https://img/tall.jpg", 1500, 3000),
            poster_candidate("tmdb", "https://img/good.jpg", 1000, 1500),
        ],
    ));
    let engine =
        engine_with(serial(), vec![tmdb], media.clone()).await;

    engine.run(posters_only()).await.unwrap();
    let uploads = media.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].url, "https://img/good.jpg");
}

#[tokio::test]
async fn only_missing_overrides_overwrite() {
    let media = Arc::new(MemoryMediaServer::new());
    let mut item = movie("m1", "Alpha");
    item.has_poster = true;
    item.poster_url = Some("https://img/existing.jpg".to_string());
    media.add_library(movie_library("lib1", "Movies"), vec![item]);
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb.clone()], media.clone()).await;
    let options = RunOptions {
        overwrite: true,
        only_missing: true,
        ..posters_only()
    };

    let stats = engine.run(options).await.unwrap();
    assert_eq!(stats.keys_skipped, 1);
    assert_eq!(tmdb.calls(), 0);
    assert!(media.uploads().is_empty());
}

#[tokio::test]
async fn failed_upload_becomes_a_pending_proposal() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    media.set_fail_uploads(true);
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb], media.clone()).await;

    let stats = engine.run(posters_only()).await.unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.proposals_created, 1);
    assert!(media.uploads().is_empty());

    // The preserved winner can be applied once the server recovers.
    media.set_fail_uploads(false);
    let pending = engine.list_pending_proposals();
    assert_eq!(pending.len(), 1);
    engine.decide(pending[0].id, true).await.unwrap();
    let summary = engine.apply_approved().await.unwrap();
    assert_eq!(summary.applied, 1);
    assert_eq!(media.uploads().len(), 1);
}

#[tokio::test]
async fn named_library_selection_limits_the_scan() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    media.add_library(
        movie_library("lib2", "Anime"),
        vec![movie("a1", "Haru")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb], media.clone()).await;
    let options = RunOptions {
        libraries: LibrarySelection::Named(vec!["Movies".to_string()]),
        ..posters_only()
    };

    let stats = engine.run(options).await.unwrap();
    assert_eq!(stats.items_scanned, 1);
    assert_eq!(media.uploads().len(), 1);
    assert_eq!(media.uploads()[0].item_id.as_str(), "m1");
}

#[tokio::test]
async fn disabled_provider_is_not_queried() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/p.jpg", 1000, 1500)],
    ));
    let fanart = Arc::new(ScriptedProvider::always(
        "fanart",
        vec![poster_candidate("fanart", "https://img/f.jpg", 1000, 1500)],
    ));
    let engine = engine_with(
        serial(),
        vec![tmdb.clone(), fanart.clone()],
        media.clone(),
    )
    .await;

    engine.run(posters_only()).await.unwrap();
    assert_eq!(tmdb.calls(), 1);
    assert_eq!(fanart.calls(), 0);

    // Disable the winner; a fresh item must be served by the fallback.
    engine.set_provider_enabled("tmdb", false);
    media.add_library(
        movie_library("lib2", "More Movies"),
        vec![movie("m2", "Beta")],
    );
    engine.run(posters_only()).await.unwrap();
    assert_eq!(tmdb.calls(), 1);
    assert_eq!(fanart.calls(), 1);
    assert_eq!(media.uploads().len(), 2);
}

#[tokio::test]
async fn background_slot_is_processed_when_enabled() {
    let media = Arc::new(MemoryMediaServer::new());
    media.add_library(
        movie_library("lib1", "Movies"),
        vec![movie("m1", "Alpha")],
    );
    let tmdb = Arc::new(ScriptedProvider::always(
        "tmdb",
        vec![poster_candidate("tmdb", "https://img/w.jpg", 1920, 1080)],
    ));
    let engine =
        engine_with(serial(), vec![tmdb], media.clone()).await;

    let stats = engine.run(RunOptions::default()).await.unwrap();
    assert_eq!(stats.applied, 2);
    let slots: Vec<_> =
        media.uploads().iter().map(|u| u.slot).collect();
    assert_eq!(slots.len(), 2);
}
