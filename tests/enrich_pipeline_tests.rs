//! End-to-end tests for the enrichment stage

mod common;

use common::{
    FakeStreamingService, TestDb, ARTIST_1, ARTIST_2, ARTIST_3, ARTIST_4, DAY_1, TITLE_1, TITLE_2,
    TITLE_3, TITLE_4, TRACK_1_ID, TRACK_2_ID, TRACK_3_ID,
};
use deathguild::job_pool::JobPool;
use deathguild::pacing::RateLimitPacing;
use deathguild::pipeline::SongEnricher;
use deathguild::playlist_store::{PlaylistStore, Song};
use std::time::{Duration, Instant};

fn enricher<'a>(db: &'a TestDb, service: &'a FakeStreamingService) -> SongEnricher<'a> {
    SongEnricher {
        store: &db.store,
        service,
        pacing: RateLimitPacing::disabled(),
        batch_size: 20,
        max_songs: None,
    }
}

fn stored_song(db: &TestDb, playlist_id: i64, title: &str) -> Song {
    db.store
        .playlist_songs(playlist_id)
        .unwrap()
        .into_iter()
        .find(|s| s.title == title)
        .expect("song not stored")
}

#[test]
fn test_enrich_records_found_and_not_found() {
    let db = TestDb::new();
    let playlist_id = db.add_playlist(DAY_1, &[(ARTIST_1, TITLE_1), (ARTIST_4, TITLE_4)]);
    let service = FakeStreamingService::new().with_track(ARTIST_1, TITLE_1, TRACK_1_ID);

    let summary = enricher(&db, &service).run(&JobPool::new(2).unwrap()).unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.found, 1);
    assert_eq!(summary.not_found, 1);

    let found = stored_song(&db, playlist_id, TITLE_1);
    assert_eq!(found.spotify_id.as_deref(), Some(TRACK_1_ID));
    assert!(found.spotify_checked_at.is_some());

    let missing = stored_song(&db, playlist_id, TITLE_4);
    assert_eq!(missing.spotify_id, None);
    assert!(missing.spotify_checked_at.is_some());

    // The miss is not searched again inside the recheck window
    assert!(db.store.songs_needing_external_id(20).unwrap().is_empty());
}

#[test]
fn test_enrich_retries_without_trailing_parenthetical() {
    let db = TestDb::new();
    let playlist_id = db.add_playlist(DAY_1, &[(ARTIST_3, TITLE_3), (ARTIST_4, TITLE_4)]);
    let service = FakeStreamingService::new().with_track(ARTIST_3, "Stranger", TRACK_3_ID);

    enricher(&db, &service).run(&JobPool::new(1).unwrap()).unwrap();

    assert_eq!(
        stored_song(&db, playlist_id, TITLE_3).spotify_id.as_deref(),
        Some(TRACK_3_ID)
    );

    let searches = service.searches();
    assert!(searches.contains(&format!("artist:{} {}", ARTIST_3, TITLE_3)));
    assert!(searches.contains(&format!("artist:{} Stranger", ARTIST_3)));
    // A title without a parenthetical is searched exactly once
    let plain = searches
        .iter()
        .filter(|q| q.starts_with(&format!("artist:{}", ARTIST_4)))
        .count();
    assert_eq!(plain, 1);
}

#[test]
fn test_enrich_stops_at_max_songs() {
    let db = TestDb::new();
    db.add_playlist(
        DAY_1,
        &[
            ("A", "1"),
            ("B", "2"),
            ("C", "3"),
            ("D", "4"),
            ("E", "5"),
        ],
    );
    let service = FakeStreamingService::new();
    let enricher = SongEnricher {
        batch_size: 2,
        max_songs: Some(3),
        ..enricher(&db, &service)
    };

    let summary = enricher.run(&JobPool::new(2).unwrap()).unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.batches, 2);
    assert_eq!(service.searches().len(), 3);
    assert_eq!(db.store.songs_needing_external_id(20).unwrap().len(), 2);
}

#[test]
fn test_enrich_failure_stops_run_but_commits_successes() {
    let db = TestDb::new();
    let playlist_id = db.add_playlist(DAY_1, &[(ARTIST_1, TITLE_1), (ARTIST_2, TITLE_2)]);
    let service = FakeStreamingService::new()
        .with_track(ARTIST_1, TITLE_1, TRACK_1_ID)
        .with_track(ARTIST_2, TITLE_2, TRACK_2_ID)
        .failing_on(ARTIST_2, TITLE_2);

    let result = enricher(&db, &service).run(&JobPool::new(2).unwrap());

    assert!(result.is_err());
    assert_eq!(
        stored_song(&db, playlist_id, TITLE_1).spotify_id.as_deref(),
        Some(TRACK_1_ID)
    );
    let failed = stored_song(&db, playlist_id, TITLE_2);
    assert_eq!(failed.spotify_id, None);
    assert_eq!(failed.spotify_checked_at, None);

    // The failed song is picked up again by the next run
    let pending = db.store.songs_needing_external_id(20).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, TITLE_2);
}

#[test]
fn test_enrich_pauses_after_every_search() {
    let db = TestDb::new();
    // Not found twice (full title, then trimmed), and one failed search
    db.add_playlist(DAY_1, &[(ARTIST_3, TITLE_3), (ARTIST_2, TITLE_2)]);
    let service = FakeStreamingService::new().failing_on(ARTIST_2, TITLE_2);
    let pause = Duration::from_millis(20);
    let enricher = SongEnricher {
        pacing: RateLimitPacing::new(pause, pause),
        ..enricher(&db, &service)
    };

    let started = Instant::now();
    let result = enricher.run(&JobPool::new(1).unwrap());
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert_eq!(service.searches().len(), 3);
    assert!(elapsed >= pause * 3, "only {:?} elapsed", elapsed);
}

#[test]
fn test_enrich_with_nothing_to_do() {
    let db = TestDb::new();
    let service = FakeStreamingService::new();

    let summary = enricher(&db, &service).run(&JobPool::new(1).unwrap()).unwrap();

    assert_eq!(summary.processed, 0);
    assert!(service.searches().is_empty());
}
