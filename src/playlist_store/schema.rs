//! SQLite schema definitions for the playlist database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};
use rusqlite::Connection;

// =============================================================================
// Version 1 - Playlists, songs and their membership
// =============================================================================

const PLAYLISTS_TABLE_V1: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        // YYYY-MM-DD
        sqlite_column!("day", &SqlType::Text, non_null = true),
        sqlite_column!("spotify_id", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["day"]],
};

const SONGS_TABLE_V1: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("spotify_id", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["artist", "title"]],
};

const PLAYLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "playlists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PLAYLISTS_SONGS_TABLE_V1: Table = Table {
    name: "playlists_songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "playlists_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sqlite_column!(
            "songs_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        // 0-based
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_playlists_songs_songs_id", "songs_id")],
    unique_constraints: &[&["playlists_id", "songs_id"]],
};

// =============================================================================
// Version 2 - Enrichment bookkeeping and aggregate playlists
// =============================================================================

const SONGS_TABLE_V2: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("spotify_id", &SqlType::Text),
        // Unix seconds
        sqlite_column!("spotify_checked_at", &SqlType::Integer),
    ],
    indices: &[],
    unique_constraints: &[&["artist", "title"]],
};

/// Year and all-time ranking playlists, keyed by slug ("2019", "all-time").
const SPECIAL_PLAYLISTS_TABLE_V2: Table = Table {
    name: "special_playlists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("slug", &SqlType::Text, non_null = true),
        sqlite_column!("spotify_id", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["slug"]],
};

fn migrate_v1_to_v2(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("ALTER TABLE songs ADD COLUMN spotify_checked_at INTEGER", [])?;
    SPECIAL_PLAYLISTS_TABLE_V2.create(conn)?;
    Ok(())
}

pub const PLAYLIST_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[PLAYLISTS_TABLE_V1, SONGS_TABLE_V1, PLAYLISTS_SONGS_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            PLAYLISTS_TABLE_V1,
            SONGS_TABLE_V2,
            PLAYLISTS_SONGS_TABLE_V1,
            SPECIAL_PLAYLISTS_TABLE_V2,
        ],
        migration: Some(migrate_v1_to_v2),
    },
];
