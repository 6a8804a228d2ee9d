//! Read-only aggregation queries backing the site's statistics pages.

use super::models::{ArtistRanking, Playlist, PlaylistYear, SongRanking};
use super::sqlite_playlist_store::parse_day;
use anyhow::Result;
use chrono::Datelike;
use rusqlite::{params, Connection};

/// Plays joined with songs, restricted to the years in `?1` (a JSON array;
/// empty means every year).
const YEAR_SONGS_CTE: &str = "
    WITH year_songs AS (
        SELECT s.artist, s.title, s.spotify_id
        FROM playlists p
            INNER JOIN playlists_songs ps ON p.id = ps.playlists_id
            INNER JOIN songs s ON s.id = ps.songs_id
        WHERE json_array_length(?1) = 0
            OR CAST(substr(p.day, 1, 4) AS INTEGER) IN (SELECT value FROM json_each(?1))
    )";

fn years_param(years: &[i32]) -> Result<String> {
    Ok(serde_json::to_string(years)?)
}

pub(super) fn playlist_years(conn: &Connection) -> Result<Vec<PlaylistYear>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, day, spotify_id
         FROM playlists
         WHERE spotify_id IS NOT NULL
         ORDER BY day DESC",
    )?;
    let playlists = stmt
        .query_map([], |row| {
            Ok(Playlist {
                id: row.get(0)?,
                day: parse_day(1, &row.get::<_, String>(1)?)?,
                spotify_id: row.get(2)?,
                songs: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut years: Vec<PlaylistYear> = Vec::new();
    for playlist in playlists {
        let year = playlist.day.year();
        match years.last_mut() {
            Some(current) if current.year == year => current.playlists.push(playlist),
            _ => years.push(PlaylistYear {
                year,
                playlists: vec![playlist],
            }),
        }
    }
    Ok(years)
}

#[derive(Debug, Clone, Copy)]
pub(super) enum ArtistRankingBy {
    /// Every play counts.
    Plays,
    /// Each distinct title counts once.
    Songs,
}

pub(super) fn artist_rankings(
    conn: &Connection,
    years: &[i32],
    limit: usize,
    by: ArtistRankingBy,
) -> Result<Vec<ArtistRanking>> {
    let count_expr = match by {
        ArtistRankingBy::Plays => "count(*)",
        ArtistRankingBy::Songs => "count(DISTINCT title)",
    };
    let sql = format!(
        "{YEAR_SONGS_CTE}
        SELECT artist, {count_expr} AS plays
        FROM year_songs
        GROUP BY artist
        ORDER BY plays DESC, artist
        LIMIT ?2"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rankings = stmt
        .query_map(params![years_param(years)?, limit as i64], |row| {
            Ok(ArtistRanking {
                artist: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rankings)
}

pub(super) fn song_rankings(
    conn: &Connection,
    years: &[i32],
    limit: usize,
    only_with_external_id: bool,
) -> Result<Vec<SongRanking>> {
    let sql = format!(
        "{YEAR_SONGS_CTE}
        SELECT artist, title, spotify_id, count(*) AS plays
        FROM year_songs
        WHERE ?3 = 0 OR spotify_id IS NOT NULL
        GROUP BY artist, title, spotify_id
        ORDER BY plays DESC, artist, title, spotify_id
        LIMIT ?2"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rankings = stmt
        .query_map(
            params![years_param(years)?, limit as i64, only_with_external_id],
            |row| {
                Ok(SongRanking {
                    artist: row.get(0)?,
                    title: row.get(1)?,
                    spotify_id: row.get(2)?,
                    count: row.get(3)?,
                })
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rankings)
}
