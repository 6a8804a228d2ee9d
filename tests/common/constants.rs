//! Shared constants for pipeline tests
//!
//! When test data changes (days, artists, track ids), update only this file.

// ============================================================================
// Playlist days
// ============================================================================

pub const DAY_1: &str = "2018-12-31";
pub const DAY_2: &str = "2019-01-07";
pub const DAY_3: &str = "2019-01-14";

// ============================================================================
// Songs
// ============================================================================

pub const ARTIST_1: &str = "Depeche Mode";
pub const TITLE_1: &str = "Never Let Me Down Again";
pub const TRACK_1_ID: &str = "track-depeche-mode";

pub const ARTIST_2: &str = "Covenant";
pub const TITLE_2: &str = "Bullet";
pub const TRACK_2_ID: &str = "track-covenant";

pub const ARTIST_3: &str = "Clan of Xymox";
pub const TITLE_3: &str = "Stranger (Extended Mix)";
/// Only found when searching without the trailing parenthetical.
pub const TRACK_3_ID: &str = "track-clan-of-xymox";

pub const ARTIST_4: &str = "Unknown Band";
pub const TITLE_4: &str = "Unreleased Demo";

// ============================================================================
// Spotify
// ============================================================================

pub const SPOTIFY_USER_ID: &str = "deathguild-user";
