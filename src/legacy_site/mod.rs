//! Scraping of the legacy Death Guild site.
//!
//! The site is not under our control and has used two page layouts over the
//! years. Both are handled here; anything that does not fit either layout is
//! reported as a [`ScrapeError`] rather than silently producing a partial or
//! empty playlist.

mod client;

pub use client::{LegacySiteClient, PlaylistSource, DEFAULT_BASE_URL};

use crate::playlist_store::NewSong;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Structural parse error: {0}")]
    StructuralParse(String),

    /// The page parsed but yielded no songs, which means the scraping logic
    /// no longer matches the site.
    #[error("Found zero-length playlist")]
    EmptyPlaylist,

    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },
}

/// A link to one day's playlist, as found on the index page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaylistLink(pub String);

impl PlaylistLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The day is the last path segment of a playlist link.
pub fn extract_day(link: &PlaylistLink) -> Result<NaiveDate, ScrapeError> {
    let segment = link
        .as_str()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(segment, "%Y-%m-%d").map_err(|e| {
        ScrapeError::StructuralParse(format!("Invalid day '{}' in link {}: {}", segment, link, e))
    })
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::StructuralParse(format!("Invalid selector '{}': {:?}", css, e)))
}

/// Extracts every playlist link from the index page.
///
/// A link without `href` fails the whole parse.
pub fn scrape_index(document: &str) -> Result<Vec<PlaylistLink>, ScrapeError> {
    let html = Html::parse_document(document);
    let links_selector = selector("#playlist table a")?;

    let links = html
        .select(&links_selector)
        .map(|a| match a.value().attr("href") {
            Some(href) => Ok(PlaylistLink(href.to_string())),
            None => Err(ScrapeError::StructuralParse(format!(
                "No href attribute for link: {}",
                element_text(&a)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!("Found {} playlist(s) in index", links.len());
    Ok(links)
}

/// The page layouts the site has used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistLayout {
    /// Rows of `table.Normal`, artist and title in the first two cells.
    Table,
    /// `div#playlist` with each artist in an `<em>`, followed by ` - title`.
    InlineEmphasis,
}

impl PlaylistLayout {
    /// Picks the layout whose selector matches the document.
    pub fn detect(html: &Html) -> Result<Option<Self>, ScrapeError> {
        if html.select(&selector("table.Normal tr")?).next().is_some() {
            return Ok(Some(PlaylistLayout::Table));
        }
        if html.select(&selector("div#playlist em")?).next().is_some() {
            return Ok(Some(PlaylistLayout::InlineEmphasis));
        }
        Ok(None)
    }
}

/// Extracts the ordered songs of one day's playlist page.
pub fn scrape_playlist(document: &str) -> Result<Vec<NewSong>, ScrapeError> {
    let html = Html::parse_document(document);

    let songs = match PlaylistLayout::detect(&html)? {
        Some(PlaylistLayout::Table) => scrape_table_layout(&html)?,
        Some(PlaylistLayout::InlineEmphasis) => scrape_inline_emphasis_layout(&html)?,
        None => Vec::new(),
    };

    if songs.is_empty() {
        return Err(ScrapeError::EmptyPlaylist);
    }

    info!("Found playlist of {} song(s)", songs.len());
    Ok(songs)
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn scrape_table_layout(html: &Html) -> Result<Vec<NewSong>, ScrapeError> {
    let row_selector = selector("table.Normal tr")?;
    let cell_selector = selector("td")?;

    let mut songs = Vec::new();
    for row in html.select(&row_selector) {
        let mut cells = row.select(&cell_selector);
        let (Some(artist), Some(title)) = (cells.next(), cells.next()) else {
            continue;
        };
        let artist = element_text(&artist);
        let title = element_text(&title);

        if artist == "Artist" && title == "Title" {
            continue;
        }
        songs.push(NewSong { artist, title });
    }
    Ok(songs)
}

/// Escapes text the way the HTML serializer does, so it can be located in an
/// element's serialized inner HTML.
fn escape_serialized_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn decode_entities(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect()
}

/// Finds the title following `<em>ARTIST</em>` in the parent's serialized
/// HTML, starting at `from`. Returns the decoded title and the offset just
/// past the match.
fn find_title_after_artist(
    parent_html: &str,
    artist: &str,
    from: usize,
) -> Result<Option<(String, usize)>, ScrapeError> {
    let pattern = format!(
        "<em>{}</em> - ([^<]*)<",
        regex::escape(&escape_serialized_text(artist))
    );
    let rx = Regex::new(&pattern)
        .map_err(|e| ScrapeError::StructuralParse(format!("Bad title pattern: {}", e)))?;

    Ok(rx.captures_at(parent_html, from).and_then(|caps| {
        let whole = caps.get(0)?;
        let title = caps.get(1)?;
        Some((decode_entities(title.as_str()).trim().to_string(), whole.end()))
    }))
}

fn scrape_inline_emphasis_layout(html: &Html) -> Result<Vec<NewSong>, ScrapeError> {
    let em_selector = selector("div#playlist em")?;

    // An artist can appear more than once under the same parent, so each
    // search resumes where the previous match in that parent ended.
    let mut parent_html_cache = HashMap::new();
    let mut offsets = HashMap::new();

    let mut songs = Vec::new();
    for em in html.select(&em_selector) {
        let artist = em.text().collect::<String>();
        let parent = em
            .parent()
            .and_then(ElementRef::wrap)
            .ok_or_else(|| ScrapeError::StructuralParse(format!("No parent for: {}", artist)))?;

        let parent_html = parent_html_cache
            .entry(parent.id())
            .or_insert_with(|| parent.inner_html());
        let from = offsets.get(&parent.id()).copied().unwrap_or(0);

        let Some((title, end)) = find_title_after_artist(parent_html, &artist, from)? else {
            return Err(ScrapeError::StructuralParse(format!(
                "Failed to find title match for: {}",
                artist
            )));
        };
        debug!("Scraped {} - {}", artist, title);
        offsets.insert(parent.id(), end);
        songs.push(NewSong { artist, title });
    }
    Ok(songs)
}
