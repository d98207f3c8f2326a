//! Genre matching and genre-group normalization.

use std::collections::HashMap;

lazy_static::lazy_static! {
    /// Lowercase genre tag to the display group it belongs to.
    static ref GENRE_GROUPS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for (genre, group) in [
            ("hip-hop", "Hip-Hop / Rap / R&B"),
            ("rap", "Hip-Hop / Rap / R&B"),
            ("r&b", "Hip-Hop / Rap / R&B"),
            ("electronic", "Electronic / Dance"),
            ("dance", "Electronic / Dance"),
            ("rock", "Rock / Pop"),
            ("pop", "Rock / Pop"),
            ("soul", "Soul / Funk / Disco"),
            ("funk", "Soul / Funk / Disco"),
            ("disco", "Soul / Funk / Disco"),
            ("jazz", "Jazz / Blues"),
            ("blues", "Jazz / Blues"),
            ("reggae", "Reggae / Dub"),
            ("dub", "Reggae / Dub"),
            ("country", "Country / Folk"),
            ("folk", "Country / Folk"),
            ("world", "World / Latin"),
            ("latin", "World / Latin"),
            ("soundtrack", "Soundtrack / Library"),
            ("library", "Soundtrack / Library"),
            ("classical", "Classical"),
        ] {
            m.insert(genre, group);
        }
        m
    };

    /// Group name to the single genre used when querying the catalog.
    static ref SEARCH_GENRES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for (group, genre) in [
            ("Hip-Hop / Rap / R&B", "hip-hop"),
            ("Electronic / Dance", "electronic"),
            ("Rock / Pop", "rock"),
            ("Soul / Funk / Disco", "soul"),
            ("Jazz / Blues", "jazz"),
            ("Reggae / Dub", "reggae"),
            ("Country / Folk", "country"),
            ("World / Latin", "world"),
            ("Soundtrack / Library", "soundtrack"),
            ("Classical", "classical"),
        ] {
            m.insert(group, genre);
        }
        m
    };
}

/// Trimmed, lowercased form used for every genre comparison.
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// True when any tag equals `target` after trimming and case folding.
#[must_use]
pub fn has_genre<S: AsRef<str>>(genres: &[S], target: &str) -> bool {
    let target = normalize_tag(target);
    genres.iter().any(|genre| normalize_tag(genre.as_ref()) == target)
}

/// Maps a user-supplied genre onto its display group.
///
/// Unknown genres come back trimmed and lowercased.
#[must_use]
pub fn normalize_genre(genre: &str) -> String {
    let normalized = normalize_tag(genre);
    match GENRE_GROUPS.get(normalized.as_str()) {
        Some(group) => (*group).to_string(),
        None => normalized,
    }
}

/// Representative catalog genre for a group produced by [`normalize_genre`].
#[must_use]
pub fn search_genre(group: &str) -> String {
    match SEARCH_GENRES.get(group) {
        Some(genre) => (*genre).to_string(),
        None => normalize_tag(group),
    }
}
