//! Graph document for presenting search results.
//!
//! Flattens a list of [`SearchResult`]s into the shape a front end draws:
//! every song once, an undirected adjacency list built from the paths, and
//! the paths themselves as id lists.

use crate::song::{Artist, SearchResult, Song};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One song as drawn in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: i64,
    pub title: String,
    pub artists: Vec<Artist>,
    pub genres: Vec<String>,
}

impl From<&Song> for GraphNode {
    fn from(song: &Song) -> Self {
        Self {
            id: song.id,
            title: song.title.clone(),
            artists: song.artists.clone(),
            genres: song.genres.clone(),
        }
    }
}

/// One search result as a chain of node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathInfo {
    /// Id of the seed song
    pub start: String,
    /// Id of the matched song
    pub end: String,
    /// Ids from `start` to `end`, inclusive
    pub path_nodes: Vec<String>,
    /// Hops from `start` to `end`
    pub distance: usize,
}

/// Search results flattened into nodes, edges and paths.
///
/// Keys are song ids rendered as strings, matching the JSON output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    /// Undirected edges taken from consecutive path entries
    pub adjacency_list: BTreeMap<String, BTreeSet<String>>,
    /// Every song that appears in any result
    pub nodes: BTreeMap<String, GraphNode>,
    /// One entry per result, in result order
    pub paths: Vec<PathInfo>,
}

impl GraphDocument {
    /// Builds the document for `results`. Songs shared between results
    /// appear once.
    #[must_use]
    pub fn from_results(results: &[SearchResult]) -> Self {
        let mut doc = Self::default();

        for result in results {
            doc.add_node(&result.source_song);
            doc.add_node(&result.matched_song);
            for song in &result.path {
                doc.add_node(song);
            }

            for pair in result.path.windows(2) {
                let (a, b) = (pair[0].id.to_string(), pair[1].id.to_string());
                doc.adjacency_list.entry(a.clone()).or_default().insert(b.clone());
                doc.adjacency_list.entry(b).or_default().insert(a);
            }

            doc.paths.push(PathInfo {
                start: result.source_song.id.to_string(),
                end: result.matched_song.id.to_string(),
                path_nodes: result.path.iter().map(|s| s.id.to_string()).collect(),
                distance: result.distance,
            });
        }

        doc
    }

    fn add_node(&mut self, song: &Song) {
        self.nodes
            .entry(song.id.to_string())
            .or_insert_with(|| GraphNode::from(song));
    }
}
