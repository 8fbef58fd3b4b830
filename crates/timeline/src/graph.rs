//! Media-graph collaborator: textual serialization of clips and playlists.
//!
//! The command layer stashes content as text (a removed track, the "after"
//! content of an update) and rebuilds it later. It only needs the three
//! operations of [`MediaGraph`]; [`JsonGraph`] implements them with serde_json.

use serde::{Deserialize, Serialize};

use splice_common::{GraphError, TrackType};

use crate::arena::EntryId;
use crate::entry::{ClipEntry, Entry};
use crate::filter::Filter;

/// One entry of a serialized playlist. `id` lets a restore reuse the handle
/// the entry had when it was serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: Option<EntryId>,
    pub entry: Entry,
}

/// Serialized form of a track's content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistNode {
    pub name: String,
    pub track_type: TrackType,
    pub entries: Vec<PlaylistItem>,
    /// Filters attached to the track itself.
    pub filters: Vec<Filter>,
}

/// A producer subtree the media graph can serialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Clip(ClipEntry),
    Playlist(PlaylistNode),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Clip(_) => "clip",
            Self::Playlist(_) => "playlist",
        }
    }

    pub fn into_clip(self) -> Result<ClipEntry, GraphError> {
        match self {
            Self::Clip(clip) => Ok(clip),
            other => Err(GraphError::UnexpectedNode {
                expected: "clip",
                found: other.kind_name(),
            }),
        }
    }

    pub fn into_playlist(self) -> Result<PlaylistNode, GraphError> {
        match self {
            Self::Playlist(playlist) => Ok(playlist),
            other => Err(GraphError::UnexpectedNode {
                expected: "playlist",
                found: other.kind_name(),
            }),
        }
    }
}

/// Serialization service of the underlying media engine.
pub trait MediaGraph: Send + Sync {
    fn serialize(&self, node: &Node) -> Result<String, GraphError>;
    fn deserialize(&self, text: &str) -> Result<Node, GraphError>;

    /// Deep copy of a node, detached from the original.
    fn clone_node(&self, node: &Node) -> Result<Node, GraphError> {
        let text = self.serialize(node)?;
        self.deserialize(&text)
    }
}

/// [`MediaGraph`] backed by JSON text.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonGraph;

impl MediaGraph for JsonGraph {
    fn serialize(&self, node: &Node) -> Result<String, GraphError> {
        Ok(serde_json::to_string(node)?)
    }

    fn deserialize(&self, text: &str) -> Result<Node, GraphError> {
        Ok(serde_json::from_str(text)?)
    }

    fn clone_node(&self, node: &Node) -> Result<Node, GraphError> {
        Ok(node.clone())
    }
}
