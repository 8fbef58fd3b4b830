//! Structural timeline commands.
//!
//! Each command captures what it needs to invert itself when it is
//! constructed or first applied, routes every mutation through the
//! [`Timeline`](splice_timeline::Timeline) primitives, and turns rejected
//! primitives into logged no-ops.
//!
//! Index effects worth knowing when chaining commands:
//!
//! | command                | indices that shift afterwards                    |
//! |------------------------|--------------------------------------------------|
//! | insert / overwrite     | entries at or after the position on that track   |
//! | lift                   | none (the clip becomes a blank)                  |
//! | remove                 | entries after the clip                           |
//! | trim in (no ripple)    | the clip itself, when a blank appears or vanishes |
//! | split                  | entries after the clip, by one                   |
//! | add transition         | entries after the new transition, by one         |
//! | add / insert track     | tracks at or above the new index                 |

mod clip;
mod track;
mod transition;

pub use clip::{
    AppendCommand, FadeInCommand, FadeOutCommand, InsertCommand, LiftCommand, MoveClipCommand,
    MoveInsertClipCommand, OverwriteCommand, RemoveCommand, SplitCommand, TrimClipInCommand,
    TrimClipOutCommand, UpdateCommand,
};
pub use track::{
    AddTrackCommand, BlendTarget, ChangeBlendModeCommand, CompositeTrackCommand, HideTrackCommand,
    InsertTrackCommand, LockTrackCommand, MuteTrackCommand, NameTrackCommand, RemoveTrackCommand,
};
pub use transition::{
    AddTransitionByTrimInCommand, AddTransitionByTrimOutCommand, AddTransitionCommand,
    RemoveTransitionCommand, RemoveTransitionsOnClipCommand, TrimTransitionInCommand,
    TrimTransitionOutCommand,
};

use splice_timeline::{ClipEntry, MediaGraph};

/// Rebuild the clip a command stashed as text.
fn materialize(graph: &dyn MediaGraph, text: &str, command: &str) -> Option<ClipEntry> {
    match graph.deserialize(text).and_then(|node| node.into_clip()) {
        Ok(clip) => Some(clip),
        Err(err) => {
            tracing::warn!(command, %err, "Cannot rebuild clip from text");
            None
        }
    }
}
