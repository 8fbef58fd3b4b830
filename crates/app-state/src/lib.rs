//! `splice-app-state` -- Undoable edit commands for the splice timeline.
//!
//! This crate provides:
//!
//! - **`Command`**: the apply/undo/merge contract every edit implements.
//! - **Structural commands** (`commands`): clip, track and transition edits.
//!   Compound edits undo through an [`UndoHelper`] snapshot.
//! - **Filter commands** (`filter_commands`): parameter, keyframe, attach and
//!   reorder edits on filters, plus replacing a clip's whole filter list.
//! - **`CommandHistory`**: linear undo/redo stack with merging and macros.
//! - **`EditSession`**: the timeline, selection and dirty flag commands act on.
//! - **`EditExecutor`**: runs all edits on one dedicated thread.
//!
//! # Architecture
//!
//! ```text
//! ExecutorHandle ──channel──▶ edit thread
//!                              ├── CommandHistory
//!                              │   ├── undo_stack: Vec<HistoryEntry>
//!                              │   └── redo_stack: Vec<HistoryEntry>
//!                              └── EditSession
//!                                  ├── timeline: Timeline
//!                                  ├── selection: SelectionState
//!                                  └── is_dirty
//! ```

pub mod command;
pub mod commands;
pub mod executor;
pub mod filter_commands;
pub mod history;
pub mod selection;
pub mod snapshot;
pub mod state;

// Re-export primary types at crate root for convenience.
pub use command::{Command, Hook, Phase, UndoId};
pub use executor::{EditExecutor, ExecutorHandle};
pub use filter_commands::{FilterAttachCommand, FilterClipCommand, FilterCommand, FilterMoveCommand, KeyFrameCommand};
pub use history::{CommandHistory, HistoryEntry};
pub use selection::{ClipsSelectCommand, SelectionState};
pub use snapshot::UndoHelper;
pub use state::EditSession;
