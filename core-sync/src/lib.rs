//! # Playback Sync Module
//!
//! Keeps several media players on the same position of the same content.
//!
//! ## Components
//!
//! - **Peer State** (`peer`): Per-endpoint observations and the expected state
//!   established by the last command
//! - **Content Match** (`content`): Decides whether every peer shows the same thing
//! - **Drift Classifier** (`drift`): Compares observations against expected state
//! - **Reconciliation** (`reconcile`): Selects and drives the corrective protocol
//! - **Sync Coordinator** (`coordinator`): The poll loop tying it all together

pub mod content;
pub mod coordinator;
pub mod drift;
pub mod error;
pub mod peer;
pub mod reconcile;

pub use content::{items_match, same_content};
pub use coordinator::{CycleOutcome, PeerStatus, SyncCoordinator};
pub use drift::{classify, DriftReason, Verdict};
pub use error::{Result, SyncError};
pub use peer::{format_position, seek_percentage, ExpectedState, Peer};
pub use reconcile::{select_protocol, Protocol, Reconciler};
