//! Content-match classifier.
//!
//! Sync only makes sense when every peer shows the same thing. Episodes are
//! compared by show/season/episode when both sides carry that information;
//! everything else falls back to title, then label.

use crate::peer::Peer;
use bridge_traits::CurrentItem;

/// Whether `other` presents the same content as `reference`.
pub fn items_match(reference: &CurrentItem, other: &CurrentItem) -> bool {
    match (reference.episode_info(), other.episode_info()) {
        (Some(a), Some(b)) => a == b,
        _ => reference.title == other.title || reference.label == other.label,
    }
}

/// Whether every peer that answered this cycle presents the same content.
///
/// Unreachable peers are left out; the first peer playing a video is the
/// reference. A peer that answered without an active video player makes the
/// whole set a mismatch, even when it is the only peer. So does a cycle in
/// which nobody answered.
pub fn same_content(peers: &[Peer]) -> bool {
    if peers
        .iter()
        .any(|peer| peer.is_available() && peer.player().is_none())
    {
        return false;
    }

    let mut live = peers.iter().filter(|peer| peer.is_playing_video());
    let Some(reference) = live.next() else {
        return false;
    };

    live.all(|peer| items_match(reference.item(), peer.item()))
}
