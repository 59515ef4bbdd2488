//! File d'attente FIFO d'une session

use crate::track::Track;
use std::collections::VecDeque;

/// Ordered queue of tracks, owned exclusively by one session.
///
/// Pure data structure: callers serialize access through the owning
/// session, so no locking happens here. FIFO by default; the only
/// reordering operation is [`TrackQueue::shuffle`].
#[derive(Clone, Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Append one track at the back.
    pub fn enqueue(&mut self, track: Track) {
        self.items.push_back(track);
    }

    /// Append tracks at the back, preserving their order.
    pub fn enqueue_many<I: IntoIterator<Item = Track>>(&mut self, tracks: I) {
        for track in tracks {
            self.items.push_back(track);
        }
    }

    /// Remove and return the next track to play.
    pub fn pop_front(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// Re-insert a track at the front (repeat-one path).
    pub fn push_front(&mut self, track: Track) {
        self.items.push_front(track);
    }

    /// Next track without removing it.
    pub fn peek_front(&self) -> Option<&Track> {
        self.items.front()
    }

    /// Uniformly random permutation of the entries.
    pub fn shuffle(&mut self) {
        use rand::seq::SliceRandom;

        let mut rng = rand::rng();
        self.items.make_contiguous().shuffle(&mut rng);
    }

    /// Ordered copy of the entries, front first.
    pub fn snapshot(&self) -> Vec<Track> {
        self.items.iter().cloned().collect()
    }
}
