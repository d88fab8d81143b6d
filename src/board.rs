//! Registry of active viewers
//!
//! Every viewer (one level stream shown on screen) owns exactly one meter.
//! The board keeps them in one explicit collection keyed by viewer id and
//! routes snapshots and poll calls to the right meter.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use thiserror::Error;

use crate::meter::{Clock, LevelMeter, MeterError, Snapshot, SystemClock};
use crate::render::Surface;

/// Identifies one viewer on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(pub u32);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("Unknown viewer {0}")]
    UnknownViewer(ViewerId),

    #[error(transparent)]
    Meter(#[from] MeterError),
}

/// A viewer's meter and what the board knows about its stream
pub struct Viewer<S: Surface, C: Clock = SystemClock> {
    meter: LevelMeter<S, C>,
    snapshots: u64,
}

impl<S: Surface, C: Clock> Viewer<S, C> {
    pub fn meter(&self) -> &LevelMeter<S, C> {
        &self.meter
    }

    /// Whether the first snapshot has arrived
    pub fn has_data(&self) -> bool {
        self.snapshots > 0
    }

    /// Snapshots received so far
    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }

    /// Channels carried by this viewer's stream
    pub fn channel_count(&self) -> usize {
        self.meter.channel_count()
    }
}

/// Explicit collection of viewers, in id order
pub struct MeterBoard<S: Surface, C: Clock = SystemClock> {
    viewers: BTreeMap<ViewerId, Viewer<S, C>>,
}

impl<S: Surface, C: Clock> Default for MeterBoard<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface, C: Clock> MeterBoard<S, C> {
    pub fn new() -> Self {
        Self {
            viewers: BTreeMap::new(),
        }
    }

    /// Register a viewer's meter
    ///
    /// An existing viewer with the same id is torn down and its surface
    /// returned.
    pub fn open(&mut self, id: ViewerId, meter: LevelMeter<S, C>) -> Option<S> {
        log::info!("Opened {}", id);
        self.viewers
            .insert(id, Viewer { meter, snapshots: 0 })
            .map(|old| old.meter.teardown())
    }

    /// Route a snapshot to a viewer's meter
    pub fn push(&mut self, id: ViewerId, snapshot: &Snapshot) -> Result<(), BoardError> {
        let viewer = self
            .viewers
            .get_mut(&id)
            .ok_or(BoardError::UnknownViewer(id))?;
        viewer.meter.update_snapshot(snapshot)?;
        if viewer.snapshots == 0 {
            log::info!("{}: first snapshot, {} channels", id, snapshot.len());
        }
        viewer.snapshots += 1;
        Ok(())
    }

    /// Run due ticks on every meter
    ///
    /// # Returns
    /// Total number of ticks run
    pub fn poll(&mut self) -> usize {
        self.viewers.values_mut().map(|v| v.meter.poll()).sum()
    }

    /// Earliest tick due on any meter
    pub fn next_deadline(&self) -> Option<Instant> {
        self.viewers
            .values()
            .filter_map(|v| v.meter.next_deadline())
            .min()
    }

    /// Remove a viewer, tearing down its meter
    pub fn close(&mut self, id: ViewerId) -> Option<S> {
        let viewer = self.viewers.remove(&id)?;
        log::info!("Closed {} after {} snapshots", id, viewer.snapshots);
        Some(viewer.meter.teardown())
    }

    pub fn get(&self, id: ViewerId) -> Option<&Viewer<S, C>> {
        self.viewers.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewerId, &Viewer<S, C>)> {
        self.viewers.iter().map(|(id, viewer)| (*id, viewer))
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::{ManualClock, MeterConfig};
    use crate::render::DisplayList;

    fn board(ids: &[u32], clock: &ManualClock) -> MeterBoard<DisplayList, ManualClock> {
        let mut board = MeterBoard::new();
        for &id in ids {
            let meter = LevelMeter::with_clock(MeterConfig::default(), DisplayList::new(), clock.clone());
            board.open(ViewerId(id), meter);
        }
        board
    }

    fn snapshot(values: &[f32]) -> Snapshot {
        Snapshot::new(values.to_vec(), vec![-100.0; values.len()]).unwrap()
    }

    #[test]
    fn test_push_routes_to_viewer() {
        let clock = ManualClock::new();
        let mut board = board(&[0, 1], &clock);

        board.push(ViewerId(1), &snapshot(&[40.0, 50.0])).unwrap();

        assert!(!board.get(ViewerId(0)).unwrap().has_data());
        let viewer = board.get(ViewerId(1)).unwrap();
        assert!(viewer.has_data());
        assert_eq!(viewer.channel_count(), 2);
        assert_eq!(viewer.meter().current_values(), vec![40.0, 50.0]);
    }

    #[test]
    fn test_unknown_viewer() {
        let clock = ManualClock::new();
        let mut board = board(&[0], &clock);

        let err = board.push(ViewerId(7), &snapshot(&[1.0])).unwrap_err();
        assert_eq!(err, BoardError::UnknownViewer(ViewerId(7)));
    }

    #[test]
    fn test_poll_and_deadline_span_viewers() {
        let clock = ManualClock::new();
        let mut board = board(&[0, 1], &clock);
        board.push(ViewerId(0), &snapshot(&[0.0])).unwrap();
        board.push(ViewerId(1), &snapshot(&[0.0])).unwrap();
        assert_eq!(board.next_deadline(), None);

        board.push(ViewerId(0), &snapshot(&[100.0])).unwrap();
        board.push(ViewerId(1), &snapshot(&[50.0])).unwrap();
        assert!(board.next_deadline().is_some());

        clock.advance(MeterConfig::default().tick_interval());
        assert_eq!(board.poll(), 2);
        assert_eq!(board.get(ViewerId(0)).unwrap().meter().current_values(), vec![20.0]);
        assert_eq!(board.get(ViewerId(1)).unwrap().meter().current_values(), vec![10.0]);
    }

    #[test]
    fn test_close_returns_surface() {
        let clock = ManualClock::new();
        let mut board = board(&[0], &clock);
        board.push(ViewerId(0), &snapshot(&[60.0])).unwrap();

        let surface = board.close(ViewerId(0)).unwrap();
        assert_eq!(surface.frames(), 1);
        assert!(board.is_empty());
        assert!(board.close(ViewerId(0)).is_none());
    }
}
