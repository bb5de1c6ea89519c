//! Generation-tagged asynchronous image decoding.
//!
//! Restoring content after a resize and retrieving a saved drawing both
//! decode images before drawing them. Hosts run the decode off the event
//! path and hand the outcome back; only the most recently issued job may
//! touch the raster, so completions that arrive out of order are dropped.

use crate::snapshot::{self, SnapshotError};
use tiny_skia::Pixmap;

/// Why a decode was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePurpose {
    /// Redraw content captured before a resize, beneath any newer ink.
    Restore,
    /// Draw a drawing loaded from storage, replacing the ink.
    Retrieve,
}

/// A pending decode handed to the host.
#[derive(Debug, Clone)]
pub struct DecodeJob {
    pub generation: u64,
    pub purpose: DecodePurpose,
    /// Encoded images, bottom layer first.
    pub layers: Vec<String>,
}

impl DecodeJob {
    /// Decode every layer. Hosts may call this from a deferred task.
    pub fn run(self) -> DecodeOutcome {
        DecodeOutcome {
            generation: self.generation,
            purpose: self.purpose,
            result: self
                .layers
                .iter()
                .map(|url| snapshot::decode_data_url(url))
                .collect(),
        }
    }
}

/// Result of running a [`DecodeJob`].
#[derive(Debug)]
pub struct DecodeOutcome {
    pub generation: u64,
    pub purpose: DecodePurpose,
    pub result: Result<Vec<Pixmap>, SnapshotError>,
}

/// What to do with a finished decode.
#[derive(Debug)]
pub enum Completion {
    Apply(Vec<Pixmap>),
    Failed(SnapshotError),
    Stale,
}

/// The latest issued job while it has not completed.
#[derive(Debug, Clone)]
struct Pending {
    purpose: DecodePurpose,
    layers: Vec<String>,
}

/// Issues decode jobs and filters their completions.
#[derive(Debug, Default)]
pub struct DecodeTracker {
    generation: u64,
    queued: Vec<DecodeJob>,
    pending: Option<Pending>,
}

impl DecodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recently issued job or invalidation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a decode that supersedes everything issued before it.
    pub fn issue(&mut self, purpose: DecodePurpose, layers: Vec<String>) -> u64 {
        self.generation += 1;
        self.pending = Some(Pending {
            purpose,
            layers: layers.clone(),
        });
        self.queued.push(DecodeJob {
            generation: self.generation,
            purpose,
            layers,
        });
        self.generation
    }

    /// Queue the restore step of a resize.
    ///
    /// A job still in flight would be discarded by the resize before its
    /// images reached the surface, so it is carried into the new job. A
    /// pending restore keeps its layers beneath the freshly captured ink. A
    /// pending retrieve replaces the ink when it lands, so the capture is
    /// dropped. Returns `None` when there is nothing to restore.
    pub fn issue_restore(&mut self, snapshot: Option<String>) -> Option<u64> {
        let (purpose, mut layers) = match self.pending.take() {
            Some(Pending {
                purpose: DecodePurpose::Retrieve,
                layers,
            }) => (DecodePurpose::Retrieve, layers),
            Some(Pending { layers, .. }) => (DecodePurpose::Restore, layers),
            None => (DecodePurpose::Restore, Vec::new()),
        };
        if purpose == DecodePurpose::Restore {
            layers.extend(snapshot);
        }

        if layers.is_empty() {
            self.invalidate();
            None
        } else {
            Some(self.issue(purpose, layers))
        }
    }

    /// Make every outstanding job stale.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.queued.clear();
    }

    /// Hand queued jobs to the host.
    pub fn take_jobs(&mut self) -> Vec<DecodeJob> {
        let current = self.generation;
        let mut jobs = std::mem::take(&mut self.queued);
        jobs.retain(|job| job.generation == current);
        jobs
    }

    /// Whether a job is still waiting to be taken or completed.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Classify a finished decode.
    pub fn complete(&mut self, outcome: DecodeOutcome) -> Completion {
        if !self.is_current(outcome.generation) {
            log::debug!(
                "Discarding stale {:?} decode (generation {}, current {})",
                outcome.purpose,
                outcome.generation,
                self.generation
            );
            return Completion::Stale;
        }

        self.pending = None;
        match outcome.result {
            Ok(layers) => Completion::Apply(layers),
            Err(e) => Completion::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{encode_pixmap, to_data_url};

    fn url() -> String {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        pixmap.fill(tiny_skia::Color::BLACK);
        to_data_url(&encode_pixmap(&pixmap).unwrap())
    }

    fn other_url() -> String {
        let mut pixmap = Pixmap::new(3, 3).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        to_data_url(&encode_pixmap(&pixmap).unwrap())
    }

    #[test]
    fn test_latest_job_applies() {
        let mut tracker = DecodeTracker::new();
        tracker.issue(DecodePurpose::Retrieve, vec![url()]);
        let jobs = tracker.take_jobs();
        assert_eq!(jobs.len(), 1);

        let outcome = jobs.into_iter().next().unwrap().run();
        assert!(matches!(tracker.complete(outcome), Completion::Apply(layers) if layers.len() == 1));
    }

    #[test]
    fn test_out_of_order_completion_is_stale() {
        let mut tracker = DecodeTracker::new();
        tracker.issue(DecodePurpose::Restore, vec![url()]);
        let older = tracker.take_jobs().pop().unwrap();
        tracker.issue(DecodePurpose::Restore, vec![url()]);
        let newer = tracker.take_jobs().pop().unwrap();

        assert!(matches!(tracker.complete(newer.run()), Completion::Apply(_)));
        assert!(matches!(tracker.complete(older.run()), Completion::Stale));
    }

    #[test]
    fn test_queued_stale_jobs_are_not_handed_out() {
        let mut tracker = DecodeTracker::new();
        tracker.issue(DecodePurpose::Restore, vec![url()]);
        tracker.issue(DecodePurpose::Restore, vec![url()]);
        let jobs = tracker.take_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].generation, tracker.generation());
    }

    #[test]
    fn test_invalidate_drops_outstanding_work() {
        let mut tracker = DecodeTracker::new();
        tracker.issue(DecodePurpose::Retrieve, vec![url()]);
        let job = tracker.take_jobs().pop().unwrap();
        tracker.invalidate();
        assert!(matches!(tracker.complete(job.run()), Completion::Stale));
        assert!(tracker.take_jobs().is_empty());
    }

    #[test]
    fn test_resize_keeps_pending_retrieve() {
        let mut tracker = DecodeTracker::new();
        let retrieved = url();
        tracker.issue(DecodePurpose::Retrieve, vec![retrieved.clone()]);
        let _in_flight = tracker.take_jobs();

        tracker.issue_restore(Some(other_url()));
        let jobs = tracker.take_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].purpose, DecodePurpose::Retrieve);
        assert_eq!(jobs[0].layers, vec![retrieved]);
    }

    #[test]
    fn test_resize_stacks_capture_over_pending_restore() {
        let mut tracker = DecodeTracker::new();
        let first = url();
        let captured = other_url();
        tracker.issue_restore(Some(first.clone()));
        let _in_flight = tracker.take_jobs();

        tracker.issue_restore(Some(captured.clone()));
        let jobs = tracker.take_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].purpose, DecodePurpose::Restore);
        assert_eq!(jobs[0].layers, vec![first, captured]);
    }

    #[test]
    fn test_resize_without_capture_keeps_pending_restore() {
        let mut tracker = DecodeTracker::new();
        let first = url();
        tracker.issue_restore(Some(first.clone()));
        let _in_flight = tracker.take_jobs();

        tracker.issue_restore(None);
        let jobs = tracker.take_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].layers, vec![first]);
    }

    #[test]
    fn test_completed_job_is_not_adopted() {
        let mut tracker = DecodeTracker::new();
        tracker.issue_restore(Some(url()));
        let job = tracker.take_jobs().pop().unwrap();
        assert!(matches!(tracker.complete(job.run()), Completion::Apply(_)));

        assert_eq!(tracker.issue_restore(None), None);
    }

    #[test]
    fn test_restore_without_snapshot_invalidates() {
        let mut tracker = DecodeTracker::new();
        tracker.issue(DecodePurpose::Restore, vec![url()]);
        let job = tracker.take_jobs().pop().unwrap();
        tracker.invalidate();

        assert_eq!(tracker.issue_restore(None), None);
        assert!(tracker.take_jobs().is_empty());
        assert!(matches!(tracker.complete(job.run()), Completion::Stale));
    }

    #[test]
    fn test_failed_layer_fails_the_job() {
        let mut tracker = DecodeTracker::new();
        tracker.issue(
            DecodePurpose::Restore,
            vec![url(), "data:image/png;base64,AAAA".to_string()],
        );
        let job = tracker.take_jobs().pop().unwrap();
        assert!(matches!(tracker.complete(job.run()), Completion::Failed(_)));
    }
}
