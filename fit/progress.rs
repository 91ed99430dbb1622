use crate::model::ModelKind;

/// Snapshot handed to an [`IterationObserver`] at the end of each solver iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationProgress {
    pub model: ModelKind,
    /// 1-based iteration index.
    pub iteration: usize,
    /// Magnitude of the update compared against the convergence tolerance.
    pub change: f64,
    /// Mean of the current parameter vector on the solver's internal scale.
    pub mean_parameter: f64,
}

/// Observer for reporting incremental progress while fitting a model.
pub trait IterationObserver {
    fn on_iteration(&mut self, progress: &IterationProgress) {
        let _ = progress;
    }
}

#[derive(Default)]
pub struct NoopIterationObserver;

impl IterationObserver for NoopIterationObserver {}

/// Forwards every iteration to the `log` facade at debug level.
#[derive(Default)]
pub struct LogIterationObserver;

impl IterationObserver for LogIterationObserver {
    fn on_iteration(&mut self, progress: &IterationProgress) {
        log::debug!(
            "[{}] Iteration {:4}: change {:.3e}, mean parameter {:.6}",
            progress.model,
            progress.iteration,
            progress.change,
            progress.mean_parameter
        );
    }
}

/// Collects every progress record; handy for inspecting convergence traces.
#[derive(Default, Debug)]
pub struct RecordingIterationObserver {
    pub records: Vec<IterationProgress>,
}

impl IterationObserver for RecordingIterationObserver {
    fn on_iteration(&mut self, progress: &IterationProgress) {
        self.records.push(*progress);
    }
}
