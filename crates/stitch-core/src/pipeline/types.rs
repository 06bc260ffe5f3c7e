/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum PipelineStage {
    Reading,
    Correlating,
    StageModel,
    Refining,
    GlobalPosition,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading tiles"),
            Self::Correlating => write!(f, "Computing pairwise translations"),
            Self::StageModel => write!(f, "Inferring stage model"),
            Self::Refining => write!(f, "Refining translations"),
            Self::GlobalPosition => write!(f, "Computing global positions"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., edge count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when the orchestrator is driven without a UI.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
