/// Checkpoint signal emitted as provisioning stages complete.
///
/// Informational only: no data rides on a checkpoint, and checkpoints are
/// strictly ordered relative to each other (upload → job → ready) because
/// provisioning is a linear sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCheckpoint {
    ArchiveUploaded,
    FineTuneJobCreated,
    TrainingResourceReady,
}

/// Caller-supplied progress sink. Invoked inline by the provisioning stage;
/// implementations should hand off to their own executor if they do real work.
pub type ProgressHandler = dyn Fn(ProgressCheckpoint) + Send + Sync;
