use crate::dump::Revision;
use crate::error::ProcessError;

/// Receives revisions in stream order.
///
/// Implementations that need the revision's metadata take exactly one
/// record from the metadata queue per `process_revision` call; that is what
/// keeps the i-th record paired with the i-th revision.
pub trait RevisionProcessor {
    /// Called once before the first revision.
    fn start(&mut self) {}

    /// Called for every revision, in stream order.
    fn process_revision(&mut self, revision: &Revision) -> Result<(), ProcessError>;

    /// Called once after the last revision, also when processing stopped
    /// early.
    fn finish(&mut self) -> Result<(), ProcessError> {
        Ok(())
    }
}
