use arcstr::ArcStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the connectivity engine and the layout container.
///
/// Internal invariant violations are not represented here; those are hard
/// assertions, since they indicate a bug in the engine rather than a
/// recoverable caller error. Empty or not-found queries do not fail either;
/// they return empty views.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("layout has not been finalized")]
    NotFinalized,

    #[error("no such cell: index {0}")]
    UnknownCell(u32),

    #[error("duplicate cell name `{0}`")]
    DuplicateCellName(ArcStr),

    #[error("recursive cell hierarchy involving `{0}`")]
    RecursiveHierarchy(ArcStr),
}
