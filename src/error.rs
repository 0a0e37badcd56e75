//! Build-time failures for level authoring.
//!
//! In-frame failures (capacity overflow, draw-budget exhaustion, sampler
//! miss) are never represented here — per the renderer's error-handling
//! design they are swallowed and produce a defined fallback instead of a
//! `Result`. Only failures that make the geometry model itself invalid
//! are fatal.

use thiserror::Error;

/// Things that can go wrong while authoring level geometry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// `update_sector_lines` was called with no sector open on the
    /// builder stack and no explicit sector argument.
    #[error("no sector is open; call begin_sector first")]
    NoOpenSector,

    /// A line batch used `VertexSpec::FinishLoop` but the batch had no
    /// prior vertex to close back to.
    #[error("cannot finish an empty line batch")]
    EmptyBatch,

    /// A line batch used `VertexSpec::AppendPrev` as its very first
    /// vertex, with nothing to append to.
    #[error("cannot append to a line batch that hasn't started")]
    DanglingAppend,

    /// Two vertices of a line DTO resolved to the same vertex (zero
    /// length linedef).
    #[error("degenerate linedef: v0 and v1 resolve to the same vertex")]
    DegenerateLinedef,

    /// `find_linedef`/`set_middle_texture` referenced a linedef that
    /// does not exist.
    #[error("no linedef between the given vertices")]
    UnknownLinedef,
}
