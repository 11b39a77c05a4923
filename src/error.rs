use crate::allocator::Layout;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordArrayError {
    /// A placed array was asked to hold more elements than its buffer affords.
    #[error("capacity exceeded: requested {requested} elements, capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    /// The caller-supplied buffer cannot even hold the control fields.
    #[error("buffer too small: {size} bytes, need at least {required}")]
    BufferTooSmall { size: usize, required: usize },

    #[error("capacity overflow")]
    CapacityOverflow,

    #[error("allocation failed: {layout:?}")]
    AllocFailed { layout: Layout },
}

pub type Result<T> = std::result::Result<T, RecordArrayError>;
