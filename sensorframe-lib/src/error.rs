#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("field/scale count mismatch: {names} names, {scales} scales")]
    FieldCountMismatch { names: usize, scales: usize },
    #[error("format describes {codes} fields but {names} names were given")]
    FormatCountMismatch { names: usize, codes: usize },
    #[error("unknown format code {0:?}")]
    UnknownFormat(char),
    #[error("invalid repeat count in format: {0}")]
    InvalidRepeat(String),
    #[error("duplicate field name {0:?}")]
    DuplicateField(String),
    #[error("field name {0:?} is reserved")]
    ReservedField(String),

    /// More sync-matched attempts than a hard-capped assembler allows.
    #[error("dataset capacity of {capacity} rows exceeded")]
    CapacityExceeded { capacity: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
}

impl Error {
    /// True for errors raised while constructing a [FrameLayout](crate::FrameLayout).
    #[must_use]
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            Error::FieldCountMismatch { .. }
                | Error::FormatCountMismatch { .. }
                | Error::UnknownFormat(_)
                | Error::InvalidRepeat(_)
                | Error::DuplicateField(_)
                | Error::ReservedField(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
