use thiserror::Error;

/// Failure to tokenize or parse a formula.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Failures raised while evaluating a cell.
///
/// `Cycle` and `CellNotFound` are always surfaced on the cell as error codes.
/// The remaining kinds go through the recovery policy in
/// [`classify`](super::services::classify).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("circular reference to {0}")]
    Cycle(String),

    #[error("cell {0} not found")]
    CellNotFound(String),

    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// A literal the grammar accepted as numeric failed to convert.
    #[error("could not parse {0:?} as a number")]
    InvalidLiteral(String),
}

impl EvalError {
    /// Whether the fallback to a scalar literal may replace this failure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EvalError::Cycle(_) | EvalError::CellNotFound(_))
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    #[error("Unknown cell: {0}")]
    UnknownCell(String),

    #[error("Cannot delete the last row")]
    LastRow,

    #[error("Cannot delete the last column")]
    LastColumn,

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("Column {0} is out of range")]
    ColumnOutOfRange(usize),
}

pub type DomainResult<T> = Result<T, DomainError>;
