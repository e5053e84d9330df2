use thiserror::Error;

use crate::DType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Argument '{arg}' passed to '{func}' must be a Tensor or TensorLike, but got '{got}'")]
    NotTensorLike {
        arg: String,
        func: String,
        got: String,
    },

    #[error("Argument {arg} passed to {func} must be a `Tensor[]` or `TensorLike[]`")]
    NotTensorArray { arg: String, func: String },

    #[error("Argument '{arg}' passed to '{func}' must be {expected} tensor, but got {actual} tensor")]
    DtypeMismatch {
        arg: String,
        func: String,
        expected: String,
        actual: DType,
    },

    #[error("The dtypes of the first({first}) and second({second}) input must match")]
    TypesMismatch { first: DType, second: DType },

    #[error("Can not upcast {0} with {1}")]
    Upcast(DType, DType),

    /// Nested array whose sub-arrays disagree on length or depth.
    #[error("{0}")]
    InconsistentShape(String),

    #[error("Element {index} of a {dtype} tensor has the wrong type: {reason}")]
    BadElement {
        index: usize,
        dtype: DType,
        reason: String,
    },

    #[error("Cannot unflatten Tensor[], keys and arrays are not of same length.")]
    UnflattenLength { keys: usize, tensors: usize },

    #[error("duplicate key '{0}' in named tensor map")]
    DuplicateKey(String),

    #[error("key '{0}' not found in named tensor map")]
    MissingKey(String),

    #[error("node {0} does not exist in this object graph")]
    UnknownNode(usize),

    #[error("node {id} is not a {expected}")]
    NodeKind { id: usize, expected: &'static str },

    #[error("shape {0:?} has more elements than fit in usize")]
    ShapeOverflow(Vec<usize>),

    #[error("{dtype} tensor of shape {shape:?} needs {expected} elements, got {actual}")]
    StorageLength {
        dtype: DType,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("{dtype} tensor of shape {shape:?} needs {expected} bytes, got {actual}")]
    ByteLength {
        dtype: DType,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("{0} tensors have no fixed-width byte storage")]
    NotNumeric(DType),

    #[error("cannot cast {from} tensor to {to}")]
    UnsupportedCast { from: DType, to: DType },

    #[error("expected {expected} tensor, got {actual}")]
    WrongDtype { expected: DType, actual: DType },
}

pub type Result<T> = std::result::Result<T, TensorError>;
