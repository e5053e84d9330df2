//! Element-type inference, promotion and argument checks.

use std::fmt;

use tracing::trace;

use crate::{DType, Result, Tensor, TensorError, TensorLike, TypedArray};

/// Element type a caller asks coercion to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseDtype {
    Exact(DType),
    /// Any dtype except string.
    #[default]
    Numeric,
    /// String or numeric.
    Any,
}

impl ParseDtype {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "numeric" => Some(ParseDtype::Numeric),
            "any" | "string_or_numeric" => Some(ParseDtype::Any),
            other => DType::parse(other).map(ParseDtype::Exact),
        }
    }
}

impl From<DType> for ParseDtype {
    fn from(dtype: DType) -> Self {
        ParseDtype::Exact(dtype)
    }
}

impl fmt::Display for ParseDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDtype::Exact(dtype) => dtype.fmt(f),
            ParseDtype::Numeric => f.write_str("numeric"),
            ParseDtype::Any => f.write_str("string_or_numeric"),
        }
    }
}

/// Dtype implied by a value. Arrays take the dtype of their first leaf and an
/// empty array defaults to float32.
pub fn infer_dtype(value: &TensorLike) -> DType {
    let mut current = value;
    loop {
        match current {
            TensorLike::Array(items) => match items.first() {
                Some(first) => current = first,
                None => return DType::F32,
            },
            TensorLike::Typed(TypedArray::Float32(_) | TypedArray::Float64(_)) => {
                return DType::F32
            }
            TensorLike::Typed(TypedArray::Int32(_) | TypedArray::Uint8(_)) => return DType::I32,
            TensorLike::Bool(_) => return DType::Bool,
            TensorLike::Str(_) => return DType::String,
            TensorLike::Tensor(t) => return t.dtype(),
            TensorLike::Number(_) | TensorLike::Null => return DType::F32,
        }
    }
}

fn rank(dtype: DType) -> Option<u8> {
    match dtype {
        DType::Bool => Some(0),
        DType::I32 => Some(1),
        DType::F32 => Some(2),
        DType::String => None,
    }
}

/// Smallest dtype both inputs promote to: `bool < int32 < float32`.
pub fn upcast_type(a: DType, b: DType) -> Result<DType> {
    if a == b {
        return Ok(a);
    }
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => Ok(if ra >= rb { a } else { b }),
        _ => Err(TensorError::Upcast(a, b)),
    }
}

pub fn assert_dtype(
    expected: ParseDtype,
    actual: DType,
    arg_name: &str,
    fn_name: &str,
) -> Result<()> {
    let ok = match expected {
        ParseDtype::Any => true,
        ParseDtype::Numeric => actual.is_numeric(),
        ParseDtype::Exact(dtype) => dtype == actual,
    };
    if ok {
        return Ok(());
    }
    Err(TensorError::DtypeMismatch {
        arg: arg_name.to_string(),
        func: fn_name.to_string(),
        expected: expected.to_string(),
        actual,
    })
}

pub fn assert_types_match(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.dtype() == b.dtype() {
        return Ok(());
    }
    Err(TensorError::TypesMismatch {
        first: a.dtype(),
        second: b.dtype(),
    })
}

/// Casts both tensors to their common dtype. Inputs that already agree come
/// back as the same handles.
pub fn make_types_match(a: &Tensor, b: &Tensor) -> Result<(Tensor, Tensor)> {
    if a.dtype() == b.dtype() {
        return Ok((a.clone(), b.clone()));
    }
    let dtype = upcast_type(a.dtype(), b.dtype())?;
    trace!(first = %a.dtype(), second = %b.dtype(), to = %dtype, "promoting operands");
    Ok((a.cast(dtype)?, b.cast(dtype)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upcast_lattice() {
        assert_eq!(upcast_type(DType::Bool, DType::I32).unwrap(), DType::I32);
        assert_eq!(upcast_type(DType::F32, DType::Bool).unwrap(), DType::F32);
        assert_eq!(upcast_type(DType::I32, DType::F32).unwrap(), DType::F32);
        assert_eq!(
            upcast_type(DType::String, DType::String).unwrap(),
            DType::String
        );
    }

    #[test]
    fn upcast_string_fails() {
        let err = upcast_type(DType::String, DType::I32).unwrap_err();
        assert_eq!(err.to_string(), "Can not upcast string with int32");
    }

    #[test]
    fn parse_dtype_names() {
        assert_eq!(ParseDtype::parse("numeric"), Some(ParseDtype::Numeric));
        assert_eq!(ParseDtype::parse("any"), Some(ParseDtype::Any));
        assert_eq!(
            ParseDtype::parse("int32"),
            Some(ParseDtype::Exact(DType::I32))
        );
        assert_eq!(ParseDtype::parse("complex64"), None);
    }
}
