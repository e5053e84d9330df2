//! Coercion of loosely typed input into tensors.
//!
//! Accepts scalars, nested arrays, typed arrays and existing tensor handles.
//! Nested arrays are shape-checked before any storage is built, and integer
//! targets use wrapping truncation with NaN and infinities mapped to zero.

use bytes::Bytes;
use tracing::debug;

use crate::dtype::{assert_dtype, infer_dtype, ParseDtype};
use crate::tensor::TensorStorage;
use crate::{DType, Result, Shape, Tensor, TensorError};

#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Uint8(Vec<u8>),
}

impl TypedArray {
    pub fn len(&self) -> usize {
        match self {
            TypedArray::Float32(v) => v.len(),
            TypedArray::Float64(v) => v.len(),
            TypedArray::Int32(v) => v.len(),
            TypedArray::Uint8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_f64(&self, out: &mut Vec<Leaf<'_>>) {
        match self {
            TypedArray::Float32(v) => out.extend(v.iter().map(|&x| Leaf::Number(f64::from(x)))),
            TypedArray::Float64(v) => out.extend(v.iter().map(|&x| Leaf::Number(x))),
            TypedArray::Int32(v) => out.extend(v.iter().map(|&x| Leaf::Number(f64::from(x)))),
            TypedArray::Uint8(v) => out.extend(v.iter().map(|&x| Leaf::Number(f64::from(x)))),
        }
    }
}

/// Anything [`convert_to_tensor`] accepts.
#[derive(Clone, Debug)]
pub enum TensorLike {
    Null,
    Number(f64),
    Bool(bool),
    Str(String),
    Array(Vec<TensorLike>),
    Typed(TypedArray),
    Tensor(Tensor),
}

impl TensorLike {
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TensorLike>,
    {
        TensorLike::Array(items.into_iter().map(Into::into).collect())
    }

    /// Short type name used in argument errors.
    pub fn kind(&self) -> &'static str {
        match self {
            TensorLike::Null => "null",
            TensorLike::Number(_) => "number",
            TensorLike::Bool(_) => "boolean",
            TensorLike::Str(_) => "string",
            TensorLike::Array(_) => "Array",
            TensorLike::Typed(_) => "TypedArray",
            TensorLike::Tensor(_) => "Tensor",
        }
    }

    fn array_len(&self, dtype: DType) -> Option<usize> {
        match self {
            TensorLike::Array(items) => Some(items.len()),
            TensorLike::Typed(typed) if dtype != DType::String => Some(typed.len()),
            _ => None,
        }
    }
}

impl From<f64> for TensorLike {
    fn from(v: f64) -> Self {
        TensorLike::Number(v)
    }
}

impl From<f32> for TensorLike {
    fn from(v: f32) -> Self {
        TensorLike::Number(f64::from(v))
    }
}

impl From<i32> for TensorLike {
    fn from(v: i32) -> Self {
        TensorLike::Number(f64::from(v))
    }
}

impl From<bool> for TensorLike {
    fn from(v: bool) -> Self {
        TensorLike::Bool(v)
    }
}

impl From<&str> for TensorLike {
    fn from(v: &str) -> Self {
        TensorLike::Str(v.to_string())
    }
}

impl From<String> for TensorLike {
    fn from(v: String) -> Self {
        TensorLike::Str(v)
    }
}

impl From<Tensor> for TensorLike {
    fn from(t: Tensor) -> Self {
        TensorLike::Tensor(t)
    }
}

impl From<TypedArray> for TensorLike {
    fn from(t: TypedArray) -> Self {
        TensorLike::Typed(t)
    }
}

impl<T: Into<TensorLike>> From<Vec<T>> for TensorLike {
    fn from(items: Vec<T>) -> Self {
        TensorLike::array(items)
    }
}

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Reject ragged nested arrays. Turning this off trusts the first-element
    /// shape and only checks the total element count.
    pub check_shape_consistency: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            check_shape_consistency: true,
        }
    }
}

/// One scalar position of a flattened [`TensorLike`].
#[derive(Clone, Copy, Debug)]
pub enum Leaf<'a> {
    Null,
    Number(f64),
    Bool(bool),
    Str(&'a str),
    Tensor(&'a Tensor),
}

pub fn infer_shape(value: &TensorLike, dtype: DType) -> Result<Shape> {
    infer_shape_with(value, dtype, &ConvertOptions::default())
}

pub fn infer_shape_with(value: &TensorLike, dtype: DType, opts: &ConvertOptions) -> Result<Shape> {
    match value {
        TensorLike::Typed(typed) => {
            return Ok(if dtype == DType::String {
                Shape::scalar()
            } else {
                Shape::from_slice(&[typed.len()])
            });
        }
        TensorLike::Array(_) => {}
        _ => return Ok(Shape::scalar()),
    }

    let mut dims = Vec::new();
    let mut current = Some(value);
    while let Some(node) = current {
        let Some(len) = node.array_len(dtype) else {
            break;
        };
        dims.push(len);
        current = match node {
            TensorLike::Array(items) => items.first(),
            _ => None,
        };
    }

    if opts.check_shape_consistency {
        deep_assert_shape_consistency(value, &dims, dtype, &mut Vec::new())?;
    }
    Ok(Shape::from_slice(&dims))
}

fn deep_assert_shape_consistency(
    value: &TensorLike,
    shape: &[usize],
    dtype: DType,
    indices: &mut Vec<usize>,
) -> Result<()> {
    let Some(len) = value.array_len(dtype) else {
        if let Some(expected) = shape.first() {
            return Err(TensorError::InconsistentShape(format!(
                "Element arr[{}] is a primitive, but should be an array/TypedArray of {expected} elements",
                join_indices(indices)
            )));
        }
        return Ok(());
    };

    let Some(&expected) = shape.first() else {
        return Err(TensorError::InconsistentShape(format!(
            "Element arr[{}] should be a primitive, but is an array of {len} elements",
            join_indices(indices)
        )));
    };
    if len != expected {
        return Err(TensorError::InconsistentShape(format!(
            "Element arr[{}] should have {expected} elements, but has {len} elements",
            join_indices(indices)
        )));
    }

    let sub_shape = &shape[1..];
    match value {
        TensorLike::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                indices.push(i);
                deep_assert_shape_consistency(item, sub_shape, dtype, indices)?;
                indices.pop();
            }
        }
        // Typed arrays are always flat.
        _ if !sub_shape.is_empty() => {
            indices.push(0);
            let err = TensorError::InconsistentShape(format!(
                "Element arr[{}] is a primitive, but should be an array/TypedArray of {} elements",
                join_indices(indices),
                sub_shape[0]
            ));
            indices.pop();
            return Err(err);
        }
        _ => {}
    }
    Ok(())
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("][")
}

/// Scalar positions of `value` in row-major order.
pub fn flatten(value: &TensorLike) -> Vec<Leaf<'_>> {
    let mut out = Vec::new();
    flatten_into(value, &mut out);
    out
}

fn flatten_into<'a>(value: &'a TensorLike, out: &mut Vec<Leaf<'a>>) {
    match value {
        TensorLike::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        TensorLike::Typed(typed) => typed.push_f64(out),
        TensorLike::Null => out.push(Leaf::Null),
        TensorLike::Number(v) => out.push(Leaf::Number(*v)),
        TensorLike::Bool(b) => out.push(Leaf::Bool(*b)),
        TensorLike::Str(s) => out.push(Leaf::Str(s)),
        TensorLike::Tensor(t) => out.push(Leaf::Tensor(t)),
    }
}

/// Flattens `value` and encodes it as storage for `dtype`. Returns the
/// element count alongside the storage.
pub fn to_typed_values(value: &TensorLike, dtype: DType) -> Result<(TensorStorage, usize)> {
    let leaves = flatten(value);
    let count = leaves.len();

    if dtype == DType::String {
        let mut entries = Vec::with_capacity(count);
        for (index, leaf) in leaves.into_iter().enumerate() {
            match leaf {
                Leaf::Str(s) => entries.push(Bytes::copy_from_slice(s.as_bytes())),
                other => return Err(bad_element(index, dtype, &other)),
            }
        }
        return Ok((TensorStorage::Strings(entries), count));
    }

    let mut numbers = Vec::with_capacity(count);
    for (index, leaf) in leaves.into_iter().enumerate() {
        let v = match leaf {
            Leaf::Number(v) => v,
            Leaf::Bool(b) => f64::from(u8::from(b)),
            Leaf::Null => 0.0,
            other => return Err(bad_element(index, dtype, &other)),
        };
        numbers.push(v);
    }

    let bytes: Vec<u8> = match dtype {
        DType::F32 => numbers
            .iter()
            .flat_map(|&v| (v as f32).to_le_bytes())
            .collect(),
        DType::I32 => numbers
            .iter()
            .flat_map(|&v| to_int32(v).to_le_bytes())
            .collect(),
        DType::Bool => numbers
            .iter()
            .map(|&v| u8::from(js_round_nonzero(v)))
            .collect(),
        DType::String => return Err(TensorError::NotNumeric(dtype)),
    };
    Ok((TensorStorage::CpuBytes(Bytes::from(bytes)), count))
}

fn bad_element(index: usize, dtype: DType, leaf: &Leaf<'_>) -> TensorError {
    let reason = match leaf {
        Leaf::Tensor(_) => "tensor handles cannot be nested inside arrays".to_string(),
        Leaf::Str(s) => format!("string {s:?} in a numeric array"),
        Leaf::Number(v) => format!("number {v} in a string array"),
        Leaf::Bool(b) => format!("boolean {b} in a string array"),
        Leaf::Null => "null in a string array".to_string(),
    };
    TensorError::BadElement {
        index,
        dtype,
        reason,
    }
}

/// Int32 coercion: truncate toward zero and wrap modulo 2^32. NaN and the
/// infinities become 0.
pub(crate) fn to_int32(v: f64) -> i32 {
    const TWO_32: f64 = 4_294_967_296.0;
    const TWO_31: f64 = 2_147_483_648.0;
    if !v.is_finite() {
        return 0;
    }
    let m = v.trunc().rem_euclid(TWO_32);
    if m >= TWO_31 {
        (m - TWO_32) as i32
    } else {
        m as i32
    }
}

/// `round(v) != 0` with halves rounded toward +inf. NaN counts as nonzero.
pub(crate) fn js_round_nonzero(v: f64) -> bool {
    let floor = v.floor();
    let rounded = if v - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded != 0.0
}

pub fn convert_to_tensor(
    x: &TensorLike,
    arg_name: &str,
    fn_name: &str,
    parse_as: ParseDtype,
) -> Result<Tensor> {
    convert_to_tensor_with(x, arg_name, fn_name, parse_as, &ConvertOptions::default())
}

pub fn convert_to_tensor_with(
    x: &TensorLike,
    arg_name: &str,
    fn_name: &str,
    parse_as: ParseDtype,
    opts: &ConvertOptions,
) -> Result<Tensor> {
    if let TensorLike::Tensor(t) = x {
        assert_dtype(parse_as, t.dtype(), arg_name, fn_name)?;
        return Ok(t.clone());
    }
    if let TensorLike::Null = x {
        return Err(TensorError::NotTensorLike {
            arg: arg_name.to_string(),
            func: fn_name.to_string(),
            got: x.kind().to_string(),
        });
    }

    let mut dtype = infer_dtype(x);
    if dtype != DType::String {
        if let ParseDtype::Exact(requested) = parse_as {
            if requested.is_numeric() {
                dtype = requested;
            }
        }
    }
    assert_dtype(parse_as, dtype, arg_name, fn_name)?;

    let shape = infer_shape_with(x, dtype, opts)?;
    let (storage, count) = to_typed_values(x, dtype)?;
    let expected = shape.checked_size_or_err()?;
    if count != expected {
        return Err(TensorError::StorageLength {
            dtype,
            shape: shape.dims().to_vec(),
            expected,
            actual: count,
        });
    }

    debug!(arg = arg_name, func = fn_name, %dtype, %shape, "converted tensor-like input");
    Ok(Tensor::new_unchecked(dtype, shape, storage))
}

pub fn convert_to_tensor_array(
    xs: &TensorLike,
    arg_name: &str,
    fn_name: &str,
    parse_as: ParseDtype,
) -> Result<Vec<Tensor>> {
    let TensorLike::Array(items) = xs else {
        return Err(TensorError::NotTensorArray {
            arg: arg_name.to_string(),
            func: fn_name.to_string(),
        });
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert_to_tensor(item, &format!("{arg_name}[{i}]"), fn_name, parse_as))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_truncates_and_wraps() {
        assert_eq!(to_int32(1.9), 1);
        assert_eq!(to_int32(-1.9), -1);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(f64::INFINITY), 0);
        assert_eq!(to_int32(f64::NEG_INFINITY), 0);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(-4_294_967_297.0), -1);
    }

    #[test]
    fn bool_rounding_matches_half_up() {
        assert!(!js_round_nonzero(0.0));
        assert!(!js_round_nonzero(0.49));
        assert!(js_round_nonzero(0.5));
        assert!(!js_round_nonzero(-0.5));
        assert!(js_round_nonzero(-0.51));
        assert!(js_round_nonzero(f64::NAN));
    }

    #[test]
    fn join_indices_formats_paths() {
        assert_eq!(join_indices(&[]), "");
        assert_eq!(join_indices(&[1]), "1");
        assert_eq!(join_indices(&[0, 2, 1]), "0][2][1");
    }
}
