use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use smallvec::SmallVec;

use crate::convert::to_int32;
use crate::{Result, TensorError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    I32,
    Bool,
    String,
}

impl DType {
    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::I32 => "int32",
            DType::Bool => "bool",
            DType::String => "string",
        }
    }

    /// Width of one element in numeric storage. Strings are variable-width.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            DType::F32 | DType::I32 => Some(4),
            DType::Bool => Some(1),
            DType::String => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self != DType::String
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "float32" => Some(DType::F32),
            "int32" => Some(DType::I32),
            "bool" => Some(DType::Bool),
            "string" => Some(DType::String),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn scalar() -> Self {
        Self(SmallVec::new())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
    /// Number of elements. A scalar holds one, any zero dim makes it empty.
    /// Saturates at `usize::MAX`; tensors are only built from shapes that pass
    /// [`Shape::checked_size`].
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }
    pub fn checked_size(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }
    /// Row-major strides, in elements. Saturates like [`Shape::size`].
    pub fn strides(&self) -> SmallVec<[usize; 6]> {
        let mut strides: SmallVec<[usize; 6]> = SmallVec::from_elem(1, self.rank());
        for i in (0..self.rank().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1].saturating_mul(self.0[i + 1]);
        }
        strides
    }

    pub(crate) fn checked_size_or_err(&self) -> Result<usize> {
        self.checked_size()
            .ok_or_else(|| TensorError::ShapeOverflow(self.dims().to_vec()))
    }
}

impl From<&[usize]> for Shape {
    fn from(d: &[usize]) -> Self {
        Self::from_slice(d)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims())
    }
}

/// Process-unique tensor identity. Clones of a handle share it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub u64);

static NEXT_TENSOR_ID: AtomicU64 = AtomicU64::new(0);

impl TensorId {
    fn next() -> Self {
        Self(NEXT_TENSOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub struct TensorDesc {
    pub dtype: DType,
    pub shape: Shape,
}

/// Owns the storage for a tensor.
#[derive(Clone, Debug)]
pub enum TensorStorage {
    /// Little-endian element bytes for numeric dtypes.
    CpuBytes(Bytes),
    /// One UTF-8 encoded entry per element.
    Strings(Vec<Bytes>),
}

/// A tensor handle. `clone` yields another handle to the same tensor; use
/// [`Tensor::is_same`] for identity and compare values explicitly otherwise.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub id: TensorId,
    pub desc: TensorDesc,
    pub storage: TensorStorage,
    /// Total payload bytes; for strings, the sum of the encoded entries.
    pub byte_len: usize,
}

impl Tensor {
    pub fn from_cpu_bytes(dtype: DType, shape: Shape, bytes: Bytes) -> Result<Self> {
        let width = dtype.byte_size().ok_or(TensorError::NotNumeric(dtype))?;
        let expected = shape
            .checked_size_or_err()?
            .checked_mul(width)
            .ok_or_else(|| TensorError::ShapeOverflow(shape.dims().to_vec()))?;
        if bytes.len() != expected {
            return Err(TensorError::ByteLength {
                dtype,
                shape: shape.dims().to_vec(),
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self::new_unchecked(dtype, shape, TensorStorage::CpuBytes(bytes)))
    }

    pub fn from_f32(values: Vec<f32>, shape: Shape) -> Result<Self> {
        check_len(DType::F32, &shape, values.len())?;
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_cpu_bytes(DType::F32, shape, Bytes::from(bytes))
    }

    pub fn from_i32(values: Vec<i32>, shape: Shape) -> Result<Self> {
        check_len(DType::I32, &shape, values.len())?;
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_cpu_bytes(DType::I32, shape, Bytes::from(bytes))
    }

    pub fn from_bool(values: Vec<bool>, shape: Shape) -> Result<Self> {
        check_len(DType::Bool, &shape, values.len())?;
        let bytes: Vec<u8> = values.iter().map(|&v| u8::from(v)).collect();
        Self::from_cpu_bytes(DType::Bool, shape, Bytes::from(bytes))
    }

    pub fn from_strings<S: Into<String>>(values: Vec<S>, shape: Shape) -> Result<Self> {
        check_len(DType::String, &shape, values.len())?;
        let entries = values
            .into_iter()
            .map(|s| Bytes::from(Into::<String>::into(s).into_bytes()))
            .collect();
        Ok(Self::new_unchecked(
            DType::String,
            shape,
            TensorStorage::Strings(entries),
        ))
    }

    pub fn scalar_f32(value: f32) -> Self {
        let bytes = Bytes::copy_from_slice(&value.to_le_bytes());
        Self::new_unchecked(DType::F32, Shape::scalar(), TensorStorage::CpuBytes(bytes))
    }

    pub fn scalar_i32(value: i32) -> Self {
        let bytes = Bytes::copy_from_slice(&value.to_le_bytes());
        Self::new_unchecked(DType::I32, Shape::scalar(), TensorStorage::CpuBytes(bytes))
    }

    pub fn scalar_bool(value: bool) -> Self {
        let bytes = Bytes::copy_from_slice(&[u8::from(value)]);
        Self::new_unchecked(DType::Bool, Shape::scalar(), TensorStorage::CpuBytes(bytes))
    }

    pub(crate) fn new_unchecked(dtype: DType, shape: Shape, storage: TensorStorage) -> Self {
        let byte_len = match &storage {
            TensorStorage::CpuBytes(bytes) => bytes.len(),
            TensorStorage::Strings(entries) => entries.iter().map(Bytes::len).sum(),
        };
        Self {
            id: TensorId::next(),
            desc: TensorDesc { dtype, shape },
            storage,
            byte_len,
        }
    }

    pub fn dtype(&self) -> DType {
        self.desc.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.desc.shape
    }

    pub fn size(&self) -> usize {
        self.desc.shape.size()
    }

    pub fn is_same(&self, other: &Tensor) -> bool {
        self.id == other.id
    }

    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        let bytes = self.numeric_bytes(DType::F32)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    pub fn to_i32_vec(&self) -> Result<Vec<i32>> {
        let bytes = self.numeric_bytes(DType::I32)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    pub fn to_bool_vec(&self) -> Result<Vec<bool>> {
        let bytes = self.numeric_bytes(DType::Bool)?;
        Ok(bytes.iter().map(|&b| b != 0).collect())
    }

    pub fn to_string_vec(&self) -> Result<Vec<String>> {
        match &self.storage {
            TensorStorage::Strings(entries) => Ok(entries
                .iter()
                .map(|e| String::from_utf8_lossy(e).into_owned())
                .collect()),
            TensorStorage::CpuBytes(_) => Err(TensorError::WrongDtype {
                expected: DType::String,
                actual: self.dtype(),
            }),
        }
    }

    /// Any numeric tensor, widened to `f64`.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match self.dtype() {
            DType::F32 => Ok(self.to_f32_vec()?.into_iter().map(f64::from).collect()),
            DType::I32 => Ok(self.to_i32_vec()?.into_iter().map(f64::from).collect()),
            DType::Bool => Ok(self
                .to_bool_vec()?
                .into_iter()
                .map(|b| if b { 1.0 } else { 0.0 })
                .collect()),
            DType::String => Err(TensorError::NotNumeric(DType::String)),
        }
    }

    /// Casting to the current dtype hands back the same handle.
    pub fn cast(&self, dtype: DType) -> Result<Tensor> {
        if dtype == self.dtype() {
            return Ok(self.clone());
        }
        let unsupported = TensorError::UnsupportedCast {
            from: self.dtype(),
            to: dtype,
        };
        if !self.dtype().is_numeric() {
            return Err(unsupported);
        }

        let values = self.to_f64_vec()?;
        let shape = self.shape().clone();
        match dtype {
            DType::F32 => Tensor::from_f32(values.into_iter().map(|v| v as f32).collect(), shape),
            DType::I32 => Tensor::from_i32(values.into_iter().map(to_int32).collect(), shape),
            DType::Bool => Tensor::from_bool(
                values.into_iter().map(|v| v != 0.0).collect(),
                shape,
            ),
            DType::String => Err(unsupported),
        }
    }

    fn numeric_bytes(&self, dtype: DType) -> Result<&Bytes> {
        if self.dtype() != dtype {
            return Err(TensorError::WrongDtype {
                expected: dtype,
                actual: self.dtype(),
            });
        }
        match &self.storage {
            TensorStorage::CpuBytes(bytes) => Ok(bytes),
            TensorStorage::Strings(_) => Err(TensorError::NotNumeric(self.dtype())),
        }
    }
}

fn check_len(dtype: DType, shape: &Shape, actual: usize) -> Result<()> {
    let expected = shape.checked_size_or_err()?;
    if actual != expected {
        return Err(TensorError::StorageLength {
            dtype,
            shape: shape.dims().to_vec(),
            expected,
            actual,
        });
    }
    Ok(())
}
