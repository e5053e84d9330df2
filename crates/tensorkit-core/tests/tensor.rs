use anyhow::{ensure, Result};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use tensorkit_core::{
    assert_dtype, assert_types_match, infer_dtype, make_types_match, DType, ParseDtype, Shape,
    Tensor, TensorError, TensorLike,
};

#[test]
fn shape_size_and_strides() {
    let s = Shape::from_slice(&[2, 3, 4]);
    assert_eq!(s.rank(), 3);
    assert_eq!(s.size(), 24);
    assert_eq!(s.strides().as_slice(), &[12, 4, 1]);

    assert_eq!(Shape::scalar().size(), 1);
    assert_eq!(Shape::from_slice(&[3, 0]).size(), 0);
}

#[test]
fn clone_shares_identity() {
    let a = Tensor::scalar_f32(1.0);
    let b = Tensor::scalar_f32(1.0);
    assert!(a.is_same(&a.clone()));
    assert!(!a.is_same(&b));
}

#[test]
fn from_cpu_bytes_checks_length() {
    let err = Tensor::from_cpu_bytes(DType::F32, Shape::from_slice(&[2]), Bytes::from_static(&[0; 4]))
        .unwrap_err();
    assert!(matches!(
        err,
        TensorError::ByteLength {
            expected: 8,
            actual: 4,
            ..
        }
    ));

    let err = Tensor::from_cpu_bytes(DType::String, Shape::scalar(), Bytes::new()).unwrap_err();
    assert_eq!(err, TensorError::NotNumeric(DType::String));
}

#[test]
fn oversized_shapes_are_rejected() -> Result<()> {
    let huge = Shape::from_slice(&[1 << 33, 1 << 33]);
    assert_eq!(huge.checked_size(), None);
    assert_eq!(huge.size(), usize::MAX);
    assert_eq!(huge.strides().as_slice(), &[1 << 33, 1]);

    let err = Tensor::from_f32(vec![], huge.clone()).unwrap_err();
    assert_eq!(err, TensorError::ShapeOverflow(vec![1 << 33, 1 << 33]));
    let err = Tensor::from_strings(Vec::<String>::new(), huge).unwrap_err();
    ensure!(matches!(err, TensorError::ShapeOverflow(_)), "got {err:?}");

    // element count fits, byte count does not
    let wide = Shape::from_slice(&[usize::MAX / 2 + 1]);
    ensure!(wide.checked_size().is_some());
    let err = Tensor::from_cpu_bytes(DType::F32, wide, Bytes::new()).unwrap_err();
    ensure!(matches!(err, TensorError::ShapeOverflow(_)), "got {err:?}");
    Ok(())
}

#[test]
fn byte_len_counts_payload() -> Result<()> {
    let t = Tensor::from_f32(vec![1.0, 2.0], Shape::from_slice(&[2]))?;
    assert_eq!(t.byte_len, 8);
    assert_eq!(Tensor::scalar_bool(true).byte_len, 1);
    let s = Tensor::from_strings(vec!["a", "bc"], Shape::from_slice(&[2]))?;
    assert_eq!(s.byte_len, 3);
    Ok(())
}

#[test]
fn typed_constructors_check_count() {
    let err = Tensor::from_i32(vec![1, 2, 3], Shape::from_slice(&[2, 2])).unwrap_err();
    assert!(matches!(
        err,
        TensorError::StorageLength {
            expected: 4,
            actual: 3,
            ..
        }
    ));
}

#[test]
fn readers_check_dtype() {
    let t = Tensor::scalar_i32(1);
    assert_eq!(
        t.to_f32_vec().unwrap_err(),
        TensorError::WrongDtype {
            expected: DType::F32,
            actual: DType::I32
        }
    );
}

#[test]
fn casts() -> Result<()> {
    let f = Tensor::from_f32(vec![1.7, -1.7, f32::NAN, 0.0], Shape::from_slice(&[4]))?;

    let i = f.cast(DType::I32)?;
    assert_eq!(i.to_i32_vec()?, vec![1, -1, 0, 0]);

    let b = f.cast(DType::Bool)?;
    assert_eq!(b.to_bool_vec()?, vec![true, true, true, false]);

    let back = b.cast(DType::F32)?;
    assert_eq!(back.to_f32_vec()?, vec![1.0, 1.0, 1.0, 0.0]);

    ensure!(f.cast(DType::F32)?.is_same(&f), "same-dtype cast keeps handle");

    let s = Tensor::from_strings(vec!["a"], Shape::from_slice(&[1]))?;
    assert!(matches!(
        s.cast(DType::F32),
        Err(TensorError::UnsupportedCast { .. })
    ));
    assert!(matches!(
        f.cast(DType::String),
        Err(TensorError::UnsupportedCast { .. })
    ));
    Ok(())
}

#[test]
fn make_types_match_promotes() -> Result<()> {
    let a = Tensor::scalar_i32(2);
    let b = Tensor::scalar_f32(0.5);
    let (a2, b2) = make_types_match(&a, &b)?;
    assert_eq!(a2.dtype(), DType::F32);
    assert_eq!(a2.to_f32_vec()?, vec![2.0]);
    ensure!(b2.is_same(&b), "already-float operand is untouched");

    let c = Tensor::scalar_f32(3.0);
    let (b3, c3) = make_types_match(&b, &c)?;
    ensure!(b3.is_same(&b) && c3.is_same(&c), "matching dtypes return inputs");

    let s = Tensor::from_strings(vec!["x"], Shape::scalar())?;
    let err = make_types_match(&a, &s).unwrap_err();
    assert_eq!(err.to_string(), "Can not upcast int32 with string");
    Ok(())
}

#[test]
fn assert_types_match_message() {
    let err = assert_types_match(&Tensor::scalar_f32(1.0), &Tensor::scalar_i32(1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The dtypes of the first(float32) and second(int32) input must match"
    );
}

#[test]
fn assert_dtype_rules() {
    assert!(assert_dtype(ParseDtype::Any, DType::String, "x", "f").is_ok());
    assert!(assert_dtype(ParseDtype::Numeric, DType::Bool, "x", "f").is_ok());
    assert!(assert_dtype(ParseDtype::Numeric, DType::String, "x", "f").is_err());
    assert!(assert_dtype(DType::I32.into(), DType::I32, "x", "f").is_ok());
    assert!(assert_dtype(DType::I32.into(), DType::Bool, "x", "f").is_err());
}

#[test]
fn infer_dtype_rules() {
    assert_eq!(infer_dtype(&TensorLike::Number(1.0)), DType::F32);
    assert_eq!(infer_dtype(&TensorLike::Bool(false)), DType::Bool);
    assert_eq!(infer_dtype(&TensorLike::from("s")), DType::String);
    assert_eq!(infer_dtype(&TensorLike::Array(Vec::new())), DType::F32);
    assert_eq!(
        infer_dtype(&TensorLike::array(vec![TensorLike::array(vec![true])])),
        DType::Bool
    );
    assert_eq!(
        infer_dtype(&TensorLike::Tensor(Tensor::scalar_i32(0))),
        DType::I32
    );
}
