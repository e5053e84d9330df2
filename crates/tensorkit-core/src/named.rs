use indexmap::IndexMap;

use crate::{Result, Tensor, TensorError};

/// Name-keyed tensors in insertion order.
pub type NamedTensorMap = IndexMap<String, Tensor>;

/// The three shapes a set of op inputs or outputs can take.
#[derive(Clone, Debug)]
pub enum NameArrayMap {
    Single(Tensor),
    List(Vec<Tensor>),
    Named(NamedTensorMap),
}

impl From<Tensor> for NameArrayMap {
    fn from(t: Tensor) -> Self {
        NameArrayMap::Single(t)
    }
}

impl From<Vec<Tensor>> for NameArrayMap {
    fn from(ts: Vec<Tensor>) -> Self {
        NameArrayMap::List(ts)
    }
}

impl From<NamedTensorMap> for NameArrayMap {
    fn from(map: NamedTensorMap) -> Self {
        NameArrayMap::Named(map)
    }
}

/// Membership by handle identity. A different tensor holding equal values is
/// not a match.
pub fn is_tensor_in_list(tensor: &Tensor, list: &[Tensor]) -> bool {
    list.iter().any(|t| t.is_same(tensor))
}

pub fn flatten_name_array_map(map: &NameArrayMap, keys: Option<&[String]>) -> Result<Vec<Tensor>> {
    match map {
        NameArrayMap::Single(t) => Ok(vec![t.clone()]),
        NameArrayMap::List(ts) => Ok(ts.clone()),
        NameArrayMap::Named(named) => match keys {
            Some(keys) => keys
                .iter()
                .map(|k| {
                    named
                        .get(k)
                        .cloned()
                        .ok_or_else(|| TensorError::MissingKey(k.clone()))
                })
                .collect(),
            None => Ok(named.values().cloned().collect()),
        },
    }
}

/// Splits a named map into parallel key and tensor lists.
pub fn flatten_named(map: &NamedTensorMap) -> (Vec<String>, Vec<Tensor>) {
    map.iter().map(|(k, t)| (k.clone(), t.clone())).unzip()
}

pub fn unflatten_to_name_array_map(keys: &[String], tensors: &[Tensor]) -> Result<NamedTensorMap> {
    if keys.len() != tensors.len() {
        return Err(TensorError::UnflattenLength {
            keys: keys.len(),
            tensors: tensors.len(),
        });
    }
    let mut map = NamedTensorMap::with_capacity(keys.len());
    for (key, tensor) in keys.iter().zip(tensors) {
        if map.insert(key.clone(), tensor.clone()).is_some() {
            return Err(TensorError::DuplicateKey(key.clone()));
        }
    }
    Ok(map)
}
