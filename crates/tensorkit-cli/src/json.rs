//! JSON front end for the library types.
//!
//! Containers may embed tensors as `{"$tensor": <json>}` and point back at an
//! earlier node or tensor with `{"$ref": "<path>"}`, where a path joins keys and
//! indices with `/` and the root is `""`.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde_json::Value as Json;
use tensorkit_core::{convert_to_tensor, ObjectGraph, ParseDtype, TensorLike, Value};

const TENSOR_KEY: &str = "$tensor";
const REF_KEY: &str = "$ref";

pub fn tensor_like_from_json(json: &Json) -> Result<TensorLike> {
    Ok(match json {
        Json::Null => TensorLike::Null,
        Json::Bool(b) => TensorLike::Bool(*b),
        Json::Number(n) => TensorLike::Number(number(n)?),
        Json::String(s) => TensorLike::Str(s.clone()),
        Json::Array(items) => TensorLike::Array(
            items
                .iter()
                .map(tensor_like_from_json)
                .collect::<Result<_>>()?,
        ),
        Json::Object(_) => bail!("JSON objects are not tensor-like"),
    })
}

/// Builds an object graph and returns it with the root value.
pub fn graph_from_json(json: &Json) -> Result<(ObjectGraph, Value)> {
    let mut builder = GraphBuilder::default();
    let root = builder.build(json, "")?;
    Ok((builder.graph, root))
}

#[derive(Default)]
struct GraphBuilder {
    graph: ObjectGraph,
    // Nodes register before their children, so refs to ancestors resolve.
    paths: HashMap<String, Value>,
}

impl GraphBuilder {
    fn build(&mut self, json: &Json, path: &str) -> Result<Value> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => Ok(Value::Number(number(n)?)),
            Json::String(s) => Ok(Value::Str(s.clone())),
            Json::Array(items) => {
                let id = self.graph.add_list();
                self.paths.insert(path.to_string(), Value::Ref(id));
                for (i, item) in items.iter().enumerate() {
                    let child = self.build(item, &join(path, &i.to_string()))?;
                    self.graph.push(id, child)?;
                }
                Ok(Value::Ref(id))
            }
            Json::Object(entries) => {
                if entries.len() == 1 {
                    if let Some(raw) = entries.get(TENSOR_KEY) {
                        let like = tensor_like_from_json(raw)
                            .with_context(|| format!("invalid tensor at '{path}'"))?;
                        let tensor = convert_to_tensor(&like, path, "walk", ParseDtype::Any)?;
                        let value = Value::Tensor(tensor);
                        self.paths.insert(path.to_string(), value.clone());
                        return Ok(value);
                    }
                    if let Some(target) = entries.get(REF_KEY) {
                        let target = target
                            .as_str()
                            .with_context(|| format!("{REF_KEY} at '{path}' must be a string"))?;
                        return self
                            .paths
                            .get(target)
                            .cloned()
                            .with_context(|| format!("'{path}' refers to unknown path '{target}'"));
                    }
                }

                let id = self.graph.add_map();
                self.paths.insert(path.to_string(), Value::Ref(id));
                for (key, item) in entries {
                    let child = self.build(item, &join(path, key))?;
                    self.graph.insert(id, key.clone(), child)?;
                }
                Ok(Value::Ref(id))
            }
        }
    }
}

fn number(n: &serde_json::Number) -> Result<f64> {
    n.as_f64()
        .with_context(|| format!("number {n} does not fit in f64"))
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tensorkit_core::get_tensors_in_container;

    #[test]
    fn join_paths() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "0"), "a/0");
    }

    #[test]
    fn nested_json_becomes_tensor_like() {
        let like = tensor_like_from_json(&json!([[1, 2], [3, 4]])).unwrap();
        let t = convert_to_tensor(&like, "x", "f", ParseDtype::Numeric).unwrap();
        assert_eq!(t.shape().dims(), &[2, 2]);
        assert!(tensor_like_from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn refs_build_cycles_and_share_tensors() {
        let doc = json!({
            "w": {"$tensor": [1, 2]},
            "layers": [{"$ref": ""}, {"$ref": "w"}, {"$tensor": true}],
        });
        let (graph, root) = graph_from_json(&doc).unwrap();
        let found = get_tensors_in_container(&graph, &root);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].shape().dims(), &[2]);
        assert_eq!(found[1].to_bool_vec().unwrap(), vec![true]);
    }

    #[test]
    fn graph_numbers_keep_their_value() -> anyhow::Result<()> {
        let (graph, root) = graph_from_json(&json!([1.5, -3, u64::MAX]))?;
        let Value::Ref(list) = &root else {
            anyhow::bail!("root should be a list, got {root:?}");
        };
        let Some(tensorkit_core::Node::List(items)) = graph.get(*list) else {
            anyhow::bail!("root node should be a list");
        };
        let numbers: Vec<f64> = items
            .iter()
            .map(|v| match v {
                Value::Number(n) => Ok(*n),
                other => Err(anyhow::anyhow!("expected a number, got {other:?}")),
            })
            .collect::<anyhow::Result<_>>()?;
        assert_eq!(numbers, vec![1.5, -3.0, u64::MAX as f64]);
        anyhow::ensure!(numbers.iter().all(|n| n.is_finite()));
        Ok(())
    }

    #[test]
    fn unknown_ref_is_an_error() {
        let err = graph_from_json(&json!([{"$ref": "nope"}])).unwrap_err();
        assert!(err.to_string().contains("unknown path 'nope'"));
    }
}
