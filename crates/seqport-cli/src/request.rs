//! JSON request files for `seqport eval`.
//!
//! ```json
//! {
//!   "inputs": {
//!     "features": { "dense": { "sequences": [[1, 2, 3, 4, 5, 6], [7, 8, 9]] } },
//!     "mask": { "sparse": { "sequences": [[{ "indices": [0, 3], "values": [1, 2] }]] } },
//!     "tokens": { "one_hot": { "sequences": [[3, 0, 7], [9]] } }
//!   },
//!   "outputs": ["scores"]
//! }
//! ```
//!
//! Values are packed with the element type the model declares. A `shape`
//! may be given per input and otherwise defaults to the declared one.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use seqport_core::codec::{pack_dense, pack_one_hot, pack_sparse_samples, SparseSample};
use seqport_core::{BatchedValue, DType, Element, Shape, Variable, VariableKind, VariableRegistry};
use seqport_runtime::NamedInputs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    pub inputs: BTreeMap<String, InputSpec>,
    /// Empty means every output the model declares.
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSpec {
    Dense {
        shape: Option<Vec<usize>>,
        sequences: Vec<Vec<f64>>,
    },
    Sparse {
        shape: Option<Vec<usize>>,
        sequences: Vec<Vec<SampleSpec>>,
    },
    OneHot {
        vocabulary: Option<usize>,
        sequences: Vec<Vec<usize>>,
    },
}

#[derive(Debug, Deserialize)]
pub struct SampleSpec {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl RequestFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse request {}", path.display()))
    }

    /// Packs every input for the variable of the same name.
    pub fn named_inputs(&self, registry: &VariableRegistry) -> Result<NamedInputs> {
        let mut inputs = NamedInputs::with_capacity(self.inputs.len());
        for (name, spec) in &self.inputs {
            let var = registry.resolve_input(name)?;
            let value = match var.dtype {
                DType::F32 => spec.pack::<f32>(var, |v| v as f32),
                DType::F64 => spec.pack::<f64>(var, |v| v),
            }
            .with_context(|| format!("failed to pack input '{name}'"))?;
            inputs.insert(name.clone(), value);
        }
        Ok(inputs)
    }

    pub fn output_names(&self, registry: &VariableRegistry) -> Vec<String> {
        if !self.outputs.is_empty() {
            return self.outputs.clone();
        }
        registry
            .resolve_kind(VariableKind::Output)
            .into_iter()
            .map(|v| v.name.clone())
            .collect()
    }
}

impl InputSpec {
    fn pack<T: Element>(&self, var: &Variable, convert: fn(f64) -> T) -> Result<BatchedValue> {
        let shape_or_declared = |shape: &Option<Vec<usize>>| {
            shape
                .as_deref()
                .map_or_else(|| var.shape.clone(), Shape::from_slice)
        };

        let value = match self {
            InputSpec::Dense { shape, sequences } => {
                let sequences: Vec<Vec<T>> = sequences
                    .iter()
                    .map(|seq| seq.iter().copied().map(convert).collect())
                    .collect();
                pack_dense(&sequences, &shape_or_declared(shape))?.into()
            }
            InputSpec::Sparse { shape, sequences } => {
                let sequences: Vec<Vec<SparseSample<T>>> = sequences
                    .iter()
                    .map(|seq| {
                        seq.iter()
                            .map(|s| {
                                SparseSample::new(
                                    s.indices.clone(),
                                    s.values.iter().copied().map(convert).collect(),
                                )
                            })
                            .collect()
                    })
                    .collect();
                pack_sparse_samples(&sequences, &shape_or_declared(shape))?.into()
            }
            InputSpec::OneHot {
                vocabulary,
                sequences,
            } => {
                let vocabulary = vocabulary.unwrap_or_else(|| var.shape.total_size());
                pack_one_hot::<T, _>(sequences, vocabulary)?.into()
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqport_core::VariableHandle;

    fn registry() -> VariableRegistry {
        let mut registry = VariableRegistry::new();
        let vars = [
            ("features", VariableKind::Input, DType::F32, vec![3]),
            ("mask", VariableKind::Input, DType::F64, vec![4]),
            ("tokens", VariableKind::Input, DType::F32, vec![10]),
            ("scores", VariableKind::Output, DType::F32, vec![2]),
        ];
        for (i, (name, kind, dtype, dims)) in vars.into_iter().enumerate() {
            registry
                .register(Variable {
                    name: name.into(),
                    kind,
                    dtype,
                    shape: Shape::from_slice(&dims),
                    handle: VariableHandle(i as u32),
                })
                .unwrap();
        }
        registry
    }

    const REQUEST: &str = r#"{
        "inputs": {
            "features": { "dense": { "sequences": [[1, 2, 3, 4, 5, 6], [7, 8, 9]] } },
            "mask": { "sparse": { "sequences": [[{ "indices": [0, 3], "values": [1, 2] }], []] } },
            "tokens": { "one_hot": { "sequences": [[3, 0, 7], [9]] } }
        }
    }"#;

    #[test]
    fn packs_with_declared_types() {
        let request: RequestFile = serde_json::from_str(REQUEST).unwrap();
        let registry = registry();
        let inputs = request.named_inputs(&registry).unwrap();

        assert_eq!(inputs["features"].dtype(), DType::F32);
        assert_eq!(inputs["features"].sample_counts(), vec![2, 1]);
        assert_eq!(inputs["mask"].dtype(), DType::F64);
        assert!(inputs["mask"].is_sparse());
        assert_eq!(inputs["mask"].sample_counts(), vec![1, 0]);
        assert_eq!(inputs["tokens"].shape(), &Shape::from([10]));

        assert_eq!(request.output_names(&registry), vec!["scores".to_string()]);
    }

    #[test]
    fn unknown_input_is_rejected() {
        let request: RequestFile =
            serde_json::from_str(r#"{ "inputs": { "scores": { "dense": { "sequences": [] } } } }"#)
                .unwrap();
        let err = request.named_inputs(&registry()).unwrap_err();
        assert!(err.to_string().contains("unknown input variable 'scores'"));
    }

    #[test]
    fn malformed_sequence_names_the_input() {
        let request: RequestFile = serde_json::from_str(
            r#"{ "inputs": { "features": { "dense": { "sequences": [[1, 2]] } } } }"#,
        )
        .unwrap();
        let err = request.named_inputs(&registry()).unwrap_err();
        assert!(err.to_string().contains("'features'"));
    }
}
