//! Dense ReLU networks used as oracles.
//!
//! Networks are read from TOML, one table per layer, weights given as one row per neuron:
//!
//! ```toml
//! [[layers]]
//! weights = [[1.0, -1.0], [0.5, 0.5]]
//! bias = [0.0, -0.25]
//!
//! [[layers]]
//! weights = [[1.0, 1.0]]
//! bias = [0.0]
//! ```
//!
//! Hidden layers are followed by a ReLU. The single output is clamped to `[0, 1]` unless
//! `clamp_output = false` is given.
use std::io::{self, Read};

use anyhow::Error;
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::oracle::Oracle;

/// Shape errors of a network description.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Network has no layers")]
    NoLayers,
    #[error("Layer {} has no neurons", layer)]
    EmptyLayer { layer: usize },
    #[error("Layer {} has no inputs", layer)]
    NoInputs { layer: usize },
    #[error(
        "Layer {} neuron {} has {} weights, expected {}",
        layer,
        neuron,
        found,
        expected
    )]
    WeightCount {
        layer: usize,
        neuron: usize,
        found: usize,
        expected: usize,
    },
    #[error("Layer {} has {} biases for {} neurons", layer, found, expected)]
    BiasCount {
        layer: usize,
        found: usize,
        expected: usize,
    },
    #[error("Layer {} contains a non-finite parameter", layer)]
    NonFinite { layer: usize },
    #[error("Network has {} outputs, expected a single output", found)]
    OutputCount { found: usize },
    #[error("Point has {} coordinates but the network has {} inputs", found, dimension)]
    DimensionMismatch { found: usize, dimension: usize },
}

/// A fully connected layer.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Layer {
    /// One row of input weights per neuron.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl Layer {
    fn apply(&self, input: &[f64], output: &mut Vec<f64>) {
        output.clear();
        for (row, &bias) in self.weights.iter().zip(self.bias.iter()) {
            let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
            output.push(sum + bias);
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkFile {
    layers: Vec<Layer>,
    #[serde(default = "clamp_by_default")]
    clamp_output: bool,
}

fn clamp_by_default() -> bool {
    true
}

/// A feed-forward network with ReLU hidden layers and a single output.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseNetwork {
    layers: Vec<Layer>,
    clamp_output: bool,
}

impl DenseNetwork {
    /// Checks that consecutive layers fit together and the last layer has one neuron.
    pub fn new(layers: Vec<Layer>, clamp_output: bool) -> Result<DenseNetwork, NetworkError> {
        if layers.is_empty() {
            return Err(NetworkError::NoLayers);
        }

        let mut inputs = None;
        for (index, layer) in layers.iter().enumerate() {
            let layer_number = index + 1;
            if layer.weights.is_empty() {
                return Err(NetworkError::EmptyLayer {
                    layer: layer_number,
                });
            }
            if layer.bias.len() != layer.weights.len() {
                return Err(NetworkError::BiasCount {
                    layer: layer_number,
                    found: layer.bias.len(),
                    expected: layer.weights.len(),
                });
            }

            let expected = *inputs.get_or_insert(layer.weights[0].len());
            if expected == 0 {
                return Err(NetworkError::NoInputs {
                    layer: layer_number,
                });
            }
            for (neuron, row) in layer.weights.iter().enumerate() {
                if row.len() != expected {
                    return Err(NetworkError::WeightCount {
                        layer: layer_number,
                        neuron: neuron + 1,
                        found: row.len(),
                        expected,
                    });
                }
            }

            let finite = layer.weights.iter().flatten().all(|w| w.is_finite())
                && layer.bias.iter().all(|b| b.is_finite());
            if !finite {
                return Err(NetworkError::NonFinite {
                    layer: layer_number,
                });
            }

            inputs = Some(layer.weights.len());
        }

        let outputs = layers[layers.len() - 1].weights.len();
        if outputs != 1 {
            return Err(NetworkError::OutputCount { found: outputs });
        }

        Ok(DenseNetwork {
            layers,
            clamp_output,
        })
    }

    /// Parse a network from its TOML description.
    pub fn parse(mut input: impl io::Read) -> Result<DenseNetwork, Error> {
        let mut contents = String::new();
        input.read_to_string(&mut contents)?;

        let file: NetworkFile = toml::from_str(&contents)?;
        let network = DenseNetwork::new(file.layers, file.clamp_output)?;

        info!(
            "Parsed network with {} inputs and {} layers",
            network.input_dimension(),
            network.layers().len()
        );

        Ok(network)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_dimension(&self) -> usize {
        self.layers[0].weights[0].len()
    }

    /// Runs the network on a single point.
    pub fn forward(&self, point: &[f64]) -> Result<f64, NetworkError> {
        if point.len() != self.input_dimension() {
            return Err(NetworkError::DimensionMismatch {
                found: point.len(),
                dimension: self.input_dimension(),
            });
        }

        let mut values = point.to_vec();
        let mut next = vec![];
        let hidden = self.layers.len() - 1;

        for (index, layer) in self.layers.iter().enumerate() {
            layer.apply(&values, &mut next);
            if index < hidden {
                for value in next.iter_mut() {
                    *value = value.max(0.0);
                }
            }
            std::mem::swap(&mut values, &mut next);
        }

        let output = values[0];
        Ok(if self.clamp_output {
            output.max(0.0).min(1.0)
        } else {
            output
        })
    }
}

impl Oracle for DenseNetwork {
    fn dimension(&self) -> usize {
        self.input_dimension()
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64, Error> {
        Ok(self.forward(point)?)
    }
}
