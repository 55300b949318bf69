//! Architecture configuration structures
//!
//! This module provides configuration structures for defining network
//! architectures via JSON files, so layer stacks can be changed without code
//! changes.

use crate::layers::{
    ConvolutionalLayer, Flattener, FullyConnectedLayer, Layer, MaxPoolingLayer, ReLULayer,
};
use crate::model::Model;
use crate::utils::SimpleRng;
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Configuration for a single layer in the network.
///
/// Defines the layer type and its parameters. Different layer types require
/// different fields:
///
/// - **fully_connected**: Requires `n_input` and `n_output`
/// - **conv**: Requires `in_channels`, `out_channels`, `filter_size`, and
///   optional `padding` (default 0)
/// - **maxpool**: Requires `pool_size` and `stride`
/// - **relu**, **flatten**: No parameters
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "conv",
///   "in_channels": 1,
///   "out_channels": 8,
///   "filter_size": 3,
///   "padding": 1
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "fully_connected", "conv", "relu", "maxpool", or "flatten"
    pub layer_type: String,

    // Fully connected layer parameters
    /// Input feature count for a fully connected layer
    pub n_input: Option<usize>,
    /// Output feature count for a fully connected layer
    pub n_output: Option<usize>,

    // Convolutional layer parameters
    /// Number of input channels for a convolutional layer
    pub in_channels: Option<usize>,
    /// Number of output channels (filters) for a convolutional layer
    pub out_channels: Option<usize>,
    /// Filter size for a convolutional layer (square filters)
    pub filter_size: Option<usize>,
    /// Zero-padding for a convolutional layer (default: 0)
    pub padding: Option<usize>,

    // Max pooling layer parameters
    /// Pooling window size for a max pooling layer (square windows)
    pub pool_size: Option<usize>,
    /// Stride for a max pooling layer
    pub stride: Option<usize>,
}

/// Configuration for the entire network architecture.
///
/// Layers are applied in the order they appear in the configuration.
///
/// # Example
///
/// ```json
/// {
///   "layers": [
///     { "layer_type": "conv", "in_channels": 1, "out_channels": 4, "filter_size": 3, "padding": 1 },
///     { "layer_type": "relu" },
///     { "layer_type": "maxpool", "pool_size": 2, "stride": 2 },
///     { "layer_type": "flatten" },
///     { "layer_type": "fully_connected", "n_input": 196, "n_output": 10 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into an
/// `ArchitectureConfig`, and validates it.
///
/// # Returns
///
/// `Ok(ArchitectureConfig)` on success, or an error if the file cannot be
/// read, the JSON is invalid, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use cnn_from_scratch::config::load_architecture;
///
/// let arch = load_architecture("config/cnn_small.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn invalid_data(message: String) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

/// Validates an architecture configuration.
///
/// Checks that the architecture has at least one layer and that each layer
/// has the required fields for its type with values in valid ranges.
fn validate_architecture(config: &ArchitectureConfig) -> Result<(), Box<dyn Error>> {
    if config.layers.is_empty() {
        return Err(invalid_data(
            "Architecture must have at least one layer".to_string(),
        ));
    }

    for (i, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, i)?;
    }

    Ok(())
}

/// Validates a single layer configuration.
fn validate_layer(layer: &LayerConfig, index: usize) -> Result<(), Box<dyn Error>> {
    let layer_type = layer.layer_type.to_lowercase();

    match layer_type.as_str() {
        "fully_connected" => {
            let n_input = layer.n_input.ok_or_else(|| {
                invalid_data(format!(
                    "Layer {}: fully_connected layer requires 'n_input'",
                    index
                ))
            })?;
            let n_output = layer.n_output.ok_or_else(|| {
                invalid_data(format!(
                    "Layer {}: fully_connected layer requires 'n_output'",
                    index
                ))
            })?;
            if n_input == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: n_input must be greater than 0",
                    index
                )));
            }
            if n_output == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: n_output must be greater than 0",
                    index
                )));
            }
        }
        "conv" => {
            let in_channels = layer.in_channels.ok_or_else(|| {
                invalid_data(format!("Layer {}: conv layer requires 'in_channels'", index))
            })?;
            let out_channels = layer.out_channels.ok_or_else(|| {
                invalid_data(format!(
                    "Layer {}: conv layer requires 'out_channels'",
                    index
                ))
            })?;
            let filter_size = layer.filter_size.ok_or_else(|| {
                invalid_data(format!("Layer {}: conv layer requires 'filter_size'", index))
            })?;
            if in_channels == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: in_channels must be greater than 0",
                    index
                )));
            }
            if out_channels == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: out_channels must be greater than 0",
                    index
                )));
            }
            if filter_size == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: filter_size must be greater than 0",
                    index
                )));
            }
        }
        "maxpool" => {
            let pool_size = layer.pool_size.ok_or_else(|| {
                invalid_data(format!(
                    "Layer {}: maxpool layer requires 'pool_size'",
                    index
                ))
            })?;
            let stride = layer.stride.ok_or_else(|| {
                invalid_data(format!("Layer {}: maxpool layer requires 'stride'", index))
            })?;
            if pool_size == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: pool_size must be greater than 0",
                    index
                )));
            }
            if stride == 0 {
                return Err(invalid_data(format!(
                    "Layer {}: stride must be greater than 0",
                    index
                )));
            }
        }
        "relu" | "flatten" => {}
        _ => {
            return Err(invalid_data(format!(
                "Layer {}: Invalid layer type '{}'. Must be one of: fully_connected, conv, relu, maxpool, flatten",
                index, layer.layer_type
            )));
        }
    }

    Ok(())
}

/// Builds a model from an architecture configuration.
///
/// Each layer is initialized with its parameters from the config and uses the
/// provided RNG for weight initialization.
///
/// # Arguments
///
/// * `config` - Architecture configuration defining the layer sequence
/// * `rng` - Random number generator for weight initialization
///
/// # Errors
///
/// Returns an error if a layer configuration is invalid.
///
/// # Examples
///
/// ```no_run
/// use cnn_from_scratch::config::{build_model, load_architecture};
/// use cnn_from_scratch::utils::SimpleRng;
///
/// let config = load_architecture("config/cnn_small.json").unwrap();
/// let mut rng = SimpleRng::new(42);
/// let model = build_model(&config, &mut rng).unwrap();
/// assert_eq!(model.num_layers(), config.layers.len());
/// ```
pub fn build_model(config: &ArchitectureConfig, rng: &mut SimpleRng) -> Result<Model, Box<dyn Error>> {
    validate_architecture(config)?;

    let mut layers: Vec<Box<dyn Layer>> = Vec::new();

    for layer_config in &config.layers {
        let layer_type = layer_config.layer_type.to_lowercase();

        match layer_type.as_str() {
            "fully_connected" => {
                // Presence already checked by validate_architecture.
                let n_input = layer_config.n_input.unwrap_or(0);
                let n_output = layer_config.n_output.unwrap_or(0);
                layers.push(Box::new(FullyConnectedLayer::new(n_input, n_output, rng)));
            }
            "conv" => {
                let in_channels = layer_config.in_channels.unwrap_or(0);
                let out_channels = layer_config.out_channels.unwrap_or(0);
                let filter_size = layer_config.filter_size.unwrap_or(0);
                let padding = layer_config.padding.unwrap_or(0);
                layers.push(Box::new(ConvolutionalLayer::new(
                    in_channels,
                    out_channels,
                    filter_size,
                    padding,
                    rng,
                )));
            }
            "relu" => layers.push(Box::new(ReLULayer::new())),
            "maxpool" => {
                let pool_size = layer_config.pool_size.unwrap_or(0);
                let stride = layer_config.stride.unwrap_or(0);
                layers.push(Box::new(MaxPoolingLayer::new(pool_size, stride)));
            }
            "flatten" => layers.push(Box::new(Flattener::new())),
            other => {
                return Err(invalid_data(format!("Unknown layer type: {}", other)));
            }
        }
    }

    Ok(Model::new(layers))
}
