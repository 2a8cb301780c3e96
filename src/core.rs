// src/core.rs
pub mod activations;
pub mod layers;
pub mod optimizers;

// Re-export commonly used items
pub use activations::{Activation, ActivationFn};
pub use layers::{Dense, Layer, LayerDescriptor, LayerGradients, LayerKind, Linear, resolve_layer_kind};
pub use optimizers::{Adam, Optimizer, OptimizerType, Sgd, get_optimizer};
