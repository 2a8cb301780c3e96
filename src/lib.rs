pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod prelude;
pub mod utils;


// Re-export types
pub use crate::core::{Activation, ActivationFn, Dense, Layer, LayerDescriptor, LayerKind, Optimizer, get_optimizer};
pub use crate::models::{LayerStack, StackBuilder, StackConfig};
pub use crate::error::{NNError, Result};
