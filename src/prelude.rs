pub use serde::{Serialize, Deserialize};
pub use std::sync::Arc;

pub use ndarray::*;
pub use ndarray_rand::RandomExt;
pub use ndarray_rand::rand_distr::Uniform;

pub use crate::models::{LayerStack, StackBuilder, StackConfig};
pub use crate::error::*;

// Internal re-exports
pub use crate::core::{
    Activation,
    ActivationFn,
    Dense,
    Layer,
    LayerDescriptor,
    LayerGradients,
    LayerKind,
    Linear,
    Optimizer,
    OptimizerType,
    get_optimizer,
};
