use crate::prelude::*;

/// A stateless, parameter-free function applied between two layers of a stack.
///
/// Implementors must be shareable across threads: a single instance is held
/// behind an `Arc` by every stack (and anything else) that uses it.
pub trait ActivationFn: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, z: Array2<f64>) -> Array2<f64>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    pub fn forward(&self, z: Array2<f64>) -> Array2<f64> {
        match self {
            Self::Linear => z,
            Self::Relu => relu_forward(z),
            Self::Sigmoid => sigmoid_forward(z),
            Self::Tanh => tanh_forward(z),
            Self::Softmax => softmax_forward(z),
        }
    }

    /// Wraps the activation for sharing between stacks.
    pub fn shared(self) -> Arc<dyn ActivationFn> {
        Arc::new(self)
    }
}

impl ActivationFn for Activation {
    fn name(&self) -> &str {
        match self {
            Self::Linear => "Linear",
            Self::Relu => "Relu",
            Self::Sigmoid => "Sigmoid",
            Self::Tanh => "Tanh",
            Self::Softmax => "Softmax",
        }
    }

    fn apply(&self, z: Array2<f64>) -> Array2<f64> {
        self.forward(z)
    }
}

fn sigmoid_forward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| 1.0 / (1.0 + (-z).exp()))
}

fn relu_forward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| if z >= 0.0 {z} else {0.0})
}

fn tanh_forward(z: Array2<f64>) -> Array2<f64> {
    z.mapv(|z| z.tanh())
}

/// Row-wise softmax. Each row is shifted by its max before exponentiating.
pub fn softmax_forward(mut z: Array2<f64>) -> Array2<f64> {
    for mut row in z.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    z
}
