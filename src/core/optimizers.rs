use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerType {
    SGD,
    Adam,
}

impl FromStr for OptimizerType {
    type Err = NNError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SGD" => Ok(Self::SGD),
            "Adam" => Ok(Self::Adam),
            other => Err(NNError::Configuration(format!("Unrecognized optimizer type={}", other))),
        }
    }
}

impl fmt::Display for OptimizerType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SGD => write!(f, "SGD"),
            Self::Adam => write!(f, "Adam"),
        }
    }
}

/// Updates the parameters of a [`LayerStack`] from externally computed gradients.
///
/// `grads[i]` holds the gradients of layer `i`, ordered like [`Layer::parameters`].
pub trait Optimizer: Send {
    fn kind(&self) -> OptimizerType;

    fn learning_rate(&self) -> f64;

    fn step(&mut self, model: &mut LayerStack, grads: &[LayerGradients]) -> Result<()>;
}

/// Builds an optimizer of the named kind over the parameters of `model`.
pub fn get_optimizer(model: &LayerStack, kind: &str, learning_rate: f64) -> Result<Box<dyn Optimizer>> {
    let kind: OptimizerType = kind.parse()?;
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(NNError::Configuration(format!(
            "learning rate must be positive and finite, got {}",
            learning_rate
        )));
    }
    debug!("creating {} optimizer (lr={}) over {} parameters", kind, learning_rate, model.parameter_count());

    Ok(match kind {
        OptimizerType::SGD => Box::new(Sgd::new(learning_rate)),
        OptimizerType::Adam => Box::new(Adam::new(model, learning_rate)),
    })
}

fn check_gradients(model: &LayerStack, grads: &[LayerGradients]) -> Result<()> {
    if grads.len() != model.len() {
        return Err(NNError::ShapeMismatch(format!(
            "got gradients for {} layers, model has {}",
            grads.len(), model.len()
        )));
    }
    for (i, (layer, grad)) in model.iter().zip(grads).enumerate() {
        let params = layer.parameters();
        if params.len() != grad.len() {
            return Err(NNError::ShapeMismatch(format!(
                "layer {} has {} parameter tensors, got {} gradients",
                i, params.len(), grad.len()
            )));
        }
        for (p, g) in params.iter().zip(grad) {
            if p.shape() != g.shape() {
                return Err(NNError::ShapeMismatch(format!(
                    "layer {}: gradient shape {:?} does not match parameter shape {:?}",
                    i, g.shape(), p.shape()
                )));
            }
        }
    }
    Ok(())
}

fn layer_at(model: &mut LayerStack, index: usize) -> Result<&mut dyn Layer> {
    let len = model.len();
    model.layer_mut(index).ok_or_else(|| {
        NNError::ShapeMismatch(format!("gradient for layer {} but model has {} layers", index, len))
    })
}

#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f64,
}

impl Sgd {
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }
}

impl Optimizer for Sgd {
    fn kind(&self) -> OptimizerType {
        OptimizerType::SGD
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn step(&mut self, model: &mut LayerStack, grads: &[LayerGradients]) -> Result<()> {
        check_gradients(model, grads)?;
        let lr = self.lr;
        for (i, grad) in grads.iter().enumerate() {
            for (mut p, g) in layer_at(model, i)?.parameters_mut().into_iter().zip(grad) {
                p.scaled_add(-lr, g);
            }
        }
        Ok(())
    }
}

/// Adam with bias-corrected first and second moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: Vec<Vec<Array2<f64>>>,
    v: Vec<Vec<Array2<f64>>>,
}

impl Adam {
    pub fn new(model: &LayerStack, lr: f64) -> Self {
        Self::with_hyperparameters(model, lr, 0.9, 0.999, 1e-8)
    }

    pub fn with_hyperparameters(model: &LayerStack, lr: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        let zeros: Vec<Vec<Array2<f64>>> = model
            .iter()
            .map(|layer| {
                layer
                    .parameters()
                    .iter()
                    .map(|p| Array2::zeros(p.raw_dim()))
                    .collect()
            })
            .collect();
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: zeros.clone(),
            v: zeros,
        }
    }
}

impl Optimizer for Adam {
    fn kind(&self) -> OptimizerType {
        OptimizerType::Adam
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn step(&mut self, model: &mut LayerStack, grads: &[LayerGradients]) -> Result<()> {
        check_gradients(model, grads)?;
        if self.m.len() != grads.len() {
            return Err(NNError::ShapeMismatch(
                "optimizer state was created for a different model".to_string()
            ));
        }

        self.t += 1;
        let (lr, b1, b2, eps) = (self.lr, self.beta1, self.beta2, self.epsilon);
        let bc1 = 1.0 - b1.powi(self.t);
        let bc2 = 1.0 - b2.powi(self.t);

        for (i, grad) in grads.iter().enumerate() {
            let params = layer_at(model, i)?.parameters_mut();
            for (((p, g), m), v) in params
                .into_iter()
                .zip(grad)
                .zip(self.m[i].iter_mut())
                .zip(self.v[i].iter_mut())
            {
                Zip::from(p).and(g).and(m).and(v).for_each(|p, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    let m_hat = *m / bc1;
                    let v_hat = *v / bc2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
            }
        }
        Ok(())
    }
}
