use std::fmt;

use rand::rngs::StdRng;

use crate::prelude::*;
use crate::rand_array;

/// Shape of one linear stage: `input_width` features in, `output_width` out.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub input_width: usize,
    pub output_width: usize,
}

impl LayerDescriptor {
    pub fn new(input_width: usize, output_width: usize) -> Self {
        Self { input_width, output_width }
    }
}

/// Gradients for one layer, in the same order as [`Layer::parameters`].
pub type LayerGradients = Vec<Array2<f64>>;

pub trait Layer: fmt::Debug + Send + Sync {
    fn typ(&self) -> String;

    fn input_width(&self) -> usize;

    fn output_width(&self) -> usize;

    /// Maps a `(batch, input_width)` array to `(batch, output_width)`.
    fn forward(&self, a: ArrayView2<f64>) -> Result<Array2<f64>>;

    fn parameters(&self) -> Vec<ArrayView2<'_, f64>>;

    fn parameters_mut(&mut self) -> Vec<ArrayViewMut2<'_, f64>>;

    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

/// A family of layers the stack builder knows how to instantiate.
///
/// New kinds are added by implementing this trait and listing the
/// implementation in `LAYER_KINDS`; the builder itself never changes.
pub trait LayerKind: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn build(&self, descriptor: &LayerDescriptor, rng: &mut StdRng) -> Result<Box<dyn Layer>>;

    fn matches(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Fully connected layer kind, producing [`Dense`] layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl LayerKind for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["dense"]
    }

    fn build(&self, descriptor: &LayerDescriptor, rng: &mut StdRng) -> Result<Box<dyn Layer>> {
        Ok(Box::new(Dense::new(descriptor.output_width, descriptor.input_width, rng)?))
    }
}

static LAYER_KINDS: &[&dyn LayerKind] = &[&Linear];

/// Looks up a registered layer kind by name or alias, case-insensitively.
pub fn resolve_layer_kind(name: &str) -> Result<&'static dyn LayerKind> {
    LAYER_KINDS
        .iter()
        .copied()
        .find(|kind| kind.matches(name))
        .ok_or_else(|| NNError::Configuration(format!("unsupported layer kind: {}", name)))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dense {
    pub w: Array2<f64>,
    pub b: Array2<f64>,
}

impl Dense {
    /// Weights and biases are drawn from `U(-k, k)` with `k = 1 / sqrt(prev)`.
    pub fn new(perceptron: usize, prev: usize, rng: &mut StdRng) -> Result<Self> {
        if perceptron == 0 || prev == 0 {
            return Err(NNError::InvalidLayerConfiguration(
                "Layer dimensions must be greater than 0".to_string()
            ));
        }
        let k = 1.0 / (prev as f64).sqrt();
        Ok(Self {
            w: rand_array!(rng, k; prev, perceptron),
            b: rand_array!(rng, k; 1, perceptron),
        })
    }

    pub fn from_parts(w: Array2<f64>, b: Array2<f64>) -> Result<Self> {
        if w.nrows() == 0 || w.ncols() == 0 {
            return Err(NNError::InvalidLayerConfiguration(
                "Layer dimensions must be greater than 0".to_string()
            ));
        }
        if b.nrows() != 1 || b.ncols() != w.ncols() {
            return Err(NNError::ShapeMismatch(format!(
                "bias shape {:?} does not fit weight shape {:?}",
                b.shape(), w.shape()
            )));
        }
        Ok(Self { w, b })
    }
}

impl Layer for Dense {
    fn typ(&self) -> String {
        "Dense".into()
    }

    fn input_width(&self) -> usize {
        self.w.nrows()
    }

    fn output_width(&self) -> usize {
        self.w.ncols()
    }

    fn forward(&self, a: ArrayView2<f64>) -> Result<Array2<f64>> {
        if a.ncols() != self.w.nrows() {
            return Err(NNError::ShapeMismatch(format!(
                "input has {} features but layer expects {}",
                a.ncols(), self.w.nrows()
            )));
        }
        Ok(a.dot(&self.w) + &self.b)
    }

    fn parameters(&self) -> Vec<ArrayView2<'_, f64>> {
        vec![self.w.view(), self.b.view()]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMut2<'_, f64>> {
        vec![self.w.view_mut(), self.b.view_mut()]
    }
}
