use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::prelude::*;
use crate::core::layers::resolve_layer_kind;

/// An ordered stack of layers with one shared activation between consecutive layers.
///
/// The stack owns its layers; the activation is only referenced, so the same
/// instance can be shared with other stacks. The topology is fixed once built.
pub struct LayerStack {
    layers: Vec<Box<dyn Layer>>,
    activation: Option<Arc<dyn ActivationFn>>,
}

impl fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LayerStack")
            .field("layers", &self.layers)
            .field("activation", &self.activation.as_ref().map(|a| a.name()))
            .finish()
    }
}

impl LayerStack {
    pub fn builder() -> StackBuilder {
        StackBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&dyn Layer> {
        self.layers.get(index).map(as_layer)
    }

    /// Mutable access for an external optimizer. The stack's shape is not affected.
    pub fn layer_mut(&mut self, index: usize) -> Option<&mut dyn Layer> {
        let layer: &mut dyn Layer = &mut **self.layers.get_mut(index)?;
        Some(layer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Layer> + '_ {
        self.layers.iter().map(as_layer)
    }

    pub fn activation(&self) -> Option<&Arc<dyn ActivationFn>> {
        self.activation.as_ref()
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_width())
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_width())
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Runs `x` through every layer, applying the activation between layers
    /// but never after the last one.
    ///
    /// Consecutive widths are not checked up front; a broken chain surfaces
    /// here as [`NNError::ShapeMismatch`].
    pub fn forward(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (last, hidden) = self.layers.split_last().ok_or(NNError::EmptyModel)?;
        let mut a = x.to_owned();
        for layer in hidden {
            a = layer.forward(a.view())?;
            if let Some(act) = &self.activation {
                a = act.apply(a);
            }
        }
        last.forward(a.view())
    }

    /// Evaluates independent batches in parallel against the same stack.
    pub fn forward_batches(&self, batches: &[Array2<f64>]) -> Result<Vec<Array2<f64>>> {
        batches
            .par_iter()
            .map(|x| self.forward(x.view()))
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut res = "\nModel LayerStack\n".to_string();
        res.push_str("-------------------------------------------------------------\n");
        res.push_str("Layer (Type)\t\t Output shape\t\t No.of params\n");
        for layer in self.layers.iter() {
            res.push_str(&format!(
                "{}\t\t\t  (None, {})\t\t  {}\n",
                layer.typ(), layer.output_width(), layer.parameter_count()
            ));
        }
        res.push_str("-------------------------------------------------------------\n");
        if let Some(act) = &self.activation {
            res.push_str(&format!("Activation: {}\n", act.name()));
        }
        res.push_str(&format!("Total params: {}\n", self.parameter_count()));
        res
    }
}

fn as_layer(layer: &Box<dyn Layer>) -> &dyn Layer {
    &**layer
}

enum KindChoice {
    Named(String),
    Custom(Box<dyn LayerKind>),
}

pub struct StackBuilder {
    descriptors: Vec<LayerDescriptor>,
    activation: Option<Arc<dyn ActivationFn>>,
    kind: KindChoice,
    seed: Option<u64>,
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
            activation: None,
            kind: KindChoice::Named(Linear.name().to_string()),
            seed: None,
        }
    }
}

impl StackBuilder {
    pub fn descriptor(mut self, input_width: usize, output_width: usize) -> Self {
        self.descriptors.push(LayerDescriptor::new(input_width, output_width));
        self
    }

    pub fn descriptors<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = LayerDescriptor>,
    {
        self.descriptors.extend(descriptors);
        self
    }

    pub fn activation<A: ActivationFn + 'static>(self, activation: A) -> Self {
        self.shared_activation(Arc::new(activation))
    }

    pub fn shared_activation(mut self, activation: Arc<dyn ActivationFn>) -> Self {
        self.activation = Some(activation);
        self
    }

    /// Selects a registered layer kind by name ("linear" / "dense").
    pub fn layer_kind(mut self, name: &str) -> Self {
        self.kind = KindChoice::Named(name.to_string());
        self
    }

    /// Uses a layer kind that is not part of the built-in registry.
    pub fn custom_kind<K: LayerKind + 'static>(mut self, kind: K) -> Self {
        self.kind = KindChoice::Custom(Box::new(kind));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<LayerStack> {
        // resolve before touching any descriptor so a bad kind builds nothing
        let kind: &dyn LayerKind = match &self.kind {
            KindChoice::Named(name) => resolve_layer_kind(name)?,
            KindChoice::Custom(kind) => &**kind,
        };
        if self.descriptors.is_empty() {
            return Err(NNError::EmptyModel);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut layers = Vec::with_capacity(self.descriptors.len());
        for (i, descriptor) in self.descriptors.iter().enumerate() {
            let layer = kind.build(descriptor, &mut rng)?;
            debug!(
                "layer {}: {} {} -> {}",
                i, layer.typ(), descriptor.input_width, descriptor.output_width
            );
            layers.push(layer);
        }

        let stack = LayerStack {
            layers,
            activation: self.activation,
        };
        info!(
            "built {} stack with {} layers, {} parameters",
            kind.name(), stack.len(), stack.parameter_count()
        );
        Ok(stack)
    }
}

fn default_layer_kind() -> String {
    Linear.name().to_string()
}

/// Declarative form of a stack, as read from JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StackConfig {
    pub layers: Vec<LayerDescriptor>,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default = "default_layer_kind")]
    pub layer_kind: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl StackConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn build(&self) -> Result<LayerStack> {
        let mut builder = LayerStack::builder()
            .layer_kind(&self.layer_kind)
            .descriptors(self.layers.iter().copied());
        if let Some(activation) = self.activation {
            builder = builder.activation(activation);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingActivation {
        calls: AtomicUsize,
    }

    impl ActivationFn for CountingActivation {
        fn name(&self) -> &str {
            "Counting"
        }

        fn apply(&self, z: Array2<f64>) -> Array2<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            z
        }
    }

    fn chain(widths: &[usize]) -> Vec<LayerDescriptor> {
        widths.windows(2).map(|w| LayerDescriptor::new(w[0], w[1])).collect()
    }

    #[test]
    fn output_has_last_width() {
        let stack = LayerStack::builder()
            .descriptors(chain(&[2, 10, 10, 1]))
            .activation(Activation::Relu)
            .seed(42)
            .build()
            .unwrap();
        let out = stack.forward(Array2::zeros((5, 2)).view()).unwrap();
        assert_eq!(out.shape(), &[5, 1]);
        assert_eq!(stack.input_width(), 2);
        assert_eq!(stack.output_width(), 1);
    }

    #[test]
    fn single_layer_never_activates() {
        let counter = Arc::new(CountingActivation::default());
        let stack = LayerStack::builder()
            .descriptor(3, 4)
            .shared_activation(counter.clone())
            .build()
            .unwrap();
        stack.forward(Array2::ones((2, 3)).view()).unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn activation_runs_between_each_pair() {
        let counter = Arc::new(CountingActivation::default());
        let stack = LayerStack::builder()
            .descriptors(chain(&[3, 5, 5, 5, 2]))
            .shared_activation(counter.clone())
            .build()
            .unwrap();
        stack.forward(Array2::ones((1, 3)).view()).unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 3);
        stack.forward(Array2::ones((1, 3)).view()).unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn forward_alternates_layers_and_activation() {
        // identity layers with a negative bias, so relu placement is visible
        let mut stack = LayerStack::builder()
            .descriptor(1, 1)
            .descriptor(1, 1)
            .activation(Activation::Relu)
            .build()
            .unwrap();
        for i in 0..2 {
            let mut params = stack.layer_mut(i).unwrap().parameters_mut();
            params[0].fill(1.0);
            params[1].fill(-1.0);
        }
        let out = stack.forward(array![[0.5], [3.0]].view()).unwrap();
        // relu(0.5 - 1) - 1 = -1, relu(3 - 1) - 1 = 1
        assert_eq!(out, array![[-1.0], [1.0]]);
    }

    #[test]
    fn unknown_kind_builds_nothing() {
        let err = LayerStack::builder()
            .descriptor(2, 2)
            .layer_kind("recurrent")
            .build()
            .unwrap_err();
        assert!(matches!(err, NNError::Configuration(_)));
    }

    struct ZeroInit;

    impl LayerKind for ZeroInit {
        fn name(&self) -> &'static str {
            "zero"
        }

        fn build(&self, d: &LayerDescriptor, _rng: &mut StdRng) -> Result<Box<dyn Layer>> {
            let layer = Dense::from_parts(
                Array2::zeros((d.input_width, d.output_width)),
                Array2::zeros((1, d.output_width)),
            )?;
            Ok(Box::new(layer))
        }
    }

    #[test]
    fn custom_kind_plugs_into_builder() {
        let stack = LayerStack::builder()
            .descriptors(chain(&[3, 4, 2]))
            .custom_kind(ZeroInit)
            .build()
            .unwrap();
        let out = stack.forward(Array2::ones((2, 3)).view()).unwrap();
        assert_eq!(out, Array2::<f64>::zeros((2, 2)));
    }

    #[test]
    fn empty_descriptor_list_is_rejected() {
        assert!(matches!(LayerStack::builder().build(), Err(NNError::EmptyModel)));
    }

    #[test]
    fn broken_chain_fails_at_forward() {
        let stack = LayerStack::builder()
            .descriptors(vec![LayerDescriptor::new(2, 4), LayerDescriptor::new(3, 1)])
            .build()
            .unwrap();
        let err = stack.forward(Array2::zeros((1, 2)).view()).unwrap_err();
        assert!(matches!(err, NNError::ShapeMismatch(_)));
    }

    #[test]
    fn layers_are_indexed_in_descriptor_order() {
        let stack = LayerStack::builder()
            .descriptors(chain(&[4, 6, 2]))
            .build()
            .unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.layer(0).unwrap().output_width(), 6);
        assert_eq!(stack.layer(1).unwrap().input_width(), 6);
        assert!(stack.layer(2).is_none());
        let mut stack = stack;
        assert_eq!(stack.layer_mut(1).unwrap().output_width(), 2);
        assert!(stack.layer_mut(2).is_none());
        assert_eq!(stack.parameter_count(), 4 * 6 + 6 + 6 * 2 + 2);
    }

    #[test]
    fn same_seed_same_weights() {
        let a = LayerStack::builder().descriptor(3, 3).seed(9).build().unwrap();
        let b = LayerStack::builder().descriptor(3, 3).seed(9).build().unwrap();
        assert_eq!(a.layer(0).unwrap().parameters(), b.layer(0).unwrap().parameters());
    }

    #[test]
    fn batches_evaluate_in_parallel() {
        let stack = LayerStack::builder()
            .descriptors(chain(&[2, 8, 3]))
            .activation(Activation::Tanh)
            .seed(1)
            .build()
            .unwrap();
        let batches: Vec<Array2<f64>> = (0..8).map(|i| Array2::from_elem((4, 2), i as f64)).collect();
        let outs = stack.forward_batches(&batches).unwrap();
        for (x, out) in batches.iter().zip(&outs) {
            assert_eq!(out, &stack.forward(x.view()).unwrap());
        }
    }

    #[test]
    fn config_builds_stack() {
        let config = StackConfig::from_json(
            r#"{"layers": [{"input_width": 2, "output_width": 10},
                           {"input_width": 10, "output_width": 1}],
                "activation": "Relu", "seed": 5}"#,
        )
        .unwrap();
        assert_eq!(config.layer_kind, "linear");
        let stack = config.build().unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.activation().unwrap().name(), "Relu");
    }

    #[test]
    fn config_with_unknown_kind_is_rejected() {
        let config = StackConfig::from_json(
            r#"{"layers": [{"input_width": 2, "output_width": 1}], "layer_kind": "conv2d"}"#,
        )
        .unwrap();
        match config.build() {
            Err(NNError::Configuration(msg)) => assert!(msg.contains("conv2d")),
            other => panic!("unexpected result: {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn summary_lists_every_layer() {
        let stack = LayerStack::builder().descriptors(chain(&[2, 3, 1])).build().unwrap();
        let summary = stack.summary();
        assert_eq!(summary.matches("Dense").count(), 2);
        assert!(summary.contains("Total params: 13"));
    }
}
