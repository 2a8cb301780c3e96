#[allow(unused)]
use crate::prelude::*;

/// Uniform `U(-bound, bound)` array drawn from the given rng.
#[macro_export]
macro_rules! rand_array {
    ($rng:expr, $bound:expr; $($x:expr),*) => {
        {
            Array2::random_using(($($x,)*), Uniform::new(-$bound, $bound), &mut *$rng)
        }
    };
}

/// Shorthand for a stack of linear layers:
/// `stack!(2 => 10 => 1; Activation::Relu)`.
#[macro_export]
macro_rules! stack {
    ($first:expr $(=> $rest:expr)+ ; $a:expr) => {
        {
            let widths: Vec<usize> = vec![$first, $($rest),+];
            let descriptors: Vec<$crate::core::LayerDescriptor> = widths
                .windows(2)
                .map(|w| $crate::core::LayerDescriptor::new(w[0], w[1]))
                .collect();
            $crate::models::LayerStack::builder()
                .descriptors(descriptors)
                .activation($a)
                .build()
        }
    };
    ($first:expr $(=> $rest:expr)+) => {
        {
            let widths: Vec<usize> = vec![$first, $($rest),+];
            let descriptors: Vec<$crate::core::LayerDescriptor> = widths
                .windows(2)
                .map(|w| $crate::core::LayerDescriptor::new(w[0], w[1]))
                .collect();
            $crate::models::LayerStack::builder()
                .descriptors(descriptors)
                .build()
        }
    };
}
