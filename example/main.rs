use std::env;

use layerstack::config::load_config;
use layerstack::data::{linear_data, train_test_split, write_predictions_csv};
use layerstack::metrics::multiclass_accuracy;
use layerstack::prelude::*;
use log::{info, warn};

fn main() -> Result<()> {
    env_logger::init();

    // usage: main [stack.json] [env.json]
    let mut args = env::args().skip(1);
    let stack_path = args.next();
    let env_path = args.next();

    if let Some(path) = env_path {
        match load_config(&path) {
            Some(config) => {
                config.apply_to_env();
                for status in config.verify_env() {
                    info!("{}: {}", status.key, if status.ok { "set" } else { "FAILED" });
                }
            }
            None => warn!("continuing without environment config from {}", path),
        }
    }

    let model = match stack_path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|_| NNError::NotFound(path.clone()))?;
            StackConfig::from_json(&json)?.build()?
        }
        None => LayerStack::builder()
            .descriptor(1, 10)
            .descriptor(10, 10)
            .descriptor(10, 1)
            .activation(Activation::Relu)
            .seed(42)
            .build()?,
    };
    println!("{}", model.summary());

    let (x, y) = linear_data();
    let (_x_train, x_test, _y_train, y_test) = train_test_split(&x, &y, 0.2, Some(42))?;

    let optimizer = get_optimizer(&model, "SGD", 0.01)?;
    info!("optimizer ready: {} (lr={})", optimizer.kind(), optimizer.learning_rate());

    let predictions = model.forward(x_test.view())?;
    let mse = (&predictions - &y_test).mapv(|d| d * d).mean().unwrap_or(0.0);
    println!("untrained test MSE: {:.4}", mse);
    write_predictions_csv(&x_test, &y_test, &predictions, "predictions.csv")?;
    println!("predictions have been saved as 'predictions.csv'");

    let classifier = layerstack::stack!(2 => 8 => 2; Activation::Tanh)?;
    let points = array![[0.0, 1.0], [1.0, 0.0], [0.5, 0.5], [1.0, 1.0]];
    let labels = array![1, 0, 0, 1];
    let logits = classifier.forward(points.view())?;
    println!("untrained classifier accuracy: {:.1}%", multiclass_accuracy(labels.view(), logits.view())?);

    Ok(())
}
