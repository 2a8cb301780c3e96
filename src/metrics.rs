use crate::core::activations::softmax_forward;
use crate::prelude::*;

fn check_lengths(truth: usize, pred: usize) -> Result<()> {
    if truth != pred {
        return Err(NNError::ShapeMismatch(format!(
            "{} labels but {} predictions",
            truth, pred
        )));
    }
    if pred == 0 {
        return Err(NNError::EmptyInput);
    }
    Ok(())
}

/// Percentage of positions where `y_true` and `y_pred` agree.
pub fn accuracy<T: PartialEq>(y_true: ArrayView1<T>, y_pred: ArrayView1<T>) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / y_pred.len() as f64 * 100.0)
}

/// Index of the largest entry in each row. Ties resolve to the first index;
/// NaN counts as larger than any number, so the first NaN in a row wins.
/// Rows must not be empty.
pub fn argmax_rows(logits: ArrayView2<f64>) -> Array1<usize> {
    logits
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                let bv = row[best];
                if bv.is_nan() {
                    break;
                }
                if v.is_nan() || v > bv {
                    best = i;
                }
            }
            best
        })
        .collect()
}

fn check_logits(y_true: &ArrayView1<usize>, logits: &ArrayView2<f64>) -> Result<()> {
    check_lengths(y_true.len(), logits.nrows())?;
    if logits.ncols() == 0 {
        return Err(NNError::EmptyInput);
    }
    Ok(())
}

/// Accuracy of the per-row argmax of `logits` against class labels.
pub fn multiclass_accuracy(y_true: ArrayView1<usize>, logits: ArrayView2<f64>) -> Result<f64> {
    check_logits(&y_true, &logits)?;
    let y_pred = argmax_rows(logits);
    accuracy(y_true, y_pred.view())
}

/// Same as [`multiclass_accuracy`], with a row-wise softmax applied first.
pub fn softmax_accuracy(y_true: ArrayView1<usize>, logits: ArrayView2<f64>) -> Result<f64> {
    check_logits(&y_true, &logits)?;
    let probs = softmax_forward(logits.to_owned());
    let y_pred = argmax_rows(probs.view());
    accuracy(y_true, y_pred.view())
}

/// Compares float-typed truth labels with integer predictions by truncating
/// the labels to `i64` first.
pub fn coerced_accuracy(y_true: ArrayView1<f64>, y_pred: ArrayView1<i64>) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let y_true = y_true.mapv(|v| v as i64);
    accuracy(y_true.view(), y_pred)
}
