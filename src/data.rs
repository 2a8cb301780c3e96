use std::path::Path;

use csv::{ReaderBuilder, Writer};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::prelude::*;

/// Points on `y = 0.7 * x + 0.3` for `x` in `[0, 1)` with step `0.01`, as `(100, 1)` columns.
pub fn linear_data() -> (Array2<f64>, Array2<f64>) {
    linear_points(0.7, 0.3, 0.0, 0.01, 100)
}

/// Upper bound on the number of points `linear_data_with` will generate.
pub const MAX_POINTS: usize = 1 << 24;

/// Points on `y = weight * x + bias` for `x` in `[start, end)` by `step`.
///
/// An empty or reversed range yields no points. Non-finite arguments and
/// ranges needing more than [`MAX_POINTS`] points are rejected.
pub fn linear_data_with(weight: f64, bias: f64, start: f64, end: f64, step: f64) -> Result<(Array2<f64>, Array2<f64>)> {
    if ![weight, bias, start, end, step].iter().all(|v| v.is_finite()) {
        return Err(NNError::Configuration(format!(
            "linear data arguments must be finite: weight={}, bias={}, start={}, end={}, step={}",
            weight, bias, start, end, step
        )));
    }
    if step <= 0.0 || end <= start {
        return Ok(linear_points(weight, bias, start, step, 0));
    }
    let count = ((end - start) / step).ceil();
    if !count.is_finite() || count > MAX_POINTS as f64 {
        return Err(NNError::Configuration(format!(
            "range [{}, {}) with step {} needs {} points, limit is {}",
            start, end, step, count, MAX_POINTS
        )));
    }
    Ok(linear_points(weight, bias, start, step, count as usize))
}

fn linear_points(weight: f64, bias: f64, start: f64, step: f64, n: usize) -> (Array2<f64>, Array2<f64>) {
    // x_i = start + i * step avoids the drift of repeated addition
    let x = Array2::from_shape_fn((n, 1), |(i, _)| start + i as f64 * step);
    let y = x.mapv(|v| weight * v + bias);
    (x, y)
}

/// Randomly partitions the rows of `x` and `y` into train and test sets.
///
/// The test set gets `ceil(test_fraction * n)` rows. The same `seed` always
/// yields the same partition; `None` draws a fresh permutation.
/// Returns `(x_train, x_test, y_train, y_test)`.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array2<f64>,
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<(Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>)> {
    if x.nrows() != y.nrows() {
        return Err(NNError::ShapeMismatch(format!(
            "x has {} rows but y has {}",
            x.nrows(), y.nrows()
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(NNError::Configuration(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = x.nrows();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(NNError::Configuration(format!(
            "test_fraction={} with {} samples leaves an empty train or test set",
            test_fraction, n
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);
    debug!("split {} samples into {} train / {} test", n, train_idx.len(), test_idx.len());

    Ok((
        x.select(Axis(0), train_idx),
        x.select(Axis(0), test_idx),
        y.select(Axis(0), train_idx),
        y.select(Axis(0), test_idx),
    ))
}

/// Reads a headerless CSV where each row holds `n_features` inputs followed by targets.
pub fn read_xy_csv<P: AsRef<Path>>(path: P, n_features: usize) -> Result<(Array2<f64>, Array2<f64>)> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(NNError::NotFound(path.display().to_string()));
    }
    let mut rdr = ReaderBuilder::new().has_headers(false).flexible(true).from_path(path)?;

    let mut values = Vec::new();
    let mut width = None;
    let mut rows = 0;
    for record in rdr.records() {
        let record = record?;
        match width {
            None => width = Some(record.len()),
            Some(w) if w != record.len() => {
                return Err(NNError::Parse(format!(
                    "row {} has {} columns, expected {}",
                    rows + 1, record.len(), w
                )));
            }
            _ => (),
        }
        for field in record.iter() {
            let v: f64 = field.trim().parse().map_err(|_| {
                NNError::Parse(format!("row {}: '{}' is not a number", rows + 1, field))
            })?;
            values.push(v);
        }
        rows += 1;
    }

    let width = width.ok_or(NNError::EmptyInput)?;
    if n_features == 0 || n_features >= width {
        return Err(NNError::Configuration(format!(
            "{} feature columns leave no targets in a {}-column file",
            n_features, width
        )));
    }
    let table = Array2::from_shape_vec((rows, width), values)?;
    let x = table.slice(s![.., ..n_features]).to_owned();
    let y = table.slice(s![.., n_features..]).to_owned();
    Ok((x, y))
}

/// Writes one `x..., target..., prediction...` row per sample.
pub fn write_predictions_csv<P: AsRef<Path>>(
    x: &Array2<f64>,
    targets: &Array2<f64>,
    predictions: &Array2<f64>,
    path: P,
) -> Result<()> {
    if x.nrows() != targets.nrows() || x.nrows() != predictions.nrows() {
        return Err(NNError::ShapeMismatch(format!(
            "row counts differ: x={}, targets={}, predictions={}",
            x.nrows(), targets.nrows(), predictions.nrows()
        )));
    }
    let mut wtr = Writer::from_path(path)?;

    for ((xr, tr), pr) in x.outer_iter().zip(targets.outer_iter()).zip(predictions.outer_iter()) {
        let record: Vec<String> = xr
            .iter()
            .chain(tr.iter())
            .chain(pr.iter())
            .map(|v| v.to_string())
            .collect();
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("layerstack-data-{}-{}", std::process::id(), name))
    }

    #[test]
    fn linear_data_has_hundred_points() {
        let (x, y) = linear_data();
        assert_eq!(x.shape(), &[100, 1]);
        assert_eq!(y.shape(), &[100, 1]);
        assert!((x[[0, 0]] - 0.0).abs() < 1e-9);
        assert!((y[[0, 0]] - 0.3).abs() < 1e-9);
        assert!((x[[99, 0]] - 0.99).abs() < 1e-9);
        assert!((y[[99, 0]] - 0.993).abs() < 1e-9);
    }

    #[test]
    fn linear_data_with_degenerate_range_is_empty() {
        let (x, _) = linear_data_with(1.0, 0.0, 1.0, 0.0, 0.1).unwrap();
        assert_eq!(x.nrows(), 0);
    }

    #[test]
    fn linear_data_with_matches_default_generator() {
        let (x, y) = linear_data_with(0.7, 0.3, 0.0, 1.0, 0.01).unwrap();
        assert_eq!((x, y), linear_data());
    }

    #[test]
    fn linear_data_with_rejects_unbounded_ranges() {
        assert!(matches!(
            linear_data_with(1.0, 0.0, 0.0, f64::INFINITY, 0.1),
            Err(NNError::Configuration(_))
        ));
        assert!(matches!(
            linear_data_with(1.0, 0.0, 0.0, 1.0, f64::NAN),
            Err(NNError::Configuration(_))
        ));
        assert!(matches!(
            linear_data_with(1.0, 0.0, 0.0, 1.0, 1e-300),
            Err(NNError::Configuration(_))
        ));
    }

    #[test]
    fn split_is_reproducible_per_seed() {
        let (x, y) = linear_data();
        let a = train_test_split(&x, &y, 0.2, Some(42)).unwrap();
        let b = train_test_split(&x, &y, 0.2, Some(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0.nrows(), 80);
        assert_eq!(a.1.nrows(), 20);

        let c = train_test_split(&x, &y, 0.2, Some(7)).unwrap();
        assert_eq!(c.0.nrows() + c.1.nrows(), 100);
        assert_ne!(a.1, c.1);
    }

    #[test]
    fn split_keeps_rows_paired() {
        let (x, y) = linear_data();
        let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.25, Some(3)).unwrap();
        for (xs, ys) in [(&x_train, &y_train), (&x_test, &y_test)] {
            for (xv, yv) in xs.iter().zip(ys.iter()) {
                assert!((0.7 * xv + 0.3 - yv).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn split_rejects_bad_input() {
        let (x, y) = linear_data();
        assert!(matches!(train_test_split(&x, &y, 1.0, None), Err(NNError::Configuration(_))));
        assert!(matches!(train_test_split(&x, &y, 0.0, None), Err(NNError::Configuration(_))));
        let short = y.slice(s![..10, ..]).to_owned();
        assert!(matches!(train_test_split(&x, &short, 0.2, None), Err(NNError::ShapeMismatch(_))));
    }

    #[test]
    fn csv_round_trip_through_prediction_writer() {
        let path = temp_path("preds.csv");
        let x = array![[0.0], [0.5]];
        let t = array![[0.3], [0.65]];
        let p = array![[0.25], [0.7]];
        write_predictions_csv(&x, &t, &p, &path).unwrap();

        let (xr, yr) = read_xy_csv(&path, 1).unwrap();
        assert_eq!(xr, x);
        assert_eq!(yr, array![[0.3, 0.25], [0.65, 0.7]]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn csv_reader_reports_missing_and_malformed_files() {
        assert!(matches!(read_xy_csv(temp_path("absent.csv"), 1), Err(NNError::NotFound(_))));

        let path = temp_path("bad.csv");
        std::fs::write(&path, "1.0,2.0\nabc,3.0\n").unwrap();
        assert!(matches!(read_xy_csv(&path, 1), Err(NNError::Parse(_))));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn csv_reader_rejects_ragged_rows() {
        let path = temp_path("ragged.csv");
        std::fs::write(&path, "1.0,2.0\n3.0,4.0,5.0\n").unwrap();
        match read_xy_csv(&path, 1) {
            Err(NNError::Parse(msg)) => assert!(msg.contains("row 2")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        std::fs::remove_file(&path).unwrap();
    }
}
