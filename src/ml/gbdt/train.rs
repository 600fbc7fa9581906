use super::model::{GbdtModel, Stump, sigmoid};

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of boosting rounds to add.
    pub rounds: usize,
    /// Learning rate applied per round.
    pub learning_rate: f32,
    /// Number of bins used for split search.
    pub bins: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            bins: 32,
        }
    }
}

/// Train a binary stump-GBDT model using logistic gradient boosting.
///
/// With `prior` set, boosting continues from the saved ensemble: per-row raw
/// scores start from the prior model's predictions and the new rounds are
/// appended to its stumps.
pub fn train_gbdt(
    x: &[Vec<f32>],
    y: &[bool],
    options: &TrainOptions,
    prior: Option<&GbdtModel>,
) -> Result<GbdtModel, String> {
    if x.len() != y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    let feature_len = x[0].len();
    if feature_len == 0 {
        return Err("Feature vectors are empty".to_string());
    }
    if let Some(prior) = prior {
        if prior.feature_len != feature_len {
            return Err(format!(
                "Prior model expects {} features but rows carry {}",
                prior.feature_len, feature_len
            ));
        }
    }

    let n = x.len();
    let (mins, maxs) = compute_feature_min_max(x, feature_len);
    let binned = bin_features(x, &mins, &maxs, options.bins);

    let (init_raw, mut stumps, mut raw) = match prior {
        Some(prior) => {
            let raw: Vec<f32> = x.iter().map(|row| prior.predict_raw(row)).collect();
            (prior.init_raw, prior.stumps.clone(), raw)
        }
        None => {
            let positives = y.iter().filter(|&&label| label).count();
            let p = (positives as f64 / n as f64).clamp(1e-6, 1.0 - 1e-6);
            let init = (p / (1.0 - p)).ln() as f32;
            (init, Vec::new(), vec![init; n])
        }
    };

    for _round in 0..options.rounds {
        let residuals: Vec<f32> = raw
            .iter()
            .zip(y.iter())
            .map(|(&score, &label)| {
                let target = if label { 1.0 } else { 0.0 };
                target - sigmoid(score as f64) as f32
            })
            .collect();

        let stump = fit_best_stump(&binned, x, &mins, &maxs, options.bins, &residuals);
        for i in 0..n {
            raw[i] += options.learning_rate * stump.predict(&x[i]);
        }
        stumps.push(stump);
    }

    Ok(GbdtModel {
        model_version: 1,
        feature_len,
        learning_rate: options.learning_rate,
        init_raw,
        stumps,
    })
}

fn compute_feature_min_max(x: &[Vec<f32>], feature_len: usize) -> (Vec<f32>, Vec<f32>) {
    let mut mins = vec![f32::INFINITY; feature_len];
    let mut maxs = vec![f32::NEG_INFINITY; feature_len];
    for row in x {
        for (j, &v) in row.iter().take(feature_len).enumerate() {
            if v.is_finite() {
                mins[j] = mins[j].min(v);
                maxs[j] = maxs[j].max(v);
            }
        }
    }
    for j in 0..feature_len {
        if !mins[j].is_finite() || !maxs[j].is_finite() {
            mins[j] = 0.0;
            maxs[j] = 0.0;
        }
        if mins[j] == maxs[j] {
            maxs[j] = mins[j] + 1.0;
        }
    }
    (mins, maxs)
}

fn bin_features(x: &[Vec<f32>], mins: &[f32], maxs: &[f32], bins: usize) -> Vec<Vec<u8>> {
    let bins = bins.clamp(2, 256) as f32;
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(x.len());
    for row in x {
        let mut binned = Vec::with_capacity(mins.len());
        for (j, &min) in mins.iter().enumerate() {
            let max = maxs[j];
            let v = row.get(j).copied().unwrap_or(0.0);
            let t = if max > min {
                ((v - min) / (max - min)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let b = (t * (bins - 1.0)).round() as u8;
            binned.push(b);
        }
        out.push(binned);
    }
    out
}

fn fit_best_stump(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    mins: &[f32],
    maxs: &[f32],
    bins: usize,
    residuals: &[f32],
) -> Stump {
    let n_features = mins.len();
    let bins = bins.clamp(2, 256);

    let mut best = BestSplit::default();
    for feature_idx in 0..n_features {
        let split = best_split_for_feature(binned, residuals, feature_idx, bins);
        if split.score < best.score {
            best = split;
        }
    }

    let feature_idx = best.feature_index;
    let threshold = threshold_for_bin(mins[feature_idx], maxs[feature_idx], best.split_bin, bins);
    let (left_value, right_value) = leaf_means_for_threshold(x, residuals, feature_idx, threshold);
    Stump {
        feature_index: feature_idx as u16,
        threshold,
        left_value,
        right_value,
    }
}

#[derive(Debug, Clone)]
struct BestSplit {
    score: f64,
    feature_index: usize,
    split_bin: usize,
}

impl Default for BestSplit {
    fn default() -> Self {
        Self {
            score: f64::INFINITY,
            feature_index: 0,
            split_bin: 0,
        }
    }
}

fn best_split_for_feature(
    binned: &[Vec<u8>],
    residuals: &[f32],
    feature_idx: usize,
    bins: usize,
) -> BestSplit {
    let mut counts = vec![0u32; bins];
    let mut sums = vec![0f64; bins];
    let mut sums_sq = vec![0f64; bins];
    for (i, row) in binned.iter().enumerate() {
        let b = row.get(feature_idx).copied().unwrap_or(0) as usize;
        let r = residuals[i] as f64;
        counts[b] += 1;
        sums[b] += r;
        sums_sq[b] += r * r;
    }
    let total_count: u32 = counts.iter().sum();
    if total_count == 0 {
        return BestSplit::default();
    }
    let total_sum: f64 = sums.iter().sum();
    let total_sum_sq: f64 = sums_sq.iter().sum();

    let mut best_score = f64::INFINITY;
    let mut best_bin = 0usize;

    let mut left_count = 0u32;
    let mut left_sum = 0f64;
    let mut left_sum_sq = 0f64;

    for split_bin in 0..(bins - 1) {
        left_count += counts[split_bin];
        left_sum += sums[split_bin];
        left_sum_sq += sums_sq[split_bin];
        let right_count = total_count - left_count;
        if left_count == 0 || right_count == 0 {
            continue;
        }
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;
        let left_sse = left_sum_sq - (left_sum * left_sum) / left_count as f64;
        let right_sse = right_sum_sq - (right_sum * right_sum) / right_count as f64;
        let score = left_sse + right_sse;
        if score < best_score {
            best_score = score;
            best_bin = split_bin;
        }
    }

    BestSplit {
        score: best_score,
        feature_index: feature_idx,
        split_bin: best_bin,
    }
}

fn threshold_for_bin(min: f32, max: f32, split_bin: usize, bins: usize) -> f32 {
    let bins_f = bins as f32;
    let t = ((split_bin + 1) as f32) / bins_f;
    min + t * (max - min)
}

fn leaf_means_for_threshold(
    x: &[Vec<f32>],
    residuals: &[f32],
    feature_idx: usize,
    threshold: f32,
) -> (f32, f32) {
    let mut left_sum = 0.0f32;
    let mut left_count = 0u32;
    let mut right_sum = 0.0f32;
    let mut right_count = 0u32;
    for (i, row) in x.iter().enumerate() {
        let v = row.get(feature_idx).copied().unwrap_or(0.0);
        if v <= threshold {
            left_sum += residuals[i];
            left_count += 1;
        } else {
            right_sum += residuals[i];
            right_count += 1;
        }
    }
    let left_mean = if left_count == 0 {
        0.0
    } else {
        left_sum / left_count as f32
    };
    let right_mean = if right_count == 0 {
        0.0
    } else {
        right_sum / right_count as f32
    };
    (left_mean, right_mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Vec<Vec<f32>>, Vec<bool>) {
        let x = vec![
            vec![0.1, 1.0],
            vec![0.2, 1.0],
            vec![0.3, 0.0],
            vec![0.8, 0.0],
            vec![0.9, 1.0],
            vec![1.0, 0.0],
        ];
        let y = vec![false, false, false, true, true, true];
        (x, y)
    }

    #[test]
    fn learns_a_separable_threshold() {
        let (x, y) = separable_data();
        let options = TrainOptions {
            rounds: 40,
            learning_rate: 0.3,
            bins: 16,
        };
        let model = train_gbdt(&x, &y, &options, None).unwrap();
        model.validate().unwrap();
        assert!(model.predict_proba(&[0.15, 1.0]) < 0.5);
        assert!(model.predict_proba(&[0.95, 0.0]) > 0.5);
    }

    #[test]
    fn warm_start_appends_rounds_to_prior_ensemble() {
        let (x, y) = separable_data();
        let options = TrainOptions {
            rounds: 10,
            learning_rate: 0.3,
            bins: 16,
        };
        let first = train_gbdt(&x, &y, &options, None).unwrap();
        let second = train_gbdt(&x, &y, &options, Some(&first)).unwrap();
        assert_eq!(second.stumps.len(), 20);
        assert_eq!(second.init_raw, first.init_raw);
        // Ensemble prefix is the prior model, untouched.
        assert_eq!(second.stumps[0].threshold, first.stumps[0].threshold);
    }

    #[test]
    fn warm_start_rejects_feature_length_drift() {
        let (x, y) = separable_data();
        let options = TrainOptions::default();
        let model = train_gbdt(&x, &y, &options, None).unwrap();
        let widened: Vec<Vec<f32>> = x.iter().map(|row| [row.as_slice(), &[0.0]].concat()).collect();
        assert!(train_gbdt(&widened, &y, &options, Some(&model)).is_err());
    }

    #[test]
    fn empty_dataset_is_an_error_at_this_layer() {
        let result = train_gbdt(&[], &[], &TrainOptions::default(), None);
        assert!(result.is_err());
    }
}
