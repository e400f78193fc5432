//! Autoencoder Network
//!
//! Dense encoder/decoder trained to reproduce its own scaled input.
//! Architecture: d -> h -> b -> h -> d, ReLU on hidden layers, linear output.
//! Mean squared reconstruction error per record is the anomaly signal.

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::predictor::{ModelKind, ModelSignal, Predictor};
use crate::logic::error::{FusionError, FusionResult};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

/// Autoencoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoencoderConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Cap on the outer hidden layer
    pub max_hidden: usize,
    /// Cap on the bottleneck
    pub max_encoding: usize,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            max_hidden: 32,
            max_encoding: 16,
        }
    }
}

impl AutoencoderConfig {
    /// (hidden, encoding) widths for an input of width `d`.
    /// The bottleneck is always strictly narrower than the input.
    pub fn dims(&self, d: usize) -> FusionResult<(usize, usize)> {
        if d < 2 {
            return Err(FusionError::Training(format!(
                "autoencoder needs at least 2 input columns for a bottleneck, got {}",
                d
            )));
        }

        let encoding = (d / 2).clamp(1, self.max_encoding.max(1));
        let hidden = self.max_hidden.min((2 * encoding).max(encoding + 1)).max(encoding);
        Ok((hidden, encoding))
    }
}

// ============================================================================
// LAYERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    /// in x out
    weights: Array2<f64>,
    bias: Array1<f64>,
    relu: bool,
}

impl Dense {
    /// He-uniform weights, zero bias
    fn new(inputs: usize, outputs: usize, relu: bool, rng: &mut ChaCha8Rng) -> Self {
        let limit = (6.0 / inputs as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit)),
            bias: Array1::zeros(outputs),
            relu,
        }
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let z = x.dot(&self.weights) + &self.bias;
        if self.relu {
            z.mapv(|v| v.max(0.0))
        } else {
            z
        }
    }
}

/// Adam moments for one layer
#[derive(Debug, Clone)]
struct Moments {
    mw: Array2<f64>,
    vw: Array2<f64>,
    mb: Array1<f64>,
    vb: Array1<f64>,
}

impl Moments {
    fn for_layer(layer: &Dense) -> Self {
        Self {
            mw: Array2::zeros(layer.weights.raw_dim()),
            vw: Array2::zeros(layer.weights.raw_dim()),
            mb: Array1::zeros(layer.bias.raw_dim()),
            vb: Array1::zeros(layer.bias.raw_dim()),
        }
    }
}

// ============================================================================
// AUTOENCODER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Autoencoder {
    config: AutoencoderConfig,
    layers: Vec<Dense>,
    input_dim: usize,
    hidden_dim: usize,
    encoding_dim: usize,
    /// Mean training loss of the last epoch
    final_loss: f64,
}

impl Autoencoder {
    pub fn fit(rows: &[Vec<f64>], config: &AutoencoderConfig, rng: &mut ChaCha8Rng) -> FusionResult<Self> {
        let d = rows.first().map(Vec::len).unwrap_or(0);
        let (hidden, encoding) = config.dims(d)?;

        let layers = vec![
            Dense::new(d, hidden, true, rng),
            Dense::new(hidden, encoding, true, rng),
            Dense::new(encoding, hidden, true, rng),
            Dense::new(hidden, d, false, rng),
        ];

        let mut model = Self {
            config: config.clone(),
            layers,
            input_dim: d,
            hidden_dim: hidden,
            encoding_dim: encoding,
            final_loss: 0.0,
        };

        let mut moments: Vec<Moments> = model.layers.iter().map(Moments::for_layer).collect();
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let batch_size = config.batch_size.max(1);
        let mut step = 0i32;

        for epoch in 0..config.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;

            for chunk in order.chunks(batch_size) {
                let batch = Array2::from_shape_fn((chunk.len(), d), |(i, j)| rows[chunk[i]][j]);
                step += 1;
                epoch_loss += model.train_step(&batch, &mut moments, step) * chunk.len() as f64;
            }

            model.final_loss = epoch_loss / rows.len() as f64;
            if !model.final_loss.is_finite() {
                return Err(FusionError::Training(format!(
                    "autoencoder loss diverged at epoch {}",
                    epoch + 1
                )));
            }

            log::debug!("Autoencoder epoch {}/{}: loss {:.6}", epoch + 1, config.epochs, model.final_loss);
        }

        log::info!(
            "Autoencoder trained: {} -> {} -> {} -> {} -> {}, final loss {:.6}",
            d,
            hidden,
            encoding,
            hidden,
            d,
            model.final_loss
        );

        Ok(model)
    }

    /// One Adam step on a batch. Returns the batch loss before the update.
    fn train_step(&mut self, batch: &Array2<f64>, moments: &mut [Moments], step: i32) -> f64 {
        // Forward, keeping every activation
        let mut activations: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len() + 1);
        activations.push(batch.clone());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }

        let diff = &activations[self.layers.len()] - batch;
        let loss = diff.mapv(|v| v * v).mean().unwrap_or(0.0);
        let mut delta = diff * (2.0 / (batch.len().max(1)) as f64);

        let lr = self.config.learning_rate;
        let bias1 = 1.0 - BETA1.powi(step);
        let bias2 = 1.0 - BETA2.powi(step);

        for l in (0..self.layers.len()).rev() {
            let grad_w = activations[l].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));

            // Propagate before the weights move
            let upstream = (l > 0).then(|| {
                let mut back = delta.dot(&self.layers[l].weights.t());
                if self.layers[l - 1].relu {
                    back.zip_mut_with(&activations[l], |g, a| {
                        if *a <= 0.0 {
                            *g = 0.0;
                        }
                    });
                }
                back
            });

            let m = &mut moments[l];
            m.mw = &m.mw * BETA1 + &grad_w * (1.0 - BETA1);
            m.vw = &m.vw * BETA2 + grad_w.mapv(|g| g * g) * (1.0 - BETA2);
            m.mb = &m.mb * BETA1 + &grad_b * (1.0 - BETA1);
            m.vb = &m.vb * BETA2 + grad_b.mapv(|g| g * g) * (1.0 - BETA2);

            let adam = |p: &mut f64, &mt: &f64, &vt: &f64| {
                *p -= lr * (mt / bias1) / ((vt / bias2).sqrt() + ADAM_EPSILON);
            };

            let layer = &mut self.layers[l];
            Zip::from(&mut layer.weights)
                .and(&m.mw)
                .and(&m.vw)
                .for_each(adam);
            Zip::from(&mut layer.bias).and(&m.mb).and(&m.vb).for_each(adam);

            if let Some(back) = upstream {
                delta = back;
            }
        }

        loss
    }

    fn reconstruct(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let mut a = x.to_owned().insert_axis(Axis(0));
        for layer in &self.layers {
            a = layer.forward(&a);
        }
        a.index_axis_move(Axis(0), 0)
    }

    /// Mean squared error between a scaled row and its reconstruction
    pub fn reconstruction_error(&self, x: &[f64]) -> f64 {
        let input = ArrayView1::from(x);
        let output = self.reconstruct(input);
        let diff = &output - &input;
        diff.mapv(|v| v * v).mean().unwrap_or(0.0)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn encoding_dim(&self) -> usize {
        self.encoding_dim
    }

    pub fn epochs(&self) -> usize {
        self.config.epochs
    }

    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }
}

impl Predictor for Autoencoder {
    fn kind(&self) -> ModelKind {
        ModelKind::Reconstruction
    }

    fn input_width(&self) -> usize {
        self.input_dim
    }

    fn score(&self, features: &[f64]) -> ModelSignal {
        ModelSignal::ReconstructionError(self.reconstruction_error(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Points on a 2-d plane embedded in 6 dimensions
    fn planar(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let a = ((i % 17) as f64 - 8.0) / 8.0;
                let b = ((i * 5 % 11) as f64 - 5.0) / 5.0;
                vec![a, b, a + b, a - b, 0.5 * a, -b]
            })
            .collect()
    }

    fn small_config() -> AutoencoderConfig {
        AutoencoderConfig {
            epochs: 60,
            batch_size: 16,
            learning_rate: 0.01,
            ..Default::default()
        }
    }

    #[test]
    fn test_dims_keep_bottleneck_narrow() {
        let config = AutoencoderConfig::default();
        assert_eq!(config.dims(2).unwrap(), (2, 1));
        assert_eq!(config.dims(14).unwrap(), (14, 7));
        assert_eq!(config.dims(40).unwrap(), (32, 16));
        for d in 2..80 {
            let (hidden, encoding) = config.dims(d).unwrap();
            assert!(encoding < d);
            assert!(hidden >= encoding);
        }
        assert!(matches!(config.dims(1), Err(FusionError::Training(_))));
    }

    #[test]
    fn test_training_reduces_loss() {
        let rows = planar(200);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let untrained = Autoencoder::fit(
            &rows,
            &AutoencoderConfig { epochs: 0, ..small_config() },
            &mut rng,
        )
        .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trained = Autoencoder::fit(&rows, &small_config(), &mut rng).unwrap();

        let mean_error = |m: &Autoencoder| {
            rows.iter().map(|r| m.reconstruction_error(r)).sum::<f64>() / rows.len() as f64
        };
        assert!(mean_error(&trained) < mean_error(&untrained));
        assert!(trained.final_loss().is_finite());
    }

    #[test]
    fn test_off_manifold_point_reconstructs_worse() {
        let rows = planar(200);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let model = Autoencoder::fit(&rows, &small_config(), &mut rng).unwrap();

        let on = model.reconstruction_error(&[0.5, 0.2, 0.7, 0.3, 0.25, -0.2]);
        let off = model.reconstruction_error(&[6.0, -6.0, 6.0, 6.0, -6.0, 6.0]);
        assert!(off > on, "off {} on {}", off, on);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let rows = planar(50);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let model = Autoencoder::fit(&rows, &small_config(), &mut rng).unwrap();

        let signal = model.score(&rows[3]);
        assert_eq!(signal, model.score(&rows[3]));
        assert!(matches!(signal, ModelSignal::ReconstructionError(e) if e >= 0.0));
    }
}
