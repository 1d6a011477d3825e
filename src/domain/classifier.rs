//! Logistic regression for next-bar direction.
//!
//! Features are standardized with statistics from the fit set only, then
//! weights are learned by batch gradient descent on the L2-penalized log
//! loss. Everything is deterministic: zero initial weights, no shuffling.

use ndarray::{Array1, Array2, Axis};

/// Errors raised while fitting or scoring. The signal generator treats
/// any of these as "run without the classifier".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("training target contains a single class ({0})")]
    SingleClass(u8),

    #[error("non-finite value in input")]
    NonFiniteInput,

    #[error("model has not been fitted")]
    NotFitted,

    #[error("optimizer diverged at iteration {0}")]
    Diverged(usize),
}

#[derive(Debug, Clone)]
struct FittedModel {
    mean: Array1<f64>,
    scale: Array1<f64>,
    weights: Array1<f64>,
    bias: f64,
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    max_iter: usize,
    tolerance: f64,
    /// Inverse regularization strength.
    c: f64,
    fitted: Option<FittedModel>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(0.5, 1000, 1e-8, 1.0)
    }
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize, tolerance: f64, c: f64) -> Self {
        Self {
            learning_rate,
            max_iter,
            tolerance,
            c,
            fitted: None,
        }
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp_z = z.exp();
            exp_z / (1.0 + exp_z)
        }
    }

    fn log_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let eps = 1e-15;
        let n = y_true.len() as f64;
        -y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&y, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                y * p.ln() + (1.0 - y) * (1.0 - p).ln()
            })
            .sum::<f64>()
            / n
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fit on `x` (rows = samples) against binary labels `y` in {0, 1}.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ClassifierError> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if y.len() != n_samples {
            return Err(ClassifierError::DimensionMismatch {
                expected: n_samples,
                got: y.len(),
            });
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteInput);
        }

        let positives = y.iter().filter(|&&label| label > 0.5).count();
        if positives == 0 {
            return Err(ClassifierError::SingleClass(0));
        }
        if positives == n_samples {
            return Err(ClassifierError::SingleClass(1));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or(ClassifierError::EmptyTrainingSet)?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        let z = (x - &mean) / &scale;

        let n = n_samples as f64;
        let alpha = 1.0 / (self.c * n);
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        let mut prev_cost = f64::INFINITY;

        for iter in 0..self.max_iter {
            let predictions = (z.dot(&weights) + bias).mapv(Self::sigmoid);
            let cost = Self::log_loss(y, &predictions) + 0.5 * alpha * weights.dot(&weights);
            if !cost.is_finite() {
                return Err(ClassifierError::Diverged(iter));
            }

            let errors = &predictions - y;
            let dw = z.t().dot(&errors) / n + &weights * alpha;
            let db = errors.sum() / n;
            weights = &weights - &(dw * self.learning_rate);
            bias -= self.learning_rate * db;

            if (prev_cost - cost).abs() < self.tolerance {
                log::debug!("classifier converged at iteration {iter} (loss {cost:.6})");
                break;
            }
            prev_cost = cost;
        }

        self.fitted = Some(FittedModel {
            mean,
            scale,
            weights,
            bias,
        });
        Ok(())
    }

    /// Probability of class 1 for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ClassifierError> {
        let model = self.fitted.as_ref().ok_or(ClassifierError::NotFitted)?;
        if x.ncols() != model.weights.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: model.weights.len(),
                got: x.ncols(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteInput);
        }

        let z = (x - &model.mean) / &model.scale;
        Ok((z.dot(&model.weights) + model.bias).mapv(Self::sigmoid))
    }

    /// Class labels: 1 when P(class 1) > 0.5.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>, ClassifierError> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| u8::from(p > 0.5)))
    }
}
