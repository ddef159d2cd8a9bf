//! First-order optimizers over sets of [`Parameter`]s.
//!
//! # Optimizers
//!
//! - **SGD**: Stochastic Gradient Descent with optional momentum, Nesterov and weight decay
//! - **Adam**: Adaptive Moment Estimation with bias correction
//!
//! Optimizers keep per-parameter state (momentum buffers, moment estimates) keyed by the
//! position of the parameter in the slice passed to [`Optimizer::step`], so the same
//! parameter set must be passed in the same order on every step. Parameters that carry no
//! gradient are skipped and their state is left untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use tnopt_ad::optimizers::{Adam, Optimizer, OptimizerConfig};
//!
//! let config = OptimizerConfig::adam().learning_rate(0.01);
//! let mut optimizer = Adam::new(config);
//!
//! for _ in 0..100 {
//!     optimizer.zero_grad(&mut params);
//!     // ... backward pass fills the gradients ...
//!     optimizer.step(&mut params)?;
//! }
//! ```

use crate::parameter::Parameter;
use anyhow::{bail, Context, Result};
use scirs2_core::ndarray_ext::ArrayD;
use scirs2_core::numeric::Float;

/// Configuration for optimizers
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Momentum coefficient (for SGD)
    pub momentum: f64,
    /// Weight decay (L2 regularization)
    pub weight_decay: f64,
    /// Beta1 for Adam
    pub beta1: f64,
    /// Beta2 for Adam
    pub beta2: f64,
    /// Epsilon for numerical stability
    pub epsilon: f64,
    /// Nesterov momentum (for SGD)
    pub nesterov: bool,
    /// Dampening for momentum (for SGD)
    pub dampening: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam()
    }
}

impl OptimizerConfig {
    /// SGD configuration (learning rate 0.01, no momentum)
    pub fn sgd() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.0,
            weight_decay: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            nesterov: false,
            dampening: 0.0,
        }
    }

    /// Adam configuration (learning rate 1e-3, betas 0.9/0.999, epsilon 1e-8)
    pub fn adam() -> Self {
        Self {
            learning_rate: 0.001,
            ..Self::sgd()
        }
    }

    /// Set learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set momentum
    pub fn momentum(mut self, m: f64) -> Self {
        self.momentum = m;
        self
    }

    /// Set weight decay
    pub fn weight_decay(mut self, wd: f64) -> Self {
        self.weight_decay = wd;
        self
    }

    /// Set beta1
    pub fn beta1(mut self, b1: f64) -> Self {
        self.beta1 = b1;
        self
    }

    /// Set beta2
    pub fn beta2(mut self, b2: f64) -> Self {
        self.beta2 = b2;
        self
    }

    /// Set epsilon
    pub fn epsilon(mut self, eps: f64) -> Self {
        self.epsilon = eps;
        self
    }

    /// Enable Nesterov momentum
    pub fn nesterov(mut self) -> Self {
        self.nesterov = true;
        self
    }

    /// Set dampening
    pub fn dampening(mut self, d: f64) -> Self {
        self.dampening = d;
        self
    }
}

/// Optimizer updating a parameter set in place
pub trait Optimizer<T: Float> {
    /// Reset the gradients of every parameter
    fn zero_grad(&mut self, params: &mut [&mut Parameter<T>]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Apply one update to every parameter that carries a gradient
    fn step(&mut self, params: &mut [&mut Parameter<T>]) -> Result<()>;

    /// Get current learning rate
    fn get_lr(&self) -> f64;

    /// Set learning rate
    fn set_lr(&mut self, lr: f64);

    /// Reset optimizer state
    fn reset(&mut self);

    /// Get number of steps performed
    fn num_steps(&self) -> usize;
}

fn ensure_slots<S>(state: &mut Vec<Option<S>>, n_params: usize) -> Result<()> {
    if state.is_empty() {
        state.resize_with(n_params, || None);
    } else if state.len() != n_params {
        bail!(
            "Optimizer was initialized with {} parameters but received {}",
            state.len(),
            n_params
        );
    }
    Ok(())
}

fn checked_grad<'a, T>(value: &ArrayD<T>, grad: &'a ArrayD<T>, index: usize) -> Result<&'a ArrayD<T>> {
    if grad.shape() != value.shape() {
        bail!(
            "Gradient shape {:?} does not match parameter {} shape {:?}",
            grad.shape(),
            index,
            value.shape()
        );
    }
    Ok(grad)
}

/// Stochastic Gradient Descent optimizer
#[derive(Debug, Clone)]
pub struct Sgd<T> {
    config: OptimizerConfig,
    velocity: Vec<Option<ArrayD<T>>>,
    step_count: usize,
}

impl<T: Float + 'static> Sgd<T> {
    /// Create new SGD optimizer
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            velocity: Vec::new(),
            step_count: 0,
        }
    }
}

impl<T: Float + 'static> Optimizer<T> for Sgd<T> {
    fn step(&mut self, params: &mut [&mut Parameter<T>]) -> Result<()> {
        let lr = T::from(self.config.learning_rate).context("Failed to convert learning rate")?;
        let momentum = T::from(self.config.momentum).context("Failed to convert momentum")?;
        let weight_decay =
            T::from(self.config.weight_decay).context("Failed to convert weight decay")?;
        let dampening = T::from(self.config.dampening).context("Failed to convert dampening")?;

        ensure_slots(&mut self.velocity, params.len())?;

        for (index, param) in params.iter_mut().enumerate() {
            let (value, grad) = param.value_and_grad_mut();
            let Some(grad) = grad else {
                continue;
            };
            let mut grad = checked_grad(value, grad, index)?.clone();

            if self.config.weight_decay > 0.0 {
                grad = &grad + &value.mapv(|x| x * weight_decay);
            }

            if self.config.momentum > 0.0 {
                let slot = &mut self.velocity[index];
                let v = match slot.take() {
                    // v = momentum * v + (1 - dampening) * grad
                    Some(v) => v.mapv(|x| x * momentum) + grad.mapv(|g| g * (T::one() - dampening)),
                    None => grad.clone(),
                };
                grad = if self.config.nesterov {
                    &grad + &v.mapv(|x| x * momentum)
                } else {
                    v.clone()
                };
                *slot = Some(v);
            }

            *value = &*value - &grad.mapv(|g| g * lr);
        }

        self.step_count += 1;
        Ok(())
    }

    fn get_lr(&self) -> f64 {
        self.config.learning_rate
    }

    fn set_lr(&mut self, lr: f64) {
        self.config.learning_rate = lr;
    }

    fn reset(&mut self) {
        self.velocity.clear();
        self.step_count = 0;
    }

    fn num_steps(&self) -> usize {
        self.step_count
    }
}

#[derive(Debug, Clone)]
struct AdamState<T> {
    m: ArrayD<T>,
    v: ArrayD<T>,
    step: i32,
}

/// Adam optimizer (Adaptive Moment Estimation)
#[derive(Debug, Clone)]
pub struct Adam<T> {
    config: OptimizerConfig,
    state: Vec<Option<AdamState<T>>>,
    step_count: usize,
}

impl<T: Float + 'static> Default for Adam<T> {
    fn default() -> Self {
        Self::new(OptimizerConfig::adam())
    }
}

impl<T: Float + 'static> Adam<T> {
    /// Create new Adam optimizer
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            state: Vec::new(),
            step_count: 0,
        }
    }
}

impl<T: Float + 'static> Optimizer<T> for Adam<T> {
    fn step(&mut self, params: &mut [&mut Parameter<T>]) -> Result<()> {
        let lr = T::from(self.config.learning_rate).context("Failed to convert learning rate")?;
        let beta1 = T::from(self.config.beta1).context("Failed to convert beta1")?;
        let beta2 = T::from(self.config.beta2).context("Failed to convert beta2")?;
        let epsilon = T::from(self.config.epsilon).context("Failed to convert epsilon")?;
        let weight_decay =
            T::from(self.config.weight_decay).context("Failed to convert weight decay")?;

        ensure_slots(&mut self.state, params.len())?;

        for (index, param) in params.iter_mut().enumerate() {
            let (value, grad) = param.value_and_grad_mut();
            let Some(grad) = grad else {
                continue;
            };
            let mut grad = checked_grad(value, grad, index)?.clone();

            // L2 penalty folded into the gradient, not decoupled
            if self.config.weight_decay > 0.0 {
                grad = &grad + &value.mapv(|x| x * weight_decay);
            }

            let state = self.state[index].get_or_insert_with(|| AdamState {
                m: ArrayD::zeros(grad.raw_dim()),
                v: ArrayD::zeros(grad.raw_dim()),
                step: 0,
            });
            state.step += 1;

            state.m = state.m.mapv(|x| x * beta1) + grad.mapv(|g| g * (T::one() - beta1));
            state.v = state.v.mapv(|x| x * beta2) + grad.mapv(|g| g * g * (T::one() - beta2));

            let bias1 = T::one()
                - T::from(self.config.beta1.powi(state.step)).context("Failed to compute beta1^t")?;
            let bias2 = T::one()
                - T::from(self.config.beta2.powi(state.step)).context("Failed to compute beta2^t")?;

            // params -= lr * m_hat / (sqrt(v_hat) + epsilon)
            let update = state
                .m
                .iter()
                .zip(state.v.iter())
                .map(|(&m, &v)| (m / bias1) / ((v / bias2).sqrt() + epsilon) * lr)
                .collect::<Vec<_>>();
            let update = ArrayD::from_shape_vec(value.raw_dim(), update)
                .context("Failed to create update array")?;

            *value = &*value - &update;
        }

        self.step_count += 1;
        Ok(())
    }

    fn get_lr(&self) -> f64 {
        self.config.learning_rate
    }

    fn set_lr(&mut self, lr: f64) {
        self.config.learning_rate = lr;
    }

    fn reset(&mut self) {
        self.state.clear();
        self.step_count = 0;
    }

    fn num_steps(&self) -> usize {
        self.step_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    fn with_grad(value: ArrayD<f64>, grad: ArrayD<f64>) -> Parameter<f64> {
        let mut p = Parameter::new(value);
        p.accumulate_grad(grad);
        p
    }

    #[test]
    fn test_config_builder() {
        let config = OptimizerConfig::sgd()
            .learning_rate(0.1)
            .momentum(0.9)
            .nesterov()
            .dampening(0.1)
            .weight_decay(1e-4);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.momentum, 0.9);
        assert!(config.nesterov);
        assert_eq!(config.dampening, 0.1);
        assert_eq!(config.weight_decay, 1e-4);

        let adam = OptimizerConfig::adam();
        assert_eq!(adam.learning_rate, 1e-3);
        assert_eq!((adam.beta1, adam.beta2, adam.epsilon), (0.9, 0.999, 1e-8));
    }

    #[test]
    fn test_sgd_step() -> Result<()> {
        let mut p = with_grad(array![1.0, 2.0].into_dyn(), array![0.5, -1.0].into_dyn());
        let mut opt = Sgd::new(OptimizerConfig::sgd().learning_rate(0.1));

        opt.step(&mut [&mut p])?;
        assert!((p.value()[[0]] - 0.95).abs() < 1e-12);
        assert!((p.value()[[1]] - 2.1).abs() < 1e-12);
        assert_eq!(opt.num_steps(), 1);
        Ok(())
    }

    #[test]
    fn test_sgd_momentum_accumulates() -> Result<()> {
        let mut p = with_grad(array![0.0].into_dyn(), array![1.0].into_dyn());
        let mut opt = Sgd::new(OptimizerConfig::sgd().learning_rate(1.0).momentum(0.5));

        opt.step(&mut [&mut p])?; // v = 1
        assert!((p.value()[[0]] + 1.0).abs() < 1e-12);
        opt.step(&mut [&mut p])?; // v = 0.5 + 1
        assert!((p.value()[[0]] + 2.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_adam_first_step_is_learning_rate_sized() -> Result<()> {
        let mut p = with_grad(array![1.0, 1.0].into_dyn(), array![3.0, -0.01].into_dyn());
        let mut opt = Adam::new(OptimizerConfig::adam().learning_rate(0.1));

        opt.step(&mut [&mut p])?;
        // Bias-corrected first step moves each entry by ~lr against the gradient sign
        assert!((p.value()[[0]] - 0.9).abs() < 1e-6);
        assert!((p.value()[[1]] - 1.1).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_params_without_gradient_are_skipped() -> Result<()> {
        let mut touched = with_grad(array![1.0].into_dyn(), array![1.0].into_dyn());
        let mut untouched = Parameter::new(array![5.0].into_dyn());
        let mut opt = Adam::default();

        opt.step(&mut [&mut touched, &mut untouched])?;
        assert!(touched.value()[[0]] < 1.0);
        assert_eq!(untouched.value()[[0]], 5.0);
        Ok(())
    }

    #[test]
    fn test_zero_grad_clears_all() {
        let mut a = with_grad(array![1.0].into_dyn(), array![1.0].into_dyn());
        let mut b = with_grad(array![1.0].into_dyn(), array![2.0].into_dyn());
        let mut opt = Sgd::<f64>::new(OptimizerConfig::sgd());

        opt.zero_grad(&mut [&mut a, &mut b]);
        assert!(a.grad().is_none());
        assert!(b.grad().is_none());
    }

    #[test]
    fn test_parameter_count_change_is_error() -> Result<()> {
        let mut a = with_grad(array![1.0].into_dyn(), array![1.0].into_dyn());
        let mut b = with_grad(array![1.0].into_dyn(), array![1.0].into_dyn());
        let mut opt = Adam::default();

        opt.step(&mut [&mut a, &mut b])?;
        assert!(opt.step(&mut [&mut a]).is_err());

        opt.reset();
        assert_eq!(opt.num_steps(), 0);
        opt.step(&mut [&mut a])?;
        Ok(())
    }

    #[test]
    fn test_gradient_shape_mismatch_is_error() {
        let mut p = with_grad(array![1.0, 2.0].into_dyn(), array![1.0].into_dyn());
        let mut opt = Sgd::new(OptimizerConfig::sgd());
        assert!(opt.step(&mut [&mut p]).is_err());
    }

    #[test]
    fn test_learning_rate_accessors() {
        let mut opt = Adam::<f64>::default();
        assert_eq!(opt.get_lr(), 1e-3);
        opt.set_lr(0.5);
        assert_eq!(opt.get_lr(), 0.5);
    }
}
