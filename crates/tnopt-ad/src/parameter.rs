//! Learnable tensors.
//!
//! A [`Parameter`] owns its value and the gradient accumulated for it by the last
//! backward pass. Optimizers read the gradient and update the value in place.

use scirs2_core::ndarray_ext::ArrayD;
use scirs2_core::numeric::Float;

/// Dense tensor with a learnability flag and an optional gradient
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<T> {
    value: ArrayD<T>,
    requires_grad: bool,
    grad: Option<ArrayD<T>>,
}

impl<T: Float> Parameter<T> {
    /// Create a learnable parameter
    pub fn new(value: ArrayD<T>) -> Self {
        Self {
            value,
            requires_grad: true,
            grad: None,
        }
    }

    /// Create a frozen parameter
    pub fn frozen(value: ArrayD<T>) -> Self {
        Self {
            value,
            requires_grad: false,
            grad: None,
        }
    }

    /// Current value
    pub fn value(&self) -> &ArrayD<T> {
        &self.value
    }

    /// Mutable access to the value
    pub fn value_mut(&mut self) -> &mut ArrayD<T> {
        &mut self.value
    }

    /// Shape of the value
    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// Number of scalar elements
    pub fn numel(&self) -> usize {
        self.value.len()
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Mark the parameter as learnable or frozen. Freezing drops any stored gradient.
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
        if !requires_grad {
            self.grad = None;
        }
    }

    /// Gradient from the last backward pass, if any
    pub fn grad(&self) -> Option<&ArrayD<T>> {
        self.grad.as_ref()
    }

    /// Store a gradient, adding to any gradient already present
    pub fn accumulate_grad(&mut self, grad: ArrayD<T>) {
        match self.grad {
            Some(ref mut current) => *current = &*current + &grad,
            None => self.grad = Some(grad),
        }
    }

    /// Forget the stored gradient
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Split into value and gradient for an in-place update
    pub(crate) fn value_and_grad_mut(&mut self) -> (&mut ArrayD<T>, Option<&ArrayD<T>>) {
        (&mut self.value, self.grad.as_ref())
    }
}
