//! Tape-based automatic differentiation over dense arrays.
//!
//! Every operation called on a [`ComputationGraph`] evaluates eagerly and appends a node
//! to the tape. Nodes are stored in creation order, so walking the tape backwards from the
//! output visits every node after all of its consumers; no explicit topological sort is
//! needed for the backward pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use tnopt_ad::graph::ComputationGraph;
//! use scirs2_core::ndarray_ext::array;
//!
//! let graph = ComputationGraph::<f64>::new();
//!
//! let x = graph.variable(array![2.0, 3.0].into_dyn(), true)?;
//! let y = graph.constant(array![4.0, 5.0].into_dyn())?;
//!
//! let z = graph.mul(&x, &y)?;
//! let loss = graph.sum(&z)?;
//!
//! graph.backward(&loss)?;
//! let grad_x = graph.gradient(&x)?; // == y
//! ```
//!
//! Clearing the graph invalidates every [`Variable`] created before the clear; using a
//! stale variable is reported as an error instead of silently aliasing a new node.

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use scirs2_core::ndarray_ext::{ArrayD, Axis, Ix2, IxDyn, ScalarOperand};
use scirs2_core::numeric::{Float, FromPrimitive};
use std::collections::HashMap;
use std::fmt;

/// Position of a node on the tape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Operation that produced a node
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Leaf node (variable or constant)
    Input,
    /// z = x + y
    Add { lhs: NodeId, rhs: NodeId },
    /// z = x - y
    Sub { lhs: NodeId, rhs: NodeId },
    /// z = x * y (element-wise)
    Mul { lhs: NodeId, rhs: NodeId },
    /// z = x / y (element-wise)
    Div { lhs: NodeId, rhs: NodeId },
    /// z = x @ y (2-D only)
    MatMul { lhs: NodeId, rhs: NodeId },
    /// z = -x
    Neg { input: NodeId },
    /// z = c * x
    Scale { input: NodeId, factor: f64 },
    /// z = x^n
    Pow { input: NodeId, exponent: f64 },
    /// z = sum(x) over one axis or all elements
    Sum { input: NodeId, axis: Option<usize> },
    /// z = mean(x) over one axis or all elements
    Mean { input: NodeId, axis: Option<usize> },
    /// z = reshape(x)
    Reshape {
        input: NodeId,
        old_shape: Vec<usize>,
    },
    /// z = permute_axes(x, axes)
    Transpose { input: NodeId, axes: Vec<usize> },
}

impl Operation {
    /// Short operation name, used in statistics
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Input => "Input",
            Operation::Add { .. } => "Add",
            Operation::Sub { .. } => "Sub",
            Operation::Mul { .. } => "Mul",
            Operation::Div { .. } => "Div",
            Operation::MatMul { .. } => "MatMul",
            Operation::Neg { .. } => "Neg",
            Operation::Scale { .. } => "Scale",
            Operation::Pow { .. } => "Pow",
            Operation::Sum { .. } => "Sum",
            Operation::Mean { .. } => "Mean",
            Operation::Reshape { .. } => "Reshape",
            Operation::Transpose { .. } => "Transpose",
        }
    }

    /// Nodes consumed by this operation
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Operation::Input => vec![],
            Operation::Add { lhs, rhs }
            | Operation::Sub { lhs, rhs }
            | Operation::Mul { lhs, rhs }
            | Operation::Div { lhs, rhs }
            | Operation::MatMul { lhs, rhs } => vec![*lhs, *rhs],
            Operation::Neg { input }
            | Operation::Scale { input, .. }
            | Operation::Pow { input, .. }
            | Operation::Sum { input, .. }
            | Operation::Mean { input, .. }
            | Operation::Reshape { input, .. }
            | Operation::Transpose { input, .. } => vec![*input],
        }
    }
}

struct GraphNode<T> {
    operation: Operation,
    value: ArrayD<T>,
    gradient: Option<ArrayD<T>>,
    requires_grad: bool,
}

impl<T: Float> GraphNode<T> {
    fn accumulate_gradient(&mut self, grad: ArrayD<T>) -> Result<()> {
        if !self.requires_grad {
            return Ok(());
        }
        if grad.shape() != self.value.shape() {
            bail!(
                "Gradient shape {:?} does not match value shape {:?} for {} node",
                grad.shape(),
                self.value.shape(),
                self.operation.name()
            );
        }

        match self.gradient {
            Some(ref mut current) => *current = &*current + &grad,
            None => self.gradient = Some(grad),
        }
        Ok(())
    }
}

/// Handle to a node of a [`ComputationGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    id: NodeId,
    generation: u64,
}

impl Variable {
    /// Get the node ID
    pub fn id(&self) -> NodeId {
        self.id
    }
}

struct Tape<T> {
    generation: u64,
    nodes: Vec<GraphNode<T>>,
}

impl<T: Float + ScalarOperand + FromPrimitive> Tape<T> {
    fn node(&self, var: &Variable) -> Result<&GraphNode<T>> {
        if var.generation != self.generation {
            bail!("{} belongs to a cleared graph", var.id);
        }
        self.nodes
            .get(var.id.0)
            .ok_or_else(|| anyhow!("{} not found in graph", var.id))
    }

    fn value_of(&self, id: NodeId) -> Result<&ArrayD<T>> {
        self.nodes
            .get(id.0)
            .map(|n| &n.value)
            .ok_or_else(|| anyhow!("{} not found in graph", id))
    }

    fn push(&mut self, operation: Operation, value: ArrayD<T>, requires_grad: bool) -> Variable {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            operation,
            value,
            gradient: None,
            requires_grad,
        });
        Variable {
            id,
            generation: self.generation,
        }
    }

    /// Gradient contributions of one node to its inputs
    fn vjp(
        &self,
        operation: &Operation,
        grad_output: &ArrayD<T>,
    ) -> Result<Vec<(NodeId, ArrayD<T>)>> {
        match operation {
            Operation::Input => Ok(vec![]),

            Operation::Add { lhs, rhs } => Ok(vec![
                (*lhs, grad_output.clone()),
                (*rhs, grad_output.clone()),
            ]),

            Operation::Sub { lhs, rhs } => {
                Ok(vec![
                    (*lhs, grad_output.clone()),
                    (*rhs, grad_output.mapv(|g| -g)),
                ])
            }

            Operation::Mul { lhs, rhs } => {
                let lhs_val = self.value_of(*lhs)?;
                let rhs_val = self.value_of(*rhs)?;
                Ok(vec![
                    (*lhs, grad_output * rhs_val),
                    (*rhs, grad_output * lhs_val),
                ])
            }

            Operation::Div { lhs, rhs } => {
                // d/dx (x / y) = 1/y, d/dy (x / y) = -x/y^2
                let lhs_val = self.value_of(*lhs)?;
                let rhs_val = self.value_of(*rhs)?;
                let grad_lhs = grad_output / rhs_val;
                let grad_rhs = -(grad_output * lhs_val) / (rhs_val * rhs_val);
                Ok(vec![(*lhs, grad_lhs), (*rhs, grad_rhs)])
            }

            Operation::MatMul { lhs, rhs } => {
                // d/dx (x @ y) = g @ y^T, d/dy (x @ y) = x^T @ g
                let lhs_2d = self.value_of(*lhs)?.view().into_dimensionality::<Ix2>()?;
                let rhs_2d = self.value_of(*rhs)?.view().into_dimensionality::<Ix2>()?;
                let grad_2d = grad_output.view().into_dimensionality::<Ix2>()?;

                Ok(vec![
                    (*lhs, grad_2d.dot(&rhs_2d.t()).into_dyn()),
                    (*rhs, lhs_2d.t().dot(&grad_2d).into_dyn()),
                ])
            }

            Operation::Neg { input } => Ok(vec![(*input, grad_output.mapv(|g| -g))]),

            Operation::Scale { input, factor } => {
                let c = T::from(*factor).ok_or_else(|| anyhow!("Failed to convert factor"))?;
                Ok(vec![(*input, grad_output.mapv(|g| g * c))])
            }

            Operation::Pow { input, exponent } => {
                // d/dx x^n = n * x^(n-1)
                let input_val = self.value_of(*input)?;
                let n = T::from(*exponent).ok_or_else(|| anyhow!("Failed to convert exponent"))?;
                let n_minus_1 = T::from(exponent - 1.0)
                    .ok_or_else(|| anyhow!("Failed to convert exponent-1"))?;
                let local = input_val.mapv(|x| n * x.powf(n_minus_1));
                Ok(vec![(*input, grad_output * &local)])
            }

            Operation::Sum { input, axis } => {
                let input_shape = self.value_of(*input)?.shape().to_vec();
                let grad_input = spread_reduction(grad_output, &input_shape, *axis)?;
                Ok(vec![(*input, grad_input)])
            }

            Operation::Mean { input, axis } => {
                let input_shape = self.value_of(*input)?.shape().to_vec();
                let count = match axis {
                    Some(ax) => input_shape[*ax],
                    None => input_shape.iter().product(),
                };
                let divisor =
                    T::from(count).ok_or_else(|| anyhow!("Failed to convert element count"))?;
                let grad_input = spread_reduction(grad_output, &input_shape, *axis)?;
                Ok(vec![(*input, grad_input.mapv(|g| g / divisor))])
            }

            Operation::Reshape { input, old_shape } => {
                let grad_input = grad_output
                    .to_shape(IxDyn(old_shape))
                    .context("Reshape backward failed")?
                    .to_owned();
                Ok(vec![(*input, grad_input)])
            }

            Operation::Transpose { input, axes } => {
                let mut inverse = vec![0; axes.len()];
                for (i, &ax) in axes.iter().enumerate() {
                    inverse[ax] = i;
                }
                let grad_input = grad_output
                    .view()
                    .permuted_axes(IxDyn(&inverse))
                    .as_standard_layout()
                    .into_owned();
                Ok(vec![(*input, grad_input)])
            }
        }
    }
}

/// Broadcast the gradient of a reduction back to the shape of its input
fn spread_reduction<T: Float>(
    grad_output: &ArrayD<T>,
    input_shape: &[usize],
    axis: Option<usize>,
) -> Result<ArrayD<T>> {
    match axis {
        None => {
            let g = grad_output
                .iter()
                .next()
                .copied()
                .ok_or_else(|| anyhow!("Empty gradient for full reduction"))?;
            Ok(ArrayD::from_elem(IxDyn(input_shape), g))
        }
        Some(ax) => grad_output
            .clone()
            .insert_axis(Axis(ax))
            .broadcast(IxDyn(input_shape))
            .map(|view| view.to_owned())
            .ok_or_else(|| anyhow!("Broadcast failed in reduction backward")),
    }
}

fn ensure_same_shape<T>(op: &str, lhs: &ArrayD<T>, rhs: &ArrayD<T>) -> Result<()> {
    if lhs.shape() != rhs.shape() {
        bail!(
            "{} requires equal shapes, got {:?} and {:?}",
            op,
            lhs.shape(),
            rhs.shape()
        );
    }
    Ok(())
}

/// Computation graph for tape-based automatic differentiation
pub struct ComputationGraph<T: Float + ScalarOperand + FromPrimitive> {
    tape: Mutex<Tape<T>>,
}

impl<T: Float + ScalarOperand + FromPrimitive> Default for ComputationGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float + ScalarOperand + FromPrimitive> ComputationGraph<T> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            tape: Mutex::new(Tape {
                generation: 0,
                nodes: Vec::new(),
            }),
        }
    }

    /// Drop every node; variables created so far become invalid
    pub fn clear(&self) {
        let mut tape = self.tape.lock();
        tape.nodes.clear();
        tape.generation += 1;
    }

    /// Number of recorded nodes
    pub fn len(&self) -> usize {
        self.tape.lock().nodes.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.tape.lock().nodes.is_empty()
    }

    /// Create a leaf node
    pub fn variable(&self, value: ArrayD<T>, requires_grad: bool) -> Result<Variable> {
        Ok(self.tape.lock().push(Operation::Input, value, requires_grad))
    }

    /// Create a leaf node that never receives a gradient
    pub fn constant(&self, value: ArrayD<T>) -> Result<Variable> {
        self.variable(value, false)
    }

    /// Create a zero-dimensional constant
    pub fn scalar_constant(&self, value: T) -> Result<Variable> {
        self.constant(ArrayD::from_elem(IxDyn(&[]), value))
    }

    fn record<F>(&self, operation: Operation, inputs: &[&Variable], compute: F) -> Result<Variable>
    where
        F: FnOnce(&[&ArrayD<T>]) -> Result<ArrayD<T>>,
    {
        let mut tape = self.tape.lock();
        let mut values = Vec::with_capacity(inputs.len());
        let mut requires_grad = false;
        for var in inputs {
            let node = tape.node(var)?;
            requires_grad |= node.requires_grad;
            values.push(&node.value);
        }
        let value = compute(&values)?;
        drop(values);
        Ok(tape.push(operation, value, requires_grad))
    }

    /// Value of a variable
    pub fn value(&self, var: &Variable) -> Result<ArrayD<T>> {
        Ok(self.tape.lock().node(var)?.value.clone())
    }

    /// Value of a single-element variable
    pub fn scalar(&self, var: &Variable) -> Result<T> {
        let tape = self.tape.lock();
        let value = &tape.node(var)?.value;
        if value.len() != 1 {
            bail!("Expected a single-element value, got shape {:?}", value.shape());
        }
        value
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow!("Empty value"))
    }

    /// Whether gradients flow into this variable
    pub fn requires_grad(&self, var: &Variable) -> Result<bool> {
        Ok(self.tape.lock().node(var)?.requires_grad)
    }

    /// Accumulated gradient of a variable
    pub fn gradient(&self, var: &Variable) -> Result<ArrayD<T>> {
        self.tape
            .lock()
            .node(var)?
            .gradient
            .clone()
            .ok_or_else(|| anyhow!("No gradient available for {}", var.id))
    }

    /// Check if a variable has a gradient
    pub fn has_gradient(&self, var: &Variable) -> bool {
        self.tape
            .lock()
            .node(var)
            .is_ok_and(|node| node.gradient.is_some())
    }

    /// Zero all gradients in the graph
    pub fn zero_grad(&self) {
        for node in self.tape.lock().nodes.iter_mut() {
            node.gradient = None;
        }
    }

    // ===== Operations =====

    /// z = x + y
    pub fn add(&self, lhs: &Variable, rhs: &Variable) -> Result<Variable> {
        let op = Operation::Add {
            lhs: lhs.id,
            rhs: rhs.id,
        };
        self.record(op, &[lhs, rhs], |v| {
            ensure_same_shape("add", v[0], v[1])?;
            Ok(v[0] + v[1])
        })
    }

    /// z = x - y
    pub fn sub(&self, lhs: &Variable, rhs: &Variable) -> Result<Variable> {
        let op = Operation::Sub {
            lhs: lhs.id,
            rhs: rhs.id,
        };
        self.record(op, &[lhs, rhs], |v| {
            ensure_same_shape("sub", v[0], v[1])?;
            Ok(v[0] - v[1])
        })
    }

    /// z = x * y, element-wise
    pub fn mul(&self, lhs: &Variable, rhs: &Variable) -> Result<Variable> {
        let op = Operation::Mul {
            lhs: lhs.id,
            rhs: rhs.id,
        };
        self.record(op, &[lhs, rhs], |v| {
            ensure_same_shape("mul", v[0], v[1])?;
            Ok(v[0] * v[1])
        })
    }

    /// z = x / y, element-wise
    pub fn div(&self, lhs: &Variable, rhs: &Variable) -> Result<Variable> {
        let op = Operation::Div {
            lhs: lhs.id,
            rhs: rhs.id,
        };
        self.record(op, &[lhs, rhs], |v| {
            ensure_same_shape("div", v[0], v[1])?;
            Ok(v[0] / v[1])
        })
    }

    /// z = x @ y
    pub fn matmul(&self, lhs: &Variable, rhs: &Variable) -> Result<Variable> {
        let op = Operation::MatMul {
            lhs: lhs.id,
            rhs: rhs.id,
        };
        self.record(op, &[lhs, rhs], |v| {
            if v[0].ndim() != 2 || v[1].ndim() != 2 {
                bail!(
                    "MatMul only supports 2D matrices, got shapes {:?} and {:?}",
                    v[0].shape(),
                    v[1].shape()
                );
            }
            let lhs_2d = v[0].view().into_dimensionality::<Ix2>()?;
            let rhs_2d = v[1].view().into_dimensionality::<Ix2>()?;
            if lhs_2d.ncols() != rhs_2d.nrows() {
                bail!(
                    "MatMul inner dimensions differ: {:?} @ {:?}",
                    v[0].shape(),
                    v[1].shape()
                );
            }
            Ok(lhs_2d.dot(&rhs_2d).into_dyn())
        })
    }

    /// z = -x
    pub fn neg(&self, input: &Variable) -> Result<Variable> {
        self.record(Operation::Neg { input: input.id }, &[input], |v| {
            Ok(v[0].mapv(|x| -x))
        })
    }

    /// z = factor * x
    pub fn scale(&self, input: &Variable, factor: f64) -> Result<Variable> {
        let c = T::from(factor).ok_or_else(|| anyhow!("Failed to convert factor"))?;
        let op = Operation::Scale {
            input: input.id,
            factor,
        };
        self.record(op, &[input], |v| Ok(v[0].mapv(|x| x * c)))
    }

    /// z = x^n
    pub fn pow(&self, input: &Variable, exponent: f64) -> Result<Variable> {
        let exp_t = T::from(exponent).ok_or_else(|| anyhow!("Failed to convert exponent"))?;
        let op = Operation::Pow {
            input: input.id,
            exponent,
        };
        self.record(op, &[input], |v| Ok(v[0].mapv(|x| x.powf(exp_t))))
    }

    /// Sum of all elements, as a zero-dimensional array
    pub fn sum(&self, input: &Variable) -> Result<Variable> {
        self.sum_axis(input, None)
    }

    /// Sum along one axis, or over all elements when `axis` is `None`
    pub fn sum_axis(&self, input: &Variable, axis: Option<usize>) -> Result<Variable> {
        let op = Operation::Sum {
            input: input.id,
            axis,
        };
        self.record(op, &[input], |v| match axis {
            Some(ax) if ax >= v[0].ndim() => {
                bail!("Axis {} out of range for {}-d input", ax, v[0].ndim())
            }
            Some(ax) => Ok(v[0].sum_axis(Axis(ax))),
            None => {
                let total = v[0].iter().fold(T::zero(), |acc, &x| acc + x);
                Ok(ArrayD::from_elem(IxDyn(&[]), total))
            }
        })
    }

    /// Mean of all elements
    pub fn mean(&self, input: &Variable) -> Result<Variable> {
        self.mean_axis(input, None)
    }

    /// Mean along one axis, or over all elements when `axis` is `None`
    pub fn mean_axis(&self, input: &Variable, axis: Option<usize>) -> Result<Variable> {
        let op = Operation::Mean {
            input: input.id,
            axis,
        };
        self.record(op, &[input], |v| match axis {
            Some(ax) if ax >= v[0].ndim() => {
                bail!("Axis {} out of range for {}-d input", ax, v[0].ndim())
            }
            Some(ax) => v[0]
                .mean_axis(Axis(ax))
                .ok_or_else(|| anyhow!("Mean over an empty axis")),
            None => {
                if v[0].is_empty() {
                    bail!("Mean of an empty array");
                }
                let total = v[0].iter().fold(T::zero(), |acc, &x| acc + x);
                let n = T::from(v[0].len()).ok_or_else(|| anyhow!("Failed to convert length"))?;
                Ok(ArrayD::from_elem(IxDyn(&[]), total / n))
            }
        })
    }

    /// Row-major reshape
    pub fn reshape(&self, input: &Variable, new_shape: &[usize]) -> Result<Variable> {
        let old_shape = self.tape.lock().node(input)?.value.shape().to_vec();
        if old_shape.iter().product::<usize>() != new_shape.iter().product::<usize>() {
            bail!("Cannot reshape {:?} into {:?}", old_shape, new_shape);
        }

        let op = Operation::Reshape {
            input: input.id,
            old_shape,
        };
        self.record(op, &[input], |v| {
            Ok(v[0]
                .to_shape(IxDyn(new_shape))
                .context("Reshape failed")?
                .to_owned())
        })
    }

    /// Permute axes: output axis `i` is input axis `axes[i]`
    pub fn transpose(&self, input: &Variable, axes: &[usize]) -> Result<Variable> {
        let op = Operation::Transpose {
            input: input.id,
            axes: axes.to_vec(),
        };
        self.record(op, &[input], |v| {
            let ndim = v[0].ndim();
            let mut seen = vec![false; ndim];
            if axes.len() != ndim {
                bail!("Permutation {:?} does not match {}-d input", axes, ndim);
            }
            for &ax in axes {
                if ax >= ndim || seen[ax] {
                    bail!("Invalid axis permutation {:?}", axes);
                }
                seen[ax] = true;
            }
            Ok(v[0]
                .view()
                .permuted_axes(IxDyn(axes))
                .as_standard_layout()
                .into_owned())
        })
    }

    // ===== Backward Pass =====

    /// Accumulate gradients of a single-element output into every node it depends on
    pub fn backward(&self, output: &Variable) -> Result<()> {
        let mut tape = self.tape.lock();

        let out = tape.node(output)?;
        if out.value.len() != 1 {
            bail!(
                "Backward can only be called on scalar outputs, got shape {:?}",
                out.value.shape()
            );
        }
        if !out.requires_grad {
            return Ok(());
        }
        let seed = ArrayD::from_elem(out.value.raw_dim(), T::one());
        tape.nodes[output.id.0].accumulate_gradient(seed)?;

        for idx in (0..=output.id.0).rev() {
            let node = &tape.nodes[idx];
            if !node.requires_grad {
                continue;
            }
            let Some(grad_output) = node.gradient.as_ref() else {
                continue;
            };

            let contributions = tape.vjp(&node.operation, grad_output)?;
            for (parent, grad) in contributions {
                tape.nodes
                    .get_mut(parent.0)
                    .ok_or_else(|| anyhow!("Parent {} not found", parent))?
                    .accumulate_gradient(grad)?;
            }
        }

        Ok(())
    }

    /// Get statistics about the computation graph
    pub fn stats(&self) -> GraphStats {
        let tape = self.tape.lock();
        let mut ops_count: HashMap<String, usize> = HashMap::new();
        for node in &tape.nodes {
            *ops_count
                .entry(node.operation.name().to_string())
                .or_insert(0) += 1;
        }

        GraphStats {
            num_nodes: tape.nodes.len(),
            num_edges: tape.nodes.iter().map(|n| n.operation.inputs().len()).sum(),
            num_requires_grad: tape.nodes.iter().filter(|n| n.requires_grad).count(),
            ops_count,
        }
    }
}

/// Statistics about the computation graph
#[derive(Debug)]
pub struct GraphStats {
    /// Total number of nodes
    pub num_nodes: usize,
    /// Total number of edges
    pub num_edges: usize,
    /// Number of nodes requiring gradients
    pub num_requires_grad: usize,
    /// Count of each operation type
    pub ops_count: HashMap<String, usize>,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Computation Graph Statistics:")?;
        writeln!(f, "  Nodes: {}", self.num_nodes)?;
        writeln!(f, "  Edges: {}", self.num_edges)?;
        writeln!(f, "  Requires Grad: {}", self.num_requires_grad)?;
        writeln!(f, "  Operations:")?;
        let mut ops: Vec<_> = self.ops_count.iter().collect();
        ops.sort();
        for (op, count) in ops {
            writeln!(f, "    {}: {}", op, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    #[test]
    fn test_basic_addition() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![2.0, 3.0].into_dyn(), true)?;
        let y = graph.variable(array![4.0, 5.0].into_dyn(), true)?;
        let z = graph.add(&x, &y)?;

        let z_val = graph.value(&z)?;
        assert_eq!(z_val[[0]], 6.0);
        assert_eq!(z_val[[1]], 8.0);

        let loss = graph.sum(&z)?;
        graph.backward(&loss)?;
        assert_eq!(graph.gradient(&x)?, array![1.0, 1.0].into_dyn());
        assert_eq!(graph.gradient(&y)?, array![1.0, 1.0].into_dyn());

        Ok(())
    }

    #[test]
    fn test_multiplication_gradient() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![2.0, 3.0].into_dyn(), true)?;
        let y = graph.variable(array![4.0, 5.0].into_dyn(), true)?;
        let z = graph.mul(&x, &y)?;

        let loss = graph.sum(&z)?;
        graph.backward(&loss)?;

        // d/dx (x*y) = y
        assert_eq!(graph.gradient(&x)?, array![4.0, 5.0].into_dyn());
        // d/dy (x*y) = x
        assert_eq!(graph.gradient(&y)?, array![2.0, 3.0].into_dyn());

        Ok(())
    }

    #[test]
    fn test_matmul_gradient() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let a = graph.variable(array![[1.0, 2.0], [3.0, 4.0]].into_dyn(), true)?;
        let b = graph.variable(array![[5.0, 6.0], [7.0, 8.0]].into_dyn(), true)?;
        let c = graph.matmul(&a, &b)?;

        let loss = graph.sum(&c)?;
        graph.backward(&loss)?;
        let grad_a = graph.gradient(&a)?;
        let grad_b = graph.gradient(&b)?;

        assert_eq!(grad_a[[0, 0]], 11.0); // 5 + 6
        assert_eq!(grad_a[[0, 1]], 15.0); // 7 + 8
        assert_eq!(grad_b[[0, 0]], 4.0); // 1 + 3
        assert_eq!(grad_b[[1, 0]], 6.0); // 2 + 4

        Ok(())
    }

    #[test]
    fn test_chain_rule_with_constants() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        // f(x) = (x + 1) * 2
        let x = graph.variable(array![3.0].into_dyn(), true)?;
        let one = graph.constant(array![1.0].into_dyn())?;
        let two = graph.constant(array![2.0].into_dyn())?;

        let x_plus_1 = graph.add(&x, &one)?;
        let y = graph.mul(&x_plus_1, &two)?;

        graph.backward(&y)?;
        assert_eq!(graph.gradient(&x)?[[0]], 2.0);
        assert!(!graph.has_gradient(&one));

        Ok(())
    }

    #[test]
    fn test_squared_error_gradient() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![1.0, -2.0, 0.5].into_dyn(), true)?;
        let target = graph.constant(array![0.0, 0.0, 1.0].into_dyn())?;

        let diff = graph.sub(&x, &target)?;
        let sq = graph.pow(&diff, 2.0)?;
        let loss = graph.sum(&sq)?;
        assert!((graph.scalar(&loss)? - (1.0 + 4.0 + 0.25)).abs() < 1e-12);

        graph.backward(&loss)?;
        let grad = graph.gradient(&x)?;
        assert!((grad[[0]] - 2.0).abs() < 1e-12);
        assert!((grad[[1]] + 4.0).abs() < 1e-12);
        assert!((grad[[2]] + 1.0).abs() < 1e-12);

        Ok(())
    }

    #[test]
    fn test_reused_variable_accumulates() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![3.0].into_dyn(), true)?;
        let y = graph.add(&x, &x)?;
        let z = graph.mul(&y, &x)?; // 2x^2

        graph.backward(&z)?;
        assert_eq!(graph.gradient(&x)?[[0]], 12.0);

        Ok(())
    }

    #[test]
    fn test_sum_and_mean_axis() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn(), true)?;

        let rows = graph.sum_axis(&x, Some(1))?;
        assert_eq!(graph.value(&rows)?, array![6.0, 15.0].into_dyn());

        let m = graph.mean(&rows)?;
        assert_eq!(graph.scalar(&m)?, 10.5);

        graph.backward(&m)?;
        let grad = graph.gradient(&x)?;
        assert_eq!(grad.shape(), &[2, 3]);
        assert!(grad.iter().all(|&g| (g - 0.5).abs() < 1e-12));

        Ok(())
    }

    #[test]
    fn test_reshape_and_transpose_gradients() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn(), true)?;
        let w = graph.constant(array![[1.0, 10.0], [100.0, 1000.0], [0.0, 0.5]].into_dyn())?;

        let xt = graph.transpose(&x, &[1, 0])?;
        assert_eq!(
            graph.value(&xt)?,
            array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]].into_dyn()
        );

        // sum(x^T * w) = sum(x * w^T)
        let prod = graph.mul(&xt, &w)?;
        let flat = graph.reshape(&prod, &[6])?;
        let loss = graph.sum(&flat)?;
        graph.backward(&loss)?;

        assert_eq!(
            graph.gradient(&x)?,
            array![[1.0, 100.0, 0.0], [10.0, 1000.0, 0.5]].into_dyn()
        );

        Ok(())
    }

    #[test]
    fn test_transpose_3d_roundtrip_values() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 3, 4]), (0..24).map(f64::from).collect())?;
        let x = graph.constant(data.clone())?;
        let t = graph.transpose(&x, &[1, 0, 2])?;
        let value = graph.value(&t)?;

        assert_eq!(value.shape(), &[3, 2, 4]);
        assert_eq!(value[[2, 1, 3]], data[[1, 2, 3]]);
        assert!(value.is_standard_layout());

        Ok(())
    }

    #[test]
    fn test_backward_on_constant_output_is_noop() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![1.0].into_dyn(), true)?;
        let c = graph.scalar_constant(7.0)?;

        graph.backward(&c)?;
        assert!(!graph.has_gradient(&x));
        assert!(!graph.has_gradient(&c));

        Ok(())
    }

    #[test]
    fn test_backward_rejects_non_scalar_output() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![1.0, 2.0].into_dyn(), true)?;
        assert!(graph.backward(&x).is_err());
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_is_error() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![1.0, 2.0].into_dyn(), true)?;
        let y = graph.variable(array![1.0, 2.0, 3.0].into_dyn(), true)?;

        assert!(graph.add(&x, &y).is_err());
        assert!(graph.reshape(&x, &[3]).is_err());
        assert!(graph.transpose(&x, &[0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn test_clear_invalidates_variables() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![1.0].into_dyn(), true)?;
        graph.clear();
        assert!(graph.is_empty());

        let y = graph.variable(array![2.0].into_dyn(), true)?;
        assert_eq!(x.id(), y.id());
        assert!(graph.value(&x).is_err());
        assert_eq!(graph.scalar(&y)?, 2.0);
        Ok(())
    }

    #[test]
    fn test_zero_grad_and_stats() -> Result<()> {
        let graph = ComputationGraph::<f64>::new();
        let x = graph.variable(array![1.0, 2.0].into_dyn(), true)?;
        let s = graph.sum(&x)?;
        graph.backward(&s)?;
        assert!(graph.has_gradient(&x));

        graph.zero_grad();
        assert!(!graph.has_gradient(&x));

        let stats = graph.stats();
        assert_eq!(stats.num_nodes, 2);
        assert_eq!(stats.num_edges, 1);
        assert_eq!(stats.num_requires_grad, 2);
        assert_eq!(stats.ops_count.get("Sum"), Some(&1));
        assert!(stats.to_string().contains("Nodes: 2"));
        Ok(())
    }
}
