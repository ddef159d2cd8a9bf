//! Values a loss function may return

use tnopt_ad::Variable;

/// One scalar loss or several terms whose sum is minimized
#[derive(Debug, Clone, PartialEq)]
pub enum Loss {
    Scalar(Variable),
    Terms(Vec<Variable>),
}

impl Loss {
    /// Flatten into the list of terms
    pub fn into_terms(self) -> Vec<Variable> {
        match self {
            Loss::Scalar(v) => vec![v],
            Loss::Terms(terms) => terms,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Loss::Scalar(_) => 1,
            Loss::Terms(terms) => terms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Variable> for Loss {
    fn from(v: Variable) -> Self {
        Loss::Scalar(v)
    }
}

impl From<Vec<Variable>> for Loss {
    fn from(terms: Vec<Variable>) -> Self {
        Loss::Terms(terms)
    }
}

impl<const N: usize> From<[Variable; N]> for Loss {
    fn from(terms: [Variable; N]) -> Self {
        Loss::Terms(terms.to_vec())
    }
}

impl From<(Variable, Variable)> for Loss {
    fn from((a, b): (Variable, Variable)) -> Self {
        Loss::Terms(vec![a, b])
    }
}

impl From<(Variable, Variable, Variable)> for Loss {
    fn from((a, b, c): (Variable, Variable, Variable)) -> Self {
        Loss::Terms(vec![a, b, c])
    }
}
