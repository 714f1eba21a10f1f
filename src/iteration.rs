//! The fixed-point driver: advances a group of variables in lock-step.

use std::fmt;

use tracing::debug;

use crate::context::Context;
use crate::tuple::Tuple;
use crate::variable::Variable;

/// Options recognized when building an [`Iteration`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IterationOptions {
    /// Maximum number of rounds. `None` means unbounded.
    pub max_rounds: Option<usize>,
}

/// Error type for iteration rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationError {
    /// The configured round cap was reached before a fixed point.
    MaxRoundsExceeded {
        /// The cap that was hit.
        limit: usize,
    },
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxRoundsExceeded { limit } => {
                write!(f, "no fixed point after {limit} rounds")
            }
        }
    }
}

impl std::error::Error for IterationError {}

/// Object-safe view of a variable, one entry per registered member.
trait VariableTrait: Send {
    fn advance(&mut self) -> bool;
    fn name(&self) -> &str;
}

impl<T: Tuple> VariableTrait for Variable<T> {
    fn advance(&mut self) -> bool {
        self.changed()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Coordinates semi-naive rounds over a set of variables.
///
/// Variables created through [`Iteration::variable`] share the iteration's
/// context and are advanced together by [`Iteration::changed`]. The usual
/// driver loop is
///
/// ```ignore
/// while iteration.changed()? {
///     // apply rule bodies: join_into / extend_into / join_anti
/// }
/// ```
///
/// After convergence the host may insert more base tuples, call
/// [`Iteration::reset`], and re-drive the loop; only derivations touching
/// the new tuples are recomputed.
pub struct Iteration {
    ctx: Context,
    variables: Vec<Box<dyn VariableTrait>>,
    round: usize,
    max_rounds: Option<usize>,
}

impl Iteration {
    /// An unbounded iteration over the given context.
    pub fn new(ctx: &Context) -> Self {
        Self::with_options(ctx, IterationOptions::default())
    }

    /// An iteration with an optional round cap.
    pub fn with_options(ctx: &Context, options: IterationOptions) -> Self {
        Self {
            ctx: ctx.clone(),
            variables: Vec::new(),
            round: 0,
            max_rounds: options.max_rounds,
        }
    }

    /// Create a variable registered with this iteration.
    pub fn variable<T: Tuple>(&mut self, name: &str) -> Variable<T> {
        let variable = Variable::new(&self.ctx, name);
        self.variables.push(Box::new(variable.clone()));
        variable
    }

    /// Advance every member variable by one round.
    ///
    /// Returns true while any member still has recent tuples, false once
    /// all of them have reached a fixed point. Fails with
    /// [`IterationError::MaxRoundsExceeded`] when a configured cap is hit;
    /// the iteration stays usable after [`Iteration::reset`].
    pub fn changed(&mut self) -> Result<bool, IterationError> {
        if let Some(limit) = self.max_rounds {
            if self.round >= limit {
                return Err(IterationError::MaxRoundsExceeded { limit });
            }
        }
        self.round += 1;

        let changed = match self.ctx.pool() {
            Some(pool) if self.variables.len() > 1 => {
                use rayon::prelude::*;
                pool.install(|| {
                    self.variables
                        .par_iter_mut()
                        .map(|variable| variable.advance())
                        .reduce(|| false, |left, right| left || right)
                })
            }
            // `fold` rather than `any`: every member must advance even
            // after one reports a change.
            _ => self
                .variables
                .iter_mut()
                .fold(false, |acc, variable| variable.advance() | acc),
        };

        debug!(round = self.round, changed, "iteration round complete");
        Ok(changed)
    }

    /// The number of rounds driven since creation or the last reset.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Zero the round counter. Member variables are untouched; this is the
    /// entry point for incremental maintenance after new base tuples.
    pub fn reset(&mut self) {
        self.round = 0;
    }

    /// The context this iteration runs over.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Names of the registered variables, in registration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name())
    }
}

impl fmt::Debug for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iteration")
            .field("round", &self.round)
            .field("max_rounds", &self.max_rounds)
            .field("variables", &self.variables.len())
            .finish()
    }
}
