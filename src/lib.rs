//! Zodd: an embeddable bottom-up Datalog evaluator.
//!
//! The engine materializes derived tuples by repeatedly applying rules to
//! relations until a fixed point, using the semi-naive strategy: each
//! round only re-derives facts that involve a tuple discovered in the
//! previous round. There is no rule language; the host builds
//! [`Relation`]s and [`Variable`]s and expresses rule bodies as calls to
//! [`join_into`], [`extend_into`] and [`join_anti`] inside a driver loop
//! run by an [`Iteration`].
//!
//! ```ignore
//! let ctx = Context::sequential();
//! let mut iteration = Iteration::new(&ctx);
//! let edges_by_dst = iteration.variable::<(u32, u32)>("edges_by_dst");
//! let reachable = iteration.variable::<(u32, u32)>("reachable");
//! edges_by_dst.insert(edges.iter().map(|&(x, y)| (y, x)));
//! reachable.insert(edges.iter().copied());
//!
//! while iteration.changed()? {
//!     // reachable(x, z) <- edge(x, y), reachable(y, z)
//!     join_into(&ctx, &edges_by_dst, &reachable, &reachable,
//!         |_y, &x, &z| (x, z));
//! }
//! let closure = reachable.complete();
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod context;
pub mod gallop;
pub mod index;
pub mod iteration;
pub mod join;
pub mod leapfrog;
pub mod persist;
pub mod relation;
pub mod storable;
pub mod tuple;
pub mod variable;

pub use crate::{
    aggregate::aggregate,
    context::{Context, ContextError, ContextOptions},
    gallop::gallop,
    index::SecondaryIndex,
    iteration::{Iteration, IterationError, IterationOptions},
    join::{join_anti, join_helper, join_into},
    leapfrog::{extend_into, ExtendAnti, ExtendWith, FilterAnti, Leaper, UNBOUNDED},
    persist::PersistError,
    relation::Relation,
    storable::Storable,
    tuple::Tuple,
    variable::Variable,
};
