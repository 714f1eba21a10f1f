//! The capability bundle required of tuple types.

/// A value the engine can store in relations.
///
/// Tuples are compared lexicographically field by field, which Rust's
/// derived `Ord` on tuples, arrays and enums of scalars already provides.
/// `Send + Sync + 'static` let relations cross worker threads and live
/// inside an [`Iteration`](crate::Iteration)'s registry. Blanket-implemented,
/// so any ordinary value type qualifies without opt-in.
pub trait Tuple: Ord + Clone + Send + Sync + 'static {}

impl<T: Ord + Clone + Send + Sync + 'static> Tuple for T {}
