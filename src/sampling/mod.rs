//! Design sampling: Sobol training designs, uniform candidate pools, and the
//! exact-match disjointness filter that builds the out-of-sample set.

pub mod dedup;
pub mod design;
pub mod sobol;
