//! Editor-integration surface for Leda: [`Source`] owns one file's analysis
//! artifacts end to end, [`Project`] holds a set of them and aggregates
//! references across files, and [`name_finder`] answers "what name sits at
//! this position" queries against a parsed tree.

pub mod name_finder;
pub mod project;
pub mod source;

pub use name_finder::get_name_at;
pub use project::Project;
pub use source::Source;
