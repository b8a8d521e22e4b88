//! Typed list markers → native numbering.

pub mod detect;
pub mod group;
pub mod materialize;

pub use detect::{Marker, detect};
pub use group::{Candidate, GroupPlan, ListGroup, plan_groups};
pub use materialize::{ListLayout, Materialized, materialize, strip_prefix};
