//! Workflow graph editing pipeline: schema, validation, repair, layout and
//! snapshot history.

pub mod expression;
pub mod layout;
pub mod lint;
pub mod patch;
pub mod patterns;
pub mod pipeline;
pub mod schema;
pub mod transform;
pub mod versions;
