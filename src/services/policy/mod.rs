pub mod decision;
pub mod evaluator;
pub mod input;
pub mod rego;

pub use decision::{Decision, DecisionError, decide};
pub use evaluator::{PolicyContext, PolicyError, PolicyEvaluator, ResultSet};
pub use input::PolicyInput;
pub use rego::RegoPolicy;
