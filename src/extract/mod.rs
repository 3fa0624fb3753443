//! Field extraction engine.
//!
//! - [`field`]: locate one value with a before/after/occurrence anchor or a
//!   regex override.
//! - [`infer`]: infer anchors from a highlighted span.
//! - [`variant`]: score detection rules and pick the best variant.

pub mod error;
pub mod field;
pub mod infer;
pub mod variant;

pub use error::{ExtractError, ExtractResult};
pub use field::{Matcher, extract_field};
pub use infer::{InferMode, InferenceConfig, InferredPattern, infer_pattern};
pub use variant::{VariantScore, score_variant, score_variants, select_variant};
