//! # combo_core - Structural Load Combination Engine
//!
//! `combo_core` turns load combination expressions into coefficient matrices
//! and evaluates them. A combination such as
//! `1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W)` describes six scenarios; the
//! engine expands it once and then evaluates all six for any set of load
//! values, scalar or array-valued.
//!
//! ## Design Philosophy
//!
//! - **Compile once**: The matrix and evaluator are built on first use and cached
//! - **Two front ends**: Parse strings, or compose terms with `&`, `|` and `*`
//! - **Rich Errors**: Structured error types carrying the offending expression
//! - **Thread-safe**: Combinations are immutable and `Send + Sync`
//!
//! ## Quick Start
//!
//! ```rust
//! use combo_core::loads::{Combination, Signature};
//!
//! let combo = Combination::parse("1.4*D & 1.2*L").unwrap();
//! assert_eq!(combo.matrix().unwrap().dim(), (1, 2));
//!
//! let f = combo.function(Signature::new("gravity", ["D", "L"]).unwrap()).unwrap();
//! let result = f.call_positional([1.0, 1.0]).unwrap();
//! assert!((result[[0]] - 2.6).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`loads`] - Algebra, parser, matrix compiler, evaluator, binder, ASCE 7 presets
//! - [`common`] - Flattening of nested sequences
//! - [`errors`] - Structured error types

pub mod common;
pub mod errors;
pub mod loads;

// Re-export commonly used types at crate root for convenience
pub use errors::{ComboError, ComboResult};
pub use loads::{Combination, LoadCombinationFn, LoadValue, ScaledTerm};
