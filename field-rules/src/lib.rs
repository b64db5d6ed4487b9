//! Generic per-field validation and coercion for loosely typed declaration data.
//!
//! Source documents are decoded once into a [`Value`]. Each declaration type
//! then describes its accepted fields as a [`Rules`] table of [`Check`] rows
//! (checker, default, output key, value transform) and runs
//! [`Rules::validate`], which reports every bad field into an [`Errs`]
//! collector rather than stopping at the first one.

pub mod check;
pub mod checkers;
pub mod errs;
pub mod value;

pub use check::{Check, Checked, Checker, Rules, Transform};
pub use errs::Errs;
pub use value::{Value, ValueError};
