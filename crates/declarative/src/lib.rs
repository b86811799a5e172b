//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for comparing desired state
//! with current state and converging one write at a time.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with a desired and a current version
//! - **Change**: Create, update, delete or nothing, from [`classify`]
//! - **SetDelta**: Add/remove sets between two versions of a set
//! - **Executor**: Issues writes sequentially with pacing, dry-run and
//!   per-step failure isolation
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     Change, ExecuteOptions, Executor, NoProgress, Resource, ResourceDiff, classify,
//! };
//!
//! #[derive(Debug)]
//! struct Setting { key: String, value: String }
//!
//! impl Resource for Setting {
//!     fn id(&self) -> String { self.key.clone() }
//!     fn description(&self) -> String { format!("{} = {}", self.key, self.value) }
//!     fn resource_type(&self) -> &'static str { "setting" }
//!     fn same_as(&self, other: &Self) -> bool {
//!         self.key == other.key && self.value == other.value
//!     }
//! }
//!
//! let desired = Setting { key: "theme".into(), value: "dark".into() };
//! let current = Setting { key: "theme".into(), value: "light".into() };
//!
//! let change = classify(Some(&desired), Some(&current)).unwrap();
//! assert_eq!(change, Change::Update);
//!
//! let mut progress = NoProgress;
//! let mut executor = Executor::new(ExecuteOptions::default(), &mut progress);
//! executor.apply(ResourceDiff::new(&desired, change), || {
//!     // write the setting here
//!     Ok::<_, std::io::Error>(())
//! });
//! assert_eq!(executor.finish().summary.modified, 1);
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, SetDelta, group_by_type};
pub use executor::{Executor, Report, Step, StepRecord};
pub use resource::{Resource, classify};
pub use types::{ApplyResult, Change, ExecuteOptions, ExecuteSummary};
