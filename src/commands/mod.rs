pub mod reconcile;
pub mod status;
