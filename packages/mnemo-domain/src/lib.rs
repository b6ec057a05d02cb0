pub mod candidates;
pub mod facts;
pub mod pagination;
pub mod reconcile;
