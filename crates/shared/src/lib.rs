pub mod context;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod state;
pub mod suggestion;
