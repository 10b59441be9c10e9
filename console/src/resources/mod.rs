pub mod actions;
pub mod controller;
pub mod filter;
pub mod source;
