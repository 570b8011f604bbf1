pub mod rest;

pub use rest::{configure, ApiState, RestApi};
