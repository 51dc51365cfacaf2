//! A small backpropagation network that learns steering commands from
//! bit-packed sensor vectors, and the controller that feeds it.

#[macro_use]
extern crate serde_derive;

pub mod activator;
pub mod codec;
pub mod config;
pub mod controller;
pub mod layer;
pub mod network;
pub mod scenarios;
pub mod transport;

mod utils;
