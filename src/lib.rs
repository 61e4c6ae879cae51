pub mod automation;
pub mod backend;
pub mod classify;
pub mod config;
pub mod controller;
pub mod model;
pub mod persist;
pub mod rules;
pub mod staging;
