//! Domain core for the Stride workout coach.
//!
//! Everything in here is transport-agnostic: the HTTP layer, the LLM provider and
//! the relational store plug in through the traits in [`coach`].

pub mod coach;
pub mod conversation;
pub mod deadline;
pub mod error;
pub mod machine;
pub mod plan;
pub mod prompt;
pub mod slots;
pub mod store;
