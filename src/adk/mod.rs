// SPDX-License-Identifier: MIT

//! Collaborator kit: error types and the generation/embedding capabilities
//! the workflows call through.

pub mod error;
pub mod model;
