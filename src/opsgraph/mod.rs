// SPDX-License-Identifier: MIT

//! opsgraph - LLM workflow orchestration
//!
//! A state-machine executor ([graph]) runs typed workflows whose nodes call
//! out to a generation model, a two-tier [memory], a [knowledge] base, an
//! artifact [sink] and a human [approval] gate, all reachable through the
//! session [context].

pub mod approval;
pub mod config;
pub mod context;
pub mod graph;
pub mod input;
pub mod knowledge;
pub mod memory;
pub mod pipelines;
pub mod prompts;
pub mod sink;
pub mod validation;
