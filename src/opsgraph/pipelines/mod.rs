//! Concrete workflows built on the graph executor
//!
//! - [testcase] - generate, validate, retry and human-approve test cases
//! - [log_analyzer] - retrieval-augmented log analysis with a three-part report
//! - [incident] - supervisor over three incident specialists

pub mod incident;
pub mod log_analyzer;
pub mod testcase;
