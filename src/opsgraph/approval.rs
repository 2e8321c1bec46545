// SPDX-License-Identifier: MIT

//! Human approval gate
//!
//! The gate shows a menu on the operator channel and blocks until the
//! operator approves or rejects. Viewing details and invalid input re-prompt.

use crate::adk::error::OpsGraphError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

pub const DEFAULT_REJECT_FEEDBACK: &str = "No feedback provided";
pub const APPROVED_FEEDBACK: &str = "Approved by user";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Decision plus the operator's feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub decision: ApprovalDecision,
    pub feedback: String,
}

/// One parsed menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Approve,
    Reject,
    View,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "approve" => Some(Choice::Approve),
            "2" | "reject" => Some(Choice::Reject),
            "3" | "view" => Some(Choice::View),
            _ => None,
        }
    }
}

/// Channel to the human operator
#[async_trait]
pub trait Operator: Send + Sync {
    /// Display text
    async fn show(&self, text: &str) -> Result<(), OpsGraphError>;

    /// Display `question` and read one line
    async fn prompt(&self, question: &str) -> Result<String, OpsGraphError>;
}

const MENU: &str = "What would you like to do?\n  1. APPROVE - save the result\n  2. REJECT  - regenerate\n  3. VIEW    - show full details";

/// Block until the operator approves or rejects
pub async fn request_approval(
    operator: &dyn Operator,
    details: &str,
) -> Result<ApprovalOutcome, OpsGraphError> {
    operator.show(MENU).await?;
    loop {
        let answer = operator.prompt("Enter choice (1/2/3): ").await?;
        match Choice::parse(&answer) {
            Some(Choice::Approve) => {
                log::info!("Operator APPROVED");
                return Ok(ApprovalOutcome {
                    decision: ApprovalDecision::Approved,
                    feedback: APPROVED_FEEDBACK.to_string(),
                });
            }
            Some(Choice::Reject) => {
                let feedback = operator.prompt("Why reject? (optional): ").await?;
                let feedback = match feedback.trim() {
                    "" => DEFAULT_REJECT_FEEDBACK.to_string(),
                    text => text.to_string(),
                };
                log::warn!("Operator REJECTED: {}", feedback);
                return Ok(ApprovalOutcome {
                    decision: ApprovalDecision::Rejected,
                    feedback,
                });
            }
            Some(Choice::View) => operator.show(details).await?,
            None => {
                operator
                    .show("Invalid choice. Please enter 1, 2, or 3.")
                    .await?
            }
        }
    }
}

/// Interactive terminal operator
pub struct StdinOperator {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinOperator {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for StdinOperator {
    async fn show(&self, text: &str) -> Result<(), OpsGraphError> {
        println!("{}", text);
        Ok(())
    }

    async fn prompt(&self, question: &str) -> Result<String, OpsGraphError> {
        print!("{}", question);
        std::io::stdout().flush()?;
        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line),
            None => Err(OpsGraphError::operator("operator input closed")),
        }
    }
}

/// Non-interactive operator that approves at the first prompt
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApproveOperator;

#[async_trait]
impl Operator for AutoApproveOperator {
    async fn show(&self, text: &str) -> Result<(), OpsGraphError> {
        log::debug!("{}", text);
        Ok(())
    }

    async fn prompt(&self, question: &str) -> Result<String, OpsGraphError> {
        log::info!("{}auto-approved", question);
        Ok("approve".to_string())
    }
}
