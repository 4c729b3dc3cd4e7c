//! Explain output for compiled plans
//!
//! Produces deterministic, human-readable output, or JSON via serde.

use std::fmt;

use serde::Serialize;

use super::errors::PlannerError;
use super::plan::CompiledPlan;

/// One relationship hop as shown by explain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainHop {
    /// Dotted relationship path
    pub path: String,
    /// Target table
    pub table: String,
    /// Strategy name
    pub strategy: String,
    /// Loaded columns
    pub loaded: Vec<String>,
    /// Deferred columns
    pub deferred: Vec<String>,
}

/// Explain plan output
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    /// Whether compilation succeeded
    pub accepted: bool,
    /// Entity name
    pub entity: String,
    /// Root table (if accepted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Relationship hops, parents first
    pub hops: Vec<ExplainHop>,
    /// Rejection reason (if rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a compiled plan
    pub fn from_plan(plan: &CompiledPlan) -> Self {
        let hops = plan
            .directives()
            .map(|d| ExplainHop {
                path: d.path.clone(),
                table: d.table.clone(),
                strategy: d.strategy.as_str().to_string(),
                loaded: d.loaded.iter().cloned().collect(),
                deferred: d.deferred.iter().cloned().collect(),
            })
            .collect();

        Self {
            accepted: true,
            entity: plan.entity().to_string(),
            root: Some(plan.root().to_string()),
            hops,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a construction error
    pub fn from_error(entity: &str, err: &PlannerError) -> Self {
        Self {
            accepted: false,
            entity: entity.to_string(),
            root: None,
            hops: Vec::new(),
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN: {} ===", self.entity)?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(root) = &self.root {
                writeln!(f, "Root: {} (all columns)", root)?;
            }
            for hop in &self.hops {
                writeln!(f, "{} -> {} [{}]", hop.path, hop.table, hop.strategy)?;
                writeln!(f, "  load:  {}", hop.loaded.join(", "))?;
                if !hop.deferred.is_empty() {
                    writeln!(f, "  defer: {}", hop.deferred.join(", "))?;
                }
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
