// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Gas metering: per-opcode costs and a budgeted meter.

use std::collections::HashMap;

use thiserror::Error;

use crate::opcode::OpCode;

/// Per-opcode gas prices. Opcodes without an entry are free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasCosts {
    costs: HashMap<OpCode, u64>,
}

/// Error loading a cost table.
#[derive(Debug, Error)]
pub enum GasCostsError {
    #[error("unknown opcode '{0}' in gas cost table")]
    UnknownOpcode(String),

    #[error("invalid gas cost table: {0}")]
    Json(#[from] serde_json::Error),
}

impl GasCosts {
    /// An empty table: everything is free.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every opcode costs `cost`.
    pub fn uniform(cost: u64) -> Self {
        GasCosts {
            costs: OpCode::ALL.iter().map(|op| (*op, cost)).collect(),
        }
    }

    /// Set the price of one opcode (builder style).
    pub fn with(mut self, op: OpCode, cost: u64) -> Self {
        self.costs.insert(op, cost);
        self
    }

    pub fn set(&mut self, op: OpCode, cost: u64) {
        self.costs.insert(op, cost);
    }

    #[inline]
    pub fn cost(&self, op: OpCode) -> u64 {
        self.costs.get(&op).copied().unwrap_or(0)
    }

    /// Parse a JSON object mapping opcode names to costs, e.g. `{"Add": 3}`.
    pub fn from_json(text: &str) -> Result<Self, GasCostsError> {
        let raw: HashMap<String, u64> = serde_json::from_str(text)?;
        let mut costs = GasCosts::new();
        for (name, cost) in raw {
            let op = OpCode::from_name(&name).ok_or(GasCostsError::UnknownOpcode(name))?;
            costs.set(op, cost);
        }
        Ok(costs)
    }
}

/// Gas consumed so far against an optional budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasMeter {
    budget: Option<u64>,
    used: u64,
}

/// Returned when a charge would exceed the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfGas;

impl GasMeter {
    pub fn new(budget: Option<u64>) -> Self {
        GasMeter { budget, used: 0 }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Charge `cost`. On overflow of the budget, usage is pinned to the budget.
    #[inline]
    pub fn charge(&mut self, cost: u64) -> Result<(), OutOfGas> {
        let next = self.used.saturating_add(cost);
        match self.budget {
            Some(budget) if next > budget => {
                self.used = budget;
                Err(OutOfGas)
            }
            _ => {
                self.used = next;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_costs_are_free() {
        let costs = GasCosts::new().with(OpCode::Add, 5);
        assert_eq!(costs.cost(OpCode::Add), 5);
        assert_eq!(costs.cost(OpCode::Pop), 0);
    }

    #[test]
    fn test_uniform_covers_every_opcode() {
        let costs = GasCosts::uniform(2);
        for op in OpCode::ALL {
            assert_eq!(costs.cost(op), 2);
        }
    }

    #[test]
    fn test_meter_pins_usage_to_budget() {
        let mut meter = GasMeter::new(Some(5));
        assert!(meter.charge(3).is_ok());
        assert_eq!(meter.charge(3), Err(OutOfGas));
        assert_eq!(meter.used(), 5);
    }

    #[test]
    fn test_meter_exact_budget_succeeds() {
        let mut meter = GasMeter::new(Some(4));
        assert!(meter.charge(4).is_ok());
        assert_eq!(meter.used(), 4);
        assert_eq!(meter.charge(1), Err(OutOfGas));
    }

    #[test]
    fn test_unbounded_meter_counts() {
        let mut meter = GasMeter::new(None);
        for _ in 0..10 {
            meter.charge(7).unwrap();
        }
        assert_eq!(meter.used(), 70);
    }

    #[test]
    fn test_costs_from_json() {
        let costs = GasCosts::from_json(r#"{"Add": 3, "Constant": 1}"#).unwrap();
        assert_eq!(costs.cost(OpCode::Add), 3);
        assert_eq!(costs.cost(OpCode::Constant), 1);
        assert!(matches!(
            GasCosts::from_json(r#"{"Bogus": 1}"#),
            Err(GasCostsError::UnknownOpcode(_))
        ));
    }
}
