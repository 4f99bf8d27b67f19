//! Markov network layout and gate encoding settings.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Maximum number of address bits (inputs + history) a gate table may use.
pub const MAX_TABLE_BITS: usize = 8;

/// Maximum number of output pins per gate (table entries are bytes).
pub const MAX_OUTPUT_BITS: usize = 8;

/// Kinds of gates a genome can encode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// Deterministic truth table.
    Logic,
    /// Stochastic table of output-distribution weights.
    Probabilistic,
}

/// An enabled gate kind and its selection weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateKindWeight {
    pub kind: GateKind,
    pub weight: u32,
}

/// Bounds on gate pin counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateLimits {
    #[serde(default = "default_pin_floor")]
    pub input_floor: usize,
    #[serde(default = "default_pin_limit")]
    pub input_limit: usize,
    #[serde(default = "default_pin_floor")]
    pub output_floor: usize,
    #[serde(default = "default_pin_limit")]
    pub output_limit: usize,
    #[serde(default)]
    pub history_floor: usize,
    #[serde(default)]
    pub history_limit: usize,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            input_floor: default_pin_floor(),
            input_limit: default_pin_limit(),
            output_floor: default_pin_floor(),
            output_limit: default_pin_limit(),
            history_floor: 0,
            history_limit: 0,
        }
    }
}

fn default_pin_floor() -> usize {
    1
}
fn default_pin_limit() -> usize {
    4
}

/// Markov network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovConfig {
    /// Number of input state slots.
    #[serde(default = "default_inputs")]
    pub inputs: usize,
    /// Number of output state slots.
    #[serde(default = "default_outputs")]
    pub outputs: usize,
    /// Number of hidden state slots.
    #[serde(default = "default_hidden")]
    pub hidden: usize,
    /// Depth of the rolling history buffer.
    #[serde(default)]
    pub history_depth: usize,
    /// Gate pin bounds.
    #[serde(default)]
    pub gate: GateLimits,
    /// Enabled gate kinds and their weights.
    #[serde(default = "default_gate_kinds")]
    pub gate_kinds: Vec<GateKindWeight>,
    /// Codon pair marking the start of a gate.
    #[serde(default = "default_start_codon")]
    pub start_codon: [u32; 2],
    /// Number of distinct weight levels in probabilistic tables.
    #[serde(default = "default_weight_steps")]
    pub weight_steps: u32,
    /// Network updates per fitness trial.
    #[serde(default = "default_update_n")]
    pub update_n: usize,
    /// Independent trials per fitness evaluation.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Value of output slots no gate writes to.
    #[serde(default)]
    pub fallback_output: u8,
    /// Start codons planted in ancestral genomes.
    #[serde(default = "default_initial_gates")]
    pub initial_gates: usize,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            inputs: default_inputs(),
            outputs: default_outputs(),
            hidden: default_hidden(),
            history_depth: 0,
            gate: GateLimits::default(),
            gate_kinds: default_gate_kinds(),
            start_codon: default_start_codon(),
            weight_steps: default_weight_steps(),
            update_n: default_update_n(),
            trials: default_trials(),
            fallback_output: 0,
            initial_gates: default_initial_gates(),
        }
    }
}

fn default_trials() -> usize {
    16
}
fn default_inputs() -> usize {
    2
}
fn default_outputs() -> usize {
    2
}
fn default_hidden() -> usize {
    8
}
fn default_gate_kinds() -> Vec<GateKindWeight> {
    vec![
        GateKindWeight {
            kind: GateKind::Logic,
            weight: 1,
        },
        GateKindWeight {
            kind: GateKind::Probabilistic,
            weight: 1,
        },
    ]
}
fn default_start_codon() -> [u32; 2] {
    [42, 213]
}
fn default_weight_steps() -> u32 {
    256
}
fn default_update_n() -> usize {
    1
}
fn default_initial_gates() -> usize {
    4
}

impl MarkovConfig {
    /// Total number of state slots (inputs + outputs + hidden).
    #[inline]
    pub fn state_size(&self) -> usize {
        self.inputs + self.outputs + self.hidden
    }

    /// Sum of all gate kind weights.
    pub fn total_kind_weight(&self) -> u64 {
        self.gate_kinds.iter().map(|k| k.weight as u64).sum()
    }

    /// Validate layout and gate bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_size() == 0 {
            return Err(ConfigError::EmptyNetwork);
        }

        let g = &self.gate;
        let check = |floor: usize, limit: usize, name: &str| {
            if floor > limit {
                Err(ConfigError::InvalidGateLimits(format!(
                    "{name} floor ({floor}) > limit ({limit})"
                )))
            } else {
                Ok(())
            }
        };
        check(g.input_floor, g.input_limit, "input")?;
        check(g.output_floor, g.output_limit, "output")?;
        check(g.history_floor, g.history_limit, "history")?;

        if g.output_limit > MAX_OUTPUT_BITS {
            return Err(ConfigError::InvalidGateLimits(format!(
                "output limit {} exceeds {MAX_OUTPUT_BITS}",
                g.output_limit
            )));
        }
        let bits = g.input_limit + g.history_limit;
        if bits > MAX_TABLE_BITS {
            return Err(ConfigError::TableTooWide {
                bits,
                max: MAX_TABLE_BITS,
            });
        }
        if g.history_limit > 0 && self.history_depth == 0 {
            return Err(ConfigError::MissingHistory);
        }

        if self.total_kind_weight() == 0 {
            return Err(ConfigError::NoGateKinds);
        }
        if self.weight_steps == 0 {
            return Err(ConfigError::InvalidGateLimits(
                "weight steps must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(MarkovConfig::default().validate().is_ok());
        assert_eq!(MarkovConfig::default().state_size(), 12);
    }

    #[test]
    fn test_floor_above_limit() {
        let mut config = MarkovConfig::default();
        config.gate.input_floor = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGateLimits(_))
        ));
    }

    #[test]
    fn test_history_requires_depth() {
        let mut config = MarkovConfig::default();
        config.gate.history_limit = 2;
        assert!(matches!(config.validate(), Err(ConfigError::MissingHistory)));

        config.history_depth = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_table_width() {
        let mut config = MarkovConfig::default();
        config.gate.input_limit = 6;
        config.gate.history_limit = 3;
        config.history_depth = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TableTooWide { bits: 9, .. })
        ));
    }

    #[test]
    fn test_zero_kind_weight() {
        let config = MarkovConfig {
            gate_kinds: vec![GateKindWeight {
                kind: GateKind::Logic,
                weight: 0,
            }],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoGateKinds)));
    }
}
