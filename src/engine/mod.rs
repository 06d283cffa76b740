//! Hak ediş commission engine.
//!
//! Everything in this module is pure: given classification fields, amounts and override
//! state it returns structured results and never touches storage. Services call into it
//! and persist what it returns.
//!
//! | work scope            | policy           | outcome                         |
//! |-----------------------|------------------|---------------------------------|
//! | `NON_IMALAT`          | any              | never eligible                  |
//! | `PURE_MALZEME`        | any              | never eligible                  |
//! | `PURE_IMALAT`         | any              | always eligible                 |
//! | `MALZEME_PLUS_IMALAT` | `ALWAYS_INCLUDED`| eligible                        |
//! | `MALZEME_PLUS_IMALAT` | `ALWAYS_EXCLUDED`| not eligible                    |
//! | `MALZEME_PLUS_IMALAT` | `CONDITIONAL`    | eligible once owner approves    |

pub mod decision;
pub mod documentation;
pub mod exposure;
pub mod projection;
pub mod validation;

pub use decision::{decide, Decision, DecisionReason};
pub use documentation::{requires_documentation, DocumentationPolicy, DocumentationRequirement};
pub use exposure::{BatchEntry, Exposure};
pub use projection::{CategoryDefault, ProjectionReport, ProjectionRow, CATEGORY_DEFAULTS};
pub use validation::{validate, ValidationReport};

/// System-wide commission rate (7%).
pub const HAK_EDIS_RATE: f64 = 0.07;

/// Rounds to cents, nudging by machine epsilon first so values such as `1.005` that are
/// stored slightly below their decimal form still round up.
pub fn round2(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

/// Rate-carrying entry point to the decision table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionEngine {
    rate: f64,
}

impl CommissionEngine {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Commission owed on `amount` at this engine's rate, rounded to cents.
    pub fn commission(&self, amount: f64) -> f64 {
        round2(amount * self.rate)
    }
}

impl Default for CommissionEngine {
    fn default() -> Self {
        Self::new(HAK_EDIS_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_handles_binary_representation_error() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(1000.0 * 0.07), 70.0);
        assert_eq!(round2(2000.0 * 0.07), 140.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn round2_is_idempotent() {
        for value in [0.1, 1.005, 2.675, 12.3456, 999.999, 70.00000000000001, 1e6 / 3.0] {
            let once = round2(value);
            assert_eq!(round2(once), once, "value {value}");
        }
    }

    #[test]
    fn engine_defaults_to_seven_percent() {
        let engine = CommissionEngine::default();
        assert_eq!(engine.rate(), 0.07);
        assert_eq!(engine.commission(333.33), 23.33);
        assert_eq!(CommissionEngine::new(0.1).commission(1000.0), 100.0);
    }
}
