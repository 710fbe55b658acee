//! Control-flow vocabulary shared by interceptors and the dispatch layer.
//!
//! A `ControlFlow` is a set of independent facets combined with bitwise OR.
//! Test a facet with [`ControlFlow::has_facet`] (AND against the single-bit
//! mask), never by equality against a combined constant.

use crate::error::{Error, Result};
use bitflags::bitflags;

bitflags! {
    /// Outcome reported by an interceptor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ControlFlow: u8 {
        /// Stop running further interceptors in the sequence.
        const SHORT_CIRCUIT = 1 << 0;
        /// Skip the default store mutation for this message.
        const IGNORE_DEFAULT_DB_OPS = 1 << 1;
        const SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS =
            Self::SHORT_CIRCUIT.bits() | Self::IGNORE_DEFAULT_DB_OPS.bits();
    }
}

impl ControlFlow {
    /// No facet set: default processing proceeds.
    pub const PASS_THROUGH: Self = Self::empty();

    /// Whether every bit of `mask` is set in `self`.
    ///
    /// `PASS_THROUGH` as a mask is trivially contained in every value.
    pub fn has_facet(self, mask: ControlFlow) -> bool {
        self.bits() & mask.bits() == mask.bits()
    }

    pub fn is_short_circuit(self) -> bool {
        self.has_facet(Self::SHORT_CIRCUIT)
    }

    pub fn ignores_default_db_ops(self) -> bool {
        self.has_facet(Self::IGNORE_DEFAULT_DB_OPS)
    }

    /// Build from raw bits, rejecting bits outside the known facets.
    pub fn try_from_bits(bits: u8) -> Result<Self> {
        Self::from_bits(bits).ok_or(Error::UnknownControlFlowBits(bits))
    }
}

impl Default for ControlFlow {
    fn default() -> Self {
        Self::PASS_THROUGH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_named_values_are_distinct() {
        let flows = [
            ControlFlow::SHORT_CIRCUIT,
            ControlFlow::IGNORE_DEFAULT_DB_OPS,
            ControlFlow::PASS_THROUGH,
            ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS,
        ];
        let set: HashSet<u8> = flows.iter().map(|cf| cf.bits()).collect();
        assert_eq!(set.len(), flows.len());
    }

    #[test]
    fn test_bit_values() {
        assert_eq!(ControlFlow::PASS_THROUGH.bits(), 0);
        assert_eq!(ControlFlow::SHORT_CIRCUIT.bits(), 1);
        assert_eq!(ControlFlow::IGNORE_DEFAULT_DB_OPS.bits(), 2);
        assert_eq!(ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS.bits(), 3);
        assert_eq!(ControlFlow::default(), ControlFlow::PASS_THROUGH);
    }

    #[test]
    fn test_combined_has_both_facets() {
        let cf = ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS;
        assert!(cf.is_short_circuit());
        assert!(cf.ignores_default_db_ops());

        let pass = ControlFlow::PASS_THROUGH;
        assert!(!pass.is_short_circuit());
        assert!(!pass.ignores_default_db_ops());
    }

    #[test]
    fn test_facet_is_not_equality() {
        // Extra unknown bits must not hide a known facet.
        let cf = ControlFlow::from_bits_retain(0b1001);
        assert!(cf.is_short_circuit());
        assert!(!cf.ignores_default_db_ops());
        assert_ne!(cf, ControlFlow::SHORT_CIRCUIT);
    }

    #[test]
    fn test_try_from_bits() {
        assert_eq!(
            ControlFlow::try_from_bits(3).unwrap(),
            ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS
        );
        assert!(matches!(
            ControlFlow::try_from_bits(4),
            Err(Error::UnknownControlFlowBits(4))
        ));
    }
}
