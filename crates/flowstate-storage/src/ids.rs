// Identifier generation: prefixed, time-ordered, sortable
//
// UUIDv7 gives a millisecond timestamp in the high bits; the shared
// ContextV7 adds a counter so ids generated within the same millisecond
// still sort in generation order. Formatted as <prefix> + 32 hex chars,
// which keeps them safe as discriminator-key components.

use uuid::timestamp::context::ContextV7;
use uuid::{Timestamp, Uuid};

/// Generates prefixed, lexicographically sortable unique identifiers.
///
/// One instance per entity type that needs generated ids (runs, steps,
/// events). Hook ids are caller-supplied and never generated here.
pub struct IdGenerator {
    prefix: &'static str,
    clock: ContextV7,
}

impl IdGenerator {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            clock: ContextV7::new(),
        }
    }

    /// Generator for run ids (`run_...`)
    pub fn runs() -> Self {
        Self::new("run_")
    }

    /// Generator for step ids (`step_...`)
    pub fn steps() -> Self {
        Self::new("step_")
    }

    /// Generator for event ids (`evt_...`)
    pub fn events() -> Self {
        Self::new("evt_")
    }

    /// Produce the next identifier
    pub fn generate(&self) -> String {
        let ts = Timestamp::now(&self.clock);
        format!("{}{}", self.prefix, Uuid::new_v7(ts).simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix() {
        let ids = IdGenerator::runs();
        let id = ids.generate();
        assert!(id.starts_with("run_"));
        assert_eq!(id.len(), "run_".len() + 32);
    }

    #[test]
    fn ids_sort_in_generation_order() {
        let ids = IdGenerator::events();
        let mut generated = Vec::new();
        for _ in 0..200 {
            generated.push(ids.generate());
        }
        let mut sorted = generated.clone();
        sorted.sort();
        assert_eq!(generated, sorted);
    }

    #[test]
    fn ids_are_unique() {
        let ids = IdGenerator::steps();
        let generated: std::collections::HashSet<_> = (0..1000).map(|_| ids.generate()).collect();
        assert_eq!(generated.len(), 1000);
    }
}
