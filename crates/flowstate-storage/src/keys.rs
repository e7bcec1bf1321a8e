// Key scheme: two-part addresses for every record
//
// Group key clusters all records belonging to one run; the discriminator key
// distinguishes records within the group and determines in-group ordering.

use serde::{Deserialize, Serialize};

/// Discriminator key of a run's metadata record
pub const RUN_METADATA_KEY: &str = "RUN#METADATA";

/// Discriminator-key prefix for step records
pub const STEP_KEY_PREFIX: &str = "STEP#";

/// Discriminator-key prefix for event records
pub const EVENT_KEY_PREFIX: &str = "EVENT#";

/// Discriminator-key prefix for hook records
pub const HOOK_KEY_PREFIX: &str = "HOOK#";

/// Entity-type tag stored on every record and indexed for global listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Run,
    Step,
    Hook,
    Event,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Step => "step",
            Self::Hook => "hook",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group key owning all records of one run
pub fn run_group_key(run_id: &str) -> String {
    format!("RUN#{run_id}")
}

/// Discriminator key of a step record
pub fn step_key(step_id: &str) -> String {
    format!("{STEP_KEY_PREFIX}{step_id}")
}

/// Discriminator key of an event record
pub fn event_key(event_id: &str) -> String {
    format!("{EVENT_KEY_PREFIX}{event_id}")
}

/// Discriminator key of a hook record
pub fn hook_key(hook_id: &str) -> String {
    format!("{HOOK_KEY_PREFIX}{hook_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation() {
        assert_eq!(run_group_key("run_abc"), "RUN#run_abc");
        assert_eq!(step_key("step_1"), "STEP#step_1");
        assert_eq!(event_key("evt_1"), "EVENT#evt_1");
        assert_eq!(hook_key("h1"), "HOOK#h1");
    }

    #[test]
    fn entity_kind_tags() {
        assert_eq!(EntityKind::Run.as_str(), "run");
        assert_eq!(serde_json::to_string(&EntityKind::Hook).unwrap(), "\"hook\"");
        let kind: EntityKind = serde_json::from_str("\"event\"").unwrap();
        assert_eq!(kind, EntityKind::Event);
    }
}
