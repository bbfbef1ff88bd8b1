//! Rule set shipped with the engine.
//!
//! The rules are stored in the same JSON record format an external rule
//! store uses, embedded at compile time. A file passed on the command line
//! replaces them entirely.

use super::set::RuleSet;

const EMBEDDED_DEFAULT_RULES: &str = include_str!("../../rules/default_rules.json");

/// Default rule set. A parse failure yields an empty set and a warning.
pub fn default_rule_set() -> RuleSet {
    match RuleSet::from_json_str(EMBEDDED_DEFAULT_RULES) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!("Failed to parse embedded rules: {}", e);
            RuleSet::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentType;

    #[test]
    fn test_embedded_rules_load_cleanly() {
        let set = default_rule_set();
        assert!(set.len() >= 9);
        assert!(set.defects().is_empty());
        assert!(set.conflicts().is_empty());
    }

    #[test]
    fn test_socket_rule_present() {
        let set = default_rule_set();
        let socket = set
            .applicable(ComponentType::Motherboard, ComponentType::Cpu)
            .find(|r| r.source_property == "socket");
        assert!(socket.is_some());
    }
}
