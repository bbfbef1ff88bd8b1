//! Example: using the rule set and checker directly (without RigGuardCore).
//! Run with: cargo run --example custom_rules

use rigguard::rules::{CompatibilityRule, Operator, RuleKind, ValueModifier};
use rigguard::{CompatibilityChecker, Component, ComponentType, EngineConfig, RuleSet};
use std::sync::Arc;

fn main() {
    let rules = RuleSet::new(vec![
        CompatibilityRule::new(
            1,
            (ComponentType::Cpu, "socket"),
            (ComponentType::Motherboard, "socket"),
            RuleKind::ExactMatch(Operator::Equals),
        )
        .with_description("Socket must match"),
        // Keep 20% headroom between the GPU recommendation and the supply.
        CompatibilityRule::new(
            2,
            (ComponentType::Gpu, "recommended_psu"),
            (ComponentType::PowerSupply, "wattage"),
            RuleKind::LessThan { inclusive: true },
        )
        .with_modifier(ValueModifier::Scale(1.2))
        .with_description("Supply must cover the GPU recommendation with headroom"),
    ]);

    let cpu = Component::new(1, ComponentType::Cpu, "Ryzen 7 7700X").with_spec("socket", "AM5");
    let board = Component::new(2, ComponentType::Motherboard, "B650 board").with_spec("socket", "AM5");
    let gpu = Component::new(3, ComponentType::Gpu, "RX 7800 XT").with_spec("recommended_psu", "700W");
    let psu = Component::new(4, ComponentType::PowerSupply, "750W Gold").with_spec("wattage", "750");

    let checker = CompatibilityChecker::new(Arc::new(rules), &EngineConfig::default());
    for (a, b) in [(&cpu, &board), (&gpu, &psu)] {
        let report = checker.evaluate_pair(a, b);
        println!(
            "{} + {}: {}",
            a.label(),
            b.label(),
            if report.compatible() { "ok" } else { "incompatible" }
        );
        for failure in &report.failures {
            println!("  {} {}: {}", failure.rule_id, failure.description, failure.detail);
        }
    }
}
