use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rigguard::prelude::*;
use rigguard::{default_rule_set, ResolvedBuild};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_core() -> RigGuardCore {
    RigGuardCore::from_files(&fixture_path("catalog.json"), None, None).unwrap()
}

fn bench_analyze_build(c: &mut Criterion) {
    let core = load_core();
    let configuration = core
        .load_configuration(&fixture_path("builds").join("socket_mismatch.json"))
        .unwrap();

    c.bench_function("analyze_configuration", |b| {
        b.iter(|| {
            core.analyze_configuration(black_box(&configuration), AnalysisOptions::final_build())
                .unwrap()
        });
    });
}

fn bench_check_pair(c: &mut Criterion) {
    let core = load_core();
    let cpu = core.component(ComponentId(1)).unwrap();
    let board = core.component(ComponentId(3)).unwrap();

    c.bench_function("check_components_compatibility", |b| {
        b.iter(|| core.check_components_compatibility(black_box(cpu), black_box(board)));
    });
}

fn bench_large_build(c: &mut Criterion) {
    // Storage and memory allow multiples, so a wide build stays valid.
    let mut components = vec![
        Component::new(1, ComponentType::Cpu, "cpu").with_spec("socket", "AM5").with_spec("tdp", "120"),
        Component::new(2, ComponentType::Motherboard, "board")
            .with_spec("socket", "AM5")
            .with_spec("memory_type", "DDR5")
            .with_spec("storage_interfaces", "SATA, NVMe"),
        Component::new(3, ComponentType::PowerSupply, "psu").with_spec("wattage", "1000"),
    ];
    for i in 0..40 {
        components.push(
            Component::new(100 + i, ComponentType::Storage, format!("disk {}", i))
                .with_spec("interface", if i % 2 == 0 { "NVMe" } else { "SATA" })
                .with_spec("power_consumption", "8"),
        );
        components.push(
            Component::new(200 + i, ComponentType::Ram, format!("stick {}", i))
                .with_spec("memory_type", "DDR5")
                .with_spec("power_consumption", "5"),
        );
    }
    let refs: Vec<&Component> = components.iter().collect();
    let build = ResolvedBuild::from_components(&refs).unwrap();
    let core = RigGuardCore::new(Catalog::new(), default_rule_set(), EngineConfig::default());

    c.bench_function("analyze_83_components", |b| {
        b.iter(|| core.analyze_build(black_box(&build), AnalysisOptions::partial()));
    });
}

criterion_group!(benches, bench_analyze_build, bench_check_pair, bench_large_build);
criterion_main!(benches);
