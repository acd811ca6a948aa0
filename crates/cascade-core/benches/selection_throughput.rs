//! Benchmarks for role-mapper model selection
//!
//! Run with: `cargo bench --package cascade-core --bench selection_throughput`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cascade_core::capability::{ModelCapabilities, ModelSource, Quantization, RoleRequirements, SystemConstraints, ThermalState};
use cascade_core::registry::ModelRegistry;
use cascade_core::role_mapper::{RoleMapper, SelectionCriteria};

fn model(idx: usize) -> ModelCapabilities {
    let params = 1_000_000_000 + (idx as u64) * 500_000_000;
    let mem = 2.0 + (idx as f64 % 10.0);
    ModelCapabilities::new(
        format!("model-{idx}"),
        ModelSource::Local,
        8192,
        Quantization::Q4_0,
        params,
        mem,
        mem,
        mem,
    )
    .with_skills(
        0.4 + (idx as f32 % 6.0) / 10.0,
        0.4 + (idx as f32 % 5.0) / 10.0,
        0.3 + (idx as f32 % 7.0) / 10.0,
        0.5,
    )
}

fn registry_with(count: usize) -> ModelRegistry {
    let registry = ModelRegistry::new(256.0, 0.9, false);
    let names: Vec<String> = (0..count).map(|i| format!("model-{i}")).collect();
    for i in 0..count {
        registry.register_profile(model(i));
    }
    registry.set_role_preferences("planner", names);
    registry
}

fn constraints() -> SystemConstraints {
    SystemConstraints {
        max_memory_gb: 256.0,
        available_memory_gb: 128.0,
        max_thermal_sensitivity: 0.8,
        thermal_state: ThermalState::Normal,
        local_only: false,
        cloud_fallbacks_enabled: false,
    }
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_mapper_select");

    for size in [10, 100, 1000].iter() {
        let registry = registry_with(*size);
        let mapper = RoleMapper::new(&registry);
        let requirements = RoleRequirements::new("planner");
        let constraints = constraints();

        group.bench_with_input(BenchmarkId::new("select", size), size, |b, _| {
            b.iter(|| mapper.select("planner", black_box(&requirements), black_box(&constraints), None));
        });
    }

    group.finish();
}

fn bench_recommendations(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_mapper_recommendations");

    for size in [10, 100, 1000].iter() {
        let registry = registry_with(*size);
        let mapper = RoleMapper::new(&registry);
        let requirements = RoleRequirements::new("planner");
        let constraints = constraints();

        group.bench_with_input(BenchmarkId::new("top5", size), size, |b, _| {
            b.iter(|| mapper.recommendations("planner", black_box(&requirements), black_box(&constraints), None, 5));
        });
    }

    group.finish();
}

fn bench_select_with_criteria(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_mapper_select_with_criteria");

    let registry = registry_with(200);
    let mapper = RoleMapper::new(&registry);
    let requirements = RoleRequirements::new("planner");
    let constraints = constraints();
    let criteria = SelectionCriteria { prefer_local: true, prefer_smaller: true, prefer_faster: true };

    group.bench_function("select_overlay", |b| {
        b.iter(|| mapper.select("planner", black_box(&requirements), black_box(&constraints), Some(black_box(&criteria))));
    });

    group.finish();
}

criterion_group!(benches, bench_select, bench_recommendations, bench_select_with_criteria);
criterion_main!(benches);
