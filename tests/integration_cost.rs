//! Integration tests for cost accounting through the batch API.

mod common;

use server_room_sim::equipment::EquipmentTier;
use server_room_sim::montecarlo::run_batch;
use server_room_sim::sim::{IntegrationMethod, IntegratorConfig, PhysicalConfig};

#[test]
fn saturated_cooling_matches_analytic_cost_for_every_trial() {
    let room = common::insulated_hot_room();
    let unit = common::flat_cop_unit();
    let weather = common::constant_weather(1, 35.0);
    let expected = 25_000.0 / 3_200.0 * 24.0 * room.price_per_kwh;

    for method in [IntegrationMethod::Rk45, IntegrationMethod::Euler] {
        let integrator = IntegratorConfig {
            method,
            ..IntegratorConfig::default()
        };
        let batch = run_batch(
            &room,
            &unit,
            &weather,
            &integrator,
            &common::one_day_options(3, false, 5),
        )
        .expect("batch should succeed");

        assert_eq!(batch.costs.len(), 3);
        for cost in &batch.costs {
            assert!(
                (cost - expected).abs() / expected < 1e-6,
                "{method:?}: cost {cost} vs analytic {expected}"
            );
        }
        let stats = batch.cost_stats().expect("costs");
        assert!(stats.std < 1e-9);
    }
}

#[test]
fn better_equipment_is_cheaper_on_identical_weather() {
    let room = PhysicalConfig::default();
    let weather = common::short_weather(2);
    let options = server_room_sim::BatchOptions {
        horizon_hours: 48,
        ..common::one_day_options(4, true, 77)
    };

    let mean_cost = |tier: EquipmentTier| {
        run_batch(
            &room,
            &tier.config(),
            &weather,
            &common::default_integrator(),
            &options,
        )
        .expect("batch should succeed")
        .cost_stats()
        .expect("costs")
        .mean
    };

    let economical = mean_cost(EquipmentTier::Economical);
    let efficient = mean_cost(EquipmentTier::Efficient);
    let premium = mean_cost(EquipmentTier::Premium);
    assert!(premium < efficient, "premium {premium} vs efficient {efficient}");
    assert!(efficient < economical, "efficient {efficient} vs economical {economical}");
}

#[test]
fn higher_price_scales_cost_linearly() {
    let cheap = PhysicalConfig::default();
    let dear = PhysicalConfig {
        price_per_kwh: cheap.price_per_kwh * 2.0,
        ..PhysicalConfig::default()
    };
    let weather = common::short_weather(1);
    let unit = EquipmentTier::Efficient.config();
    let options = common::one_day_options(2, false, 9);

    let a = run_batch(&cheap, &unit, &weather, &common::default_integrator(), &options)
        .expect("batch");
    let b = run_batch(&dear, &unit, &weather, &common::default_integrator(), &options)
        .expect("batch");
    for (x, y) in a.costs.iter().zip(&b.costs) {
        assert!((y - 2.0 * x).abs() < 1e-9 * y.abs().max(1.0));
    }
}
