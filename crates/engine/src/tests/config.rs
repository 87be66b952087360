use std::time::Duration;

use alloy_primitives::U256;
use assert_matches::assert_matches;
use ledger::adapter::{IdentitySource, RailAdapter};
use tempfile::TempDir;
use types::{errors::LiquidityError, units::RateOrientation};

use crate::{
    config::{EngineConfig, EngineConfigBuilder},
    store_builder::RankingPolicy,
};

#[test]
fn test_defaults() {
    let config = EngineConfigBuilder::new().build().unwrap();

    assert_eq!(config.batch_size, 50);
    assert_eq!(config.fetch_timeout_secs, 10);
    assert_eq!(config.poll_interval(), Duration::from_secs(30));
    assert_eq!(config.ranking_policy, RankingPolicy::BestPrice);
    assert_eq!(config.rate_orientation, RateOrientation::SettlementPerFiat);
    assert_eq!(config.max_transfer_size, "250");

    let settings = config.engine_settings().unwrap();
    assert_eq!(settings.max_transfer_size, U256::from(250_000_000u64));
    assert_eq!(settings.sync.reader.batch_size(), 50);
}

#[test]
fn test_invalid_values_are_rejected() {
    assert_matches!(
        EngineConfigBuilder::new().batch_size(0).build(),
        Err(LiquidityError::Config(_))
    );
    assert_matches!(
        EngineConfigBuilder::new().batch_size(501).build(),
        Err(LiquidityError::Config(_))
    );
    assert_matches!(
        EngineConfigBuilder::new().max_transfer_size("lots").build(),
        Err(LiquidityError::Config(_))
    );
    assert_matches!(
        EngineConfigBuilder::new().poll_interval_secs(0).build(),
        Err(LiquidityError::Config(_))
    );
    assert_matches!(
        EngineConfigBuilder::new().rail(" ").build(),
        Err(LiquidityError::Config(_))
    );
}

#[test]
fn test_save_and_load_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.yaml");

    let config = EngineConfigBuilder::new()
        .config_file_path(&path)
        .database_directory(temp_dir.path().join("db"))
        .batch_size(30)
        .ranking_policy(RankingPolicy::DeepestLiquidity)
        .rate_orientation(RateOrientation::FiatPerSettlement)
        .identity_source(IdentitySource::DepositorIdHash)
        .rail("hdfc")
        .deny_list(vec!["blocked@upi".to_string()])
        .metrics_port(Some(9000))
        .build()
        .unwrap();
    config.save().unwrap();

    let yaml = std::fs::read_to_string(&path).unwrap();
    assert!(yaml.contains("ranking_policy: deepest_liquidity"));
    assert!(yaml.contains("rate_orientation: fiat_per_settlement"));

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);

    let rail = loaded.rail_adapter();
    assert_eq!(rail.name(), "hdfc");
    assert_eq!(rail.identity_source(), IdentitySource::DepositorIdHash);
}

#[test]
fn test_partial_yaml_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    std::fs::write(&path, "batch_size: 30\nrail: revolut\n").unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded.batch_size, 30);
    assert_eq!(loaded.rail, "revolut");
    assert_eq!(loaded.fetch_timeout_secs, 10);

    // An omitted database directory lands in the platform data directory,
    // not next to the working directory.
    if let Ok(data_dir) = EngineConfig::default_database_directory() {
        assert!(data_dir.is_absolute());
        assert_eq!(loaded.database_directory, data_dir);
    }
}

#[test]
fn test_invalid_yaml_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    std::fs::write(&path, "batch_size: 9000\n").unwrap();

    assert_matches!(EngineConfig::load(&path), Err(LiquidityError::Config(_)));
    assert_matches!(
        EngineConfig::load(&temp_dir.path().join("missing.yaml")),
        Err(LiquidityError::Config(_))
    );
}

#[test]
fn test_config_file_path_in_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = EngineConfig::get_config_file_path(temp_dir.path().to_str()).unwrap();
    assert_eq!(path, temp_dir.path().join("config.yaml"));
}
