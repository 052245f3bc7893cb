//! # Configuration Tests
//!
//! Tests for configuration defaults, deserialization and validation.

use std::io::Write;

use drampuf_core::common::{ConfigError, PhysAddr};
use drampuf_core::config::{Config, EndOfList};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn defaults_describe_beaglebone_black() {
    let config = Config::default();
    assert_eq!(config.dram.base, 0x8000_0000);
    assert_eq!(config.dram.end, 0x9FDF_FFFF);
    assert_eq!(config.dram.row_size(), 2048);
    assert_eq!(config.region.size, 64 * 1024);
    assert_eq!(config.region.phys_base, None);
    assert_eq!(config.refresh.period_ms, 55);
    assert_eq!(config.refresh.ctrl_reg, 0x4C00_0010);
    assert_eq!(config.refresh.shadow_reg, 0x4C00_0014);
    assert_eq!(config.refresh.disable_bit, 1 << 31);
    assert_eq!(config.warm_up.retries, 3);
    assert_eq!(config.warm_up.settle_ms, 10_000);
    assert!(config.thermal.enabled);
    assert_eq!(config.thermal.bandgap_reg, 0x44E1_0448);
    assert_eq!(config.thermal.poll_period_ms, 2_000);
    assert_eq!(config.session.end_of_list, EndOfList::Restart);
    assert!(config.validate().is_ok());
}

#[test]
fn empty_json_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.region.size, Config::default().region.size);
    assert_eq!(config.warm_up.retries, Config::default().warm_up.retries);
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = Config::from_json(r#"{ "warm_up": { "retries": 1 }, "thermal": { "enabled": false } }"#)
        .unwrap();
    assert_eq!(config.warm_up.retries, 1);
    assert_eq!(config.warm_up.settle_ms, 10_000);
    assert!(!config.thermal.enabled);
    assert_eq!(config.thermal.poll_period_ms, 2_000);
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        Config::from_json(r#"{ "region": { "size": "big" } }"#),
        Err(ConfigError::Parse(_))
    ));
}

#[rstest]
#[case::zero(0)]
#[case::half_row(1024)]
#[case::row_and_a_half(3072)]
fn region_size_must_be_whole_rows(#[case] size: u64) {
    let mut config = Config::default();
    config.region.size = size;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::RegionSize { row_size: 2048, .. })
    ));
}

#[test]
fn unaligned_base_is_rejected() {
    let mut config = Config::default();
    config.region.phys_base = Some(0x9000_0400);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::RegionAlignment { base, .. }) if base == PhysAddr::new(0x9000_0400)
    ));
}

#[rstest]
#[case::below_dram(0x7FFF_0000)]
#[case::crosses_end(0x9FDF_8000)]
#[case::above_dram(0xA000_0000)]
fn region_outside_dram_is_rejected(#[case] base: u64) {
    let mut config = Config::default();
    config.region.phys_base = Some(base);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::RegionPlacement { .. })
    ));
}

#[test]
fn region_flush_with_dram_end_is_accepted() {
    let mut config = Config::default();
    config.region.phys_base = Some(0x9FE0_0000 - config.region.size);
    assert!(config.validate().is_ok());
}

#[test]
fn degenerate_geometry_is_rejected() {
    let mut config = Config::default();
    config.dram.page_words = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));

    let mut config = Config::default();
    config.dram.end = config.dram.base - 1;
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));
}

#[test]
fn load_reads_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{ "region": {{ "size": 16384 }}, "session": {{ "end_of_list": "Release" }} }}"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.region.size, 16 * 1024);
    assert_eq!(config.session.end_of_list, EndOfList::Release);
}

#[test]
fn load_validates_file_contents() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "region": {{ "size": 100 }} }}"#).unwrap();
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::RegionSize { size: 100, .. })
    ));
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Config::load(dir.path().join("absent.json")),
        Err(ConfigError::Io(_))
    ));
}
