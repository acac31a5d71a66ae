use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const HEADER: &str = "longitude,latitude,housingMedianAge,totalRooms,totalBedrooms,population,households,medianIncome,medianHouseValue,oceanProximity";

/// Synthetic districts whose value is a noiseless linear function of income and age.
pub fn linear_rows(count: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::new();
    writeln!(out, "{HEADER}").unwrap();
    for _ in 0..count {
        let longitude: f32 = rng.random_range(-124.0..-114.0);
        let latitude: f32 = rng.random_range(32.0..42.0);
        let age: f32 = rng.random_range(1u32..53) as f32;
        let rooms: f32 = rng.random_range(100u32..6000) as f32;
        let bedrooms: f32 = rng.random_range(20u32..1200) as f32;
        let population: f32 = rng.random_range(50u32..4000) as f32;
        let households: f32 = rng.random_range(20u32..1200) as f32;
        let income: f32 = rng.random_range(0.5..15.0);
        let value = linear_value(income, age);
        writeln!(
            out,
            "{longitude},{latitude},{age},{rooms},{bedrooms},{population},{households},{income},{value},NEAR BAY"
        )
        .unwrap();
    }
    out
}

pub fn linear_value(income: f32, age: f32) -> f32 {
    50_000.0 * income + 100.0 * age
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
