//! Write simulation buckets as CSV (`unit,damage,count,probability`).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::aggregate::histogram::SimulationResult;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct BucketRow<'a> {
    unit: &'a str,
    damage: u32,
    count: u64,
    probability: f64,
}

/// Writes one row per bucket of every `(unit name, result)` pair, header first.
pub fn write_buckets<W: Write>(writer: W, results: &[(&str, &SimulationResult)]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for (unit, result) in results {
        for bucket in &result.buckets {
            csv.serialize(BucketRow {
                unit,
                damage: bucket.damage,
                count: bucket.count,
                probability: bucket.probability,
            })?;
        }
    }
    csv.flush()?;
    Ok(())
}

pub fn write_buckets_to_path(path: &Path, results: &[(&str, &SimulationResult)]) -> Result<()> {
    write_buckets(File::create(path)?, results)
}
