use rand::Rng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use epmforge_core::{CellValue, Dimension, Frame, Issue};

use crate::errors::GenerationError;

/// Outcome of intersection sampling: the dimension-only row skeleton plus
/// the space accounting that produced it.
#[derive(Debug)]
pub struct SampledSpace {
    pub frame: Frame,
    pub total_possible: u64,
    pub warnings: Vec<Issue>,
}

/// Number of distinct member combinations across dimensions.
pub fn total_combinations(dimensions: &[Dimension]) -> u128 {
    dimensions
        .iter()
        .map(|dimension| dimension.members.len() as u128)
        .product()
}

/// Record target used by the chunked path: the same sparsity clamp as the
/// batch sampler.
pub fn streaming_target(total: u128, num_records: u64, sparsity: f64) -> u64 {
    if total == 0 {
        return 0;
    }
    num_records.min(allowed_by_sparsity(total as f64, sparsity))
}

/// `floor(total * (1 - sparsity))`, tolerating float error so a nominally
/// exact product (ex.: 100 * 0.1) does not floor one row short.
fn allowed_by_sparsity(total: f64, sparsity: f64) -> u64 {
    let raw = total * (1.0 - sparsity);
    if (raw - raw.round()).abs() < 1e-9 {
        raw.round() as u64
    } else {
        raw.floor() as u64
    }
}

/// Select intersections to populate under the record-count/sparsity contract.
///
/// The effective target is `min(num_records, floor(total * density))`. A
/// request exceeding the sparsity allowance is reduced with a warning, never
/// rejected. A target covering the whole space enumerates every combination
/// exactly once; a smaller target draws distinct combinations without
/// replacement.
pub fn sample_intersections(
    dimensions: &[Dimension],
    num_records: u64,
    sparsity: f64,
    rng: &mut ChaCha8Rng,
) -> Result<SampledSpace, GenerationError> {
    let mut warnings = Vec::new();
    let total = total_combinations(dimensions);
    if total == 0 {
        return Ok(SampledSpace {
            frame: empty_skeleton(dimensions)?,
            total_possible: 0,
            warnings,
        });
    }
    if total > usize::MAX as u128 {
        return Err(GenerationError::Unsupported(format!(
            "combination space of {total} intersections is too large to sample"
        )));
    }
    let total = total as u64;

    let density = 1.0 - sparsity;
    let allowed = allowed_by_sparsity(total as f64, sparsity);
    let mut target = num_records;
    if target > allowed {
        let implied = num_records as f64 / total as f64;
        let message = format!(
            "requested {num_records} records implies density {implied:.2} above the {density:.2} allowed by sparsity; reducing target to {allowed}"
        );
        warn!(message = %message, "record target reduced by sparsity");
        warnings.push(Issue::warning("sparsity_limit", message));
        target = allowed;
    } else {
        info!(target, total, "record target within sparsity allowance");
    }

    let frame = if target >= total {
        build_skeleton(dimensions, 0..total, total as usize)?
    } else {
        let picked = index::sample(rng, total as usize, target as usize);
        build_skeleton(
            dimensions,
            picked.iter().map(|combo| combo as u64),
            target as usize,
        )?
    };

    Ok(SampledSpace {
        frame,
        total_possible: total,
        warnings,
    })
}

/// Skeleton with one row per combination, drawn independently per dimension
/// (with replacement). The streaming path trades the distinctness guarantee
/// for never touching the full combination space.
pub fn sample_with_replacement(
    dimensions: &[Dimension],
    rows: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Frame, GenerationError> {
    let mut frame = Frame::with_len(rows);
    for dimension in dimensions {
        let values = (0..rows)
            .map(|_| {
                let member = rng.random_range(0..dimension.members.len());
                CellValue::Text(dimension.members[member].clone())
            })
            .collect();
        frame.set_column(&dimension.name, values)?;
    }
    Ok(frame)
}

fn empty_skeleton(dimensions: &[Dimension]) -> Result<Frame, GenerationError> {
    let mut frame = Frame::with_len(0);
    for dimension in dimensions {
        frame.set_column(&dimension.name, Vec::new())?;
    }
    Ok(frame)
}

/// Decode combination indices into member values, rightmost dimension
/// varying fastest, and assemble the dimension columns.
fn build_skeleton(
    dimensions: &[Dimension],
    combos: impl Iterator<Item = u64>,
    rows: usize,
) -> Result<Frame, GenerationError> {
    let mut columns: Vec<Vec<CellValue>> = dimensions
        .iter()
        .map(|_| Vec::with_capacity(rows))
        .collect();

    for combo in combos {
        let mut remainder = combo;
        for (position, dimension) in dimensions.iter().enumerate().rev() {
            let span = dimension.members.len() as u64;
            let member = (remainder % span) as usize;
            remainder /= span;
            columns[position].push(CellValue::Text(dimension.members[member].clone()));
        }
    }

    let mut frame = Frame::with_len(rows);
    for (dimension, column) in dimensions.iter().zip(columns) {
        frame.set_column(&dimension.name, column)?;
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn dimension(name: &str, members: &[&str]) -> Dimension {
        Dimension {
            name: name.to_string(),
            members: members.iter().map(|member| member.to_string()).collect(),
        }
    }

    #[test]
    fn counts_combinations() {
        let dims = vec![
            dimension("Region", &["North", "South"]),
            dimension("Product", &["P1", "P2", "P3"]),
        ];
        assert_eq!(total_combinations(&dims), 6);
    }

    #[test]
    fn streaming_target_clamps_by_density() {
        assert_eq!(streaming_target(100, 50, 0.9), 10);
        assert_eq!(streaming_target(100, 5, 0.5), 5);
        assert_eq!(streaming_target(0, 5, 0.0), 0);
    }

    #[test]
    fn sparsity_allowance_survives_float_error() {
        // 100 * (1 - 0.9) is 9.999... in f64 and must not floor to 9
        assert_eq!(allowed_by_sparsity(100.0, 0.9), 10);
        assert_eq!(allowed_by_sparsity(10.0, 0.25), 7);
    }

    #[test]
    fn full_enumeration_is_exhaustive() {
        use std::collections::BTreeSet;

        let dims = vec![
            dimension("Region", &["North", "South"]),
            dimension("Product", &["P1", "P2", "P3"]),
        ];
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let sampled = sample_intersections(&dims, 10, 0.0, &mut rng).expect("sampling runs");
        assert_eq!(sampled.frame.num_rows(), 6);

        let regions = sampled.frame.column("Region").expect("Region present");
        let products = sampled.frame.column("Product").expect("Product present");
        let combos: BTreeSet<(String, String)> = regions
            .iter()
            .zip(products)
            .map(|(region, product)| {
                (
                    region.to_csv_field(),
                    product.to_csv_field(),
                )
            })
            .collect();
        assert_eq!(combos.len(), 6, "every combination appears exactly once");
    }
}
