use crate::decoder::{DecodedGrid, QrDecoder};
use crate::detector::alignment::find_alignment_pattern;
use crate::detector::finder::FinderPattern;
use crate::detector::grid::{BottomRight, module_to_image, sample_grid};
use crate::models::{BitMatrix, Point, QRCode, Version};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Three finder centres in code orientation
#[derive(Debug, Clone, Copy)]
struct Finders {
    tl: Point,
    tr: Point,
    bl: Point,
    module_size: f32,
}

fn order_finder_patterns(
    a: &FinderPattern,
    b: &FinderPattern,
    c: &FinderPattern,
) -> Option<Finders> {
    let patterns = [a, b, c];

    if patterns.iter().any(|p| p.module_size < 1.0) {
        return None;
    }

    // The right-angle corner is top-left
    let mut best_idx = 0usize;
    let mut best_cos = f32::INFINITY;
    for i in 0..3 {
        let p = &patterns[i].center;
        let p1 = &patterns[(i + 1) % 3].center;
        let p2 = &patterns[(i + 2) % 3].center;

        let v1x = p1.x - p.x;
        let v1y = p1.y - p.y;
        let v2x = p2.x - p.x;
        let v2y = p2.y - p.y;
        let dot = v1x * v2x + v1y * v2y;
        let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
        if denom == 0.0 {
            continue;
        }
        let cos = (dot / denom).abs();
        if cos < best_cos {
            best_cos = cos;
            best_idx = i;
        }
    }
    if !best_cos.is_finite() {
        return None;
    }

    let tl = patterns[best_idx];
    let p1 = patterns[(best_idx + 1) % 3];
    let p2 = patterns[(best_idx + 2) % 3];

    // image y points down, so a positive cross product puts p1 to the right
    let (tr, bl) = if tl.center.cross(&p1.center, &p2.center) > 0.0 {
        (p1, p2)
    } else {
        (p2, p1)
    };
    Some(Finders {
        tl: tl.center,
        tr: tr.center,
        bl: bl.center,
        module_size: (tl.module_size + tr.module_size + bl.module_size) / 3.0,
    })
}

/// Length of the dark-light-dark run starting at `from` heading to `to`:
/// 3.5 modules when `from` is a finder centre
fn black_white_black_run(matrix: &BitMatrix, from: Point, to: Point) -> Option<f32> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 1.0 {
        return None;
    }
    let (sx, sy) = (dx / dist, dy / dist);
    let mut state = 0;
    for i in 0..=dist.ceil() as usize {
        let x = from.x + sx * i as f32;
        let y = from.y + sy * i as f32;
        let dark = matrix.get_signed(x.floor() as isize, y.floor() as isize);
        // states 0 and 2 are dark runs, state 1 the light ring
        if dark != (state != 1) {
            if state == 2 {
                return Some(i as f32);
            }
            state += 1;
        }
    }
    None
}

/// Module size from the finder at `from`, measured toward and away from `to`
fn module_size_along(matrix: &BitMatrix, from: Point, to: Point) -> Option<f32> {
    let away = Point::new(2.0 * from.x - to.x, 2.0 * from.y - to.y);
    let forward = black_white_black_run(matrix, from, to)?;
    let backward = black_white_black_run(matrix, from, away)?;
    Some((forward + backward) / 7.0)
}

fn measure_module_size(matrix: &BitMatrix, f: &Finders) -> f32 {
    let estimates: Vec<f32> = [(f.tl, f.tr), (f.tr, f.tl), (f.tl, f.bl), (f.bl, f.tl)]
        .iter()
        .filter_map(|&(from, to)| module_size_along(matrix, from, to))
        .collect();
    if estimates.is_empty() {
        return f.module_size;
    }
    estimates.iter().sum::<f32>() / estimates.len() as f32
}

fn estimate_dimension(f: &Finders, module_size: f32) -> Option<usize> {
    if module_size <= 0.0 {
        return None;
    }
    let across = (f.tl.distance(&f.tr) / module_size).round();
    let down = (f.tl.distance(&f.bl) / module_size).round();
    let raw_dim = (across + down) / 2.0 + 7.0;
    let version = ((raw_dim - 17.0) / 4.0).round();
    if !(1.0..=40.0).contains(&version) {
        return None;
    }
    Some(17 + 4 * version as usize)
}

/// Finder triples that could be one code, binned by module size
pub(crate) fn group_finder_patterns(patterns: &[FinderPattern]) -> Vec<[usize; 3]> {
    if patterns.len() < 3 {
        return Vec::new();
    }

    let mut indexed: Vec<(usize, f32)> = patterns
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.module_size))
        .collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut bins: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut bin_min = 0.0f32;
    let bin_ratio = 1.25f32;

    for (idx, size) in indexed {
        if current.is_empty() {
            current.push(idx);
            bin_min = size;
            continue;
        }

        if size <= bin_min * bin_ratio {
            current.push(idx);
        } else {
            bins.push(std::mem::take(&mut current));
            current.push(idx);
            bin_min = size;
        }
    }
    if !current.is_empty() {
        bins.push(current);
    }
    trace!(bins = bins.len(), "module size bins");

    // Each bin together with its neighbour, to allow slight size mismatch
    let mut seen = HashSet::new();
    let mut all_groups = Vec::new();
    for i in 0..bins.len() {
        let mut indices = bins[i].clone();
        if i + 1 < bins.len() {
            indices.extend_from_slice(&bins[i + 1]);
        }
        if indices.len() < 3 {
            continue;
        }
        for group in build_groups(patterns, &indices) {
            let mut key = group;
            key.sort_unstable();
            if seen.insert(key) {
                all_groups.push(group);
            }
        }
    }

    all_groups
}

fn build_groups(patterns: &[FinderPattern], indices: &[usize]) -> Vec<[usize; 3]> {
    let mut groups = Vec::new();

    for idx_i in 0..indices.len() {
        let i = indices[idx_i];
        for idx_j in (idx_i + 1)..indices.len() {
            let j = indices[idx_j];
            for &k in indices.iter().skip(idx_j + 1) {
                let pi = &patterns[i];
                let pj = &patterns[j];
                let pk = &patterns[k];

                let sizes = [pi.module_size, pj.module_size, pk.module_size];
                let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
                if max_size / min_size > 2.0 {
                    continue;
                }

                let d_ij = pi.center.distance(&pj.center);
                let d_ik = pi.center.distance(&pk.center);
                let d_jk = pj.center.distance(&pk.center);

                let distances = [d_ij, d_ik, d_jk];
                let min_d = distances.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_d = distances.iter().fold(0.0f32, |a, &b| a.max(b));

                // finder centres of the smallest code are 14 modules apart
                let avg_module = (pi.module_size + pj.module_size + pk.module_size) / 3.0;
                if min_d < avg_module * 10.0 {
                    continue;
                }
                if max_d / min_d > 5.0 {
                    continue;
                }

                let a2 = d_ij * d_ij;
                let b2 = d_ik * d_ik;
                let c2 = d_jk * d_jk;

                let cos_i = (a2 + b2 - c2) / (2.0 * d_ij * d_ik);
                let cos_j = (a2 + c2 - b2) / (2.0 * d_ij * d_jk);
                let cos_k = (b2 + c2 - a2) / (2.0 * d_ik * d_jk);
                let has_right_angle = cos_i.abs() < 0.4 || cos_j.abs() < 0.4 || cos_k.abs() < 0.4;
                if !has_right_angle {
                    continue;
                }

                groups.push([i, j, k]);
            }
        }
    }

    groups
}

fn score_and_trim_groups(
    groups: &mut Vec<[usize; 3]>,
    patterns: &[FinderPattern],
    max_groups: usize,
) {
    groups.sort_by(|a, b| group_score(patterns, a).total_cmp(&group_score(patterns, b)));
    groups.truncate(max_groups);
}

/// Lower is better: size consistency, low distortion, near-right angle and
/// strong finder support
fn group_score(patterns: &[FinderPattern], group: &[usize; 3]) -> f32 {
    let p0 = &patterns[group[0]];
    let p1 = &patterns[group[1]];
    let p2 = &patterns[group[2]];

    let sizes = [p0.module_size, p1.module_size, p2.module_size];
    let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
    let size_ratio = max_size / min_size;

    let d01 = p0.center.distance(&p1.center);
    let d02 = p0.center.distance(&p2.center);
    let d12 = p1.center.distance(&p2.center);
    let distances = [d01, d02, d12];
    let min_d = distances.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max_d = distances.iter().fold(0.0f32, |a, &b| a.max(b));
    let distortion = max_d / min_d;

    let a2 = d01 * d01;
    let b2 = d02 * d02;
    let c2 = d12 * d12;
    let cos_i = ((a2 + b2 - c2) / (2.0 * d01 * d02)).abs();
    let cos_j = ((a2 + c2 - b2) / (2.0 * d01 * d12)).abs();
    let cos_k = ((b2 + c2 - a2) / (2.0 * d02 * d12)).abs();
    let best_cos = cos_i.min(cos_j).min(cos_k);

    let weakest = p0.count.min(p1.count).min(p2.count) as f32;
    size_ratio * 2.0 + distortion + best_cos + 1.0 / weakest.max(1.0)
}

/// Try finder groups best-first; the first group that decodes wins
pub(crate) fn decode_groups(
    binary: &BitMatrix,
    finder_patterns: &[FinderPattern],
    max_groups: usize,
) -> Option<QRCode> {
    let mut groups = group_finder_patterns(finder_patterns);
    score_and_trim_groups(&mut groups, finder_patterns, max_groups);
    debug!(
        patterns = finder_patterns.len(),
        groups = groups.len(),
        "finder groups"
    );

    for (group_idx, group) in groups.iter().enumerate() {
        let Some(finders) = order_finder_patterns(
            &finder_patterns[group[0]],
            &finder_patterns[group[1]],
            &finder_patterns[group[2]],
        ) else {
            continue;
        };
        if let Some(qr) = decode_group(binary, &finders) {
            debug!(group = group_idx, "group decoded");
            return Some(qr);
        }
        trace!(group = group_idx, "group failed to decode");
    }

    None
}

fn decode_group(binary: &BitMatrix, finders: &Finders) -> Option<QRCode> {
    let module_size = measure_module_size(binary, finders);
    let estimated = estimate_dimension(finders, module_size)?;
    trace!(module_size, dimension = estimated, "group geometry");

    let neighbours = [estimated, estimated + 4, estimated.saturating_sub(4)];
    neighbours
        .into_iter()
        .filter(|&dim| Version::from_dimension(dim).is_some())
        .find_map(|dim| decode_at_dimension(binary, finders, dim, true))
}

fn decode_at_dimension(
    binary: &BitMatrix,
    finders: &Finders,
    dimension: usize,
    allow_resample: bool,
) -> Option<QRCode> {
    let parallelogram = Point::new(
        finders.tr.x + finders.bl.x - finders.tl.x,
        finders.tr.y + finders.bl.y - finders.tl.y,
    );
    let mut references = Vec::with_capacity(2);
    if let Some(alignment) =
        find_alignment_pattern(binary, finders.tl, finders.tr, finders.bl, dimension)
    {
        references.push((alignment, BottomRight::Alignment));
    }
    references.push((parallelogram, BottomRight::Parallelogram));

    for (bottom_right, kind) in references {
        let corners = [finders.tl, finders.tr, finders.bl, bottom_right];
        let Some(transform) = module_to_image(&corners, kind, dimension) else {
            continue;
        };
        let Some(grid) = sample_grid(binary, &transform, dimension) else {
            continue;
        };

        if allow_resample && dimension >= 45 {
            if let Some(recorded) = QrDecoder::read_version(&grid).and_then(Version::new) {
                if recorded.size() != dimension {
                    debug!(
                        estimated = dimension,
                        recorded = recorded.size(),
                        "resampling at recorded version"
                    );
                    return decode_at_dimension(binary, finders, recorded.size(), false);
                }
            }
        }

        if let Some(decoded) = QrDecoder::decode_grid(&grid) {
            return Some(build_code(decoded, grid, corners));
        }
    }

    None
}

fn build_code(decoded: DecodedGrid, grid: BitMatrix, corners: [Point; 4]) -> QRCode {
    let [tl, tr, bl, br] = corners;
    // a mirrored read means the two outer finders were swapped
    let (position, modules) = if decoded.mirrored {
        ([tl, bl, tr, br], grid.transposed())
    } else {
        ([tl, tr, bl, br], grid)
    };
    QRCode {
        data: decoded.payload.data,
        content: decoded.payload.content,
        version: decoded.version,
        error_correction: decoded.ec_level,
        mask_pattern: decoded.mask_pattern,
        position,
        modules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder(x: f32, y: f32, module_size: f32) -> FinderPattern {
        FinderPattern::new(x, y, module_size)
    }

    #[test]
    fn test_order_upright() {
        let f = order_finder_patterns(
            &finder(200.0, 20.0, 4.0),
            &finder(20.0, 200.0, 4.0),
            &finder(20.0, 20.0, 4.0),
        )
        .unwrap();
        assert_eq!(f.tl, Point::new(20.0, 20.0));
        assert_eq!(f.tr, Point::new(200.0, 20.0));
        assert_eq!(f.bl, Point::new(20.0, 200.0));
    }

    #[test]
    fn test_order_upside_down() {
        // rotated 180 degrees: top-left finder sits bottom-right in the image
        let f = order_finder_patterns(
            &finder(200.0, 200.0, 4.0),
            &finder(20.0, 200.0, 4.0),
            &finder(200.0, 20.0, 4.0),
        )
        .unwrap();
        assert_eq!(f.tl, Point::new(200.0, 200.0));
        assert_eq!(f.tr, Point::new(20.0, 200.0));
        assert_eq!(f.bl, Point::new(200.0, 20.0));
    }

    #[test]
    fn test_estimate_dimension_snaps_to_version() {
        let f = Finders {
            tl: Point::new(0.0, 0.0),
            tr: Point::new(18.2 * 5.0, 0.0),
            bl: Point::new(0.0, 17.9 * 5.0),
            module_size: 5.0,
        };
        assert_eq!(estimate_dimension(&f, 5.0), Some(25));
        assert_eq!(estimate_dimension(&f, 0.0), None);
    }

    #[test]
    fn test_grouping_filters_and_dedupes() {
        let patterns = vec![
            finder(20.0, 20.0, 4.0),
            finder(120.0, 20.0, 4.0),
            finder(20.0, 120.0, 4.0),
            // too small to belong with the others
            finder(300.0, 300.0, 1.2),
        ];
        let groups = group_finder_patterns(&patterns);
        assert_eq!(groups.len(), 1);
        let mut g = groups[0];
        g.sort_unstable();
        assert_eq!(g, [0, 1, 2]);
    }

    #[test]
    fn test_grouping_rejects_collinear() {
        let patterns = vec![
            finder(20.0, 20.0, 4.0),
            finder(120.0, 20.0, 4.0),
            finder(220.0, 20.0, 4.0),
        ];
        assert!(group_finder_patterns(&patterns).is_empty());
    }

    #[test]
    fn test_black_white_black_run() {
        // 7-module finder row at 4 px/module starting at x = 8
        let matrix = BitMatrix::from_fn(60, 1, |x, _| {
            let m = (x as isize - 8).div_euclid(4);
            matches!(m, 0 | 2 | 3 | 4 | 6)
        });
        let run = black_white_black_run(&matrix, Point::new(22.0, 0.5), Point::new(59.0, 0.5));
        // from the centre (x=22) to the outer edge (x=36): 14 px = 3.5 modules
        assert_eq!(run, Some(14.0));
    }
}
