/// Finder pattern detection: 1:1:3:1:1 row scanning confirmed by
/// vertical and horizontal cross-checks through the candidate centre
use crate::models::{BitMatrix, Point};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    pub center: Point,
    pub module_size: f32,
    /// Number of confirmed hits merged into this pattern
    pub count: usize,
}

impl FinderPattern {
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            count: 1,
        }
    }

    fn about_equals(&self, other: &FinderPattern) -> bool {
        let reach = self.module_size.max(other.module_size) * 2.0;
        if (self.center.x - other.center.x).abs() > reach
            || (self.center.y - other.center.y).abs() > reach
        {
            return false;
        }
        let ratio = self.module_size.max(other.module_size)
            / self.module_size.min(other.module_size).max(f32::EPSILON);
        ratio < 1.5
    }

    /// Count-weighted average of two hits on the same pattern
    fn absorb(&mut self, other: &FinderPattern) {
        let total = (self.count + other.count) as f32;
        let (a, b) = (self.count as f32 / total, other.count as f32 / total);
        self.center = Point::new(
            self.center.x * a + other.center.x * b,
            self.center.y * a + other.center.y * b,
        );
        self.module_size = self.module_size * a + other.module_size * b;
        self.count += other.count;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

pub struct FinderDetector;

impl FinderDetector {
    /// All confirmed finder patterns, best supported first
    pub fn detect(matrix: &BitMatrix) -> Vec<FinderPattern> {
        Self::detect_with_limit(matrix, usize::MAX)
    }

    /// Like [`FinderDetector::detect`], keeping at most `limit` candidates
    pub fn detect_with_limit(matrix: &BitMatrix, limit: usize) -> Vec<FinderPattern> {
        let width = matrix.width();
        let height = matrix.height();
        if width < 7 || height < 7 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for y in 0..height {
            if !Self::has_significant_edges(matrix, y, width) {
                continue;
            }
            candidates.extend(Self::scan_row(matrix, y, width));
        }

        let mut merged = Self::merge_candidates(candidates);
        merged.sort_by(|a, b| {
            b.count.cmp(&a.count).then(
                a.module_size
                    .partial_cmp(&b.module_size)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        merged.truncate(limit);
        trace!(patterns = merged.len(), "finder candidates");
        merged
    }

    /// Check if row has enough edge transitions to potentially contain patterns
    fn has_significant_edges(matrix: &BitMatrix, y: usize, width: usize) -> bool {
        let mut transitions = 0;
        let sample_step = 2;
        let mut prev_color = matrix.get(0, y);

        for x in (sample_step..width).step_by(sample_step) {
            let color = matrix.get(x, y);
            if color != prev_color {
                transitions += 1;
                prev_color = color;
                if transitions >= 4 {
                    return true;
                }
            }
        }

        false
    }

    fn scan_row(matrix: &BitMatrix, y: usize, width: usize) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        // Rolling window over the last five completed runs
        let mut runs = [0usize; 5];
        let mut completed = 0usize;
        let mut run_start = 0usize;
        let mut current_color = matrix.get(0, y);

        for x in 1..=width {
            let color = x < width && matrix.get(x, y);
            if x < width && color == current_color {
                continue;
            }

            runs.rotate_left(1);
            runs[4] = x - run_start;
            completed += 1;
            let ended_dark = current_color;
            run_start = x;
            current_color = color;

            // dark-light-dark-light-dark ending on the run just closed
            if completed >= 5 && ended_dark && Self::quick_ratio_check(&runs) {
                let center_x = x as f32 - runs[4] as f32 - runs[3] as f32 - runs[2] as f32 / 2.0;
                if let Some(pattern) = Self::confirm(matrix, center_x, y, &runs) {
                    candidates.push(pattern);
                }
            }
        }

        candidates
    }

    /// Quick ratio validation - rough integer check before the float test
    fn quick_ratio_check(lengths: &[usize; 5]) -> bool {
        let [b1, w1, b2, w2, b3] = *lengths;
        let total = b1 + w1 + b2 + w2 + b3;
        if total < 14 {
            // Below two pixels per module
            return false;
        }

        let b2_min = b1.min(b3);
        if b2 < b2_min * 2 || b2 > b2_min.max(1) * 5 {
            return false;
        }

        let outer_avg = (b1 + b3 + w1 + w2) / 4;
        let w1_ok = w1 * 2 >= outer_avg && w1 <= outer_avg * 2;
        let w2_ok = w2 * 2 >= outer_avg && w2 <= outer_avg * 2;

        w1_ok && w2_ok
    }

    /// Module size when the runs fit 1:1:3:1:1 within tolerance
    fn check_ratios(lengths: &[usize; 5]) -> Option<f32> {
        let total: usize = lengths.iter().sum();
        if total < 7 {
            return None;
        }
        let unit = total as f32 / 7.0;
        let tolerance = unit * 0.5;
        let fits = lengths
            .iter()
            .zip([1.0f32, 1.0, 3.0, 1.0, 1.0])
            .all(|(&len, expected)| {
                let allowed = if expected > 1.0 { tolerance * 2.0 } else { tolerance };
                (len as f32 - expected * unit).abs() <= allowed
            });
        fits.then_some(unit)
    }

    /// Re-measure the pattern vertically through the row hit, then again
    /// horizontally through the refined centre.
    fn confirm(
        matrix: &BitMatrix,
        center_x: f32,
        y: usize,
        runs: &[usize; 5],
    ) -> Option<FinderPattern> {
        Self::check_ratios(runs)?;
        let row_total: usize = runs.iter().sum();

        let cx = center_x.floor() as usize;
        let (cy, v_total) = Self::cross_check(matrix, Axis::Vertical, cx, y, row_total)?;
        let (cx, h_total) =
            Self::cross_check(matrix, Axis::Horizontal, cy.floor() as usize, cx, row_total)?;
        let module_size = (v_total + h_total) as f32 / 14.0;
        Some(FinderPattern::new(cx, cy, module_size))
    }

    /// Walk outward from `start` along `axis` (with the other coordinate
    /// fixed), collecting the five runs of a finder pattern. Returns the
    /// refined centre along the axis and the total run length.
    fn cross_check(
        matrix: &BitMatrix,
        axis: Axis,
        fixed: usize,
        start: usize,
        expected_total: usize,
    ) -> Option<(f32, usize)> {
        let len = match axis {
            Axis::Horizontal => matrix.width(),
            Axis::Vertical => matrix.height(),
        };
        let dark = |p: usize| match axis {
            Axis::Horizontal => matrix.get(p, fixed),
            Axis::Vertical => matrix.get(fixed, p),
        };
        if start >= len || !dark(start) {
            return None;
        }
        let max_run = expected_total;
        let mut counts = [0usize; 5];

        // backward: centre, light, outer dark
        let mut p = start as isize;
        while p >= 0 && dark(p as usize) {
            counts[2] += 1;
            p -= 1;
        }
        if p < 0 {
            return None;
        }
        while p >= 0 && !dark(p as usize) && counts[1] <= max_run {
            counts[1] += 1;
            p -= 1;
        }
        if p < 0 || counts[1] > max_run {
            return None;
        }
        while p >= 0 && dark(p as usize) && counts[0] <= max_run {
            counts[0] += 1;
            p -= 1;
        }
        if counts[0] > max_run {
            return None;
        }

        // forward: rest of centre, light, outer dark
        let mut p = start + 1;
        while p < len && dark(p) {
            counts[2] += 1;
            p += 1;
        }
        if p == len {
            return None;
        }
        while p < len && !dark(p) && counts[3] <= max_run {
            counts[3] += 1;
            p += 1;
        }
        if p == len || counts[3] > max_run {
            return None;
        }
        while p < len && dark(p) && counts[4] <= max_run {
            counts[4] += 1;
            p += 1;
        }
        if counts[4] > max_run {
            return None;
        }

        let total: usize = counts.iter().sum();
        // reject when the perpendicular extent differs by 40% or more
        if 5 * total.abs_diff(expected_total) >= 2 * expected_total {
            return None;
        }
        Self::check_ratios(&counts)?;
        let center = p as f32 - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0;
        Some((center, total))
    }

    fn merge_candidates(candidates: Vec<FinderPattern>) -> Vec<FinderPattern> {
        let mut merged: Vec<FinderPattern> = Vec::new();
        for candidate in candidates {
            match merged.iter_mut().find(|m| m.about_equals(&candidate)) {
                Some(existing) => existing.absorb(&candidate),
                None => merged.push(candidate),
            }
        }
        merged
    }
}
