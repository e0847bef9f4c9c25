//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - retract points: `o`
//! - fitted Hertz curve / force–distance trace: `-` line

use crate::domain::{ForceDistanceCurve, HertzFitResult, RetractSegment};
use crate::models::hertz_force;

/// Retract segment points, with the fitted Hertz curve overlaid when given.
///
/// Axes are in the segment's working units; the indentation axis starts at 0.
pub fn render_retract_plot(
    segment: &RetractSegment,
    fit: Option<&HertzFitResult>,
    width: usize,
    height: usize,
) -> String {
    let points: Vec<(f64, f64)> = segment
        .points
        .iter()
        .map(|p| (p.indentation, p.force))
        .collect();
    let (x_min, x_max) = x_range(&points).unwrap_or((0.0, 1.0));
    let x_min = x_min.min(0.0);

    let curve = fit.map(|f| sample_fit(segment, f, x_min.max(0.0), x_max, width.max(2)));
    render_plot(
        &points,
        curve.as_deref(),
        ("indentation", x_min, x_max),
        width,
        height,
    )
}

/// The full converted force–distance trace as a line.
pub fn render_curve_plot(curve: &ForceDistanceCurve, width: usize, height: usize) -> String {
    let line: Vec<(f64, f64)> = curve.points.iter().map(|p| (p.distance, p.force)).collect();
    let (x_min, x_max) = x_range(&line).unwrap_or((0.0, 1.0));
    render_plot(&[], Some(&line), ("distance", x_min, x_max), width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    line: Option<&[(f64, f64)]>,
    (x_label, x_min, x_max): (&str, f64, f64),
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, line).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Line first so points overlay it.
    if let Some(line) = line {
        draw_polyline(&mut grid, line, x_min, x_max, y_min, y_max);
    }
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | force=[{y_min:.4}, {y_max:.4}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Fitted force on an even indentation grid, in the segment's units.
fn sample_fit(
    segment: &RetractSegment,
    fit: &HertzFitResult,
    x_min: f64,
    x_max: f64,
    n: usize,
) -> Vec<(f64, f64)> {
    let n = n.max(2);
    let units = segment.units;
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            let f_si = hertz_force(x * units.length_to_m, fit.effective_modulus, fit.tip_radius);
            (x, f_si / units.force_to_n)
        })
        .collect()
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)], line: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(line.unwrap_or(&[]).iter()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(
    grid: &mut [Vec<char>],
    line: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) {
    if line.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in line {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveUnits, ForcePoint, IndentationPoint};

    fn segment(points: &[(f64, f64)]) -> RetractSegment {
        RetractSegment {
            points: points
                .iter()
                .map(|&(indentation, force)| IndentationPoint { indentation, force })
                .collect(),
            units: CurveUnits::DISPLAY,
            contact_point: 0.0,
            contact_index: points.len() + 1,
            max_force_index: 0,
        }
    }

    #[test]
    fn retract_plot_golden_snapshot_small() {
        let seg = segment(&[(1.0, 1.0), (0.0, 0.0)]);
        let txt = render_retract_plot(&seg, None, 10, 5);
        let expected = concat!(
            "Plot: indentation=[0.000, 1.000] | force=[-0.0500, 1.0500]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn fitted_curve_is_drawn_under_points() {
        let e = 1e5;
        let r = 10e-6;
        let pts: Vec<(f64, f64)> = (1..=20)
            .rev()
            .map(|i| {
                let nm = 25.0 * i as f64;
                (nm, hertz_force(nm * 1e-9, e, r) * 1e6)
            })
            .collect();
        let fit = HertzFitResult {
            sample_id: "s".to_string(),
            effective_modulus: e,
            r_squared: 1.0,
            tip_radius: r,
            n_points: pts.len(),
        };

        let txt = render_retract_plot(&segment(&pts), Some(&fit), 40, 12);
        assert_eq!(txt.lines().count(), 13);
        assert!(txt.contains('-'));
        assert!(txt.contains('o'));
        // The fitted curve starts at zero indentation, left of every point.
        assert!(txt.lines().skip(1).any(|l| l.starts_with('-')));
    }

    #[test]
    fn curve_plot_draws_a_line() {
        let curve = ForceDistanceCurve {
            points: (0..10)
                .map(|i| ForcePoint {
                    distance: i as f64,
                    force: (i * i) as f64,
                })
                .collect(),
            units: CurveUnits::DISPLAY,
            baseline: 0.0,
        };
        let txt = render_curve_plot(&curve, 20, 8);
        assert!(txt.starts_with("Plot: distance=[0.000, 9.000]"));
        assert!(!txt.contains('o'));
        assert!(txt.contains('-'));
    }
}
