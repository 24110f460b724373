//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! The series is drawn as a `*` line over day index; missing points break the
//! line.

use crate::report::SeriesView;

/// Render one series view as a fixed-size plot.
pub fn render_ascii_series(view: &SeriesView, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let n = view.values.len();

    let mut out = String::new();
    let span = match (view.dates.first(), view.dates.last()) {
        (Some(a), Some(b)) => format!("{a} .. {b}"),
        _ => "no dates".to_string(),
    };
    let Some((y_min, y_max)) = y_range(&view.values) else {
        out.push_str(&format!(
            "Plot: {} {} [{}] | {span} | no data\n",
            view.metric,
            view.geo,
            view.transform.display_name()
        ));
        return out;
    };

    let mut grid = vec![vec![' '; width]; height];
    let mut prev: Option<(usize, usize)> = None;
    for (i, v) in view.values.iter().enumerate() {
        let Some(v) = v else {
            prev = None;
            continue;
        };
        let x = map_x(i, n, width);
        let y = map_y(*v as f64, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, '*'),
            None => grid[y][x] = '*',
        }
        prev = Some((x, y));
    }

    out.push_str(&format!(
        "Plot: {} {} [{}] | {span} | y=[{y_min:.0}, {y_max:.0}]\n",
        view.metric,
        view.geo,
        view.transform.display_name()
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn y_range(values: &[Option<i64>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in values.iter().flatten() {
        min_y = min_y.min(*v as f64);
        max_y = max_y.max(*v as f64);
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y <= min_y {
        // Flat series: give it a unit band so it renders mid-plot.
        return Some((min_y - 1.0, max_y + 1.0));
    }
    Some((min_y, max_y))
}

fn map_x(i: usize, n: usize, width: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let u = i as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
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
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
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
