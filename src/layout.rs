/// Width of the Grafana dashboard grid.
pub const GRID_COLUMNS: u32 = 24;

/// Place panels of the given `(w, h)` sizes left to right, wrapping to a new
/// row whenever the next panel would overflow `columns`. Returns one `(x, y)`
/// per input, in input order. Widths wider than the grid are clamped.
pub fn layout(sizes: &[(u32, u32)], columns: u32) -> Vec<(u32, u32)> {
    let columns = columns.max(1);
    let mut positions = Vec::with_capacity(sizes.len());
    let (mut x, mut y, mut row_height) = (0u32, 0u32, 0u32);

    for &(w, h) in sizes {
        let w = w.min(columns);
        if x + w > columns {
            x = 0;
            y = y.saturating_add(row_height);
            row_height = 0;
        }
        positions.push((x, y));
        x += w;
        row_height = row_height.max(h);
    }
    positions
}

/// Effective width after clamping to the grid.
pub fn clamp_width(w: u32, columns: u32) -> u32 {
    w.min(columns.max(1))
}
