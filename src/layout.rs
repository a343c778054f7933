use crate::font::measure_text_width;
use crate::record::ComponentRow;
use crate::registry::{ComponentColumn, TableRegion, TextBlock};
use crate::types::{Anchor, Pt};
use serde::{Deserialize, Serialize};

/// What happens when a wrapped paragraph reaches its block's `min_y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloorPolicy {
    /// Lines keep going below the floor.
    #[default]
    Advisory,
    /// Lines whose baseline would fall below the floor are dropped.
    Clamp,
}

impl std::str::FromStr for FloorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "advisory" | "unbounded" => Ok(FloorPolicy::Advisory),
            "clamp" => Ok(FloorPolicy::Clamp),
            other => Err(format!("unknown floor policy: {other}")),
        }
    }
}

/// Greedy word wrap against measured Helvetica widths.
///
/// A single word wider than `max_width` is placed alone on its line.
pub fn wrap_words(text: &str, font_size: Pt, max_width: Pt) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure_text_width(font_size, &candidate) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub lines: Vec<PlacedLine>,
    /// Lines dropped by [`FloorPolicy::Clamp`].
    pub clipped: usize,
}

/// Line advance for wrapped paragraphs.
pub fn line_step(font_size: Pt) -> Pt {
    font_size + Pt::from_i32(2)
}

pub fn layout_block(
    block: &TextBlock,
    text: &str,
    font_size: Pt,
    policy: FloorPolicy,
) -> BlockLayout {
    let step = line_step(font_size);
    let mut y = block.start_y;
    let mut lines = Vec::new();
    let mut clipped = 0usize;
    for line in wrap_words(text, font_size, block.max_width) {
        if policy == FloorPolicy::Clamp && y < block.min_y {
            clipped += 1;
        } else {
            lines.push(PlacedLine {
                text: line,
                anchor: Anchor::at(block.x, y),
            });
        }
        y -= step;
    }
    BlockLayout { lines, clipped }
}

/// First `max_chars` characters of `value`.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub cells: Vec<PlacedLine>,
    pub rows_placed: usize,
    pub rows_omitted: usize,
}

/// Places component rows top-down, stopping silently once the cursor is
/// below the region's safety margin.
pub fn layout_table(region: &TableRegion, rows: &[ComponentRow]) -> TableLayout {
    let mut y = region.start_y;
    let mut cells = Vec::new();
    let mut rows_placed = 0usize;
    for row in rows {
        if y < region.safety_margin {
            break;
        }
        for column in ComponentColumn::ALL {
            let Some(value) = row.cell(column) else {
                continue;
            };
            cells.push(PlacedLine {
                text: truncate_chars(value, column.max_chars()).to_string(),
                anchor: Anchor::at(region.column_x(column), y),
            });
        }
        rows_placed += 1;
        y -= region.row_height;
    }
    TableLayout {
        cells,
        rows_placed,
        rows_omitted: rows.len() - rows_placed,
    }
}
