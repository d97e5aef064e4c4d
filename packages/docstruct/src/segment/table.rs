//! Tabular-mode segmentation: header-anchored chunks from spreadsheet grids.
//!
//! The layout collaborator delivers each sheet as a 2-D cell grid plus its
//! merged-cell ranges. Segmentation fills merges, detects header rows,
//! splits the grid into header-anchored blocks, and packs data rows into
//! chunks that each re-prepend the header line(s).

use serde::{Deserialize, Serialize};

/// One spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }

    /// Render for pipe-joined row serialization. Null renders empty;
    /// whole numbers render without a fractional part.
    fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Inclusive merged-cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

/// One sheet of a workbook: a cell grid plus merged ranges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    #[serde(default)]
    pub merges: Vec<MergeRange>,
}

/// A header-anchored chunk: serialized rows with the header line(s)
/// re-prepended, plus the sheet-relative data row range it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct TableChunk {
    pub text: String,
    pub header_rows: usize,
    /// Half-open range of data row indices within the sheet.
    pub row_range: (usize, usize),
}

/// Chunk every sheet of a workbook. Every data row lands in exactly one
/// chunk, in original order.
pub fn chunk_workbook(sheets: &[Sheet], field_count: usize) -> Vec<TableChunk> {
    let mut chunks = Vec::new();
    for sheet in sheets {
        let (grid, merge_height) = fill_merges(sheet);
        if grid.is_empty() {
            continue;
        }

        let candidates = header_candidates(&grid);
        let (headers, header_height) = collapse_runs(&candidates, merge_height);
        let lines: Vec<String> = grid.iter().map(|row| render_row(row)).collect();

        for block in split_blocks(lines.len(), &headers, header_height) {
            chunks.extend(chunk_block(
                &lines[block.start..block.end],
                block.offset,
                field_count,
                block.start,
            ));
        }
    }
    chunks
}

/// Propagate each merged range's top-left value across the range and
/// normalize the grid to a rectangle. Returns the grid and the largest
/// merge height seen.
fn fill_merges(sheet: &Sheet) -> (Vec<Vec<Cell>>, usize) {
    let width = sheet.rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut grid: Vec<Vec<Cell>> = sheet
        .rows
        .iter()
        .map(|row| {
            let mut padded = row.clone();
            padded.resize(width, Cell::Null);
            padded
        })
        .collect();

    let mut max_height = 0;
    for merge in &sheet.merges {
        max_height = max_height.max(merge.last_row + 1 - merge.first_row);
        let base = grid
            .get(merge.first_row)
            .and_then(|row| row.get(merge.first_col))
            .cloned()
            .unwrap_or(Cell::Null);
        for r in merge.first_row..=merge.last_row {
            for c in merge.first_col..=merge.last_col {
                if let Some(cell) = grid.get_mut(r).and_then(|row| row.get_mut(c)) {
                    *cell = base.clone();
                }
            }
        }
    }

    (grid, max_height)
}

/// A row is a header candidate if at least 70% of its cells are non-null
/// and, among those, at least 89% are text. If 80% or more of all rows
/// qualify the sheet is headerless noise, so only the first candidate is
/// kept; if none qualify, row 0 is the header.
fn header_candidates(grid: &[Vec<Cell>]) -> Vec<usize> {
    let ncols = grid.first().map(|r| r.len()).unwrap_or(0);
    let mut candidates = Vec::new();

    if ncols > 0 {
        // The last row never anchors a header.
        for (i, row) in grid.iter().enumerate().take(grid.len().saturating_sub(1)) {
            let non_null = row.iter().filter(|c| !c.is_null()).count();
            if (non_null as f64) < ncols as f64 * 0.7 {
                continue;
            }
            let text = row.iter().filter(|c| c.is_text()).count();
            if non_null > 0 && text as f64 >= non_null as f64 * 0.89 {
                candidates.push(i);
            }
        }
    }

    if !candidates.is_empty() && candidates.len() as f64 >= grid.len() as f64 * 0.8 {
        candidates.truncate(1);
    }
    if candidates.is_empty() {
        candidates.push(0);
    }
    candidates
}

/// Collapse each run of consecutive candidate indices to its last index.
/// Returns the collapsed offsets and the header height: the longest run
/// seen, or the largest merge height if that is bigger.
fn collapse_runs(indices: &[usize], mut max_height: usize) -> (Vec<usize>, usize) {
    let mut collapsed = Vec::new();
    let mut run = 0usize;

    for (pos, &idx) in indices.iter().enumerate() {
        run += 1;
        let run_ends = pos == indices.len() - 1 || indices[pos + 1] != idx + 1;
        if run_ends {
            collapsed.push(idx);
            max_height = max_height.max(run);
            run = 0;
        }
    }

    (collapsed, max_height)
}

/// One block of rows anchored at a header offset.
struct Block {
    start: usize,
    end: usize,
    /// Index of the header row within the block.
    offset: usize,
}

/// Split `total` rows into blocks, one per header offset, each running to
/// the next header (or the end). Blocks back up `height` rows before
/// their header so multi-row headers ride along; blocks that would end
/// inside the header band are dropped.
fn split_blocks(total: usize, headers: &[usize], height: usize) -> Vec<Block> {
    let mut starts = Vec::with_capacity(headers.len() + 1);
    starts.push(0);
    starts.extend_from_slice(headers);

    let mut ends = headers.to_vec();
    ends.push(total);

    let mut blocks = Vec::new();
    for (&i, &j) in starts.iter().zip(ends.iter()) {
        if j < height || i >= j {
            continue;
        }
        let start = i.saturating_sub(height);
        blocks.push(Block {
            start,
            end: j,
            offset: i - start,
        });
    }
    blocks
}

fn render_row(row: &[Cell]) -> String {
    row.iter()
        .map(Cell::render)
        .collect::<Vec<_>>()
        .join("|")
}

/// Pack one block's data rows into chunks, re-prepending the header
/// line(s). Chunk size scales inversely with line width and is capped by
/// the schema's field count.
fn chunk_block(
    block: &[String],
    offset: usize,
    field_count: usize,
    block_start: usize,
) -> Vec<TableChunk> {
    if block.is_empty() {
        return Vec::new();
    }

    let max_line = block[offset..]
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(1)
        .max(1);
    let by_width = 1000usize.div_ceil(max_line);
    let by_fields = field_count * 6 / 50;
    let chunk_size = by_width.min(by_fields).max(1);

    let header: Vec<String> = block[..offset + 1]
        .iter()
        .map(|h| h.trim().replace('\n', " "))
        .collect();
    let data = &block[offset + 1..];
    let data_start = block_start + offset + 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let end = (start + chunk_size).min(data.len());
        let mut lines = header.clone();
        lines.extend(data[start..end].iter().cloned());
        chunks.push(TableChunk {
            text: lines.join("\n"),
            header_rows: header.len(),
            row_range: (data_start + start, data_start + end),
        });
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn sheet_with_header(data_rows: usize, cols: usize) -> Sheet {
        let header: Vec<Cell> = (0..cols).map(|c| text(&format!("col{c}"))).collect();
        let mut rows = vec![header];
        for r in 0..data_rows {
            rows.push((0..cols).map(|c| num((r * cols + c) as f64)).collect());
        }
        Sheet {
            name: "Sheet1".into(),
            rows,
            merges: vec![],
        }
    }

    #[test]
    fn test_every_data_row_chunked_exactly_once() {
        // 1 header row + 12 data rows, 6 schema fields.
        let sheet = sheet_with_header(12, 6);
        let chunks = chunk_workbook(&[sheet], 6);

        // field cap of 6 fields forces single-row chunks
        assert_eq!(chunks.len(), 12);

        let header_line = "col0|col1|col2|col3|col4|col5";
        let mut seen_rows = Vec::new();
        for chunk in &chunks {
            let lines: Vec<&str> = chunk.text.lines().collect();
            assert_eq!(lines[0], header_line);
            assert_eq!(chunk.header_rows, 1);
            seen_rows.extend(lines[1..].iter().map(|l| l.to_string()));
        }

        // All 12 rows, in original order, none duplicated or dropped.
        let expected: Vec<String> = (0..12)
            .map(|r| {
                (0..6)
                    .map(|c| (r * 6 + c).to_string())
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect();
        assert_eq!(seen_rows, expected);
    }

    #[test]
    fn test_merged_cells_propagate_top_left() {
        let sheet = Sheet {
            name: "s".into(),
            rows: vec![
                vec![text("region"), Cell::Null, text("total")],
                vec![text("north"), Cell::Null, num(10.0)],
                vec![Cell::Null, Cell::Null, num(20.0)],
            ],
            merges: vec![MergeRange {
                first_row: 1,
                first_col: 0,
                last_row: 2,
                last_col: 1,
            }],
        };

        let (grid, max_height) = fill_merges(&sheet);
        assert_eq!(max_height, 2);
        assert_eq!(grid[1][0], text("north"));
        assert_eq!(grid[1][1], text("north"));
        assert_eq!(grid[2][0], text("north"));
        assert_eq!(grid[2][1], text("north"));
    }

    #[test]
    fn test_header_candidate_thresholds() {
        // 10 columns: 7 non-null (70%), all text -> candidate.
        let mut qualifying: Vec<Cell> = (0..7).map(|c| text(&format!("h{c}"))).collect();
        qualifying.extend(std::iter::repeat(Cell::Null).take(3));

        // 7 non-null but only 5 text (71%) -> not a candidate.
        let mut mixed: Vec<Cell> = (0..5).map(|c| text(&format!("h{c}"))).collect();
        mixed.push(num(1.0));
        mixed.push(num(2.0));
        mixed.extend(std::iter::repeat(Cell::Null).take(3));

        let data: Vec<Cell> = (0..10).map(|c| num(c as f64)).collect();
        let grid = vec![qualifying, mixed, data.clone(), data];

        assert_eq!(header_candidates(&grid), vec![0]);
    }

    #[test]
    fn test_consecutive_header_run_collapses_to_last() {
        let (collapsed, height) = collapse_runs(&[0, 1, 5], 0);
        assert_eq!(collapsed, vec![1, 5]);
        assert_eq!(height, 2);
    }

    #[test]
    fn test_multi_row_header_reprepended() {
        // Rows 0 and 1 are both header candidates; data follows.
        let rows = vec![
            vec![text("group a"), text("group a"), text("group b")],
            vec![text("x"), text("y"), text("z")],
            vec![num(1.0), num(2.0), num(3.0)],
            vec![num(4.0), num(5.0), num(6.0)],
        ];
        let sheet = Sheet {
            name: "s".into(),
            rows,
            merges: vec![],
        };

        let chunks = chunk_workbook(&[sheet], 3);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.header_rows, 2);
            let lines: Vec<&str> = chunk.text.lines().collect();
            assert_eq!(lines[0], "group a|group a|group b");
            assert_eq!(lines[1], "x|y|z");
        }

        // Two data rows, single-row chunks (3 fields cap to 1).
        let ranges: Vec<_> = chunks.iter().map(|c| c.row_range).collect();
        assert_eq!(ranges, vec![(2, 3), (3, 4)]);
    }

    #[test]
    fn test_headerless_sheet_anchors_at_row_zero() {
        let sheet = Sheet {
            name: "s".into(),
            rows: vec![
                vec![num(1.0), num(2.0)],
                vec![num(3.0), num(4.0)],
                vec![num(5.0), num(6.0)],
            ],
            merges: vec![],
        };

        let chunks = chunk_workbook(&[sheet], 50);
        // Row 0 is treated as the header; rows 1-2 are data.
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "1|2\n3|4\n5|6");
        assert_eq!(chunks[0].row_range, (1, 3));
    }
}
