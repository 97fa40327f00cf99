use std::collections::BTreeMap;
use std::ops::Range;

use textwrap::core::display_width;

use crate::models::TermKind;
use crate::scroller::AnchorLayout;
use crate::store::TermStore;
use crate::window::ScrollMetrics;

pub const PLACEHOLDER: &str = "·";

/// One drawable piece of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// A loaded term, drawn from the store at render time. `part` is the byte
    /// range of the content to draw when the term spans several rows.
    Term {
        index: usize,
        width: usize,
        part: Option<Range<usize>>,
    },
    /// A run of indices that are inside the window but not loaded yet.
    Gap(Range<usize>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().filter_map(|cell| match cell {
            Cell::Term { index, .. } => Some(*index),
            Cell::Gap(_) => None,
        })
    }
}

/// Terms of the window wrapped into rows of a fixed width.
#[derive(Debug, Clone, Default)]
pub struct TermLayout {
    rows: Vec<Row>,
    row_of: BTreeMap<usize, usize>,
    viewport_rows: usize,
}

impl TermLayout {
    pub fn build(
        store: &TermStore,
        window: Range<usize>,
        width: usize,
        viewport_rows: usize,
    ) -> Self {
        let width = width.max(1);
        let mut layout = Self {
            rows: vec![Row::default()],
            row_of: BTreeMap::new(),
            viewport_rows,
        };
        let mut column = 0;

        let mut cursor = window.start;
        let place = |layout: &mut Self, cell: Cell, cell_width: usize, column: &mut usize| {
            if *column > 0 && *column + cell_width > width {
                layout.rows.push(Row::default());
                *column = 0;
            }
            if let Cell::Term { index, .. } = cell {
                let row = layout.rows.len() - 1;
                layout.row_of.entry(index).or_insert(row);
            }
            if let Some(row) = layout.rows.last_mut() {
                row.cells.push(cell);
            }
            *column += cell_width;
        };

        for term in store.loaded_in(window.clone()) {
            if term.index > cursor {
                place(&mut layout, Cell::Gap(cursor..term.index), 1, &mut column);
            }
            cursor = term.index + 1;

            if term.kind() == TermKind::Skipped && term.content.contains('\n') {
                // Paragraph break: one row per newline, blank lines included.
                // Text on either side of a newline is drawn on the row it belongs to.
                layout.row_of.insert(term.index, layout.rows.len() - 1);
                let mut offset = 0;
                for (line, segment) in term.content.split('\n').enumerate() {
                    if line > 0 {
                        layout.rows.push(Row::default());
                        column = 0;
                    }
                    let visible = segment.trim_end();
                    if !visible.trim_start().is_empty() {
                        let cell_width = display_width(visible);
                        let cell = Cell::Term {
                            index: term.index,
                            width: cell_width,
                            part: Some(offset..offset + visible.len()),
                        };
                        place(&mut layout, cell, cell_width, &mut column);
                    }
                    offset += segment.len() + 1;
                }
                continue;
            }
            let cell_width = display_width(&term.content);
            if term.kind() == TermKind::Skipped && term.content.trim().is_empty() {
                // Whitespace never starts a row.
                if column > 0 && column + cell_width > width {
                    layout.rows.push(Row::default());
                    column = 0;
                }
                if column == 0 {
                    layout.row_of.insert(term.index, layout.rows.len() - 1);
                    continue;
                }
            }

            place(
                &mut layout,
                Cell::Term { index: term.index, width: cell_width, part: None },
                cell_width,
                &mut column,
            );
        }
        if cursor < window.end {
            place(&mut layout, Cell::Gap(cursor..window.end), 1, &mut column);
        }

        layout
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.cells.is_empty())
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_rows
    }

    pub fn max_scroll(&self) -> usize {
        self.rows.len().saturating_sub(self.viewport_rows)
    }

    /// Loaded indices drawn in rows `[scroll, scroll + viewport_rows)`.
    pub fn visible_indices(&self, scroll: usize) -> Vec<usize> {
        self.rows
            .iter()
            .skip(scroll)
            .take(self.viewport_rows)
            .flat_map(Row::indices)
            .collect()
    }

    pub fn first_visible(&self, scroll: usize) -> Option<usize> {
        self.rows.iter().skip(scroll).take(self.viewport_rows).flat_map(Row::indices).next()
    }

    pub fn metrics(&self, scroll: usize) -> ScrollMetrics {
        ScrollMetrics {
            from_top: scroll,
            from_bottom: self.rows.len().saturating_sub(scroll + self.viewport_rows),
        }
    }
}

impl AnchorLayout for TermLayout {
    fn row_of(&self, index: usize) -> Option<usize> {
        self.row_of.get(&index).copied()
    }

    fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }
}
