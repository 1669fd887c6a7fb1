/// A column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Header text.
    pub title: String,
    /// Whether the column is highlighted when rendered.
    pub emphasis: bool,
}

impl Column {
    /// A plain column.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            emphasis: false,
        }
    }

    /// A highlighted column.
    pub fn emphasized(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            emphasis: true,
        }
    }
}

/// Rows of text under a set of headers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// Column headers.
    pub columns: Vec<Column>,
    /// Cell values, one vector per row.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table.
    #[must_use]
    pub const fn new(columns: Vec<Column>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display width of each column: the widest of header and cells.
    #[must_use]
    pub fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(column.title.chars().count())
            })
            .collect()
    }
}
