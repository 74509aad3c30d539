use crate::application::Workbook;
use crate::domain::Sheet;

const MIN_COLUMN_WIDTH: usize = 6;
const MAX_COLUMN_WIDTH: usize = 24;

/// Renders the computed values as an aligned text table with column labels
/// across the top and row numbers down the side.
pub fn render_sheet(sheet: &Sheet) -> String {
    let row_label_width = sheet.rows().to_string().len();
    let widths: Vec<usize> = (0..sheet.cols())
        .map(|col| column_width(sheet, col))
        .collect();

    let mut lines = Vec::with_capacity(sheet.rows() + 1);

    let mut header = " ".repeat(row_label_width);
    for (col, width) in widths.iter().enumerate() {
        header.push_str(&format!(" | {:<width$}", Sheet::column_label(col), width = *width));
    }
    lines.push(header.trim_end().to_string());

    for row in 0..sheet.rows() {
        let values: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(col, width)| {
                sheet
                    .cell_at(row, col)
                    .map(|cell| truncate(&cell.value, *width))
                    .unwrap_or_default()
            })
            .collect();
        // Columns after the last non-empty value are left off the line.
        let used = values
            .iter()
            .rposition(|value| !value.is_empty())
            .map_or(0, |last| last + 1);

        let mut line = format!("{:>width$}", row + 1, width = row_label_width);
        for (value, width) in values.iter().zip(&widths).take(used) {
            line.push_str(&format!(" | {:<width$}", value, width = *width));
        }
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

fn column_width(sheet: &Sheet, col: usize) -> usize {
    (0..sheet.rows())
        .filter_map(|row| sheet.cell_at(row, col))
        .map(|cell| cell.value.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut shortened: String = value.chars().take(width.saturating_sub(1)).collect();
        shortened.push('…');
        shortened
    }
}

/// One-line summary shown after the prompt: the pending status message if
/// there is one, otherwise the file name and dirty marker.
pub fn render_status(workbook: &Workbook) -> String {
    if let Some(status) = &workbook.status_message {
        return status.clone();
    }

    let filename = workbook.filename.as_deref().unwrap_or("unsaved");
    let marker = if workbook.dirty { " [modified]" } else { "" };
    format!(
        "File: {}{} | {}x{} | help: commands",
        filename,
        marker,
        workbook.sheet.rows(),
        workbook.sheet.cols()
    )
}

/// Reference text printed by the `help` command.
pub fn render_help() -> String {
    r#"CELLSHEET EXPRESSION LANGUAGE REFERENCE

=== BASIC CONCEPTS ===
• A cell holds text; its value is computed from that text
• Cell references use column letters + row number (A1, B2, AA10)
• Numbers may use '.' or ',' as the decimal separator (3.5, 3,5)
• Text that is not a valid expression is shown as-is
• A leading = is optional: =A1+1 and A1+1 are the same

=== ARITHMETIC OPERATORS ===
+  -    Addition, subtraction          5+3 → 8, A1-5
*  /    Multiplication, division       4*3 → 12, A1/B1
^       Power (right-associative)      2^3^2 → 512
+x -x   Unary sign                     -A1, -(2+3)

=== COMPARISON OPERATORS ===
<  >  = Compare two values             A1<B1 → TRUE or FALSE

=== FUNCTIONS ===
inc(x)  x + 1                          inc(41) → 42
dec(x)  x - 1                          dec(A1)
not(x)  Logical negation               not(A1>5)

Note: 0 is false, anything else is true

=== ERROR CODES ===
#CYCERROR   The cell is part of a circular reference
#REF_ERROR  A referenced cell does not exist
#SYNERROR   The formula could not be parsed

=== COMMANDS ===
set <cell> <text>   Enter text into a cell and recompute dependents
get <cell>          Show a cell's text and value
show                Print the sheet
recalc              Recompute every cell
addrow / addcol     Append a row or column
delrow / delcol     Remove the last row or column
new                 Start an empty sheet
save <file>         Save expressions as JSON
open <file>         Load a JSON sheet
export <file>       Export expressions as CSV
import <file>       Import expressions from CSV
help                Show this help
quit                Exit"#
        .to_string()
}
