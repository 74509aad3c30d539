use crate::application::Workbook;
use crate::domain::{CellUpdate, EvaluationOutcome};
use crate::infrastructure::{CsvExporter, FileRepository};

use super::ui::{render_help, render_sheet};

/// A parsed front-end command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { cell: String, text: String },
    Get { cell: String },
    Show,
    Recalc,
    AddRow,
    AddColumn,
    DeleteRow,
    DeleteColumn,
    New,
    Save { filename: String },
    Open { filename: String },
    Export { filename: String },
    Import { filename: String },
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Text after `set <cell>` is taken verbatim
    /// apart from the single separating space.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim_start();
        let (word, rest) = match line.split_once(' ') {
            Some((word, rest)) => (word, rest),
            None => (line.trim_end(), ""),
        };

        let filename = |command: &str| -> Result<String, String> {
            let name = rest.trim();
            if name.is_empty() {
                Err(format!("usage: {} <file>", command))
            } else {
                Ok(name.to_string())
            }
        };

        match word.to_lowercase().as_str() {
            "set" => {
                let (cell, text) = rest.split_once(' ').unwrap_or((rest, ""));
                if cell.is_empty() {
                    return Err("usage: set <cell> <text>".to_string());
                }
                Ok(Command::Set {
                    cell: cell.to_string(),
                    text: text.to_string(),
                })
            }
            "get" => match rest.trim() {
                "" => Err("usage: get <cell>".to_string()),
                cell => Ok(Command::Get { cell: cell.to_string() }),
            },
            "show" => Ok(Command::Show),
            "recalc" => Ok(Command::Recalc),
            "addrow" => Ok(Command::AddRow),
            "addcol" => Ok(Command::AddColumn),
            "delrow" => Ok(Command::DeleteRow),
            "delcol" => Ok(Command::DeleteColumn),
            "new" => Ok(Command::New),
            "save" => filename("save").map(|filename| Command::Save { filename }),
            "open" => filename("open").map(|filename| Command::Open { filename }),
            "export" => filename("export").map(|filename| Command::Export { filename }),
            "import" => filename("import").map(|filename| Command::Import { filename }),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command: {} (try 'help')", other)),
        }
    }
}

/// Executes parsed commands against a [`Workbook`].
pub struct InputHandler;

impl InputHandler {
    /// Runs a command against the workbook and returns the text to print.
    pub fn handle_command(workbook: &mut Workbook, command: Command) -> String {
        match command {
            Command::Set { cell, text } => match workbook.edit(&cell, &text) {
                Ok(outcome) => Self::describe_outcome(&outcome),
                Err(e) => format!("error: {}", e),
            },
            Command::Get { cell } => match workbook.sheet.cell_by_name(&cell) {
                Some(cell) => format!("{} = {:?} -> {}", cell.name, cell.expression, cell.value),
                None => format!("error: unknown cell {}", cell),
            },
            Command::Show => render_sheet(&workbook.sheet),
            Command::Recalc => {
                let updates = workbook.recalculate_all();
                format!("recalculated {} cells", updates.len())
            }
            Command::AddRow => Self::describe_resize(workbook.add_row(), workbook),
            Command::AddColumn => Self::describe_resize(workbook.add_column(), workbook),
            Command::DeleteRow => Self::describe_resize(workbook.delete_row(), workbook),
            Command::DeleteColumn => Self::describe_resize(workbook.delete_column(), workbook),
            Command::New => {
                workbook.new_sheet();
                "new sheet".to_string()
            }
            Command::Save { filename } => {
                match FileRepository::save_sheet(&workbook.sheet, &filename) {
                    Ok(filename) => {
                        workbook.mark_saved(&filename);
                        format!("saved to {}", filename)
                    }
                    Err(e) => format!("error: save failed: {}", e),
                }
            }
            Command::Open { filename } => match FileRepository::load_sheet(&filename) {
                Ok((sheet, filename)) => {
                    workbook.replace_sheet(sheet, Some(filename.clone()));
                    format!("loaded {}", filename)
                }
                Err(e) => format!("error: load failed: {}", e),
            },
            Command::Export { filename } => {
                match CsvExporter::export_to_csv(&workbook.sheet, &filename) {
                    Ok(filename) => format!("exported to {}", filename),
                    Err(e) => format!("error: export failed: {}", e),
                }
            }
            Command::Import { filename } => match CsvExporter::import_from_csv(&filename) {
                Ok(sheet) => {
                    // Imported data is not a saved sheet, so it keeps no filename.
                    workbook.replace_sheet(sheet, None);
                    workbook.dirty = true;
                    format!("imported {}", filename)
                }
                Err(e) => format!("error: import failed: {}", e),
            },
            Command::Help => render_help(),
            Command::Quit => {
                if workbook.dirty {
                    "unsaved changes discarded".to_string()
                } else {
                    String::new()
                }
            }
        }
    }

    fn describe_outcome(outcome: &EvaluationOutcome) -> String {
        let mut lines: Vec<String> = outcome.updates().map(Self::describe_update).collect();
        if let Some(message) = &outcome.message {
            lines.push(format!("error: {}", message));
        }
        lines.join("\n")
    }

    fn describe_update(update: &CellUpdate) -> String {
        format!("{} = {}", update.name, update.value)
    }

    fn describe_resize<E: std::fmt::Display>(
        result: Result<Vec<CellUpdate>, E>,
        workbook: &Workbook,
    ) -> String {
        match result {
            Ok(_) => format!("sheet is now {}x{}", workbook.sheet.rows(), workbook.sheet.cols()),
            Err(e) => format!("error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_set_keeps_text_verbatim() {
        assert_eq!(
            Command::parse("set A1 =B1 +  1").unwrap(),
            Command::Set {
                cell: "A1".to_string(),
                text: "=B1 +  1".to_string(),
            }
        );
        assert_eq!(
            Command::parse("set A1").unwrap(),
            Command::Set {
                cell: "A1".to_string(),
                text: String::new(),
            }
        );
        assert!(Command::parse("set").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("show").unwrap(), Command::Show);
        assert_eq!(Command::parse("  SHOW  ").unwrap(), Command::Show);
        assert_eq!(Command::parse("addrow").unwrap(), Command::AddRow);
        assert_eq!(Command::parse("delcol").unwrap(), Command::DeleteColumn);
        assert_eq!(Command::parse("q").unwrap(), Command::Quit);
        assert_eq!(Command::parse("?").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_file_commands() {
        assert_eq!(
            Command::parse("save out.json").unwrap(),
            Command::Save { filename: "out.json".to_string() }
        );
        assert!(Command::parse("open").is_err());
        assert!(Command::parse("frobnicate").is_err());
        assert!(Command::parse("").is_err());
    }

    #[test]
    fn test_set_reports_updates() {
        let mut workbook = Workbook::default();
        InputHandler::handle_command(&mut workbook, Command::parse("set B1 A1 + 1").unwrap());
        let output = InputHandler::handle_command(&mut workbook, Command::parse("set A1 5").unwrap());
        assert_eq!(output, "A1 = 5\nB1 = 6");
    }

    #[test]
    fn test_set_reports_cycle_message() {
        let mut workbook = Workbook::default();
        InputHandler::handle_command(&mut workbook, Command::parse("set B1 A1 + 1").unwrap());
        let output = InputHandler::handle_command(&mut workbook, Command::parse("set A1 B1 + 1").unwrap());
        assert!(output.starts_with("A1 = #CYCERROR"));
        assert!(output.contains("error: circular reference"));
    }

    #[test]
    fn test_get_cell() {
        let mut workbook = Workbook::default();
        workbook.edit("A1", "2 * 3").unwrap();
        let output = InputHandler::handle_command(&mut workbook, Command::Get { cell: "a1".to_string() });
        assert_eq!(output, "A1 = \"2 * 3\" -> 6");
    }

    #[test]
    fn test_resize_errors_are_reported() {
        let mut workbook = Workbook::new(crate::domain::SheetConfig {
            rows: 1,
            ..Default::default()
        });
        let output = InputHandler::handle_command(&mut workbook, Command::DeleteRow);
        assert_eq!(output, "error: Cannot delete the last row");
    }

    #[test]
    fn test_save_and_open_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.json");
        let filename = path.to_str().unwrap().to_string();

        let mut workbook = Workbook::default();
        workbook.edit("A1", "4").unwrap();
        workbook.edit("A2", "A1 * A1").unwrap();
        let output = InputHandler::handle_command(&mut workbook, Command::Save { filename: filename.clone() });
        assert!(output.starts_with("saved to"));
        assert!(!workbook.dirty);

        let mut reopened = Workbook::default();
        InputHandler::handle_command(&mut reopened, Command::Open { filename });
        assert_eq!(reopened.sheet.cell_by_name("A2").unwrap().value, "16");
        assert!(!reopened.dirty);
    }
}
