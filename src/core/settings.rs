/// Headless pieces of the settings surface: table editing, opening the
/// roster in an external editor, and the history listing.
use std::path::Path;
use std::process::Command;

use crate::schema::roster::{Roster, RosterEntry, RosterError, Tier};

/// One row of the tier editor, as raw cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub name: String,
    pub tier: String,
}

impl TableRow {
    pub fn new(name: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: tier.into(),
        }
    }
}

/// Populate editor rows from a roster.
pub fn rows_from_roster(roster: &Roster) -> Vec<TableRow> {
    roster
        .entries
        .iter()
        .map(|e| TableRow::new(e.name.clone(), e.tier.to_string()))
        .collect()
}

/// Turn edited rows back into a roster with the same rules as the file
/// format: empty names are dropped, bad tiers become 3, others clamp.
pub fn roster_from_rows(rows: &[TableRow]) -> Roster {
    let entries = rows
        .iter()
        .filter_map(|row| {
            let name = row.name.trim();
            if name.is_empty() {
                None
            } else {
                Some(RosterEntry::new(name, Tier::parse_lenient(&row.tier)))
            }
        })
        .collect();
    Roster::new(entries)
}

/// Save edited rows to the roster file and return what was written.
/// Names with a comma or line break are refused and nothing is written.
pub fn save_rows(rows: &[TableRow], path: &Path) -> Result<Roster, RosterError> {
    let roster = roster_from_rows(rows);
    roster.save(path)?;
    log::info!("saved {} roster entries to {:?}", roster.len(), path);
    Ok(roster)
}

/// Command that opens `path` in the platform's default editor.
pub fn editor_command(path: &Path) -> Command {
    editor_command_for(std::env::consts::OS, path)
}

fn editor_command_for(os: &str, path: &Path) -> Command {
    match os {
        "windows" => {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg("start").arg("").arg(path);
            cmd
        }
        "macos" => {
            let mut cmd = Command::new("open");
            cmd.arg(path);
            cmd
        }
        _ => {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(path);
            cmd
        }
    }
}

/// Spawn the editor without waiting for it.
pub fn open_in_editor(path: &Path) -> std::io::Result<()> {
    editor_command(path).spawn()?;
    Ok(())
}

/// Numbered history listing, newest first.
pub fn format_history<'a, I>(history: I, empty_label: &str) -> Vec<String>
where
    I: DoubleEndedIterator<Item = &'a str>,
{
    let lines: Vec<String> = history
        .rev()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect();
    if lines.is_empty() {
        vec![empty_label.to_string()]
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_apply_file_rules() {
        let rows = vec![
            TableRow::new("Ann", "4"),
            TableRow::new("  ", "5"),
            TableRow::new("Ben", "seven"),
            TableRow::new(" Cat ", "0"),
        ];
        let roster = roster_from_rows(&rows);
        assert_eq!(
            roster.entries,
            vec![
                RosterEntry::new("Ann", Tier::clamped(4)),
                RosterEntry::new("Ben", Tier::default()),
                RosterEntry::new("Cat", Tier::MIN),
            ]
        );
    }

    #[test]
    fn rows_round_trip_through_roster() {
        let roster = Roster::default_roster();
        assert_eq!(roster_from_rows(&rows_from_roster(&roster)), roster);
    }

    #[test]
    fn save_rows_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        let saved = save_rows(&[TableRow::new("Dee", "2")], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Dee,2\n");
        assert_eq!(Roster::read_from(&path).unwrap(), saved);
    }

    #[test]
    fn save_rows_refuses_comma_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        std::fs::write(&path, "Old,3\n").unwrap();
        let rows = [TableRow::new("Smith, J", "4"), TableRow::new("Dee", "2")];
        assert!(matches!(
            save_rows(&rows, &path),
            Err(RosterError::UnstorableName(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Old,3\n");
    }

    #[test]
    fn editor_command_per_platform() {
        let path = Path::new("names.txt");
        assert_eq!(editor_command_for("linux", path).get_program(), "xdg-open");
        assert_eq!(editor_command_for("macos", path).get_program(), "open");
        let win = editor_command_for("windows", path);
        assert_eq!(win.get_program(), "cmd");
        assert_eq!(win.get_args().count(), 4);
    }

    #[test]
    fn history_newest_first() {
        let history = ["a", "b", "c"];
        assert_eq!(
            format_history(history.iter().copied(), "none"),
            vec!["1. c", "2. b", "3. a"]
        );
    }

    #[test]
    fn empty_history_placeholder() {
        let history: [&str; 0] = [];
        assert_eq!(format_history(history.iter().copied(), "No picks yet"), vec!["No picks yet"]);
    }
}
