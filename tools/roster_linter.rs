/// Roster Linter: reports problems in a `name,tier` roster file.
///
/// Usage: roster_linter <names.txt>
use roll_call::schema::roster::{Roster, Tier};
use std::collections::HashMap;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: roster_linter <names.txt>");
        process::exit(0);
    }

    let path = Path::new(&args[1]);
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: Failed to read roster file: {}", e);
            process::exit(1);
        }
    };

    let roster = Roster::parse(&contents);
    println!("Loaded {} roster entries", roster.len());

    let (errors, warnings) = lint_roster(&contents, &roster);

    println!("\n=== Roster Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_roster(contents: &str, roster: &Roster) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Line-level problems the parser silently repairs
    for (i, line) in contents.lines().enumerate() {
        let lineno = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let name = fields.next().unwrap_or_default().trim();
        if name.is_empty() {
            warnings.push(format!("line {}: empty name, entry skipped", lineno));
            continue;
        }
        if let Some(cell) = fields.next().map(str::trim) {
            match Tier::parse_numeric(cell) {
                Some(tier) if cell.parse::<i64>().ok() != Some(i64::from(tier.value())) => {
                    warnings.push(format!(
                        "line {}: tier {} for '{}' clamped to {} ({})",
                        lineno,
                        cell,
                        name,
                        tier,
                        tier.label()
                    ))
                }
                Some(_) => {}
                None => warnings.push(format!(
                    "line {}: tier '{}' for '{}' is not a number, using {}",
                    lineno,
                    cell,
                    name,
                    Tier::default()
                )),
            }
        }
        if fields.next().is_some() {
            warnings.push(format!("line {}: extra fields after tier ignored", lineno));
        }
    }

    if roster.is_empty() {
        errors.push("roster has no entries; every pick will be empty".to_string());
        return (errors, warnings);
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for name in roster.names() {
        *seen.entry(name).or_insert(0) += 1;
    }
    let mut duplicates: Vec<(&str, usize)> = seen.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for (name, count) in duplicates {
        warnings.push(format!(
            "'{}' appears {} times; each copy adds its own weight",
            name, count
        ));
    }

    if roster.has_absolute() {
        let vetoed: Vec<&str> = roster
            .entries
            .iter()
            .filter(|e| !e.tier.is_absolute())
            .map(|e| e.name.as_str())
            .collect();
        if !vetoed.is_empty() {
            warnings.push(format!(
                "tier 5 present: {} lower-tier entries can never be picked ({})",
                vetoed.len(),
                vetoed.join(", ")
            ));
        }
    } else if roster.entries.iter().all(|e| e.tier.weight() == 0) {
        warnings.push(
            "every entry is tier 1; all names fall back to a single equal slot".to_string(),
        );
    }

    (errors, warnings)
}
