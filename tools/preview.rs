/// Preview: headless shell that drives the widget on virtual time.
///
/// Usage: preview [--roster <names.txt>] [--config <plugin.ron>] [--seed <n>]
///
/// Commands:
///   pick           trigger a selection
///   advance <ms>   move virtual time forward
///   run            run until the slot is back on the clock
///   history        list recent picks, newest first
///   reload         re-read the roster file
///   edit           open the roster file in the default editor
///   pool           show pool size, cursor and generation
///   seed <n>       rebuild the session with a new seed
///   help           list commands
///   quit           exit
use roll_call::core::host::{FixedClock, RecordingDisplay, RecordingNotifier};
use roll_call::core::plugin::{HeadlessPlugin, TriggerOutcome};
use roll_call::core::scheduler::VirtualScheduler;
use roll_call::core::settings::{format_history, open_in_editor};
use roll_call::schema::config::PluginConfig;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let mut roster_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--roster" if i + 1 < args.len() => {
                i += 1;
                roster_path = Some(PathBuf::from(&args[i]));
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(PathBuf::from(&args[i]));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match PluginConfig::load_from_ron(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => PluginConfig::default(),
    };

    let mut plugin = match build_plugin(&config, roster_path.as_ref(), seed) {
        Some(p) => p,
        None => process::exit(1),
    };

    println!(
        "Loaded {} roster entries ({} pool slots)",
        plugin.pool().roster().len(),
        plugin.pool().pool().len()
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let mut shown = print_writes(&plugin, 0);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{:>7} ms] preview> ", plugin.scheduler().now_ms());
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "pick" | "p" => match plugin.trigger() {
                TriggerOutcome::Started(pick) => {
                    println!("Reveal started (final: {:?})", pick.name().unwrap_or_default())
                }
                TriggerOutcome::EmptyRoster => println!("Roster is empty."),
                TriggerOutcome::Ignored => println!("Ignored: a reveal is already running."),
                TriggerOutcome::Recovered => println!("Reveal failed; back on the clock."),
            },
            "advance" | "a" => {
                let ms = match parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                    Some(ms) => ms,
                    None => {
                        println!("Usage: advance <ms>");
                        continue;
                    }
                };
                let fired = plugin.advance(ms);
                println!("{} timers fired", fired);
            }
            "run" | "r" => {
                let limit = plugin.config().reveal.total_duration_ms()
                    + plugin.config().result_dwell_ms
                    + 1;
                if !plugin.run_until_idle(limit) {
                    println!("Still not idle after {} ms", limit);
                }
            }
            "history" => {
                for line in format_history(
                    plugin.pool().history(),
                    &plugin.config().labels.history_empty,
                ) {
                    println!("  {}", line);
                }
            }
            "reload" => {
                plugin.reload_from_file();
                println!(
                    "Roster now has {} entries ({} pool slots)",
                    plugin.pool().roster().len(),
                    plugin.pool().pool().len()
                );
            }
            "edit" => match plugin.roster_path() {
                Some(path) => match open_in_editor(path) {
                    Ok(()) => println!("Opened {}; run 'reload' after saving.", path.display()),
                    Err(e) => println!("Could not open editor: {}", e),
                },
                None => println!("No roster file; start with --roster <names.txt>."),
            },
            "pool" => {
                let pool = plugin.pool();
                println!(
                    "  slots={} cursor={} remaining={} generation={}",
                    pool.pool().len(),
                    pool.cursor(),
                    pool.remaining(),
                    pool.generation()
                );
            }
            "seed" => {
                let new_seed = match parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                    Some(s) => s,
                    None => {
                        println!("Usage: seed <n>");
                        continue;
                    }
                };
                if let Some(p) = build_plugin(&config, roster_path.as_ref(), new_seed) {
                    plugin = p;
                    shown = 0;
                    println!("Session rebuilt with seed {}", new_seed);
                }
            }
            _ => println!("Unknown command '{}'. Type 'help'.", cmd),
        }

        shown = print_writes(&plugin, shown);
    }
}

fn build_plugin(
    config: &PluginConfig,
    roster_path: Option<&PathBuf>,
    seed: u64,
) -> Option<HeadlessPlugin> {
    let mut builder = HeadlessPlugin::builder()
        .config(config.clone())
        .seed(seed)
        .time_source(FixedClock("--:--:--".to_string()));
    if let Some(path) = roster_path {
        builder = builder.roster_file(path);
    }

    let mut plugin = match builder.build(
        VirtualScheduler::new(),
        RecordingDisplay::new(),
        RecordingNotifier::new(),
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return None;
        }
    };

    if let Err(e) = plugin.start() {
        eprintln!("ERROR: Failed to start: {}", e);
        return None;
    }
    Some(plugin)
}

/// Print display writes made since `shown`, returning the new count.
fn print_writes(plugin: &HeadlessPlugin, shown: usize) -> usize {
    let writes = plugin.display().writes();
    for w in &writes[shown.min(writes.len())..] {
        println!("  | {:<18} | {}", w.title, w.body);
    }
    writes.len()
}

fn print_usage() {
    println!("Usage: preview [--roster <names.txt>] [--config <plugin.ron>] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  pick          Trigger a selection");
    println!("  advance <ms>  Move virtual time forward");
    println!("  run           Run until the slot is back on the clock");
    println!("  history       List recent picks, newest first");
    println!("  reload        Re-read the roster file");
    println!("  edit          Open the roster file in the default editor");
    println!("  pool          Show pool size, cursor and generation");
    println!("  seed <n>      Rebuild the session with a new seed");
    println!("  help          This message");
    println!("  quit          Exit");
}
