// CLI entry point for offline walk replay.
//
// Loads a scene file, composes its route, walks it headless and prints the
// result as JSON lines on stdout: one line per presentation event (motion
// samples, door changes, the final snap) followed by one summary line.
// Log output goes to stderr and is controlled by `RUST_LOG`.
// See `scene.rs` for the scene format.
//
// Usage:
//   wayfarer_replay <SCENE> [OPTIONS]
//     --walk <FILE>            Walk config JSON, replaces the scene's `walk`
//     --max-iterations <N>     Search budget per segment (default: from scene)
//     --no-diagonal            Restrict the search to axis-aligned moves
//     --max-ticks <N>          Cancel the walk after N ticks (default: from scene)
//     --summary-only           Print only the summary line

use wayfarer_sim::config::WalkConfig;
use wayfarer_sim::event::EventLog;
use wayfarer_sim::scene::Scene;

struct Args {
    scene: String,
    walk: Option<String>,
    max_iterations: Option<usize>,
    no_diagonal: bool,
    max_ticks: Option<usize>,
    summary_only: bool,
}

fn main() {
    env_logger::init();
    let args = parse_args();

    let mut scene = Scene::load(&args.scene).unwrap_or_else(|e| {
        eprintln!("Failed to load scene {}: {e}", args.scene);
        std::process::exit(1);
    });
    if let Some(path) = &args.walk {
        scene.walk = WalkConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load walk config {path}: {e}");
            std::process::exit(1);
        });
    }
    if let Some(n) = args.max_iterations {
        scene.options.max_iterations = n;
    }
    if args.no_diagonal {
        scene.options.allow_diagonal = false;
    }
    if let Some(n) = args.max_ticks {
        scene.max_ticks = n;
    }

    let mut log = EventLog::new();
    let report = match scene.replay(&mut log, &mut ()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Route failed: {e}");
            std::process::exit(2);
        }
    };

    if !args.summary_only {
        for event in log.drain() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Failed to encode event: {e}"),
            }
        }
    }
    let summary = serde_json::json!({
        "event": "summary",
        "points": report.points,
        "ticks": report.ticks,
        "outcome": report.outcome,
    });
    println!("{summary}");
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching,
/// no clap dependency.
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut scene = None;
    let mut parsed = Args {
        scene: String::new(),
        walk: None,
        max_iterations: None,
        no_diagonal: false,
        max_ticks: None,
        summary_only: false,
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--walk" => {
                i += 1;
                parsed.walk = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--walk requires a file path");
                    std::process::exit(1);
                }));
            }
            "--max-iterations" => {
                i += 1;
                parsed.max_iterations =
                    Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--max-iterations requires a positive integer");
                        std::process::exit(1);
                    }));
            }
            "--no-diagonal" => {
                parsed.no_diagonal = true;
            }
            "--max-ticks" => {
                i += 1;
                parsed.max_ticks =
                    Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--max-ticks requires a positive integer");
                        std::process::exit(1);
                    }));
            }
            "--summary-only" => {
                parsed.summary_only = true;
            }
            "--help" | "-h" => {
                println!("Usage: wayfarer_replay <SCENE> [OPTIONS]");
                println!("  --walk <FILE>            Walk config JSON");
                println!("  --max-iterations <N>     Search budget per segment");
                println!("  --no-diagonal            Axis-aligned moves only");
                println!("  --max-ticks <N>          Cancel the walk after N ticks");
                println!("  --summary-only           Print only the summary line");
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
            other => {
                if scene.is_some() {
                    eprintln!("Only one scene file may be given");
                    std::process::exit(1);
                }
                scene = Some(other.to_string());
            }
        }
        i += 1;
    }

    parsed.scene = scene.unwrap_or_else(|| {
        eprintln!("Usage: wayfarer_replay <SCENE> [OPTIONS]");
        std::process::exit(1);
    });
    parsed
}
