//! Arm IK CLI - trace a target path from JSON configuration.

use std::fs;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Instant;

use arm_ik::{
    compute::evolution::SegmentDriver,
    schema::{SolverConfig, TargetPath},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 3 {
        eprintln!("Usage: {} <config.json> <path.json> [points] [trajectory.json]", args[0]);
        eprintln!();
        eprintln!("Trace a path of 3D points with the tip of a 3-link arm.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json      Arm geometry and solver settings");
        eprintln!("  path.json        JSON array of [x, y, z] target points");
        eprintln!("  points           Number of points to solve (default: all)");
        eprintln!("  trajectory.json  Where to write the solved trajectory");
        eprintln!();
        eprintln!("Example files are printed with the --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let path_path = PathBuf::from(&args[2]);
    let trajectory_path = args.get(4).map(PathBuf::from);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: SolverConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let path = TargetPath::load(&path_path).unwrap_or_else(|e| {
        eprintln!("Error loading path: {}", e);
        std::process::exit(1);
    });

    let points = parse_point_count(args.get(3).map(String::as_str), path.len())
        .unwrap_or_else(|e| {
            eprintln!("Invalid point count '{}': {}", args[3], e);
            std::process::exit(1);
        });

    let mut driver = SegmentDriver::from_config(&config, path).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    println!("Arm IK Path Tracer");
    println!("==================");
    println!("Links: {:?}", config.chain.link_lengths);
    println!("Base: {:?}", config.chain.base_position);
    println!(
        "Population: {}, generations: {}, mutation: {}, crossover: {}",
        config.driver.ga.population_size,
        config.driver.ga.max_generations,
        config.driver.ga.mutation_rate,
        config.driver.ga.crossover_rate
    );
    println!("Points: {}/{}", points, driver.path().len());
    println!();

    println!("Running solver...");
    let start = Instant::now();

    let summary = driver
        .run_points_with_callbacks(
            points,
            |_| {},
            |report| {
                let target = report.segment.last_point().copied().unwrap_or(report.reached);
                println!(
                    "  Point {}: target=({:.3}, {:.3}, {:.3}) reached=({:.3}, {:.3}, {:.3}) fitness={:.4} generations={}",
                    report.segment.end_index() - 1,
                    target.x,
                    target.y,
                    target.z,
                    report.reached.x,
                    report.reached.y,
                    report.reached.z,
                    report.fitness,
                    report.generations
                );
            },
        )
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let elapsed = start.elapsed();
    let trajectory = driver.trajectory();

    println!();
    println!("{}", driver.status_message());
    println!("Segments solved: {}", summary.segments.len());
    println!("Max error: {:.6}", trajectory.max_error());
    println!("Time: {:.2}s", elapsed.as_secs_f32());

    if let Some(out) = trajectory_path {
        if let Err(e) = trajectory.save(&out) {
            eprintln!("Error writing trajectory: {}", e);
            std::process::exit(1);
        }
        println!("Trajectory written to {}", out.display());
    }
}

/// Point count argument, defaulting to the whole path when absent.
fn parse_point_count(arg: Option<&str>, path_len: usize) -> Result<usize, ParseIntError> {
    arg.map_or(Ok(path_len), str::parse::<usize>)
}

fn print_example_config() {
    let config = SolverConfig::default();
    let path = [[0.0, 3.0, 0.0], [0.3, 3.1, 0.0], [0.5, 3.2, 0.1], [0.6, 3.3, 0.3]];

    match (
        serde_json::to_string_pretty(&config),
        serde_json::to_string_pretty(&path),
    ) {
        (Ok(config), Ok(path)) => {
            println!("Example configuration (config.json):");
            println!("{}", config);
            println!();
            println!("Example path (path.json):");
            println!("{}", path);
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
