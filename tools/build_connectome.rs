// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connectome Construction Tool

Builds a connectome from a blueprint file over a synthesized demo tissue
(three scattered populations plus a morphology-bearing fiber layer).

Usage:
  cargo run --bin build_connectome -- [blueprint.toml] [--seed N]

Without a path, an embedded demo blueprint is used. `--seed` overrides the
blueprint's seed; `CONNECTOGEN_SEED` does the same from the environment.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::collections::HashMap;
use std::env;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use connectogen::prelude::*;

const DEMO_BLUEPRINT: &str = r#"
[simulation]
seed = 42

[simulation.volume]
x = 400.0
z = 400.0

[scalars]
capture_radius = 40.0
fiber_half_length = 200.0
fiber_half_width = 6.0

[[connection]]
name = "glom_to_granule"
strategy = "proximity"
from = "glomerulus"
to = "granule"
tag = "glom_to_granule"
radius = "capture_radius"
plane = "xyz"
convergence = 4
selection = "closest_first"
acceptance = "distance"

[[connection]]
name = "fiber_to_interneuron"
strategy = "box"
from = "granule"
to = "interneuron"
tag = "fiber_to_interneuron"
limit_x = "fiber_half_length"
limit_z = "fiber_half_width"
convergence = 80

[[connection]]
name = "contacts"
strategy = "touch"
from = "axon_layer"
to = "dendrite_layer"
tag = "contacts"
cell_intersection_plane = "xz"
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut blueprint_path: Option<String> = None;
    let mut cli_args: HashMap<String, String> = HashMap::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                if i + 1 >= args.len() {
                    eprintln!("Usage: {} [blueprint.toml] [--seed N]", args[0]);
                    std::process::exit(1);
                }
                cli_args.insert("seed".to_string(), args[i + 1].clone());
                i += 2;
            }
            "--help" | "-h" => {
                println!("Usage: {} [blueprint.toml] [--seed N]", args[0]);
                return Ok(());
            }
            path => {
                blueprint_path = Some(path.to_string());
                i += 1;
            }
        }
    }

    println!("🧠 Connectogen Construction Tool");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let blueprint = match &blueprint_path {
        Some(path) => {
            if !Path::new(path).exists() {
                eprintln!("❌ Error: Blueprint file '{}' not found", path);
                std::process::exit(1);
            }
            println!("📂 Blueprint: {}", path);
            connectogen::config::load_blueprint(Some(Path::new(path)), Some(&cli_args))?
        }
        None => {
            println!("📂 Blueprint: <embedded demo>");
            let mut blueprint: Blueprint = toml::from_str(DEMO_BLUEPRINT)?;
            connectogen::config::apply_environment_overrides(&mut blueprint);
            connectogen::config::apply_cli_overrides(&mut blueprint, &cli_args);
            blueprint
        }
    };

    let mut scaffold = Scaffold::from_blueprint(&blueprint);
    println!("🎲 Seed: {}", scaffold.seed());
    println!();

    println!("🧫 Placing demo populations...");
    place_demo_tissue(&mut scaffold, &blueprint)?;
    println!();

    println!("🔗 Running {} connection declarations...", blueprint.connections.len());
    let report = scaffold.run(&blueprint.connections);
    println!();

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(r) => {
                println!(
                    "   ✅ {} ({}): {} edges",
                    outcome.name,
                    outcome.kind,
                    r.total_edges()
                );
                if r.under_connected > 0 {
                    println!("      ⚠️  {} under-connected cell(s)", r.under_connected);
                }
            }
            Err(err) => println!("   ❌ {} ({}): {}", outcome.name, outcome.kind, err),
        }
    }
    println!();
    println!(
        "🏁 Done: {} succeeded, {} failed, {} edges total (seed {})",
        report.succeeded(),
        report.failed(),
        report.total_edges(),
        report.seed
    );

    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Scatter the populations the embedded demo blueprint wires up. Placement
/// uses its own RNG stream, seeded from the run seed, so construction draws
/// stay independent of population sizes.
fn place_demo_tissue(
    scaffold: &mut Scaffold,
    blueprint: &Blueprint,
) -> Result<(), Box<dyn std::error::Error>> {
    let volume = blueprint.simulation.volume;
    let mut rng = StdRng::seed_from_u64(scaffold.seed() ^ 0x706c_6163);

    let mut scatter = |n: usize, y_range: (f64, f64)| -> Vec<Point> {
        (0..n)
            .map(|_| {
                [
                    rng.gen_range(0.0..volume.x),
                    rng.gen_range(y_range.0..y_range.1),
                    rng.gen_range(0.0..volume.z),
                ]
            })
            .collect()
    };

    let glomerulus = scatter(600, (0.0, 50.0));
    let granule = scatter(4_000, (0.0, 150.0));
    let interneuron = scatter(80, (200.0, 300.0));
    let axons = scatter(120, (150.0, 160.0));
    let dendrites = scatter(120, (150.0, 160.0));

    scaffold.add_population(Population::new("glomerulus", 0, glomerulus))?;
    scaffold.add_population(Population::new("granule", 10_000, granule))?;
    scaffold.add_population(Population::new("interneuron", 20_000, interneuron))?;

    // One soma-centered compartment per cell is enough for demo contacts.
    let soma = |radius: f64, count: usize| {
        vec![Morphology::new(vec![Compartment::new([0.0; 3], radius)]); count]
    };
    scaffold.add_population(
        Population::new("axon_layer", 30_000, axons).with_morphologies(soma(12.0, 120))?,
    )?;
    scaffold.add_population(
        Population::new("dendrite_layer", 40_000, dendrites).with_morphologies(soma(12.0, 120))?,
    )?;

    for name in ["glomerulus", "granule", "interneuron", "axon_layer", "dendrite_layer"] {
        if let Some(p) = scaffold.population(name) {
            println!("   {} cells in '{}'", p.len(), name);
        }
    }
    Ok(())
}
