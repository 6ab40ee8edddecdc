//! Riftfile CLI - Command-line tool for inspecting and converting game
//! asset files.
//!
//! This is the main entry point for the riftfile command-line application.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use riftfile_mapgeo::MapGeometry;
use riftfile_skl::Skeleton;

/// Riftfile - game asset inspection and conversion tool
#[derive(Parser)]
#[command(name = "riftfile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of an SKL skeleton file
    SklInfo {
        /// Input SKL file
        #[arg(short, long, env = "INPUT_SKL")]
        input: PathBuf,

        /// Also dump the full skeleton as JSON to this path
        #[arg(short, long)]
        json: Option<PathBuf>,
    },

    /// Rewrite an SKL file in the modern layout
    SklConvert {
        /// Input SKL file (legacy or modern)
        #[arg(short, long)]
        input: PathBuf,

        /// Output SKL file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show a summary of a MAPGEO map geometry file
    MapgeoInfo {
        /// Input MAPGEO file
        #[arg(short, long, env = "INPUT_MAPGEO")]
        input: PathBuf,

        /// Also dump the full geometry as JSON to this path
        #[arg(short, long)]
        json: Option<PathBuf>,
    },

    /// Rewrite a MAPGEO file at the latest supported version
    MapgeoConvert {
        /// Input MAPGEO file (any supported version)
        #[arg(short, long)]
        input: PathBuf,

        /// Output MAPGEO file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::SklInfo { input, json } => {
            cmd_skl_info(&input, json.as_ref())?;
        }
        Commands::SklConvert { input, output } => {
            cmd_skl_convert(&input, &output)?;
        }
        Commands::MapgeoInfo { input, json } => {
            cmd_mapgeo_info(&input, json.as_ref())?;
        }
        Commands::MapgeoConvert { input, output } => {
            cmd_mapgeo_convert(&input, &output)?;
        }
    }

    Ok(())
}

fn cmd_skl_info(input: &PathBuf, json: Option<&PathBuf>) -> Result<()> {
    let start = Instant::now();
    let skeleton = Skeleton::from_file(input).context("Failed to read SKL file")?;

    println!(
        "Loaded {} in {:?}: {:?}, {} joints, {} influences",
        input.display(),
        start.elapsed(),
        skeleton.format,
        skeleton.joints.len(),
        skeleton.influences.len()
    );
    if !skeleton.name.is_empty() {
        println!("Name: {}", skeleton.name);
    }

    for joint in &skeleton.joints {
        let indent = "  ".repeat(depth_of(&skeleton, joint.id));
        println!(
            "{}{} (id {}, parent {}, radius {:.2})",
            indent, joint.name, joint.id, joint.parent, joint.radius
        );
    }

    if let Some(path) = json {
        skeleton.write_json(path).context("Failed to write JSON")?;
        println!("JSON written to {}", path.display());
    }

    Ok(())
}

/// Depth of a joint in the tree, for display indentation. Parents always
/// precede children, so this terminates.
fn depth_of(skeleton: &Skeleton, id: i16) -> usize {
    let mut depth = 0;
    let mut current = id;
    while let Some(joint) = skeleton.joints.get(current as usize) {
        if joint.is_root() {
            break;
        }
        current = joint.parent;
        depth += 1;
    }
    depth
}

fn cmd_skl_convert(input: &PathBuf, output: &PathBuf) -> Result<()> {
    println!("Converting: {} -> {}", input.display(), output.display());

    let skeleton = Skeleton::from_file(input).context("Failed to read SKL file")?;
    skeleton
        .write_to_file(output)
        .context("Failed to write SKL file")?;

    println!("Wrote {} joints in the modern layout", skeleton.joints.len());

    Ok(())
}

fn cmd_mapgeo_info(input: &PathBuf, json: Option<&PathBuf>) -> Result<()> {
    let start = Instant::now();
    let geo = MapGeometry::from_file(input).context("Failed to read MAPGEO file")?;

    println!(
        "Loaded {} in {:?}: version {}, {} models, {} bucket grids, {} reflectors",
        input.display(),
        start.elapsed(),
        geo.version,
        geo.models.len(),
        geo.bucket_grids.len(),
        geo.planar_reflectors.len()
    );

    for model in &geo.models {
        println!(
            "  {}: {} vertices, {} indices, {} submeshes, quality {:#04x}, layer {:#04x}",
            model.name,
            model.vertices.len(),
            model.indices.len(),
            model.submeshes.len(),
            model.quality,
            model.layer
        );
        for submesh in &model.submeshes {
            println!(
                "    {} [{}..{}]",
                submesh.material,
                submesh.index_start,
                submesh.index_start + submesh.index_count
            );
        }
    }

    if let Some(path) = json {
        geo.write_json(path).context("Failed to write JSON")?;
        println!("JSON written to {}", path.display());
    }

    Ok(())
}

fn cmd_mapgeo_convert(input: &PathBuf, output: &PathBuf) -> Result<()> {
    println!("Converting: {} -> {}", input.display(), output.display());

    let start = Instant::now();
    let geo = MapGeometry::from_file(input).context("Failed to read MAPGEO file")?;
    geo.write_to_file(output)
        .context("Failed to write MAPGEO file")?;

    println!(
        "Rewrote {} models at version {} in {:?}",
        geo.models.len(),
        riftfile_mapgeo::WRITE_VERSION,
        start.elapsed()
    );

    Ok(())
}
