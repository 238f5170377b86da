//! Scene Exporter CLI
//!
//! Convert scene documents to the JSON scene format.

use clap::{Parser, Subcommand};
use scene_exporter::{load_from_path, ExportConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scene-exporter")]
#[command(author, version, about = "Convert scene documents to a JSON scene file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene document to a scene file
    Export {
        /// Input document: a JSON file, a directory with scene.json, or a ZIP bundle
        #[arg(short, long)]
        input: PathBuf,

        /// Output scene file path
        #[arg(short, long)]
        output: PathBuf,

        /// Flat-shade every mesh in the scene
        #[arg(long)]
        flat_shading: bool,

        /// Skip IK helper bones when exporting skeletons
        #[arg(long)]
        ignore_ik_bones: bool,

        /// Write bone indices uncompressed (4 values per vertex instead of 1)
        #[arg(long)]
        no_compressed_indices: bool,

        /// Subdirectory for texture files, next to the scene file
        #[arg(long, default_value = "textures")]
        texture_dir: String,

        /// Material namespace (defaults to the output file name)
        #[arg(long)]
        namespace: Option<String>,

        /// Export only meshes on these layers (repeatable)
        #[arg(long)]
        layer: Vec<i32>,
    },

    /// Show information about a scene document
    Info {
        /// Input document path
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            flat_shading,
            ignore_ik_bones,
            no_compressed_indices,
            texture_dir,
            namespace,
            layer,
        } => {
            let config = ExportConfig {
                flat_shade_scene: flat_shading,
                ignore_ik_bones,
                compress_matrix_indices: !no_compressed_indices,
                texture_dir,
                namespace,
                selected_layers: if layer.is_empty() { None } else { Some(layer) },
            };

            // add a default extension when none was given
            let output = if output.extension().is_some() {
                output
            } else {
                output.with_extension("scene")
            };

            println!("Exporting {:?} to {:?}...", input, output);
            let warnings = scene_exporter::export_file(&input, &output, config)?;
            if warnings > 0 {
                println!("Export completed with {} warning(s), see {:?}", warnings, output.with_extension("log"));
            } else {
                println!("Export completed");
            }
        }
        Commands::Info { input } => {
            show_document_info(&input)?;
        }
    }

    Ok(())
}

fn show_document_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading document from {:?}...", input);
    let loaded = load_from_path(input)?;
    let doc = &loaded.scene;

    let total_faces: usize = doc.meshes.iter().map(|m| m.geometry.faces.len()).sum();
    let total_vertices: usize = doc.meshes.iter().map(|m| m.geometry.positions.len()).sum();

    println!("\nScene Document Info:");
    println!("  Name: {}", if doc.name.is_empty() { "(unnamed)" } else { &doc.name });
    println!("  Meshes: {} ({} faces, {} source vertices)", doc.meshes.len(), total_faces, total_vertices);
    println!("  Empties: {}", doc.empties.len());
    println!("  Materials: {}", doc.materials.len());
    println!("  Armatures: {}", doc.armatures.len());
    println!("  Cameras: {}", doc.cameras.len());
    println!("  Lights: {}", doc.lights.len());

    for mesh in &doc.meshes {
        println!(
            "    - {} [{} faces, {} slots{}]",
            mesh.name,
            mesh.geometry.faces.len(),
            mesh.material_slots.len(),
            if mesh.skin.is_some() { ", skinned" } else { "" }
        );
    }

    Ok(())
}
