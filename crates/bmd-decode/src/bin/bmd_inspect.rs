//! Print a summary of a BMD model and dump its textures as PNG files.
//!
//! Run: `cargo run -p bmd-decode --features inspect --bin bmd_inspect -- model.bmd [out_dir]`
//!
//! Writes `summary.json` and one `<index>_<name>.png` per decodable texture
//! into `out_dir` (default `bmd_inspect_out`). Set `RUST_LOG=debug` to see
//! per-chunk decode logs.

use std::fs;
use std::path::{Path, PathBuf};

use bmd_decode::{DecodeOptions, HierarchyNode, MipLevels, Model, TextureData};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT_DIR: &str = "bmd_inspect_out";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args_os().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        eprintln!("usage: bmd_inspect <model.bmd> [out_dir]");
        std::process::exit(2);
    };
    let output_dir = args
        .next()
        .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from);

    let bytes = fs::read(&input)?;
    let options = DecodeOptions {
        mip_levels: MipLevels::All,
        ..DecodeOptions::default()
    };
    let model = bmd_decode::decode_with(&bytes, &options)?;

    print_summary(&input, &model);

    fs::create_dir_all(&output_dir)?;
    let summary = summary_json(&model);
    fs::write(
        output_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    let written = write_textures(&model, &output_dir)?;

    println!("\nWrote summary.json and {written} textures to {}", output_dir.display());
    Ok(())
}

fn print_summary(input: &Path, model: &Model) {
    println!("{}", input.display());
    println!(
        "  hierarchy: {} nodes, depth {}",
        model.hierarchy().nodes.len(),
        model.hierarchy().max_depth()
    );
    println!("  joints:    {}", model.joints().len());
    println!("  envelopes: {}", model.envelopes().len());
    println!(
        "  batches:   {} ({} vertices)",
        model.batches().len(),
        model.batches().iter().map(|b| b.vertex_count).sum::<usize>()
    );
    println!(
        "  materials: {} ({} references)",
        model.materials().materials.len(),
        model.materials().len()
    );
    println!("  textures:  {}", model.textures().len());

    if !model.warnings().is_empty() {
        println!("\n{} warnings:", model.warnings().len());
        for warning in model.warnings() {
            println!("  - {warning}");
        }
    }
}

fn summary_json(model: &Model) -> serde_json::Value {
    let materials = model.materials();
    let hierarchy: Vec<_> = model
        .hierarchy()
        .nodes
        .iter()
        .map(|node| match node {
            HierarchyNode::Open => json!("open"),
            HierarchyNode::Close => json!("close"),
            HierarchyNode::Joint(i) => json!({ "joint": i }),
            HierarchyNode::Material(i) => json!({ "material": i }),
            HierarchyNode::Batch(i) => json!({ "batch": i }),
        })
        .collect();

    json!({
        "hierarchy": hierarchy,
        "hierarchy_depth": model.hierarchy().max_depth(),
        "joints": model.joints().iter().map(|j| json!({
            "name": j.name,
            "translation": j.translation.to_array(),
            "rotation": j.rotation.to_array(),
            "scale": j.scale.to_array(),
        })).collect::<Vec<_>>(),
        "batches": model.batches().iter().map(|b| json!({
            "matrix_type": format!("{:?}", b.matrix_type),
            "vertices": b.vertex_count,
            "stride": b.stride,
            "packets": b.packets.len(),
            "primitives": b.primitives().count(),
        })).collect::<Vec<_>>(),
        "materials": (0..materials.len()).map(|i| {
            let reference = i as u16;
            json!({
                "name": materials.name(reference),
                "tev_stages": materials.resolve(reference).map(|m| m.tev_stages.len()),
            })
        }).collect::<Vec<_>>(),
        "textures": model.textures().iter().map(|t| json!({
            "name": t.name,
            "format": format!("{:?}", t.format),
            "width": t.width,
            "height": t.height,
            "mip_count": t.mip_count,
            "decoded": matches!(t.data, TextureData::Decoded { .. }),
        })).collect::<Vec<_>>(),
        "warnings": model.warnings().iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

fn write_textures(model: &Model, output_dir: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let mut written = 0;
    for (index, texture) in model.textures().iter().enumerate() {
        let Some(image) = texture.to_image() else {
            continue;
        };
        let file_name = format!("{index:03}_{}.png", sanitize(&texture.name));
        image.save(output_dir.join(file_name))?;
        written += 1;
    }
    Ok(written)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
