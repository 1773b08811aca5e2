//! Fetch an ITRI terrain asset and save it with a decoded summary.
//!
//! Run: `cargo run -p terrain --features test-tools --bin fetch_terrain -- <url> [output.bin]`
//!
//! Writes the raw buffer to the output path and a `.json` summary next to it
//! (header fields and the first few decoded triangles) for inspection.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use terrain::{Fetcher, TriangleMesh};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let Some(url) = args.get(1) else {
        eprintln!("usage: fetch_terrain <url> [output.bin]");
        std::process::exit(2);
    };
    let output_path = Path::new(args.get(2).map_or("terrain.bin", String::as_str));

    println!("Fetching {url}...");
    let bytes = Fetcher::new().fetch_bytes(url).await?;
    File::create(output_path)?.write_all(&bytes)?;
    println!("Saved {} bytes to {}", bytes.len(), output_path.display());

    let mesh = TriangleMesh::from_bytes(bytes)?;
    let header = mesh.header();
    let (world_min, world_max) = mesh.world_bounds();

    let summary = serde_json::json!({
        "count": header.count,
        "flags": header.flags.0,
        "has_colors": header.flags.has_colors(),
        "has_uvs": header.flags.has_uvs(),
        "header_size": header.header_size,
        "offsets": {
            "base": header.offsets.base,
            "edge_x": header.offsets.edge_x,
            "edge_y": header.offsets.edge_y,
            "colors": header.offsets.colors,
            "uvs": header.offsets.uvs,
        },
        "bmin": header.bmin.to_array(),
        "bmax": header.bmax.to_array(),
        "vec_range": header.vec_range,
        "world_min": world_min.to_array(),
        "world_max": world_max.to_array(),
        "first_triangles": (0..mesh.len().min(5)).map(|i| {
            serde_json::json!({
                "index": i,
                "vertices": mesh.triangle_at(i).map(|v| v.to_array()),
                "color": mesh.color_at(i),
                "uvs": mesh.uvs_at(i).map(|uvs| uvs.map(|v| v.to_array())),
            })
        }).collect::<Vec<_>>(),
    });

    let summary_path = output_path.with_extension("json");
    File::create(&summary_path)?.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;
    println!("Saved summary to {}", summary_path.display());

    println!(
        "\n{} triangles, world bounds [{world_min}] .. [{world_max}]",
        header.count
    );

    Ok(())
}
