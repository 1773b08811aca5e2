//! Compare indexed and exhaustive height queries on a real terrain asset.
//!
//! Samples a regular grid over the mesh's XZ extent, answers every point
//! both through the quadtree and by scanning all triangles, and reports any
//! disagreement.
//!
//! Run: `cargo run -p terrain --features test-tools --bin compare_height_queries -- <path-or-url> [grid] [config.json]`

use std::env;
use std::time::{Duration, Instant};

use terrain::{Fetcher, TerrainConfig, TerrainService, height_exhaustive, height_indexed};

const TOLERANCE: f32 = 1e-4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let Some(source) = args.get(1) else {
        eprintln!("usage: compare_height_queries <path-or-url> [grid] [config.json]");
        std::process::exit(2);
    };
    let grid: u32 = args.get(2).map_or(Ok(64), |s| s.parse())?;
    let config = match args.get(3) {
        Some(path) => TerrainConfig::from_json_file(path)?,
        None => TerrainConfig::default(),
    };

    let service = TerrainService::new(config);
    let loaded = if source.starts_with("http://") || source.starts_with("https://") {
        service.load_url(&Fetcher::new(), source).await?
    } else {
        service.load_file(source)?
    };
    let Some(terrain) = loaded else {
        return Err("terrain load was superseded".into());
    };

    let start = Instant::now();
    let tree = service.build_index(&terrain);
    println!("Index built in {:.1?}: {:?}\n", start.elapsed(), tree.stats());

    let mesh = terrain.mesh();
    let (min, max) = mesh.world_bounds();
    let height = &service.config().height;

    let mut hits = 0usize;
    let mut misses = 0usize;
    let mut mismatches = 0usize;
    let mut indexed_time = Duration::ZERO;
    let mut exhaustive_time = Duration::ZERO;

    for i in 0..grid {
        for j in 0..grid {
            let x = lerp(min.x, max.x, (i as f32 + 0.5) / grid as f32);
            let z = lerp(min.z, max.z, (j as f32 + 0.5) / grid as f32);

            let t0 = Instant::now();
            let indexed = height_indexed(mesh, tree, x, z, height);
            let t1 = Instant::now();
            let exhaustive = height_exhaustive(mesh, x, z, height);
            exhaustive_time += t1.elapsed();
            indexed_time += t1 - t0;

            match (indexed, exhaustive) {
                (None, None) => misses += 1,
                (Some(a), Some(b)) if (a - b).abs() <= TOLERANCE => hits += 1,
                (a, b) => {
                    mismatches += 1;
                    if mismatches <= 10 {
                        println!("  MISMATCH at ({x:.3}, {z:.3}): indexed={a:?}, exhaustive={b:?}");
                    }
                }
            }
        }
    }

    let total = grid * grid;
    println!("Sampled {total} points over [{min}] .. [{max}]");
    println!("  hits: {hits}, misses: {misses}, mismatches: {mismatches}");
    println!(
        "  indexed: {:.2?}/query, exhaustive: {:.2?}/query",
        indexed_time / total.max(1),
        exhaustive_time / total.max(1)
    );

    if mismatches > 0 {
        println!("\nSome comparisons FAILED!");
        std::process::exit(1);
    }
    println!("\nAll comparisons PASSED!");
    Ok(())
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
