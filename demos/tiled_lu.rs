//! A tiled-LU-style control-flow demo.
//!
//! Factorizes a small block matrix tile by tile: each tile is a handle, and
//! the classic diagonal/row/column/trailing-update dependency pattern is
//! expressed purely as access lists (§8 scenario 4), with no explicit
//! synchronization in the kernels themselves. Not part of the public API;
//! this binary exists to exercise `Runtime` end to end.
//!
//! Run with `cargo run --release --bin tiled_lu`. The worker count defaults
//! to the number of available cores, or can be overridden with the
//! `RIO_WORKERS` environment variable.

use rio::{AccessMode, Builder};
use std::sync::{Arc, Mutex};

const TILES: usize = 4; // a 4x4 grid of tiles

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut builder = Builder::new();
    if let Ok(raw) = std::env::var("RIO_WORKERS") {
        match raw.parse::<usize>() {
            Ok(workers) => builder = builder.workers(workers),
            Err(_) => log::warn!("ignoring malformed RIO_WORKERS={raw:?}"),
        }
    }
    let runtime = builder.build();

    // tile[row][col], row-major.
    let tiles: Vec<Vec<_>> = (0..TILES).map(|_| (0..TILES).map(|_| runtime.register()).collect()).collect();
    let trace = Arc::new(Mutex::new(Vec::new()));

    for k in 0..TILES {
        submit_step(&runtime, &trace, format!("factor({k},{k})"), &[(tiles[k][k], AccessMode::Write)]);

        for col in (k + 1)..TILES {
            submit_step(
                &runtime,
                &trace,
                format!("solve_row({k},{col})"),
                &[(tiles[k][k], AccessMode::Read), (tiles[k][col], AccessMode::Write)],
            );
        }
        for row in (k + 1)..TILES {
            submit_step(
                &runtime,
                &trace,
                format!("solve_col({row},{k})"),
                &[(tiles[k][k], AccessMode::Read), (tiles[row][k], AccessMode::Write)],
            );
        }
        for row in (k + 1)..TILES {
            for col in (k + 1)..TILES {
                submit_step(
                    &runtime,
                    &trace,
                    format!("update({row},{col})"),
                    &[
                        (tiles[row][k], AccessMode::Read),
                        (tiles[k][col], AccessMode::Read),
                        (tiles[row][col], AccessMode::Write),
                    ],
                );
            }
        }
    }

    runtime.wait_for_all();

    let trace = trace.lock().unwrap();
    log::info!("factorization finished after {} steps", trace.len());
    for step in trace.iter() {
        println!("{step}");
    }
}

fn submit_step(
    runtime: &rio::Runtime,
    trace: &Arc<Mutex<Vec<String>>>,
    name: String,
    access: &[(rio::Handle, AccessMode)],
) {
    let trace = Arc::clone(trace);
    runtime
        .submit(move || trace.lock().unwrap().push(name), access)
        .expect("demo never submits after shutdown or with invalid access");
}
