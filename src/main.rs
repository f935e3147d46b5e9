use anyhow::Result;
use log::{debug, error, info, trace};
use std::fs::File;
use std::io::Write;
use std::time::Instant;

// Define modules used by main
mod attractor;
mod boid;
mod drift;
mod grid;
mod simulation;
mod swarm_state;

use simulation::SwarmSimulation;
use swarm_common::{FrameSnapshot, SimulationConfig};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Swarm Engine...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    if config.engine.parallel {
        info!("Using {} Rayon threads.", rayon::current_num_threads());
    }

    // --- Initialize Simulation ---
    let mut sim = SwarmSimulation::new(config)?;
    info!("Swarm initialized with {} active particles.", sim.current_particle_count());
    debug!("Simulation Parameters: {:#?}", sim.params());

    // --- Simulation Loop ---
    let timing = sim.config().timing.clone();
    let record_interval = timing.record_interval_frames.max(1);
    info!(
        "Running {} frames ({} ms virtual frame period), recording every {} frames.",
        timing.frames, timing.frame_period_ms, record_interval
    );

    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    info!("Recording initial snapshot (frame 0)...");
    sim.record_snapshot();

    for frame in 0..timing.frames {
        // Virtual clock: frame pacing is the caller's business.
        let now_ms = frame as u64 * timing.frame_period_ms;
        let step_start_time = Instant::now();
        if let Err(e) = sim.step(now_ms) {
            error!("Error during frame {}: {}", frame + 1, e);
            anyhow::bail!("Simulation step failed.");
        }
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_frame = (frame + 1) % record_interval == 0;
        let is_last_frame = frame + 1 == timing.frames;

        if should_print_status || is_record_frame || is_last_frame {
            info!(
                "Frame [{}/{}] ({} ms) | Particles: {} | Step Time: {:6.3} ms | Elapsed: {:.2} s",
                frame + 1,
                timing.frames,
                now_ms,
                sim.current_particle_count(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_frame || is_last_frame {
                sim.record_snapshot();
            }
        } else {
            trace!(
                "Frame [{}/{}] completed in {:.3} ms",
                frame + 1,
                timing.frames,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished {} frames in {:.3} seconds.", sim.frame(), total_duration.as_secs_f64());
    for (i, attractor) in sim.attractors().iter().enumerate() {
        debug!(
            "Attractor {}: pos=({:.2}, {:.2}) mass={:.2} G={:.2} active={}",
            i, attractor.position.x, attractor.position.y, attractor.mass, attractor.gravitational_constant, attractor.active
        );
    }

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    if output.save_snapshots {
        let format = output.format.as_deref().unwrap_or("json");
        if let Err(e) = save_snapshots(sim.get_recorded_snapshots(), &output.base_filename, format) {
            error!("Error saving snapshots: {}", e);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    if output.save_final_positions {
        let filename = format!("{}_final_positions.csv", output.base_filename);
        match csv::Writer::from_path(&filename) {
            Ok(mut writer) => {
                writer.write_record(["x", "y", "vx", "vy", "hue", "brightness"])?;
                for p in sim.snapshot().particles {
                    writer.write_record(&[
                        format!("{:.4}", p.x),
                        format!("{:.4}", p.y),
                        format!("{:.4}", p.vx),
                        format!("{:.4}", p.vy),
                        p.hue.to_string(),
                        p.brightness.to_string(),
                    ])?;
                }
                writer.flush()?;
                info!("Final particle state saved to {}", filename);
            }
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Writes all snapshots to `<base>_snapshots.<ext>` in the requested format.
/// Unknown formats fall back to JSON.
fn save_snapshots(snapshots: &[FrameSnapshot], base_filename: &str, format: &str) -> Result<()> {
    match format {
        "bincode" => {
            let filename = format!("{}_snapshots.bin", base_filename);
            let file = File::create(&filename)
                .map_err(|e| anyhow::anyhow!("Error creating snapshot file '{}': {}", filename, e))?;
            bincode::serialize_into(file, snapshots)?;
            info!("{} snapshots saved to {} (binary format)", snapshots.len(), filename);
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", base_filename);
            let mut file = File::create(&filename)
                .map_err(|e| anyhow::anyhow!("Error creating snapshot file '{}': {}", filename, e))?;
            rmp_serde::encode::write(&mut file, snapshots)?;
            info!("{} snapshots saved to {} (MessagePack format)", snapshots.len(), filename);
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_snapshots.json", base_filename);
            let mut file = File::create(&filename)
                .map_err(|e| anyhow::anyhow!("Error creating snapshot file '{}': {}", filename, e))?;
            let json_string = serde_json::to_string(snapshots)?;
            file.write_all(json_string.as_bytes())?;
            info!("{} snapshots saved to {} ({} KB)", snapshots.len(), filename, json_string.len() / 1024);
        }
    }
    Ok(())
}
