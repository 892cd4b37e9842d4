//! Records a noisy sine wave into a short video plus a session snapshot.
//!
//! Requires `ffmpeg` on the PATH. Output lands under `recordings/`.

use anyhow::Result;
use rand::Rng;

use pulsescope::{RecorderConfig, SignalScope};

fn main() -> Result<()> {
    env_logger::init();

    let config = RecorderConfig {
        filename_prefix: "sine".into(),
        ..Default::default()
    };
    let dt = config.dt();
    let mut scope = SignalScope::new(config)?;

    let mut rng = rand::thread_rng();
    let start = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs_f64();

    // Ten seconds of 1.2 Hz sine with amplitude noise and timing jitter.
    let mut t = start;
    for i in 0..250 {
        let phase = i as f64 * dt * 1.2 * std::f64::consts::TAU;
        let value = phase.sin() as f32 + rng.gen_range(-0.05..0.05);
        scope.push_sample(value, t)?;
        t += dt * rng.gen_range(0.8..1.2);
    }

    let artifacts = scope.close();
    if let Some(video) = artifacts.video {
        println!("video: {}", video.display());
    }
    if let Some(snapshot) = artifacts.snapshot {
        println!("snapshot: {}", snapshot.display());
    }
    Ok(())
}
