//! CKKS demo: keygen, encrypt, slot-wise products down the whole chain, decrypt.
//!
//! Usage: `ckks-engine [config.toml]`. Per-operation timings go to `ckks_stats.csv`.

use ckks_engine::{CkksEngine, CkksError, Context, EngineConfig};
use csv::Writer;
use rand::{thread_rng, Rng};
use std::error::Error;
use std::time::Instant;

const RING_DIMENSION: usize = 8192;
const VECTOR_LEN: usize = 16;
const ROUNDS: usize = 5;

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let mut wtr = Writer::from_path("ckks_stats.csv")?;
    wtr.write_record(["round", "operation", "time_ms", "max_error"])?;

    let ctx = Context::new(RING_DIMENSION)?;
    println!("Initializing CKKS engine:");
    println!("N = {}, slots = {}, depth = {}", ctx.ring_dimension(), ctx.slot_count(), ctx.depth());
    println!("chain = {:?} ({:?} bits)", ctx.modulus_chain(), ctx.chain_bits());
    let engine = CkksEngine::with_config(ctx, config);

    let mut rng = thread_rng();
    for round in 0..ROUNDS {
        let start = Instant::now();
        let keys = engine.generate_keys()?;
        let keygen_ms = start.elapsed().as_secs_f64() * 1000.0;
        wtr.write_record(&[round.to_string(), "keygen".into(), format!("{:.3}", keygen_ms), String::new()])?;

        let x: Vec<f64> = (0..VECTOR_LEN).map(|_| rng.gen_range(-2.0..2.0)).collect();
        let start = Instant::now();
        let mut ct = engine.encrypt(&x, &keys.public_key)?;
        let encrypt_ms = start.elapsed().as_secs_f64() * 1000.0;
        wtr.write_record(&[round.to_string(), "encrypt".into(), format!("{:.3}", encrypt_ms), String::new()])?;

        // square repeatedly until the chain runs out
        let mut expected = x.clone();
        loop {
            let start = Instant::now();
            match engine.compute_dot_product(&ct, &ct, &keys.relin_key) {
                Ok(next) => {
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    ct = next;
                    expected.iter_mut().for_each(|v| *v *= *v);
                    let got = engine.decrypt(&ct, &keys.secret_key)?;
                    let max_error = expected
                        .iter()
                        .zip(&got)
                        .map(|(e, g)| (e - g).abs())
                        .fold(0.0f64, f64::max);
                    println!("round {}: product in {:.3} ms, max error {:.3e}", round, elapsed_ms, max_error);
                    wtr.write_record(&[
                        round.to_string(),
                        "dot_product".into(),
                        format!("{:.3}", elapsed_ms),
                        format!("{:.3e}", max_error),
                    ])?;
                }
                Err(CkksError::DepthExhausted { level, depth }) => {
                    println!("round {}: chain exhausted at level {} of {}", round, level, depth);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let start = Instant::now();
        let values = engine.decrypt(&ct, &keys.secret_key)?;
        let decrypt_ms = start.elapsed().as_secs_f64() * 1000.0;
        wtr.write_record(&[round.to_string(), "decrypt".into(), format!("{:.3}", decrypt_ms), String::new()])?;
        println!("round {}: keygen {:.3} ms, encrypt {:.3} ms, decrypt {:.3} ms ({} values)", round, keygen_ms, encrypt_ms, decrypt_ms, values.len());
    }

    wtr.flush()?;
    Ok(())
}
