use ckks_engine::transport::{self, DecodePolicy};
use ckks_engine::{
    compute_dot_product, decrypt, encrypt, generate_keys, CkksEngine, CkksError, Context, EngineConfig,
    OutputLength,
};
use rand::{thread_rng, Rng};

fn context() -> Context {
    Context::new(8192).unwrap()
}

#[test]
fn test_transport_roundtrip_all_lengths() {
    let mut rng = thread_rng();
    for len in 0..64usize {
        let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let text = transport::encode(&bytes);
        assert_eq!(text.len(), len.div_ceil(3) * 4);
        assert_eq!(transport::decode(&text), bytes);
        assert_eq!(transport::decode_strict(&text).unwrap(), bytes);
    }
}

#[test]
fn test_cross_key_decrypt_fails() {
    let ctx = context();
    let alice = generate_keys(&ctx).unwrap();
    let bob = generate_keys(&ctx).unwrap();
    let ct = encrypt(&[1.0, 2.0], &alice.public_key, &ctx).unwrap();
    assert!(matches!(
        decrypt(&ct, &bob.secret_key, &ctx),
        Err(CkksError::Decryption(_))
    ));
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let ctx = context();
    let keys = generate_keys(&ctx).unwrap();
    let input = [1.5, -2.25, 0.0, 3.75];
    let ct = encrypt(&input, &keys.public_key, &ctx).unwrap();
    let output = decrypt(&ct, &keys.secret_key, &ctx).unwrap();
    assert_eq!(output.len(), 4096);
    for (i, &v) in input.iter().enumerate() {
        assert!((output[i] - v).abs() < 1e-3, "slot {}: {} vs {}", i, output[i], v);
    }
}

#[test]
fn test_dot_product_is_slotwise() {
    let ctx = context();
    let keys = generate_keys(&ctx).unwrap();
    let a = encrypt(&[2.0, 3.0], &keys.public_key, &ctx).unwrap();
    let b = encrypt(&[4.0, 5.0], &keys.public_key, &ctx).unwrap();
    let product = compute_dot_product(&a, &b, &keys.relin_key, &ctx).unwrap();
    let values = decrypt(&product, &keys.secret_key, &ctx).unwrap();
    assert!((values[0] - 8.0).abs() < 1e-2, "{}", values[0]);
    assert!((values[1] - 15.0).abs() < 1e-2, "{}", values[1]);
}

#[test]
fn test_depth_is_exhausted_after_chain() {
    let ctx = context();
    let keys = generate_keys(&ctx).unwrap();
    let mut ct = encrypt(&[1.1, -0.9], &keys.public_key, &ctx).unwrap();
    let mut expected = [1.1f64, -0.9];
    for _ in 0..ctx.depth() {
        ct = compute_dot_product(&ct, &ct, &keys.relin_key, &ctx).unwrap();
        expected.iter_mut().for_each(|v| *v *= *v);
    }
    let values = decrypt(&ct, &keys.secret_key, &ctx).unwrap();
    for (got, want) in values.iter().zip(&expected) {
        assert!((got - want).abs() < 1e-2, "{} vs {}", got, want);
    }
    assert!(matches!(
        compute_dot_product(&ct, &ct, &keys.relin_key, &ctx),
        Err(CkksError::DepthExhausted { level: 2, depth: 2 })
    ));
}

#[test]
fn test_level_mismatch() {
    let ctx = context();
    let keys = generate_keys(&ctx).unwrap();
    let fresh = encrypt(&[1.0], &keys.public_key, &ctx).unwrap();
    let once = compute_dot_product(&fresh, &fresh, &keys.relin_key, &ctx).unwrap();
    assert!(matches!(
        compute_dot_product(&fresh, &once, &keys.relin_key, &ctx),
        Err(CkksError::LevelMismatch { left: 0, right: 1 })
    ));
}

#[test]
fn test_capacity_overflow() {
    let ctx = context();
    let keys = generate_keys(&ctx).unwrap();
    let too_long = vec![0.5; ctx.slot_count() + 1];
    assert!(matches!(
        encrypt(&too_long, &keys.public_key, &ctx),
        Err(CkksError::Capacity { len: 4097, capacity: 4096 })
    ));
    let full = vec![0.5; ctx.slot_count()];
    assert!(encrypt(&full, &keys.public_key, &ctx).is_ok());
}

#[test]
fn test_unsupported_dimension() {
    for n in [0, 3000, 65536] {
        assert!(matches!(Context::new(n), Err(CkksError::Parameter(_))));
    }
    assert!(matches!(CkksEngine::new(4096), Err(CkksError::Parameter(_))));
}

#[test]
fn test_strict_policy_rejects_malformed_text() {
    let ctx = context();
    let keys = generate_keys(&ctx).unwrap();
    let mut tampered = keys.public_key.clone();
    tampered.insert(8, '*');
    assert!(matches!(
        encrypt(&[1.0], &tampered, &ctx),
        Err(CkksError::KeyFormat(_))
    ));
}

#[test]
fn test_artifacts_are_bound_to_context() {
    let ctx = context();
    let other = Context::with_parameters(8192, &[60, 40, 60], 2f64.powi(40)).unwrap();
    let keys = generate_keys(&ctx).unwrap();
    let ct = encrypt(&[1.0], &keys.public_key, &ctx).unwrap();
    assert!(matches!(
        encrypt(&[1.0], &keys.public_key, &other),
        Err(CkksError::KeyFormat(_))
    ));
    let other_keys = generate_keys(&other).unwrap();
    assert!(matches!(
        decrypt(&ct, &other_keys.secret_key, &other),
        Err(CkksError::CiphertextFormat(_))
    ));
}

#[test]
fn test_logical_output_length() {
    let config = EngineConfig::from_toml_str("output_length = \"logical\"").unwrap();
    assert_eq!(config.output_length, OutputLength::Logical);
    assert_eq!(config.decode_policy, DecodePolicy::Strict);
    let engine = CkksEngine::with_config(context(), config);
    let keys = engine.generate_keys().unwrap();
    let ct = engine.encrypt(&[1.0, 2.0, 3.0], &keys.public_key).unwrap();
    let values = engine.decrypt(&ct, &keys.secret_key).unwrap();
    assert_eq!(values.len(), 3);
}

#[test]
fn test_engines_on_separate_threads() {
    let handles: Vec<_> = (0..2)
        .map(|i| {
            std::thread::spawn(move || {
                let engine = CkksEngine::new(8192).unwrap();
                let keys = engine.generate_keys().unwrap();
                let x = i as f64 + 0.5;
                let ct = engine.encrypt(&[x], &keys.public_key).unwrap();
                let sq = engine.compute_dot_product(&ct, &ct, &keys.relin_key).unwrap();
                (x * x, engine.decrypt(&sq, &keys.secret_key).unwrap()[0])
            })
        })
        .collect();
    for handle in handles {
        let (want, got) = handle.join().unwrap();
        assert!((want - got).abs() < 1e-2);
    }
}
