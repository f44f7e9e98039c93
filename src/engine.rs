//! One Context plus boundary configuration behind a single handle.

use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::Result;
use crate::evaluator;
use crate::keys::{self, KeyTriple};
use crate::session;

/// Holds no keys; every key and ciphertext is passed in as transport text.
#[derive(Debug)]
pub struct CkksEngine {
    ctx: Context,
    config: EngineConfig,
}

impl CkksEngine {
    /// Default chain and scale at `ring_dimension`, default config.
    pub fn new(ring_dimension: usize) -> Result<Self> {
        Ok(Self::with_config(Context::new(ring_dimension)?, EngineConfig::default()))
    }

    /// Wrap an existing Context.
    pub fn with_config(ctx: Context, config: EngineConfig) -> Self {
        Self { ctx, config }
    }

    /// The parameter set every artifact of this engine is bound to.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Boundary configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// See [`keys::generate_keys`].
    pub fn generate_keys(&self) -> Result<KeyTriple> {
        keys::generate_keys(&self.ctx)
    }

    /// See [`session::encrypt`].
    pub fn encrypt(&self, values: &[f64], public_key: &str) -> Result<String> {
        session::encrypt_with(values, public_key, &self.ctx, &self.config)
    }

    /// See [`session::decrypt`]; honors [`EngineConfig::output_length`].
    pub fn decrypt(&self, ciphertext: &str, secret_key: &str) -> Result<Vec<f64>> {
        session::decrypt_with(ciphertext, secret_key, &self.ctx, &self.config)
    }

    /// See [`evaluator::compute_dot_product`].
    pub fn compute_dot_product(&self, a: &str, b: &str, relin_key: &str) -> Result<String> {
        evaluator::compute_dot_product_with(a, b, relin_key, &self.ctx, &self.config)
    }

    /// See [`evaluator::compute_dot_products`].
    pub fn compute_dot_products<S: AsRef<str>>(
        &self,
        query: &str,
        records: &[S],
        relin_key: &str,
    ) -> Result<Vec<Result<String>>> {
        evaluator::compute_dot_products(query, records, relin_key, &self.ctx, &self.config)
    }
}
