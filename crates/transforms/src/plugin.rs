//! Language plugins.
//!
//! A plugin is anything that can turn source text into transformed source
//! text for a mode. Front ends hold plugins as `Box<dyn TransformPlugin>`, so
//! supporting another source language means adding an implementation, not
//! touching the callers.

use crate::obfuscator::{obfuscate_source, ObfuscationConfig, ObfuscationResult};
use crate::options::{TransformMode, TransformOptions};
use crate::{PassConfig, Result};
use async_trait::async_trait;
use jscloak_utils::errors::TransformError;
use tracing::debug;

#[async_trait]
pub trait TransformPlugin: Send + Sync {
    /// Short identifier, e.g. `javascript`.
    fn name(&self) -> &'static str;

    /// Options used when the caller supplies none.
    fn default_options(&self) -> TransformOptions;

    /// Runs a full transform, returning the output and its metadata.
    async fn transform(&self, config: ObfuscationConfig, source: String) -> Result<ObfuscationResult>;

    /// Runs a transform and returns only the output text.
    async fn transform_source(
        &self,
        source: String,
        options: TransformOptions,
        mode: TransformMode,
    ) -> Result<String> {
        let config = ObfuscationConfig {
            options,
            mode,
            pass_config: PassConfig::default(),
        };
        Ok(self.transform(config, source).await?.code)
    }
}

/// The JavaScript engine. Each call runs on a blocking worker thread with its
/// own program state, so concurrent calls never share anything.
#[derive(Debug, Default, Clone)]
pub struct JavaScriptPlugin;

#[async_trait]
impl TransformPlugin for JavaScriptPlugin {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn default_options(&self) -> TransformOptions {
        TransformOptions::default()
    }

    async fn transform(&self, config: ObfuscationConfig, source: String) -> Result<ObfuscationResult> {
        debug!(plugin = self.name(), mode = %config.mode, bytes = source.len(), "dispatching transform");
        tokio::task::spawn_blocking(move || obfuscate_source(&source, &config))
            .await
            .map_err(|e| TransformError::Worker(e.to_string()))?
    }
}
