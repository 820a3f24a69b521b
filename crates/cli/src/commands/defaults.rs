/// Module for the `defaults` subcommand, which prints the default transform
/// options in the JSON shape accepted by `--config`.
use async_trait::async_trait;
use clap::Args;
use jscloak_transform::TransformOptions;
use std::error::Error;

/// Arguments for the `defaults` subcommand.
#[derive(Args)]
pub struct DefaultsArgs;

#[async_trait]
impl super::Command for DefaultsArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        println!(
            "{}",
            serde_json::to_string_pretty(&TransformOptions::default())?
        );
        Ok(())
    }
}
