/// Module for the `deobfuscate` subcommand, which reformats a JavaScript file
/// with every obfuscating pass switched off.
use super::{read_input, read_options, write_output};
use async_trait::async_trait;
use clap::Args;
use jscloak_transform::plugin::{JavaScriptPlugin, TransformPlugin};
use jscloak_transform::{TransformMode, TransformOptions};
use std::error::Error;

/// Arguments for the `deobfuscate` subcommand.
#[derive(Args)]
pub struct DeobfuscateArgs {
    /// Input JavaScript file, or `-` for stdin.
    pub input: String,
    /// Output file; `.js` is appended when it has no extension. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<String>,
    /// JSON file with transform options; only its `seed` is used.
    #[arg(long)]
    pub config: Option<String>,
}

#[async_trait]
impl super::Command for DeobfuscateArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let options = match &self.config {
            Some(path) => read_options(path, &TransformOptions::default())?,
            None => TransformOptions::default(),
        };
        let source = read_input(&self.input)?;

        let code = JavaScriptPlugin
            .transform_source(source, options, TransformMode::Deobfuscate)
            .await
            .map_err(|e| format!("Deobfuscation failed: {e}"))?;

        if let Some(path) = write_output(self.output.as_deref(), &code)? {
            println!("Wrote {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use std::fs;

    #[tokio::test]
    async fn reformats_minified_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("min.js");
        fs::write(&input, "function a(b){return b+1}").unwrap();
        let output = dir.path().join("pretty.js");

        DeobfuscateArgs {
            input: input.to_str().unwrap().to_string(),
            output: Some(output.to_str().unwrap().to_string()),
            config: None,
        }
        .execute()
        .await
        .unwrap();

        let code = fs::read_to_string(&output).unwrap();
        assert!(code.contains("\n    return "), "{code}");
    }

    #[tokio::test]
    async fn config_does_not_rewrite_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("d.js");
        fs::write(
            &input,
            "var total=1; function add(x){console.log(x); return x+total} add(2);",
        )
        .unwrap();
        let config = dir.path().join("options.json");
        fs::write(
            &config,
            r#"{"disableConsoleOutput": true, "renameGlobals": true, "identifierNamesGenerator": "mangled"}"#,
        )
        .unwrap();
        let output = dir.path().join("pretty.js");

        DeobfuscateArgs {
            input: input.to_str().unwrap().to_string(),
            output: Some(output.to_str().unwrap().to_string()),
            config: Some(config.to_str().unwrap().to_string()),
        }
        .execute()
        .await
        .unwrap();

        let code = fs::read_to_string(&output).unwrap();
        assert!(code.starts_with("var total = 1;\nfunction add("), "{code}");
        assert!(code.contains("console.log("), "{code}");
        assert!(code.contains(" + total;"), "{code}");
    }
}
