use async_trait::async_trait;
use clap::Subcommand;
use jscloak_transform::TransformOptions;
use jscloak_utils::errors::ObfuscateError;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub mod defaults;
pub mod deobfuscate;
pub mod obfuscate;

#[derive(Subcommand)]
pub enum Cmd {
    /// Obfuscate a JavaScript file
    Obfuscate(obfuscate::ObfuscateArgs),

    /// Reformat a JavaScript file for reading
    Deobfuscate(deobfuscate::DeobfuscateArgs),

    /// Print the default options as JSON
    Defaults(defaults::DefaultsArgs),
}

#[async_trait]
pub trait Command {
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Obfuscate(args) => args.execute().await,
            Cmd::Deobfuscate(args) => args.execute().await,
            Cmd::Defaults(args) => args.execute().await,
        }
    }
}

/// Reads program text from `input`, or from stdin when it is `-`.
pub fn read_input(input: &str) -> Result<String, ObfuscateError> {
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    fs::read_to_string(input).map_err(|source| ObfuscateError::File {
        path: input.to_string(),
        source,
    })
}

/// Loads options from a JSON file over `base`; fields it omits keep the
/// values they have in `base`.
pub fn read_options(path: &str, base: &TransformOptions) -> Result<TransformOptions, ObfuscateError> {
    let json = fs::read_to_string(path).map_err(|source| ObfuscateError::File {
        path: path.to_string(),
        source,
    })?;
    Ok(base.overlay_json(&json)?)
}

/// Output file for `path`: a path without an extension gets `.js`.
pub fn output_path(path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("js")
    }
}

/// Writes `code` to `output`, or to stdout when there is none. Returns the
/// file written.
pub fn write_output(output: Option<&str>, code: &str) -> Result<Option<PathBuf>, ObfuscateError> {
    let Some(output) = output else {
        println!("{code}");
        return Ok(None);
    };
    let path = output_path(output);
    fs::write(&path, code).map_err(|source| ObfuscateError::File {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_appends_js() {
        assert_eq!(output_path("out"), PathBuf::from("out.js"));
        assert_eq!(output_path("dir/out"), PathBuf::from("dir/out.js"));
        assert_eq!(output_path("out.mjs"), PathBuf::from("out.mjs"));
        assert_eq!(output_path("out.min.js"), PathBuf::from("out.min.js"));
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = read_input("/nonexistent/input.js").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.js"), "{err}");
    }

    #[test]
    fn options_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{"compact": false, "seed": 9}"#).unwrap();
        let options = read_options(path.to_str().unwrap(), &TransformOptions::default()).unwrap();
        assert!(!options.compact);
        assert_eq!(options.seed, 9);
        assert!(options.string_array);
    }
}
