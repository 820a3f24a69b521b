use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn jscloak() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jscloak"))
}

#[test]
fn obfuscates_stdin_to_stdout() -> anyhow::Result<()> {
    let mut child = jscloak()
        .args(["obfuscate", "-", "--seed", "4", "--string-array", "false"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .ok_or_else(|| anyhow::anyhow!("no stdin"))?
        .write_all(b"function add(first, second) { return first + second; }")?;
    let output = child.wait_with_output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("function add(_0x"), "{stdout}");
    assert!(!stdout.contains("first"), "{stdout}");
    Ok(())
}

#[test]
fn deobfuscates_file_to_file() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let input = tmp.path().join("min.js");
    fs::write(&input, "function a(b){if(b){return 1}return 2}")?;
    let output = tmp.path().join("pretty");

    let status = jscloak()
        .arg("deobfuscate")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .status()?;
    assert!(status.success());

    let code = fs::read_to_string(tmp.path().join("pretty.js"))?;
    assert!(code.contains("    if ("), "{code}");
    Ok(())
}

#[test]
fn defaults_round_trip_through_config() -> anyhow::Result<()> {
    let output = jscloak().arg("defaults").output()?;
    assert!(output.status.success());
    let defaults: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(defaults["compact"], true);
    assert_eq!(defaults["stringArrayThreshold"], 0.75);

    let tmp = TempDir::new()?;
    let config = tmp.path().join("options.json");
    fs::write(&config, &output.stdout)?;
    let input = tmp.path().join("in.js");
    fs::write(&input, "var greeting = 'hi';")?;
    let status = jscloak()
        .arg("obfuscate")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .stdout(Stdio::null())
        .status()?;
    assert!(status.success());
    Ok(())
}

#[test]
fn parse_errors_fail_the_command() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let input = tmp.path().join("bad.js");
    fs::write(&input, "var = ;")?;
    let output = jscloak().arg("obfuscate").arg(&input).output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Obfuscation failed"), "{stderr}");
    Ok(())
}
