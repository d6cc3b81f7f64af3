use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{cmd, Shell};

const APP_PACKAGE: &str = "app-cycler";

#[derive(Parser)]
#[command(name = "cargo-xtask", version, about = "Project automation tasks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format Rust sources
    Fmt,
    /// Run format check and clippy for the core and the Tauri shell
    Check,
    /// Run the workspace tests
    Test,
    /// Build the Android bundle through the Tauri CLI
    Package,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_root = project_root()?;
    let shell = Shell::new()?;
    let _dir = shell.push_dir(project_root);

    match cli.command {
        Command::Fmt => run_fmt(&shell),
        Command::Check => run_check(&shell),
        Command::Test => run_test(&shell),
        Command::Package => run_package(&shell),
    }
}

fn run_fmt(shell: &Shell) -> Result<()> {
    cmd!(shell, "cargo fmt --all")
        .run()
        .context("failed to run cargo fmt")?;
    Ok(())
}

fn run_check(shell: &Shell) -> Result<()> {
    cmd!(shell, "cargo fmt --all -- --check")
        .run()
        .context("cargo fmt --check failed")?;
    cmd!(
        shell,
        "cargo clippy --workspace --all-targets -- -D warnings"
    )
    .run()
    .context("cargo clippy failed")?;
    cmd!(
        shell,
        "cargo clippy -p {APP_PACKAGE} --all-targets --features shell -- -D warnings"
    )
    .run()
    .context("cargo clippy (shell) failed")?;
    Ok(())
}

fn run_test(shell: &Shell) -> Result<()> {
    cmd!(shell, "cargo test --workspace")
        .run()
        .context("cargo test failed")?;
    Ok(())
}

fn run_package(shell: &Shell) -> Result<()> {
    let _dir = shell.push_dir("src-tauri");
    cmd!(shell, "cargo tauri android build --features shell")
        .run()
        .context("tauri android build failed")?;
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|dir| dir.to_path_buf())
        .context("xtask must live inside the workspace")
}
