//! Developer tasks for the rust-mysqlx workspace.
//!
//! Run with `cargo xtask <command>`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

/// Crates published from this workspace, in dependency order.
const PUBLISHED: [&str; 4] = ["mysqlx-protocol", "mysqlx-types", "mysqlx-codec", "mysqlx-client"];

#[derive(Parser)]
#[command(name = "xtask", about = "Developer tasks for rust-mysqlx")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format check, clippy, tests and cargo-deny
    Ci,
    /// Run cargo fmt (--check unless --fix)
    Fmt {
        #[arg(long)]
        fix: bool,
    },
    /// Run clippy over every target and feature
    Clippy,
    /// Run tests
    Test {
        /// Restrict to one package
        #[arg(short, long)]
        package: Option<String>,
        /// Also run the #[ignore]d live server tests (reads MYSQLX_HOST and friends)
        #[arg(long)]
        live: bool,
    },
    /// Build the API documentation
    Doc {
        #[arg(long)]
        open: bool,
    },
    /// Run a fuzz target (cargo-fuzz on nightly)
    Fuzz {
        #[arg(default_value = "parse_frame")]
        target: String,
        /// Stop after this many seconds
        #[arg(long, default_value = "60")]
        max_time: u64,
        /// Print the available targets and exit
        #[arg(long)]
        list: bool,
    },
    /// Coverage report via cargo-llvm-cov (html, lcov or json)
    Coverage {
        #[arg(long, default_value = "html")]
        format: String,
    },
    /// Package the published crates
    Package,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            step("fmt", || fmt(&sh, false))?;
            step("clippy", || clippy(&sh))?;
            step("test", || test(&sh, None, false))?;
            step("deny", || Ok(cmd!(sh, "cargo deny check").run()?))?;
        }
        Command::Fmt { fix } => step("fmt", || fmt(&sh, fix))?,
        Command::Clippy => step("clippy", || clippy(&sh))?,
        Command::Test { package, live } => step("test", || test(&sh, package.as_deref(), live))?,
        Command::Doc { open } => step("doc", || doc(&sh, open))?,
        Command::Fuzz { target, max_time, list } => fuzz(&sh, &target, max_time, list)?,
        Command::Coverage { format } => step("coverage", || coverage(&sh, &format))?,
        Command::Package => step("package", || package(&sh))?,
    }
    Ok(())
}

fn step(name: &str, f: impl FnOnce() -> Result<()>) -> Result<()> {
    println!("==> {name}");
    f().with_context(|| format!("{name} failed"))?;
    println!("==> {name} ok");
    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;
    let manifest = String::from_utf8(output.stdout).context("cargo printed invalid UTF-8")?;
    PathBuf::from(manifest.trim())
        .parent()
        .map(PathBuf::from)
        .context("workspace manifest has no parent directory")
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    let check: &[&str] = if fix { &[] } else { &["--", "--check"] };
    cmd!(sh, "cargo fmt --all {check...}").run()?;
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-features --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>, live: bool) -> Result<()> {
    let mut args = vec!["test", "--all-features"];
    match package {
        Some(pkg) => args.extend(["-p", pkg]),
        None => args.push("--workspace"),
    }
    if live {
        args.extend(["--", "--include-ignored"]);
    }
    cmd!(sh, "cargo {args...}").run()?;
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    let open = open.then_some("--open");
    cmd!(sh, "cargo doc --workspace --all-features --no-deps {open...}").run()?;
    Ok(())
}

fn fuzz(sh: &Shell, target: &str, max_time: u64, list: bool) -> Result<()> {
    let targets_dir = sh.current_dir().join("fuzz/fuzz_targets");
    let mut targets = Vec::new();
    for entry in fs::read_dir(&targets_dir).with_context(|| format!("reading {}", targets_dir.display()))? {
        if let Some(stem) = entry?.path().file_stem() {
            targets.push(stem.to_string_lossy().into_owned());
        }
    }
    targets.sort();

    if list {
        for name in &targets {
            println!("{name}");
        }
        return Ok(());
    }
    if !targets.iter().any(|t| t == target) {
        bail!("unknown fuzz target {target}; available: {}", targets.join(", "));
    }

    let max_time = format!("-max_total_time={max_time}");
    let _dir = sh.push_dir("fuzz");
    cmd!(sh, "cargo +nightly fuzz run {target} -- {max_time}").run()?;
    Ok(())
}

fn coverage(sh: &Shell, format: &str) -> Result<()> {
    let output: &[&str] = match format {
        "html" => &["--html"],
        "lcov" => &["--lcov", "--output-path", "target/lcov.info"],
        "json" => &["--json", "--output-path", "target/coverage.json"],
        other => bail!("unknown coverage format {other}; use html, lcov or json"),
    };
    cmd!(sh, "cargo llvm-cov --workspace --all-features {output...}").run()?;
    Ok(())
}

fn package(sh: &Shell) -> Result<()> {
    for name in PUBLISHED {
        cmd!(sh, "cargo package -p {name} --allow-dirty").run()?;
    }
    Ok(())
}
