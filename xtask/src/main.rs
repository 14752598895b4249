use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "csv_parquet_lambda";
const LAMBDA_BINARY: &str = "convert_lambda";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the CSV-to-Parquet converter workspace",
    long_about = "Runs CI checks and packages the converter Lambda binary\n\
                  into a deployable bootstrap zip."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the converter Lambda binary and package it as a bootstrap zip
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Directory receiving the zip artifact
        #[arg(long, default_value = "dist")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Package the Lambda for the host target
    Package,
    /// Run check + package
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_converter_lambda(target: &str, profile: BuildProfile, out_dir: &Path) {
    ensure_rust_target_installed(target);

    step("Build converter lambda binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--target",
        target,
        "--bin",
        LAMBDA_BINARY,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(binary_name(LAMBDA_BINARY, target));
    fs::create_dir_all(out_dir).expect("failed to create lambda dist directory");

    let zip_path = out_dir.join(format!("{LAMBDA_BINARY}.zip"));
    write_bootstrap_zip(&binary_path, &zip_path);
    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

fn ensure_rust_target_installed(target: &str) {
    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); skipping target preflight"
            );
            return;
        }
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "rust target `{target}` is not installed. run `rustup target add {target}` and retry `cargo run -p xtask -- lambda-package`"
        );
    }
}

fn host_target() -> String {
    let output = Command::new("rustc")
        .arg("-vV")
        .output()
        .expect("failed to execute rustc");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.strip_prefix("host: "))
        .map(|host| host.trim().to_string())
        .expect("rustc -vV should report a host triple")
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

fn write_bootstrap_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path).unwrap_or_else(|error| {
        panic!(
            "failed to read lambda binary at '{}': {error}",
            binary_path.display()
        )
    });

    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test csv_parquet_core");
    run_cargo(&["test", "-p", "csv_parquet_core"]);

    step("Test csv_parquet_lambda");
    run_cargo(&["test", "-p", LAMBDA_PACKAGE]);
}

fn ci_package() {
    package_converter_lambda(&host_target(), BuildProfile::Debug, Path::new("target/ci-dist"));
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Package => ci_package(),
                CiJob::All => {
                    ci_check();
                    ci_package();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LambdaPackage {
            target,
            profile,
            out_dir,
        } => {
            package_converter_lambda(&target, profile, &out_dir);
        }
    }
}
