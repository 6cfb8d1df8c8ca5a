//! Launcher: capture environment setup and process replacement
//!
//! The launcher resolves the capture adapter library next to its own
//! executable, injects it via `LD_PRELOAD`, propagates the verbosity
//! contract, and replaces itself with the target program. On a successful
//! exec nothing after it runs; the report is printed by the engine inside
//! the target process at teardown.

use std::env;
use std::ffi::CString;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use nix::unistd::execvp;

use crate::cli::Cli;
use crate::engine::{ENV_QUIET, ENV_VERBOSE_INIT};

/// Capture adapter shared library, expected next to the launcher binary.
pub const CAPTURE_LIBRARY: &str = "libgpudataperf.so";

/// Resolve the capture library path from the launcher's own location.
pub fn capture_library_path() -> Result<PathBuf> {
    let exe = env::current_exe().context("failed to resolve launcher executable path")?;
    let exe = exe
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {}", exe.display()))?;
    let dir = exe
        .parent()
        .context("launcher executable has no parent directory")?;
    Ok(dir.join(CAPTURE_LIBRARY))
}

/// Append the capture library to an existing `LD_PRELOAD` value.
pub fn compose_ld_preload(existing: Option<&str>, library: &str) -> String {
    match existing {
        None | Some("") => library.to_string(),
        Some(prior) => format!("{prior}:{library}"),
    }
}

fn print_env(name: &str) {
    match env::var(name) {
        Ok(value) => eprintln!("info: {name}={value}"),
        Err(_) => eprintln!("info: {name} not set"),
    }
}

/// Set up the capture environment and exec the target program. Only returns
/// on error.
pub fn launch(args: &Cli) -> Result<()> {
    let program = args
        .command
        .first()
        .context("no program specified to profile")?;

    let library = capture_library_path()?;
    let preload = compose_ld_preload(
        env::var("LD_PRELOAD").ok().as_deref(),
        &library.to_string_lossy(),
    );
    env::set_var("LD_PRELOAD", &preload);

    // An explicitly configured verbosity wins over our flags.
    if env::var_os(ENV_VERBOSE_INIT).is_none() {
        env::set_var(ENV_VERBOSE_INIT, if args.verbose { "stderr" } else { "disabled" });
    }
    if args.quiet {
        env::set_var(ENV_QUIET, "1");
    }

    if args.verbose {
        print_env("LD_PRELOAD");
        print_env(ENV_VERBOSE_INIT);
        print_env(ENV_QUIET);
        eprintln!("info: profiling '{}'", args.command.join(" "));
    }

    let c_program =
        CString::new(program.as_str()).context("program path contains a NUL byte")?;
    let c_args: Vec<CString> = args
        .command
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<_, _>>()
        .context("program argument contains a NUL byte")?;

    match execvp(&c_program, &c_args) {
        Ok(infallible) => match infallible {},
        Err(errno) => bail!("failed to execute program. {errno}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_ld_preload_empty() {
        assert_eq!(compose_ld_preload(None, "/opt/lib.so"), "/opt/lib.so");
        assert_eq!(compose_ld_preload(Some(""), "/opt/lib.so"), "/opt/lib.so");
    }

    #[test]
    fn test_compose_ld_preload_appends() {
        assert_eq!(
            compose_ld_preload(Some("/existing.so"), "/opt/lib.so"),
            "/existing.so:/opt/lib.so"
        );
    }

    #[test]
    fn test_capture_library_path_is_sibling_of_exe() {
        let path = capture_library_path().unwrap();
        assert_eq!(path.file_name().unwrap(), CAPTURE_LIBRARY);
        assert!(path.parent().is_some());
    }

    #[test]
    fn test_launch_requires_program() {
        let args = Cli {
            verbose: false,
            quiet: false,
            command: vec![],
        };
        let err = launch(&args).unwrap_err();
        assert!(err.to_string().contains("no program specified"));
    }
}
