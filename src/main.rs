use clap::error::ErrorKind;
use clap::Parser;

use gpudataperf::cli::Cli;
use gpudataperf::launcher;

fn main() {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version are successful exits; everything else is an
            // argument error.
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if args.command.is_empty() {
        eprintln!("error: no program specified to profile");
        std::process::exit(1);
    }

    // Only returns on error; on success the process image is replaced.
    if let Err(err) = launcher::launch(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
