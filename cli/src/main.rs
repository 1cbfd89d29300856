mod commands;

use filebridge_core::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("Usage: filebridge <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  ls [path]                 List a directory");
    eprintln!("  cat <path>                Print a file");
    eprintln!("  put <file> [dir]          Upload a local file");
    eprintln!("  rm <path>                 Delete a file or directory");
    eprintln!("  mkdir <name> [parent]     Create a folder");
    eprintln!("  tree [path]               Recursive tree as JSON");
    eprintln!("  outline [path]            Indented text outline");
    eprintln!("  aggregate [path]          Every file with its content as JSON");
    eprintln!("  dump [path]               Every file with its content as Markdown");
    eprintln!("  probe                     Test remote connectivity");
    eprintln!("  exec <command>            Run a command on the remote server");
    eprintln!("  config                    Show the configuration");
    eprintln!("  set-config <json>         Apply a partial configuration update");
    eprintln!("  force-local <on|off>      Force the local folder outside development");
    eprintln!("  force-ssh <on|off>        Force the remote server in development");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --version   Print version and exit");
    eprintln!("  --help      Print this help message");
    eprintln!();
    eprintln!("Environment: FILEBRIDGE_ENV, SSH_HOST, SSH_PORT, SSH_USERNAME,");
    eprintln!("             SSH_PASSWORD, SSH_KEY_PATH, RUST_LOG");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--version" => {
            println!("filebridge {VERSION}");
            return Ok(());
        }
        "--help" => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    // Logs go to stderr so stdout only carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = match commands::parse(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            std::process::exit(1);
        }
    };
    debug!(?command, "Running command");

    let storage = Storage::from_env();
    let output = commands::run(&storage, command).await?;
    println!("{}", output.render()?);
    Ok(())
}
