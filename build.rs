// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Boolean switch with a short and long name
fn switch(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("find-prereqs")
        .version(env!("CARGO_PKG_VERSION"))
        .author("find-prereqs Contributors")
        .about("List the installed packages that a set of prerequisites depends on")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .conflicts_with("simple")
                .help("Increase log verbosity (repeatable)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::Count)
                .help("Decrease log verbosity (repeatable)"),
        )
        .arg(switch("details", 'd', "List the packages that required each package").conflicts_with("simple"))
        .arg(switch("progress", '.', "Show a spinner while the package database loads"))
        .arg(
            Arg::new("color")
                .short('c')
                .long("color")
                .value_name("CODE")
                .num_args(0..=1)
                .default_missing_value("31;47")
                .help("Highlight missing packages with an ANSI color code"),
        )
        .arg(
            Arg::new("prereqs")
                .short('p')
                .long("prereqs")
                .value_name("FILE")
                .help("Read prerequisites from FILE, one per line ('-' for stdin)"),
        )
        .arg(switch("flat", 'f', "Only look up the prerequisites themselves").conflicts_with("levels"))
        .arg(switch("levels", 'l', "Print the depth of each package"))
        .arg(switch("simple", 's', "Print 'name, version' rows and no counts"))
        .arg(
            Arg::new("max_depth")
                .long("max-depth")
                .value_name("N")
                .help("Hide packages deeper than N"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the result as JSON"),
        )
        .arg(
            Arg::new("dump_db")
                .long("dump-db")
                .action(ArgAction::SetTrue)
                .help("Print the loaded package database and capability cache"),
        )
        .arg(Arg::new("config").long("config").value_name("FILE").help("Configuration file"))
        .arg(
            Arg::new("os_release")
                .long("os-release")
                .value_name("FILE")
                .default_value("/etc/os-release")
                .help("os-release file used to detect the distro"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("find-prereqs.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
