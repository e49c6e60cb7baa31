//! Renders roff man pages for `mysmartbike` and every visible subcommand
//! into `$OUT_DIR/man`, so packaging can pick them up.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

// cli.rs only touches clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        return Err(io::Error::other("OUT_DIR is not set"));
    };
    let man_dir = PathBuf::from(out_dir).join("man");
    std::fs::create_dir_all(&man_dir)?;

    // Walk the command tree; subcommand pages are named
    // `mysmartbike-bikes-list.1` and so on.
    let mut pending = vec![cli::Cli::command()];
    while let Some(cmd) = pending.pop() {
        let name = cmd.get_name().to_owned();
        for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
            pending.push(sub.clone().name(format!("{name}-{}", sub.get_name())));
        }
        write_page(cmd, &man_dir.join(format!("{name}.1")))?;
    }
    Ok(())
}

fn write_page(cmd: clap::Command, path: &Path) -> io::Result<()> {
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buf)?;
    std::fs::write(path, buf)
}
