use std::io;
use std::io::stdout;
use std::path::PathBuf;

use clap::Parser;
use commit_log::dump_writer;
use commit_log::Config;
use commit_log::Dump;

#[derive(Clone, Debug, PartialEq, Eq, clap::Parser)]
#[clap(about = "dump the store files of a CommitLog directory", author)]
pub struct Args {
    #[arg(value_name = "PATH")]
    path: PathBuf,
}

fn main() -> Result<(), io::Error> {
    let args = Args::parse();

    let config = Config::new(args.path.to_string_lossy());

    let dump = Dump::new(config.into());
    dump.write_with(stdout().lock(), dump_writer::multiline_string)?;

    Ok(())
}
