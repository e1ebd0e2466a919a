use std::path::PathBuf;

use clap::{crate_description, crate_name, crate_version};
use clap::{Arg, ArgAction, Command};

pub struct Args {
    pub file: PathBuf,
    pub decode_instance_fields: bool,
}

fn command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("file")
                .help("binary hprof input file")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("fields")
                .help("decode instance field values against observed class dumps")
                .long("fields")
                .action(ArgAction::SetTrue),
        )
}

pub fn get_args() -> Args {
    let matches = command().get_matches();
    Args {
        file: matches
            .get_one::<PathBuf>("file")
            .expect("required argument")
            .clone(),
        decode_instance_fields: matches.get_flag("fields"),
    }
}
