mod args;

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use hprof_stream::handlers::counter::RecordCounter;
use hprof_stream::utils::human_bytes;
use hprof_stream::{HprofError, HprofReader};

use crate::args::{get_args, Args};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = get_args();
    match run(&args) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("hprof-stream: {e}");
            exit_code(&e)
        }
    }
}

fn run(args: &Args) -> Result<String, HprofError> {
    let file = File::open(&args.file)?;
    let file_len = file.metadata()?.len();
    println!(
        "Decoding {} of hprof data from {}",
        human_bytes(file_len),
        args.file.display()
    );

    let pb = ProgressBar::new(file_len);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
        )
        .expect("progress template is valid")
        .progress_chars("#>-"),
    );

    let reader = BufReader::new(pb.wrap_read(file));
    let counter = HprofReader::new(reader, RecordCounter::new())
        .decode_instance_fields(args.decode_instance_fields)
        .run();
    pb.finish_and_clear();
    Ok(counter?.summary())
}

fn exit_code(e: &HprofError) -> ExitCode {
    match e {
        HprofError::TruncatedStream { .. } => ExitCode::from(2),
        HprofError::Format { .. } => ExitCode::from(3),
        HprofError::HandlerAbort { .. } => ExitCode::from(4),
        _ => ExitCode::FAILURE,
    }
}
