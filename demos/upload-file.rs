#![deny(rust_2018_idioms)]

//! Upload a single local file to a tus-style endpoint, with `--resume` support and a
//! progress-printing observer.

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use tus_client::{
    ControlHandle, FileSource, MemoryStore, Upload, UploadObserver, UploadOptions, UploadParams,
    UploadSource, UreqTransport,
};

macro_rules! fatal {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        exit(2);
    }}
}

fn usage() {
    eprintln!(
        "usage: {} <source file path> <endpoint url> [--resume]",
        std::env::args().next().unwrap()
    );
}

struct Args {
    source_path: PathBuf,
    endpoint: String,
}

fn parse_args() -> Option<Args> {
    let mut a = std::env::args().skip(1);
    match (a.next(), a.next()) {
        (Some(ref arg), _) if arg == "--help" || arg == "-h" => None,
        (Some(src), Some(endpoint)) => Some(Args { source_path: PathBuf::from(src), endpoint }),
        (Some(_), None) => {
            eprintln!("missing endpoint url");
            None
        }
        (None, _) => None,
    }
}

fn human_number(n: u64) -> String {
    let mut f = n as f64;
    let prefixes = ['k', 'M', 'G', 'T', 'P', 'E'];
    let mut mag = 0;
    while mag < prefixes.len() {
        if f < 1000. {
            break;
        }
        f /= 1000.;
        mag += 1;
    }
    if mag == 0 {
        format!("{} ", n)
    } else {
        format!("{:.02} {}", f, prefixes[mag - 1])
    }
}

struct Progress {
    source_len: u64,
}

impl UploadObserver for Progress {
    fn on_start(&mut self, eta_s: Option<f64>, _control: &ControlHandle) {
        match eta_s {
            Some(eta) => eprintln!("starting upload of {}Bytes, eta {:.0}s", human_number(self.source_len), eta),
            None => eprintln!("starting upload of {}Bytes", human_number(self.source_len)),
        }
    }

    fn on_progress(&mut self, percent: f64, eta_s: Option<f64>, _control: &ControlHandle) {
        match eta_s {
            Some(eta) => eprintln!("{:.01}%, eta {:.0}s", percent, eta),
            None => eprintln!("{:.01}%", percent),
        }
    }

    fn on_complete(&mut self, _control: &ControlHandle) {
        eprintln!("upload complete.");
    }
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Some(args) => args,
        None => {
            usage();
            exit(1);
        }
    };

    let source = FileSource::open(args.source_path.to_string_lossy().as_ref())
        .unwrap_or_else(|e| fatal!("source file {:?} not found: {}", args.source_path, e));
    let source_len = source.length().unwrap_or_else(|e| fatal!("failed to stat source file: {}", e));

    let transport = UreqTransport::new();
    let store = Arc::new(MemoryStore::new());
    let options = UploadOptions { store: Some(store), ..Default::default() };
    let mut upload = Upload::new(source, transport, options);

    if upload.is_resumable().unwrap_or(false) {
        eprintln!("resuming previous upload of {:?}", args.source_path);
    }

    let mut observer = Progress { source_len };
    let retry_hook = |wait: Duration| {
        eprintln!("retrying in {:.1}s", wait.as_secs_f64());
        std::thread::sleep(wait);
    };
    let params = UploadParams { retry_hook: Some(&retry_hook), ..Default::default() };

    match upload.upload(&args.endpoint, &mut observer, params) {
        Ok(outcome) => println!("{outcome:?}"),
        Err(e) => fatal!("upload failed: {}", e),
    }
}
