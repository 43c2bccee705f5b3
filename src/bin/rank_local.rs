//! Rank local audio clips by acoustic similarity to the first one.
//!
//! Usage: rank_local <seed.mp3> <candidate.mp3> [<candidate.mp3>...]

use std::env;
use std::path::Path;
use std::process;

use soundalike::{rank, Config, FeatureExtractor};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: rank_local <seed audio> <candidate audio>...");
        process::exit(1);
    }

    let settings = Config::load().unwrap_or_default().resolve();
    let extractor = FeatureExtractor::new(settings.sample_rate, settings.memo_capacity);

    let seed = match extractor.extract(Path::new(&args[0])) {
        Ok(features) => features,
        Err(e) => {
            eprintln!("Failed to analyze {}: {}", args[0], e);
            process::exit(1);
        }
    };

    let mut candidates = Vec::new();
    for path in &args[1..] {
        match extractor.extract(Path::new(path)) {
            Ok(features) => candidates.push((path.clone(), features)),
            Err(e) => eprintln!("Skipping {}: {}", path, e),
        }
    }

    let count = candidates.len();
    println!("Similarity to {}:", args[0]);
    for entry in rank(&seed, &candidates, count) {
        println!("  {:+.4}  {}", entry.similarity, entry.track_id);
    }
}
