//! Rewind CLI

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use rewind::cassette::format::TIMESTAMP_FORMAT;
use rewind::cassette::{CassetteData, Interaction};
use rewind::serializers::{Serializer, SerializerRegistry};
use rewind::RewindError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Rewind v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: rewind <command> <cassette-file>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  inspect   List the interactions in a cassette");
        eprintln!("  verify    Check every interaction can be replayed");
        process::exit(1);
    }

    let command = &args[1];
    let path = PathBuf::from(&args[2]);

    let result = match command.as_str() {
        "inspect" => inspect(&path),
        "verify" => verify(&path),
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'rewind' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

/// Backend whose extension matches the file
fn serializer_for(path: &Path) -> Result<Arc<dyn Serializer>, RewindError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let name = match extension {
        "bincode" => "binary",
        "json" => "json",
        other => return Err(RewindError::UnknownSerializer(format!(".{other} files"))),
    };

    SerializerRegistry::default().get(name)
}

fn read(path: &Path) -> Result<CassetteData, RewindError> {
    if !path.exists() {
        return Err(RewindError::CassetteNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    serializer_for(path)?.deserialize(&bytes)
}

fn inspect(path: &Path) -> Result<(), RewindError> {
    let data = read(path)?;

    println!("Cassette: {}", path.display());
    println!("Recorded with: {}", data.recorded_with);
    println!("Interactions: {}", data.http_interactions.len());
    println!();

    for (index, interaction) in data.http_interactions.iter().enumerate() {
        println!(
            "{:>4}  {}  {:<7} {}  -> {} {}",
            index,
            interaction.recorded_at.format(TIMESTAMP_FORMAT),
            interaction.request.method,
            interaction.request.uri,
            interaction.response.status.code,
            interaction.response.status.message
        );
    }

    Ok(())
}

fn verify(path: &Path) -> Result<(), RewindError> {
    let data = read(path)?;
    let total = data.http_interactions.len();
    let mut failures = 0;

    for (index, data) in data.http_interactions.into_iter().enumerate() {
        if let Err(e) = Interaction::new(data).as_response() {
            error!("Interaction {} cannot be replayed: {}", index, e);
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(RewindError::InvalidFormat(format!(
            "{failures} of {total} interactions failed to replay"
        )));
    }

    info!("All {} interactions in {} replay cleanly", total, path.display());
    Ok(())
}
