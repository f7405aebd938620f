use anyhow::Result;
use buzzdata::Client;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [dataset, filename, release_notes] = args.as_slice() else {
        println!("Usage: upload_data dataset filename 'Change notes...'");
        println!(
            "Example: upload_data eviltrout/kittens-born-by-month kittens_born.csv 'Added more kittens'"
        );
        return Ok(());
    };

    // Authentication comes from BUZZDATA_API_KEY or ~/.buzzdata.
    let client = Client::from_env()?.with_progress(true);

    print!("Uploading {}...", filename);
    std::io::stdout().flush()?;
    client.upload(dataset, Path::new(filename), Some(release_notes.as_str()))?;
    println!("Done!");
    Ok(())
}
