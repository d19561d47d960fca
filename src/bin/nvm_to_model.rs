use clap::Parser;
use nvm_to_model::pipeline::{SliceConfig, convert_slice};

/// Convert slice<N>.nvm into a COLMAP text model using slice<N>.db.
#[derive(Parser)]
#[command(version, about)]
struct NvmToModelCli {
    /// slice number, selects slice<N>.nvm and slice<N>.db in the working directory
    #[arg(long)]
    slice: String,

    /// directory receiving cameras.txt, images.txt and points3D.txt
    #[arg(long = "output_dir")]
    output_dir: String,
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = NvmToModelCli::parse();
    let config = SliceConfig::new(&cli.slice, &cli.output_dir);
    let summary = convert_slice(&config)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
