use sanity_preview_bridge::infra::config::ClientConfig;
use sanity_preview_bridge::{ClientKind, ContentSource, NextSanity, QueryParams};

/// Cheap query every dataset can answer.
const PROBE_QUERY: &str = "count(*[_type == \"sanity.imageAsset\"])";

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--require-preview]\n\
         \n\
         Requires env vars:\n\
           SANITY_PROJECT_ID\n\
         Optional:\n\
           SANITY_DATASET, SANITY_API_VERSION, SANITY_API_TOKEN, SANITY_USE_CDN, SANITY_API_HOST\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let require_preview = args.iter().any(|a| a == "--require-preview");

    let config = ClientConfig::from_env()?;
    println!("> Preflight:");
    println!("  SANITY_PROJECT_ID={}", config.project_id());
    println!("  SANITY_DATASET={}", config.dataset());
    println!("  SANITY_API_VERSION={}", config.api_version());
    println!("  SANITY_USE_CDN={}", config.use_cdn());
    println!("  SANITY_API_TOKEN={}", if config.has_token() { "set" } else { "unset" });

    let sanity = NextSanity::setup(config)?;

    let mut kinds = vec![ClientKind::Anonymous];
    if sanity.has_preview() {
        kinds.push(ClientKind::Authenticated);
        kinds.push(ClientKind::Preview);
    } else if require_preview {
        return Err(anyhow::anyhow!(
            "SANITY_API_TOKEN is not set; preview mode cannot work"
        ));
    } else {
        eprintln!("  Warning: no API token, only the anonymous client was checked.");
    }

    for kind in kinds {
        let client = sanity.client(kind)?;
        let result = client
            .fetch(PROBE_QUERY, &QueryParams::new())
            .await
            .map_err(|e| anyhow::anyhow!("{} client query failed: {}", kind, e))?;
        println!("  {} client ok ({} image assets visible)", kind, result);
    }

    println!("> Preflight OK.");
    Ok(())
}
