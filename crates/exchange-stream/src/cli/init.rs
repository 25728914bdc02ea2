/*
[INPUT]:  Output path for a new configuration file
[OUTPUT]: Generated YAML configuration template
[POS]:    CLI initialization layer
[UPDATE]: When StreamConfig schema changes
*/

use anyhow::{Context, Result, bail};
use std::path::Path;

use exchange_stream::StreamConfig;

const TEMPLATE_HEADER: &str = "\
# exchange-stream configuration
# Any key can be overridden from the environment, e.g.
#   EXCHANGE_STREAM__REST_URL=https://api.example.com
#   EXCHANGE_STREAM__MARKETS=BTC/USDC,ETH/USDC
#   EXCHANGE_STREAM__CONNECTION__PING_INTERVAL_SECS=15
";

pub fn run_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            output.display()
        );
    }

    let yaml = StreamConfig::default().to_yaml()?;
    std::fs::write(output, format!("{TEMPLATE_HEADER}{yaml}"))
        .with_context(|| format!("failed to write config to {}", output.display()))?;

    println!("Configuration written to: {}", output.display());
    println!("Edit markets/users, then run: exchange-stream --config {}", output.display());
    Ok(())
}
