mod color;
mod config;
mod data;
mod forest;
mod metrics;
mod pipeline;
mod plot;

use config::PipelineConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = PipelineConfig::default();
    match serde_json::to_string(&config) {
        Ok(json) => log::info!("configuration: {json}"),
        Err(e) => log::warn!("could not serialise configuration: {e}"),
    }

    let summary = pipeline::run(&config)?;
    log::info!(
        "done: train {:.1}%, test {:.1}%, wrote {} files",
        summary.scores.train * 100.0,
        summary.scores.test * 100.0,
        summary.outputs.len()
    );
    Ok(())
}
