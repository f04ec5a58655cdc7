//! House price - command line entry point

use clap::Parser;
use house_price_ml::cli::{
    cmd_classify_image, cmd_info, cmd_predict, cmd_serve, cmd_train, Cli, Commands,
};
use house_price_ml::config::ForestParams;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "house_price_ml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            output,
            tracking_uri,
            experiment,
            local_tracking,
            n_estimators,
            max_depth,
            max_features,
            seed,
            run_name,
        } => {
            let forest = ForestParams {
                n_estimators,
                max_depth: Some(max_depth),
                max_features: Some(max_features),
                ..ForestParams::default()
            };
            cmd_train(data, output, tracking_uri, experiment, local_tracking, forest, seed, run_name)
                .await?;
        }
        Commands::Serve { model, host, port } => {
            cmd_serve(model, host, port).await?;
        }
        Commands::Predict { data, url, row } => {
            cmd_predict(data, url, row).await?;
        }
        Commands::ClassifyImage { url, image, output, timeout } => {
            cmd_classify_image(url, image, output, timeout).await?;
        }
        Commands::Info { data } => {
            cmd_info(data)?;
        }
    }

    Ok(())
}
