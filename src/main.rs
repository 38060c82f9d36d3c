use std::process;
use std::sync::Arc;

use quaderno::{
    application::{
        error::AppError,
        indexer::{IndexBuilder, ReportOutcome, format_errors},
        stores::BlobStore,
    },
    cache::IndexStore,
    config::{self, Settings},
    infra::{blob::HttpBlobStore, github::GithubContentStore, local::LocalIndexFile, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Rebuild(config::RebuildArgs::default()));

    match command {
        config::Command::Rebuild(_) => run_rebuild(settings).await,
        config::Command::Validate(_) => run_validate(settings).await,
    }
}

async fn run_rebuild(settings: Settings) -> Result<(), AppError> {
    let (builder, index_store) = build_services(&settings)?;

    let index = builder.build().await?;
    info!(
        posts = index.total_count,
        tags = index.by_tag.len(),
        "index rebuilt from repository scan"
    );

    let saved = index_store.save(index).await?;
    info!(
        local_path = %settings.index.local_path.display(),
        blob = settings.blob.is_some(),
        posts = saved.total_count,
        "index persisted"
    );
    Ok(())
}

async fn run_validate(settings: Settings) -> Result<(), AppError> {
    let (builder, _) = build_services(&settings)?;

    let reports = builder.scan_reports().await?;
    let mut failed = 0usize;

    for report in &reports {
        match &report.outcome {
            ReportOutcome::Valid => info!(path = %report.path, "document is valid"),
            ReportOutcome::Recovered(errors) => {
                failed += 1;
                warn!(
                    path = %report.path,
                    errors = %format_errors(errors),
                    "document validates only with defaults"
                );
            }
            ReportOutcome::Unparseable(message) => {
                failed += 1;
                error!(path = %report.path, error = %message, "document is unparseable");
            }
            ReportOutcome::Unreadable(message) => {
                failed += 1;
                error!(path = %report.path, error = %message, "document is unreadable");
            }
        }
    }

    info!(
        total = reports.len(),
        valid = reports.len() - failed,
        failed,
        "validation sweep finished"
    );

    if failed > 0 {
        return Err(AppError::validation(format!(
            "{failed} of {} documents failed validation",
            reports.len()
        )));
    }
    Ok(())
}

fn build_services(settings: &Settings) -> Result<(IndexBuilder, IndexStore), AppError> {
    let store = Arc::new(GithubContentStore::new(&settings.content)?);

    let blob: Option<Arc<dyn BlobStore>> = match settings.blob.as_ref() {
        Some(blob_settings) => Some(Arc::new(HttpBlobStore::new(blob_settings)?)),
        None => None,
    };
    let local = LocalIndexFile::new(settings.index.local_path.clone());
    let index_store = IndexStore::new(blob, local, settings.index.key.clone());

    let builder = IndexBuilder::new(store, settings.index.default_category);
    Ok((builder, index_store))
}
