//! Copy command - Copy SharePoint files into a blob container
//!
//! Provides the `sp2blob copy` CLI command which:
//! 1. Loads configuration and applies command-line overrides
//! 2. Authenticates the service principal for Graph and Storage
//! 3. Resolves the site and document library
//! 4. Runs the copy use case (or only lists with `--list-only`)
//! 5. Prints a summary and exits non-zero if anything failed

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use sp2blob_core::config::{Config, ConfigOverrides};
use sp2blob_core::domain::{
    CopyReport, ListFailure, ListingReport, RemoteFolderPath, RemoteItem, SyncEntry,
    TransferFailure,
};
use sp2blob_core::filter::compile_filter;
use sp2blob_core::ports::ContainerStatus;
use sp2blob_core::usecases::{CopyFilesUseCase, CopyObserver, CopyOptions, ListObserver};
use sp2blob_graph::auth::{ClientCredentialsConfig, ServicePrincipalAuth};
use sp2blob_graph::client::GraphClient;
use sp2blob_graph::provider::GraphDriveProvider;
use sp2blob_storage::blob::{AzureBlobSink, BlobClient};

use super::{CommandContext, EXIT_CONFIG};
use crate::output::{format_bytes, format_duration, get_formatter, plural, OutputFormatter};

/// Copy command with clap options
#[derive(Debug, Args)]
pub struct CopyCommand {
    /// Document library to read from (overrides SHAREPOINT_LIBRARY)
    #[arg(long)]
    pub library: Option<String>,

    /// File name filter such as "*.pdf" (overrides FILE_FILTER)
    #[arg(long)]
    pub filter: Option<String>,

    /// Folder inside the library to start from (overrides SHAREPOINT_FOLDER)
    #[arg(long)]
    pub folder: Option<String>,

    /// Target container (overrides CONTAINER_NAME)
    #[arg(long)]
    pub container: Option<String>,

    /// Virtual folder prepended to blob names (overrides BLOB_PREFIX)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Parallel listings and transfers, 1-32 (overrides MAX_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Only list matching files, copy nothing
    #[arg(long, conflicts_with = "delete_after_copy")]
    pub list_only: bool,

    /// Delete each source file once it was copied
    #[arg(long)]
    pub delete_after_copy: bool,
}

impl CopyCommand {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            library: self.library.clone(),
            folder: self.folder.clone(),
            filter: self.filter.clone(),
            container: self.container.clone(),
            blob_prefix: self.prefix.clone(),
            max_concurrency: self.concurrency,
            delete_after_copy: self.delete_after_copy.then_some(true),
            log_level: None,
        }
    }

    /// Execute the copy command
    pub async fn execute(&self, mut ctx: CommandContext) -> Result<ExitCode> {
        let formatter = get_formatter(ctx.is_json(), ctx.quiet);

        let mut config = ctx.take_config().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                ctx.config_path.display()
            )
        })?;
        config.apply_overrides(&self.overrides());

        let errors = config.validate();
        if !errors.is_empty() {
            formatter.error(&format!(
                "Configuration has {}:",
                plural(errors.len() as u64, "error")
            ));
            for error in &errors {
                formatter.error(&format!("  {error}"));
            }
            return Ok(ExitCode::from(EXIT_CONFIG));
        }

        let options = CopyOptions {
            root: RemoteFolderPath::parse(&config.sharepoint.folder),
            blob_prefix: config.storage.blob_prefix.clone(),
            list_only: self.list_only,
            delete_after_copy: config.transfer.delete_after_copy && !self.list_only,
            max_concurrency: config.transfer.max_concurrency,
            ..CopyOptions::default()
        };

        let span = info_span!("copy", run_id = %options.run_id);
        let report = self
            .run(&config, &options, formatter.as_ref())
            .instrument(span)
            .await?;

        print_report(&report, &options, ctx.is_json(), formatter.as_ref());

        Ok(if report.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    async fn run(
        &self,
        config: &Config,
        options: &CopyOptions,
        formatter: &dyn OutputFormatter,
    ) -> Result<CopyReport> {
        let matcher = compile_filter(&config.sharepoint.filter)?;

        // Step 1: Credentials shared by both adapters
        let auth = Arc::new(
            ServicePrincipalAuth::new(&ClientCredentialsConfig::from_config(&config.auth))
                .context("Failed to set up service principal authentication")?,
        );

        // Step 2: Resolve the library
        formatter.info(&format!(
            "Resolving library '{}' in {}",
            config.sharepoint.library, config.sharepoint.site_url
        ));
        let graph = Arc::new(GraphClient::with_base_url(
            auth.clone(),
            config.sharepoint.graph_base_url.clone(),
        ));
        let drive = GraphDriveProvider::connect(
            graph,
            &config.sharepoint.site_url,
            &config.sharepoint.library,
        )
        .await?;

        // Step 3: Destination
        let sink = AzureBlobSink::new(BlobClient::new(
            config.storage.endpoint_url(),
            config.storage.container.clone(),
            auth,
        ))
        .with_upload_threshold(config.transfer.upload_threshold_bytes())
        .with_chunk_size(config.transfer.chunk_size_bytes());

        // Step 4: Ctrl-C stops scheduling new work
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight work");
                interrupt.cancel();
            }
        });

        info!(
            folder = %options.root,
            filter = %matcher.pattern(),
            container = %config.storage.container,
            list_only = options.list_only,
            delete_after_copy = options.delete_after_copy,
            concurrency = options.max_concurrency,
            "Starting copy"
        );
        formatter.info(&format!(
            "Scanning '{}' for {}",
            options.root,
            matcher.pattern()
        ));

        let usecase = CopyFilesUseCase::new(Arc::new(drive), Arc::new(sink));
        let result = usecase
            .execute(options, &matcher, &TracingObserver, &cancel)
            .await;

        ctrl_c.abort();
        result
    }
}

// ============================================================================
// Progress reporting
// ============================================================================

/// Logs progress through `tracing`
struct TracingObserver;

impl ListObserver for TracingObserver {
    fn on_folder_listed(&self, path: &RemoteFolderPath, files: usize, folders: usize) {
        debug!(folder = %path, files, folders, "Listed folder");
    }

    fn on_entry_matched(&self, entry: &SyncEntry) {
        debug!(path = %entry.destination_path, size = entry.item.size_or_zero(), "Matched");
    }

    fn on_item_skipped(&self, path: &RemoteFolderPath, item: &RemoteItem) {
        debug!(folder = %path, name = %item.name, "Skipping item that is neither file nor folder");
    }

    fn on_list_failure(&self, failure: &ListFailure) {
        warn!(folder = %failure.path, cause = %failure.cause, "Could not list folder");
    }
}

impl CopyObserver for TracingObserver {
    fn on_container_ready(&self, status: ContainerStatus) {
        match status {
            ContainerStatus::Created => info!("Created target container"),
            ContainerStatus::AlreadyExists => debug!("Target container already exists"),
        }
    }

    fn on_listing_complete(&self, listing: &ListingReport) {
        info!(
            matched = listing.entries.len(),
            bytes = listing.total_bytes(),
            folders = listing.folders_scanned,
            failures = listing.failures.len(),
            "Listing complete"
        );
    }

    fn on_copied(&self, entry: &SyncEntry, blob_name: &str, bytes: u64) {
        info!(path = %entry.destination_path, blob = blob_name, bytes, "Copied");
    }

    fn on_source_deleted(&self, entry: &SyncEntry) {
        info!(path = %entry.destination_path, "Deleted source");
    }

    fn on_transfer_failure(&self, failure: &TransferFailure) {
        warn!(path = %failure.destination_path, cause = %failure.cause, "Copy failed");
    }
}

// ============================================================================
// Summary
// ============================================================================

fn report_json(report: &CopyReport, options: &CopyOptions) -> serde_json::Value {
    let errors: Vec<serde_json::Value> = report
        .list_failures
        .iter()
        .map(|f| serde_json::json!({ "path": f.path, "kind": "list", "error": f.cause }))
        .chain(report.transfer_failures.iter().map(|f| {
            serde_json::json!({ "path": f.destination_path, "kind": "transfer", "error": f.cause })
        }))
        .collect();

    let mut json = serde_json::json!({
        "run_id": report.run_id.to_string(),
        "success": report.is_success(),
        "list_only": report.list_only,
        "cancelled": report.cancelled,
        "matched": report.matched,
        "copied": report.copied,
        "bytes_copied": report.bytes_copied,
        "deleted": report.deleted,
        "skipped": report.skipped,
        "duration_ms": report.duration_ms(),
        "errors": errors,
    });

    if report.list_only {
        json["files"] = report
            .entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "path": e.destination_path,
                    "blob": e.blob_name(&options.blob_prefix),
                    "size": e.item.size,
                })
            })
            .collect();
    }
    json
}

fn print_report(
    report: &CopyReport,
    options: &CopyOptions,
    json: bool,
    formatter: &dyn OutputFormatter,
) {
    if json {
        formatter.print_json(&report_json(report, options));
        return;
    }

    let duration = format_duration(report.duration_ms());
    if report.list_only {
        for entry in &report.entries {
            formatter.info(&format!(
                "{}  ({})",
                entry.destination_path,
                format_bytes(entry.item.size_or_zero())
            ));
        }
        let total: u64 = report.entries.iter().map(|e| e.item.size_or_zero()).sum();
        formatter.success(&format!(
            "Found {} matching ({}) in {}",
            plural(report.matched, "file"),
            format_bytes(total),
            duration
        ));
    } else if report.matched == 0 && report.error_count() == 0 {
        formatter.success("No matching files");
    } else {
        formatter.success(&format!(
            "Copied {} of {} ({}) in {}",
            report.copied,
            plural(report.matched, "matching file"),
            format_bytes(report.bytes_copied),
            duration
        ));
        if report.deleted > 0 {
            formatter.info(&format!("Deleted {} at the source", plural(report.deleted, "file")));
        }
    }

    if report.cancelled {
        formatter.warn(&format!(
            "Run was cancelled; {} not attempted",
            plural(report.skipped, "file")
        ));
    }

    if report.error_count() > 0 {
        formatter.error(&format!(
            "{} occurred:",
            plural(report.error_count() as u64, "error")
        ));
        for failure in &report.list_failures {
            formatter.error(&format!("  folder {}: {}", failure.path, failure.cause));
        }
        for failure in &report.transfer_failures {
            formatter.error(&format!(
                "  {}: {}",
                failure.destination_path, failure.cause
            ));
        }
    }
}
