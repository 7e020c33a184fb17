//! `rangedl get`: download one object to a file.

use anyhow::{bail, Context, Result};
use rangedl_core::checksum;
use rangedl_core::config::RangedlConfig;
use rangedl_core::control::CancelToken;
use rangedl_core::downloader::{DownloadInput, DownloadOptions, DownloadProgress, Downloader, GetObjectType};
use rangedl_core::fetch::HttpFetcher;
use rangedl_core::storage::{temp_path, StorageWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::cli::GetArgs;

const PROGRESS_INTERVAL_MS: u64 = 500;
const DEFAULT_FILENAME: &str = "download.bin";

pub async fn run_get(cfg: &RangedlConfig, args: GetArgs) -> Result<()> {
    let mut options = cfg.download_options();
    apply_overrides(&mut options, &args);
    let input = build_input(&args)?;
    let final_path = match &args.output {
        Some(p) => p.clone(),
        None => PathBuf::from(filename_from_url(&args.url)),
    };

    let writer = StorageWriter::create(&temp_path(&final_path))?;
    let cancel = CancelToken::new();

    let ctrl_c_token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling download");
            ctrl_c_token.cancel();
        }
    });

    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<DownloadProgress>(16);
    let progress_handle = tokio::spawn(print_progress(progress_rx));

    let downloader = Downloader::new(Arc::new(HttpFetcher::default()), options).with_progress(progress_tx);
    let started = Instant::now();
    // The engine blocks on worker threads; keep it off the async runtime.
    let (result, writer) = tokio::task::spawn_blocking(move || {
        let result = downloader.download(&input, &writer, &cancel);
        (result, writer)
    })
    .await?;
    ctrl_c.abort();
    let _ = progress_handle.await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if let Err(discard_err) = writer.discard() {
                tracing::warn!("could not remove temp file: {:#}", discard_err);
            }
            return Err(e).with_context(|| format!("download of {} failed", args.url));
        }
    };
    writer.sync()?;
    writer.finalize(&final_path)?;

    if let Some(expected) = &args.sha256 {
        checksum::verify_sha256(&final_path, expected)?;
    }

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(path = %final_path.display(), bytes = output.content_length, elapsed_secs = elapsed, "saved");
    if args.json {
        let report = serde_json::json!({
            "path": final_path.display().to_string(),
            "elapsed_secs": elapsed,
            "output": output,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "saved {} bytes to {} ({})",
            output.content_length,
            final_path.display(),
            output.content_range.as_deref().unwrap_or("whole object")
        );
    }
    Ok(())
}

/// CLI flags win over config.toml.
fn apply_overrides(options: &mut DownloadOptions, args: &GetArgs) {
    if let Some(size) = args.part_size {
        options.part_size_bytes = size;
    }
    if let Some(n) = args.concurrency {
        options.concurrency = n;
    }
    if let Some(n) = args.retries {
        options.part_body_max_retries = n;
    }
    if args.by_part {
        options.get_object_type = GetObjectType::Parts;
    }
    if args.no_consistency {
        options.enforce_consistency = false;
    }
}

fn build_input(args: &GetArgs) -> Result<DownloadInput> {
    let mut input = DownloadInput::new(args.url.as_str());
    input.params.range = args.range.clone();
    input.params.part_number = args.part_number;
    input.params.version_id = args.version_id.clone();
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        input.params.headers.insert(name, value);
    }
    Ok(input)
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must look like 'Name: value', got {:?}", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("header name is empty in {:?}", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Last non-empty path segment of the URL, without query or fragment.
fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    match path.split_once('/') {
        Some((_, p)) => p
            .rsplit('/')
            .find(|s| !s.is_empty() && *s != "." && *s != "..")
            .unwrap_or(DEFAULT_FILENAME)
            .to_string(),
        None => DEFAULT_FILENAME.to_string(),
    }
}

async fn print_progress(mut rx: tokio::sync::mpsc::Receiver<DownloadProgress>) {
    let started = Instant::now();
    let mut last_print: Option<Instant> = None;
    let mut printed = false;
    while let Some(p) = rx.recv().await {
        let now = Instant::now();
        let done = p.total.is_some_and(|t| p.written >= t);
        let due = last_print.map_or(true, |t| {
            now.duration_since(t).as_millis() as u64 >= PROGRESS_INTERVAL_MS
        });
        if !due && !done {
            continue;
        }
        let done_mib = p.written as f64 / 1_048_576.0;
        let secs = started.elapsed().as_secs_f64();
        let rate_mib = if secs > 0.0 { done_mib / secs } else { 0.0 };
        match p.total {
            Some(total) if total > 0 => {
                let pct = p.written as f64 / total as f64 * 100.0;
                eprint!(
                    "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ",
                    done_mib,
                    total as f64 / 1_048_576.0,
                    pct,
                    rate_mib
                );
            }
            _ => eprint!("\r  {:.1} MiB  {:.2} MiB/s  ", done_mib, rate_mib),
        }
        printed = true;
        last_print = Some(now);
    }
    if printed {
        eprintln!();
    }
}
