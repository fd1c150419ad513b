use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use prodlens_contracts::analysis::{ProductAnalysis, SUPPORTED_IMAGE_EXTENSIONS};
use prodlens_contracts::events::{EventPayload, EventWriter};
use prodlens_contracts::runs::outcome::{BatchItemOutcome, ErrorKind, SummaryRow};
use prodlens_contracts::runs::summary::{write_summary_report, SUMMARY_REPORT_FILE};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::codec::read_image_asset;
use crate::error::error_chain_text;
use crate::service::AnalysisService;

pub const DEFAULT_WORKERS: usize = 5;
const ERROR_TEXT_LIMIT: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Concurrency ceiling. Zero is treated as one.
    pub workers: usize,
    pub category: Option<String>,
    pub events_path: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            category: None,
            events_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: String,
    /// One entry per discovered image, in completion order.
    pub outcomes: Vec<BatchItemOutcome>,
    pub summary_path: PathBuf,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.analysis().is_some())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.outcomes.iter().map(SummaryRow::from_outcome).collect()
    }
}

/// What a worker hands back for one image.
struct ItemReport {
    outcome: BatchItemOutcome,
    missing_fields: Vec<String>,
    elapsed: Duration,
}

/// Recursively lists supported images under `root`, sorted by path.
/// Unreadable directory entries are skipped with a warning.
pub fn discover_images(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("input directory not found: {}", root.display());
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);
        if supported {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

pub fn artifact_path(output_dir: &Path, image: &Path) -> PathBuf {
    output_dir.join(format!("{}.json", image_stem(image)))
}

fn image_stem(image: &Path) -> String {
    image
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string())
}

/// Assigns every image its own artifact path before dispatch. The first image
/// (in the given order) with a stem keeps `<stem>.json`; later images sharing
/// that stem get `<stem>_2.json`, `<stem>_3.json` and so on, skipping names
/// another image already owns.
pub fn plan_artifact_paths(images: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let natural: Vec<PathBuf> = images
        .iter()
        .map(|image| artifact_path(output_dir, image))
        .collect();
    let reserved: HashSet<&PathBuf> = natural.iter().collect();
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut planned = Vec::with_capacity(images.len());
    for (image, path) in images.iter().zip(&natural) {
        if taken.insert(path.clone()) {
            planned.push(path.clone());
            continue;
        }
        let stem = image_stem(image);
        let mut suffix = 2usize;
        let renamed = loop {
            let candidate = output_dir.join(format!("{stem}_{suffix}.json"));
            if !reserved.contains(&candidate) && !taken.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        warn!(
            image = %image.display(),
            artifact = %renamed.display(),
            "artifact name already taken by another image; using a suffixed name"
        );
        taken.insert(renamed.clone());
        planned.push(renamed);
    }
    planned
}

/// Pretty JSON written to a uniquely named sibling and renamed into place, so
/// a failed write leaves no artifact behind.
fn write_artifact(path: &Path, analysis: &ProductAnalysis) -> anyhow::Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp_name);
    let body = serde_json::to_string_pretty(analysis)?;
    let written = fs::write(&tmp, body)
        .with_context(|| format!("failed to write {}", tmp.display()))
        .and_then(|_| {
            fs::rename(&tmp, path)
                .with_context(|| format!("failed to move artifact into {}", path.display()))
        });
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Runs structured analysis over a directory tree with a bounded pool of
/// worker threads. Per-image failures become error outcomes; only setup
/// and summary I/O can fail the whole run.
pub struct BatchProcessor {
    service: Arc<AnalysisService>,
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(service: Arc<AnalysisService>, config: BatchConfig) -> Self {
        Self { service, config }
    }

    pub fn process_directory(
        &self,
        root: &Path,
        output_dir: &Path,
    ) -> anyhow::Result<BatchReport> {
        let images = discover_images(root)?;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        let artifacts = plan_artifact_paths(&images, output_dir);

        let batch_id = Uuid::new_v4().to_string();
        let events = self
            .config
            .events_path
            .as_ref()
            .map(|path| EventWriter::new(path.clone(), batch_id.clone()));
        let workers = self.config.workers.max(1).min(images.len().max(1));
        info!(
            batch_id = %batch_id,
            root = %root.display(),
            discovered = images.len(),
            workers,
            provider = self.service.provider_name(),
            "batch started"
        );
        emit(
            events.as_ref(),
            "batch_started",
            json!({
                "root": root.to_string_lossy(),
                "output_dir": output_dir.to_string_lossy(),
                "discovered": images.len(),
                "workers": workers,
            }),
        );

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<ItemReport>();
        let mut outcomes = Vec::with_capacity(images.len());
        thread::scope(|scope| {
            let worker_loop = |tx: mpsc::Sender<ItemReport>| loop {
                let idx = next.fetch_add(1, Ordering::SeqCst);
                let (Some(image), Some(artifact)) = (images.get(idx), artifacts.get(idx)) else {
                    break;
                };
                let report = self.process_guarded(image, artifact);
                if tx.send(report).is_err() {
                    break;
                }
            };

            let mut spawned = 0usize;
            for worker_idx in 0..workers {
                let tx = tx.clone();
                let spawn = thread::Builder::new()
                    .name(format!("prodlens-worker-{worker_idx}"))
                    .spawn_scoped(scope, move || worker_loop(tx));
                match spawn {
                    Ok(_) => spawned += 1,
                    Err(err) => warn!(error = %err, "worker thread spawn failed"),
                }
            }
            if spawned == 0 {
                warn!("no worker threads available; processing on the calling thread");
                worker_loop(tx.clone());
            }
            drop(tx);

            for report in rx {
                self.record_item(events.as_ref(), &report);
                outcomes.push(report.outcome);
            }
        });

        let report = BatchReport {
            batch_id,
            outcomes,
            summary_path: output_dir.join(SUMMARY_REPORT_FILE),
        };
        write_summary_report(&report.summary_path, &report.summary_rows())?;
        info!(
            batch_id = %report.batch_id,
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            summary = %report.summary_path.display(),
            "batch finished"
        );
        emit(
            events.as_ref(),
            "batch_finished",
            json!({
                "total": report.total(),
                "succeeded": report.succeeded(),
                "failed": report.failed(),
                "summary_path": report.summary_path.to_string_lossy(),
            }),
        );
        Ok(report)
    }

    fn process_guarded(&self, image: &Path, artifact: &Path) -> ItemReport {
        let started = Instant::now();
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.process_single_image(image, artifact)
        })) {
            Ok(report) => report,
            Err(payload) => ItemReport {
                outcome: BatchItemOutcome::error(
                    image.to_path_buf(),
                    ErrorKind::WorkerPanic,
                    panic_message(payload.as_ref()),
                ),
                missing_fields: Vec::new(),
                elapsed: started.elapsed(),
            },
        }
    }

    /// Full pipeline for one image. Never returns an error: every failure is
    /// folded into the outcome.
    fn process_single_image(&self, image: &Path, artifact: &Path) -> ItemReport {
        let started = Instant::now();
        debug!(image = %image.display(), "processing image");
        let analyzed = read_image_asset(image).and_then(|asset| {
            self.service
                .analyze_product_detailed(&asset, self.config.category.as_deref())
        });
        let normalized = match analyzed {
            Ok(normalized) => normalized,
            Err(err) => {
                return ItemReport {
                    outcome: BatchItemOutcome::error(
                        image.to_path_buf(),
                        err.kind(),
                        error_chain_text(&err, ERROR_TEXT_LIMIT),
                    ),
                    missing_fields: Vec::new(),
                    elapsed: started.elapsed(),
                };
            }
        };

        let outcome = match write_artifact(artifact, &normalized.value) {
            Ok(()) => BatchItemOutcome::success(
                image.to_path_buf(),
                normalized.value,
                artifact.to_path_buf(),
            ),
            Err(err) => BatchItemOutcome::error(
                image.to_path_buf(),
                ErrorKind::ArtifactWrite,
                error_chain_text(err.as_ref(), ERROR_TEXT_LIMIT),
            ),
        };
        ItemReport {
            outcome,
            missing_fields: normalized.missing,
            elapsed: started.elapsed(),
        }
    }

    fn record_item(&self, events: Option<&EventWriter>, report: &ItemReport) {
        let outcome = &report.outcome;
        match outcome.error_message() {
            None => debug!(image = %outcome.image().display(), "image analyzed"),
            Some(message) => warn!(
                image = %outcome.image().display(),
                kind = ?outcome.error_kind(),
                error = message,
                "image failed"
            ),
        }
        let mut payload = json!({
            "image": outcome.image().to_string_lossy(),
            "status": outcome.status().as_str(),
            "missing_fields": report.missing_fields,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        });
        if let Some(artifact) = outcome.artifact() {
            payload["artifact"] = json!(artifact.to_string_lossy());
        }
        if let Some(kind) = outcome.error_kind() {
            payload["error_kind"] = json!(kind.as_str());
            payload["error"] = json!(outcome.error_message().unwrap_or_default());
        }
        emit(events, "item_finished", payload);
    }
}

/// Journal writes are best effort; a failing events file never fails a run.
fn emit(events: Option<&EventWriter>, event_type: &str, payload: Value) {
    let Some(events) = events else {
        return;
    };
    let payload = match payload {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    };
    if let Err(err) = events.emit(event_type, payload) {
        warn!(
            event = event_type,
            path = %events.path().display(),
            error = %err,
            "failed to append batch event"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use prodlens_contracts::runs::outcome::{ErrorKind, ItemStatus};
    use serde_json::Value;

    use super::{artifact_path, discover_images, plan_artifact_paths, BatchConfig, BatchProcessor};
    use crate::error::AnalysisError;
    use crate::service::AnalysisService;
    use crate::test_support::{Scripted, ScriptedProvider};

    const REPLY: &str = "```json\n{\"Product Type\": \"Sneaker\", \"Category\": \"Footwear, Casual\", \"Suggested Title\": \"Canvas \\\"Classic\\\" Low\", \"confidence_score\": 0.9}\n```";

    fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn processor(provider: ScriptedProvider, workers: usize) -> BatchProcessor {
        BatchProcessor::new(
            Arc::new(AnalysisService::new(Arc::new(provider))),
            BatchConfig {
                workers,
                ..BatchConfig::default()
            },
        )
    }

    fn json_files(dir: &Path) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    #[test]
    fn discovery_is_recursive_case_insensitive_and_sorted() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["b.PNG", "a.jpg", "nested/c.webp", "nested/deeper/d.GIF", "e.jpeg"] {
            write_image(dir.path(), name, b"x")?;
        }
        for name in ["notes.txt", "raw.nef", "noext"] {
            write_image(dir.path(), name, b"x")?;
        }
        fs::create_dir_all(dir.path().join("folder.png"))?;

        let found: Vec<String> = discover_images(dir.path())?
            .iter()
            .map(|path| {
                path.strip_prefix(dir.path())
                    .map(|rel| rel.to_string_lossy().to_string())
                    .unwrap_or_default()
            })
            .collect();
        assert_eq!(
            found,
            vec!["a.jpg", "b.PNG", "e.jpeg", "nested/c.webp", "nested/deeper/d.GIF"]
        );
        Ok(())
    }

    #[test]
    fn missing_input_directory_fails_the_run() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let processor = processor(ScriptedProvider::replying(REPLY), 2);
        assert!(processor
            .process_directory(&dir.path().join("absent"), &dir.path().join("out"))
            .is_err());
        Ok(())
    }

    #[test]
    fn shoe_bag_corrupt_scenario() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_image(input.path(), "shoe.jpg", b"shoe")?;
        write_image(input.path(), "bag.png", b"bag")?;
        write_image(input.path(), "corrupt.webp", b"corrupt")?;
        let provider = ScriptedProvider::replying(REPLY).on_image(
            b"corrupt",
            Scripted::Fail(|| AnalysisError::transport("scripted", Some(502), "bad gateway")),
        );

        let out_dir = output.path().join("results");
        let report = processor(provider, 5).process_directory(input.path(), &out_dir)?;
        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(json_files(&out_dir)?, vec!["bag.json", "shoe.json"]);

        let failed = report
            .outcomes
            .iter()
            .find(|outcome| outcome.status() == ItemStatus::Error);
        assert_eq!(
            failed.and_then(|outcome| outcome.error_kind()),
            Some(ErrorKind::TransportFailure)
        );

        let csv = fs::read_to_string(&report.summary_path)?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "Image,Status,Product Type,Category,Suggested Title,Confidence"
        );
        assert_eq!(lines.iter().filter(|line| line.contains(",Success,")).count(), 2);
        let error_line = lines
            .iter()
            .find(|line| line.contains(",Error,"))
            .copied()
            .unwrap_or_default();
        assert!(error_line.contains("corrupt.webp"));
        assert!(error_line.ends_with(",Error,,,,0"));
        let shoe_line = lines
            .iter()
            .find(|line| line.contains("shoe.jpg"))
            .copied()
            .unwrap_or_default();
        assert!(shoe_line.ends_with(
            ",Success,Sneaker,\"Footwear, Casual\",\"Canvas \"\"Classic\"\" Low\",0.9"
        ));

        let artifact: Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("shoe.json"))?)?;
        assert_eq!(artifact["product_type"], "Sneaker");
        assert_eq!(artifact["features"], serde_json::json!([]));
        Ok(())
    }

    #[test]
    fn failures_and_panics_are_isolated_per_item() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        for idx in 0..7 {
            write_image(input.path(), &format!("item{idx}.jpg"), format!("ok{idx}").as_bytes())?;
        }
        write_image(input.path(), "down.png", b"down")?;
        write_image(input.path(), "boom.gif", b"boom")?;
        write_image(input.path(), "junk.webp", b"junk")?;
        let provider = ScriptedProvider::replying(REPLY)
            .on_image(
                b"down",
                Scripted::Fail(|| AnalysisError::transport("scripted", None, "timed out")),
            )
            .on_image(b"boom", Scripted::Panic)
            .on_image(b"junk", Scripted::Reply("no json here".to_string()));

        let report = processor(provider, 3).process_directory(input.path(), output.path())?;
        assert_eq!(report.total(), 10);
        assert_eq!(report.failed(), 3);
        assert_eq!(json_files(output.path())?.len(), 7);

        let mut kinds: Vec<ErrorKind> = report
            .outcomes
            .iter()
            .filter_map(|outcome| outcome.error_kind())
            .collect();
        kinds.sort_by_key(|kind| kind.as_str());
        assert_eq!(
            kinds,
            vec![
                ErrorKind::MalformedResponse,
                ErrorKind::TransportFailure,
                ErrorKind::WorkerPanic
            ]
        );

        let mut images: Vec<_> = report
            .outcomes
            .iter()
            .map(|outcome| outcome.image().to_path_buf())
            .collect();
        images.sort();
        images.dedup();
        assert_eq!(images.len(), 10);

        let csv = fs::read_to_string(&report.summary_path)?;
        assert_eq!(csv.lines().count(), 11);
        assert_eq!(csv.lines().filter(|line| line.contains(",Error,")).count(), 3);
        Ok(())
    }

    #[test]
    fn zero_workers_still_processes_everything() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_image(input.path(), "a.jpg", b"a")?;
        write_image(input.path(), "b.jpg", b"b")?;
        let report = processor(ScriptedProvider::replying(REPLY), 0)
            .process_directory(input.path(), output.path())?;
        assert_eq!(report.succeeded(), 2);
        Ok(())
    }

    #[test]
    fn empty_directory_writes_header_only_summary() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        let report = processor(ScriptedProvider::replying(REPLY), 5)
            .process_directory(input.path(), output.path())?;
        assert_eq!(report.total(), 0);
        let csv = fs::read_to_string(&report.summary_path)?;
        assert_eq!(csv.lines().count(), 1);
        Ok(())
    }

    #[test]
    fn failed_artifact_write_becomes_error_outcome() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_image(input.path(), "shoe.jpg", b"shoe")?;
        fs::create_dir_all(output.path().join("shoe.json").join("occupied"))?;

        let report = processor(ScriptedProvider::replying(REPLY), 1)
            .process_directory(input.path(), output.path())?;
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.outcomes[0].error_kind(),
            Some(ErrorKind::ArtifactWrite)
        );
        let leftovers = fs::read_dir(output.path())?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        assert!(output.path().join("shoe.json").is_dir());
        Ok(())
    }

    #[test]
    fn same_stem_in_sibling_directories_gets_distinct_artifacts() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        for dir in ["a", "b", "c", "d"] {
            write_image(input.path(), &format!("{dir}/shoe.jpg"), dir.as_bytes())?;
        }
        write_image(input.path(), "shoe_2.png", b"own")?;

        for _ in 0..20 {
            let out_dir = tempfile::tempdir_in(output.path())?;
            let report = processor(ScriptedProvider::replying(REPLY), 4)
                .process_directory(input.path(), out_dir.path())?;
            assert_eq!(report.failed(), 0);
            assert_eq!(
                json_files(out_dir.path())?,
                vec!["shoe.json", "shoe_2.json", "shoe_3.json", "shoe_4.json", "shoe_5.json"]
            );
            let mut artifacts: Vec<_> = report
                .outcomes
                .iter()
                .filter_map(|outcome| outcome.artifact().map(Path::to_path_buf))
                .collect();
            artifacts.sort();
            artifacts.dedup();
            assert_eq!(artifacts.len(), report.succeeded());
        }
        Ok(())
    }

    #[test]
    fn planned_artifacts_keep_first_stem_and_avoid_owned_names() {
        let out = Path::new("/out");
        let images: Vec<PathBuf> = [
            "/in/a/bag.jpg",
            "/in/b/bag.png",
            "/in/bag_2.webp",
            "/in/hat.gif",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(
            plan_artifact_paths(&images, out),
            vec![
                PathBuf::from("/out/bag.json"),
                PathBuf::from("/out/bag_3.json"),
                PathBuf::from("/out/bag_2.json"),
                PathBuf::from("/out/hat.json"),
            ]
        );
    }

    #[test]
    fn events_journal_records_batch_lifecycle() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_image(input.path(), "shoe.jpg", b"shoe")?;
        write_image(input.path(), "corrupt.webp", b"corrupt")?;
        let provider = ScriptedProvider::replying(REPLY).on_image(
            b"corrupt",
            Scripted::Fail(|| AnalysisError::auth("scripted", "invalid key")),
        );
        let events_path = output.path().join("logs").join("events.jsonl");
        let processor = BatchProcessor::new(
            Arc::new(AnalysisService::new(Arc::new(provider))),
            BatchConfig {
                workers: 2,
                events_path: Some(events_path.clone()),
                ..BatchConfig::default()
            },
        );
        let report = processor.process_directory(input.path(), output.path())?;

        let events: Vec<Value> = fs::read_to_string(&events_path)?
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        let types: Vec<&str> = events
            .iter()
            .filter_map(|event| event["type"].as_str())
            .collect();
        assert_eq!(types.len(), 4);
        assert_eq!(types[0], "batch_started");
        assert_eq!(types[3], "batch_finished");
        assert!(events
            .iter()
            .all(|event| event["batch_id"] == Value::String(report.batch_id.clone())));

        let items: Vec<&Value> = events
            .iter()
            .filter(|event| event["type"] == "item_finished")
            .collect();
        assert_eq!(items.len(), 2);
        let failed = items
            .iter()
            .find(|event| event["status"] == "error")
            .copied()
            .cloned()
            .unwrap_or_default();
        assert_eq!(failed["error_kind"], "auth_failure");
        let succeeded = items
            .iter()
            .find(|event| event["status"] == "success")
            .copied()
            .cloned()
            .unwrap_or_default();
        assert!(succeeded["artifact"]
            .as_str()
            .unwrap_or_default()
            .ends_with("shoe.json"));
        assert!(succeeded["missing_fields"]
            .as_array()
            .map(|fields| fields.iter().any(|field| field == "colors"))
            .unwrap_or(false));
        assert_eq!(events[3]["failed"], 1);
        Ok(())
    }

    #[test]
    fn artifact_name_uses_file_stem() {
        let out = Path::new("/out");
        assert_eq!(
            artifact_path(out, Path::new("/in/a/shoe.final.jpg")),
            Path::new("/out/shoe.final.json")
        );
    }
}
