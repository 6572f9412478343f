//! Index command implementation.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

use crate::models::{Config, DEFAULT_COLLECTION, Document, DocumentFormat};
use crate::services::{IndexingPipeline, VectorStore, build_embedder};
use crate::utils::file::{extract_text, is_supported_document};

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// File or directory to index
    pub path: PathBuf,

    /// Collection to index into
    #[arg(long, short = 'c', default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Override the configured chunk size (characters)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Override the configured chunk overlap (characters)
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Glob patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// List files without indexing
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_index(args: IndexArgs, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let start_time = Instant::now();

    let chunk_size = args
        .chunk_size
        .unwrap_or(config.embedding.chunk_size as usize);
    let overlap = args
        .overlap
        .unwrap_or(config.embedding.chunk_overlap as usize);

    let path = args.path.canonicalize().context("invalid path")?;
    let files = collect_files(&path, &args.exclude)?;

    if files.is_empty() {
        println!("No supported documents found under {}", path.display());
        return Ok(());
    }

    if verbose {
        println!("Found {} documents to process", files.len());
    }

    if args.dry_run {
        println!("Dry run: would index {} documents", files.len());
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(());
    }

    let embedder = build_embedder(&config.embedding).context("failed to build embedder")?;
    let store = Arc::new(
        VectorStore::open(&config.embedder.vector_db_path)
            .context("failed to open vector store")?,
    );
    let pipeline = IndexingPipeline::new(
        embedder,
        store,
        config.embedding.batch_size as usize,
        config.embedding.max_concurrent_batches as usize,
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut documents_indexed = 0usize;
    let mut chunks_indexed = 0usize;
    let mut failures: Vec<String> = Vec::new();

    for file_path in &files {
        pb.inc(1);

        let content = match extract_text(file_path) {
            Ok(content) => content,
            Err(e) => {
                if verbose {
                    pb.println(format!("Skipping {}: {}", file_path.display(), e));
                }
                failures.push(format!("{}: {}", file_path.display(), e));
                continue;
            }
        };

        let format = DocumentFormat::from_path(file_path).unwrap_or(DocumentFormat::Txt);
        let document = Document::new(file_path.display().to_string(), format, content);

        match pipeline
            .index_document(&document, &args.collection, chunk_size, overlap)
            .await
        {
            Ok(report) => {
                documents_indexed += 1;
                chunks_indexed += report.indexed_chunks();
                for failed in &report.failed {
                    failures.push(format!(
                        "{}: chunks {}-{}: {}",
                        file_path.display(),
                        failed.range.start,
                        failed.range.end,
                        failed.error
                    ));
                }
            }
            Err(e) => {
                failures.push(format!("{}: {}", file_path.display(), e));
            }
        }
    }

    pb.finish_and_clear();

    println!(
        "{} {} documents, {} chunks into '{}' in {:.1}s",
        style("Indexed").green().bold(),
        documents_indexed,
        chunks_indexed,
        args.collection,
        start_time.elapsed().as_secs_f64()
    );

    if !failures.is_empty() {
        println!("{} {} failures:", style("Warning:").yellow().bold(), failures.len());
        for failure in &failures {
            println!("  {}", failure);
        }
    }

    Ok(())
}

fn collect_files(path: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let patterns: Vec<glob::Pattern> = exclude
        .iter()
        .map(|p| glob::Pattern::new(p))
        .collect::<Result<_, _>>()
        .context("invalid exclude pattern")?;

    if path.is_file() {
        return Ok(if is_supported_document(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.context("directory walk failed")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let entry_path = entry.path();
        if !is_supported_document(entry_path) {
            continue;
        }
        let relative = entry_path.strip_prefix(path).unwrap_or(entry_path);
        if patterns.iter().any(|p| p.matches_path(relative)) {
            continue;
        }
        files.push(entry_path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("code.rs"), "fn main() {}").unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts").join("c.txt"), "c").unwrap();

        let files = collect_files(dir.path(), &[]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| {
                f.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt", "drafts/c.txt"]);
    }

    #[test]
    fn test_collect_files_respects_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "k").unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts").join("skip.txt"), "s").unwrap();

        let files = collect_files(dir.path(), &["drafts/**".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.txt"));
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.md");
        fs::write(&file, "text").unwrap();

        assert_eq!(collect_files(&file, &[]).unwrap(), vec![file]);
        let binary = dir.path().join("doc.pdf");
        fs::write(&binary, "pdf").unwrap();
        assert!(collect_files(&binary, &[]).unwrap().is_empty());
    }
}
