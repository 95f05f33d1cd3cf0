//! `opentwin extract`: pull content from the web or local files into the
//! content store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use opentwin_config::AppConfig;
use opentwin_core::ExtractedDocument;
use opentwin_extract::{DocumentParser, POWELL_SPEECHES, create_extractor, extract_many};
use opentwin_memory::ContentStore;
use serde_json::{Map, Value, json};
use tracing::warn;

use super::{CommandResult, open_content_store};

pub async fn run(
    urls: Vec<String>,
    files: Vec<PathBuf>,
    powell: bool,
    num: usize,
    extractor: Option<String>,
) -> CommandResult {
    let config = AppConfig::load()?;

    let targets = target_urls(&urls, powell, num);
    if targets.is_empty() && files.is_empty() {
        return Err("Nothing to extract. Pass --url, --file or --powell.".into());
    }

    let store = open_content_store(&config).await?;
    let mut documents = Vec::new();

    if !targets.is_empty() {
        let extractor = create_extractor(extractor.as_deref(), &config.extractor)?;
        println!(
            "🔎 Extracting {} URL(s) with {}...",
            targets.len(),
            extractor.name()
        );
        let delay = Duration::from_millis(config.extractor.request_delay_ms);
        documents.extend(extract_many(extractor.as_ref(), &targets, delay).await);
    }

    if !files.is_empty() {
        println!("📄 Parsing {} file(s)...", files.len());
        let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        documents.extend(DocumentParser::new().parse_many(&paths).await);
    }

    let requested = targets.len() + files.len();
    let stored = store_documents(&store, &documents).await?;

    println!();
    println!("✅ Stored {stored} of {requested} item(s)");
    println!("   Total content items: {}", store.content_count().await?);
    if stored < requested {
        println!("⚠️  {} item(s) failed; run with --verbose for details", requested - stored);
    }
    if stored > 0 {
        println!("\n   Next: opentwin analyze --name \"<persona>\"");
    }
    Ok(())
}

/// Explicit URLs first, then the first `num` curated speeches.
fn target_urls(urls: &[String], powell: bool, num: usize) -> Vec<&str> {
    let mut targets: Vec<&str> = urls.iter().map(String::as_str).collect();
    if powell {
        targets.extend(POWELL_SPEECHES.iter().take(num).copied());
    }
    targets
}

async fn store_documents(
    store: &ContentStore,
    documents: &[ExtractedDocument],
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut stored = 0;
    for doc in documents {
        if doc.content.trim().is_empty() {
            warn!(source = %doc.source, "Empty document, skipping");
            continue;
        }
        let id = store
            .add_content(
                &doc.source,
                doc.source_type.as_str(),
                &doc.content,
                &document_metadata(doc),
            )
            .await?;
        println!("   [{id}] {} ({} words)", display_title(doc), doc.word_count());
        stored += 1;
    }
    Ok(stored)
}

fn display_title(doc: &ExtractedDocument) -> &str {
    if doc.title.is_empty() {
        &doc.source
    } else {
        &doc.title
    }
}

fn document_metadata(doc: &ExtractedDocument) -> Value {
    let mut map: Map<String, Value> = doc
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    map.insert("title".into(), json!(doc.title));
    map.insert("word_count".into(), json!(doc.word_count()));
    Value::Object(map)
}
