//! `opentwin info`: the available content extractors.

use opentwin_config::AppConfig;
use opentwin_extract::{ExtractorInfo, extractor_catalog};

use super::CommandResult;

pub async fn run(extractor_type: Option<String>) -> CommandResult {
    let config = AppConfig::load()?;
    let catalog = extractor_catalog();

    let shown: Vec<&ExtractorInfo> = match &extractor_type {
        Some(kind) => catalog.iter().filter(|e| e.id == kind.as_str()).collect(),
        None => catalog.iter().collect(),
    };
    if shown.is_empty() {
        return Err(format!("Unknown extractor: {}", extractor_type.unwrap_or_default()).into());
    }

    println!("🔎 Content Extractors");
    println!("=====================");
    for info in shown {
        let active = if info.id == config.extractor.kind { "  (active)" } else { "" };
        println!();
        println!("  {} [{}]{active}", info.name, info.id);
        println!("    Cost:            {}", info.cost);
        println!(
            "    API key:         {}",
            if info.api_key_required { "required" } else { "optional" }
        );
        println!("    Recommended for: {}", info.recommended_for);
        println!("    Features:");
        for feature in info.features {
            println!("      - {feature}");
        }
    }
    println!();
    println!("  Select one with EXTRACTOR_TYPE or `opentwin extract --extractor <id>`.");
    Ok(())
}
