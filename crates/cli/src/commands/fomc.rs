//! `opentwin fomc`: a policy decision in the persona's voice.

use opentwin_agent::persona::generator::{ResponseGenerator, default_economic_data};
use opentwin_config::AppConfig;

use super::{CommandResult, open_content_store, persona_system_prompt};

pub async fn run(
    inflation: String,
    unemployment: String,
    gdp_growth: String,
    name: String,
) -> CommandResult {
    let config = AppConfig::load()?;
    let llm = opentwin_providers::build_from_config(&config)?;
    let store = open_content_store(&config).await?;
    let system_prompt = persona_system_prompt(&store, &name).await?;

    let data = default_economic_data(&inflation, &unemployment, &gdp_growth);
    println!("🏛️  FOMC decision by the digital twin of {name}");
    for (indicator, value) in &data {
        println!("   {indicator}: {value}");
    }
    println!();

    let statement = ResponseGenerator::new(llm)
        .generate_fomc_decision(&data, &system_prompt)
        .await?;
    println!("{statement}");
    Ok(())
}
