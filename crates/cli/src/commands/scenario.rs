//! `opentwin scenario`: role-play practice.

use opentwin_agent::tutor::{ScenarioCatalog, TutorSession};
use opentwin_config::AppConfig;

use super::tutor_loop::{self, VoiceIo};
use super::{CommandResult, tutor_llm};

pub struct ScenarioArgs {
    pub id: Option<String>,
    pub list: bool,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub random: bool,
    pub voice: bool,
    pub no_memory: bool,
}

pub async fn run(args: ScenarioArgs) -> CommandResult {
    let config = AppConfig::load()?;

    if args.list || (args.id.is_none() && !args.random) {
        let catalog = ScenarioCatalog::load(config.teacher.scenarios_file.as_deref())?;
        print_list(&catalog, args.category.as_deref(), args.difficulty.as_deref());
        if !args.list {
            println!("\n   Start one with: opentwin scenario <ID>  (or --random)");
        }
        return Ok(());
    }

    let llm = tutor_llm(&config)?;
    let io = if args.voice { Some(VoiceIo::from_config(&config)?) } else { None };
    let mut session = TutorSession::from_config(llm, &config, !args.no_memory)?;

    let scenario_id = match args.id {
        Some(id) => id,
        None => session
            .scenarios()
            .random(args.category.as_deref(), args.difficulty.as_deref())
            .map(|s| s.scenario_id.clone())
            .ok_or("The scenario catalog is empty")?,
    };

    let intro = session.start_scenario(&scenario_id)?;
    tutor_loop::run(session, io, intro).await
}

fn print_list(catalog: &ScenarioCatalog, category: Option<&str>, difficulty: Option<&str>) {
    let scenarios = catalog.list(category, difficulty);
    println!();
    println!("📚 Scenarios ({})", scenarios.len());
    println!("==================");
    if scenarios.is_empty() {
        println!("  No scenarios match those filters.");
        return;
    }
    for s in scenarios {
        println!(
            "  {:<24} {:<13} {:<12} {:>3} min  {}",
            s.scenario_id, s.category, s.difficulty, s.duration_minutes, s.title
        );
    }
}
