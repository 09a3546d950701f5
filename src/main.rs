use anyhow::Result;
use colored::*;
use log::*;

use profile_smoke_test::config::Config;
use profile_smoke_test::logging::Logger;
use profile_smoke_test::output::{all_passed, print_test_summary};
use profile_smoke_test::scenarios;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::new();

    Logger::init_logger(&config)?;

    println!("{}", "=== PROFILE SMOKE TEST ===".bright_white().bold());
    info!(
        "Running scenario {} against {}",
        config.scenario,
        config.frontend_url()
    );

    let results = scenarios::run(&config).await?;

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let passed = all_passed(&results);

    if passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if passed { 0 } else { 1 });
}
