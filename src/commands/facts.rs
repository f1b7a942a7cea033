//! The `facts` subcommand: print the gathered host facts.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::context::Capabilities;
use crate::exec::SystemExecutor;
use crate::facts::HostFacts;
use crate::logging::Logger;

/// Gather and print host facts.
///
/// # Errors
///
/// Returns an error if the OS version cannot be read.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let executor = SystemExecutor::new(Duration::from_secs(global.timeout));
    let host_facts = HostFacts::gather(&executor)?;
    let capabilities = Capabilities::detect(&executor);

    if global.json_lines {
        println!("{}", serde_json::to_string(&host_facts)?);
        return Ok(());
    }

    log.stage("Host facts");
    log.info(&format!("generation: {}", host_facts.generation));
    log.info(&format!("major version: {}", host_facts.major));
    log.info(&format!("build: {}", host_facts.build));
    log.info(&format!(
        "elevated: {}",
        if host_facts.elevated { "yes" } else { "no" }
    ));
    log.info(&format!(
        "package manager: {}",
        if capabilities.package_manager {
            "winget"
        } else {
            "unavailable"
        }
    ));
    Ok(())
}
