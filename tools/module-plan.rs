//! Print the activation order of a directory of `module.toml` manifests
//!
//! Discovers modules, binds capabilities and resolves the dependency graph the
//! same way the module manager does, without instantiating anything.
//! Exits non-zero on configuration errors (cycles, unbound capabilities,
//! missing modules).

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use serde::Serialize;

use module_host::config::HostConfig;
use module_host::module::{ManifestPlanner, ModuleDiscovery};
use module_host::utils::init_logging_from_config;

#[derive(Parser)]
#[command(name = "module-plan", about = "Resolve the load order of discovered modules")]
struct Cli {
    /// Directory containing `<module>/module.toml` (overrides the config file)
    #[arg(long)]
    modules_dir: Option<PathBuf>,

    /// Host configuration file (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Module to enable, with its dependencies (repeatable; default all)
    #[arg(long = "enable", value_name = "NAME")]
    enable: Vec<String>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct PlanReport {
    load_order: Vec<String>,
    shutdown_order: Vec<String>,
    dependencies: BTreeMap<String, Vec<String>>,
    capabilities: BTreeMap<String, String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    init_logging_from_config(config.logging.as_ref());

    let module_config = config.module_config();
    if !module_config.enabled {
        anyhow::bail!("Module system is disabled in configuration");
    }
    let modules_dir = cli
        .modules_dir
        .clone()
        .unwrap_or_else(|| module_config.modules_path());
    let enabled = if cli.enable.is_empty() {
        module_config.enabled_modules
    } else {
        cli.enable.clone()
    };

    let discovered = ModuleDiscovery::new(&modules_dir).discover_modules()?;
    let planner = ManifestPlanner::from_discovered(discovered);
    let plan = planner.plan(&enabled)?;

    let report = PlanReport {
        shutdown_order: plan.shutdown_order(),
        dependencies: plan
            .order
            .iter()
            .map(|m| (m.clone(), plan.dependencies_of(m)))
            .collect(),
        capabilities: planner
            .manifests()
            .iter()
            .filter_map(|m| m.provides.as_ref())
            .filter_map(|c| planner.provider_of(c).map(|p| (c.clone(), p.to_string())))
            .collect(),
        load_order: plan.order,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (position, module) in report.load_order.iter().enumerate() {
            let deps = report.dependencies.get(module).cloned().unwrap_or_default();
            if deps.is_empty() {
                println!("{:>3}. {}", position + 1, module);
            } else {
                println!("{:>3}. {} (after {})", position + 1, module, deps.join(", "));
            }
        }
    }
    Ok(())
}
