use crate::config::Config;
use crate::Command;
use anyhow::{Context, Result};
use skillhub_registry::catalog::{render_full_index, render_index};
use skillhub_registry::{
    CorpusScanner, CostEstimator, DependencyResolver, DisclosureLoader, Origin, Registry,
    ScanReport,
};
use skillhub_types::{Document, DocumentKind, LoadPlan};
use tracing::{error, info};

/// Runs one CLI command against a freshly scanned registry
pub struct SkillhubService {
    config: Config,
}

impl SkillhubService {
    /// Create a new service
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run a command
    pub async fn run(self, command: Command) -> Result<()> {
        skillhub_logging::init_logging(&self.config.logging.level, self.config.logging.format)?;
        info!(
            "Corpus: {} directories, timeout {}s",
            self.config.corpus.directories.len(),
            self.config.corpus.scan_timeout_secs
        );

        let report = self.scan().await?;
        if matches!(command, Command::Scan) {
            print_report(&report);
        }

        let registry = report.build_registry().map_err(|e| {
            error!("Registry build failed: {}", e);
            e
        })?;

        match command {
            Command::Scan => println!("Registered {} documents", registry.len()),
            Command::Load {
                query,
                budget,
                enhances,
                render,
                json,
            } => self.load(&registry, &query, budget, enhances, render, json)?,
            Command::Get { id, json } => {
                let doc = registry.fetch(&id)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(doc)?);
                } else {
                    print_document(doc);
                }
            }
            Command::List { kind, tag } => list(&registry, kind, tag.as_deref()),
            Command::Resolve { ids, enhances } => {
                for resolved in DependencyResolver::new(&registry).resolve(&ids, enhances)? {
                    let origin = match resolved.origin {
                        Origin::Seed => "seed",
                        Origin::Required => "required",
                        Origin::Enhancement => "enhances",
                    };
                    println!("{:<10} {}", origin, resolved.document.id);
                }
            }
            Command::Index { kind } => match kind {
                Some(kind) => print!("{}", render_index(&registry, kind)),
                None => print!("{}", render_full_index(&registry)),
            },
        }

        Ok(())
    }

    async fn scan(&self) -> Result<ScanReport> {
        let scanner = CorpusScanner::from_config(&self.config.corpus)
            .with_estimator(CostEstimator::from_config(&self.config.loader));
        scanner.scan().await.context("Corpus scan failed")
    }

    fn load(
        &self,
        registry: &Registry,
        query: &str,
        budget: Option<i64>,
        enhances: bool,
        render: bool,
        json: bool,
    ) -> Result<()> {
        let mut loader_config = self.config.loader.clone();
        loader_config.include_enhances |= enhances;

        let loader = DisclosureLoader::new(registry, &loader_config);
        let plan = loader.load(query, budget.unwrap_or(self.config.default_budget))?;

        if render {
            let blocks = loader.render(&plan)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&blocks)?);
            } else {
                let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
                println!("{}", texts.join("\n\n"));
            }
        } else if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }

        Ok(())
    }
}

fn print_report(report: &ScanReport) {
    println!(
        "Scanned {} files at {}",
        report.files_scanned,
        report.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for failure in &report.failures {
        println!("  failed   {}: {}", failure.path.display(), failure.reason);
    }
    for warning in &report.cost_warnings {
        println!("  warning  {warning}");
    }
}

fn print_plan(plan: &LoadPlan) {
    if plan.is_empty() {
        println!("No documents match '{}'", plan.query);
        return;
    }

    println!(
        "Plan for '{}': {} entries, {}/{} tokens",
        plan.query,
        plan.len(),
        plan.total_estimated_tokens,
        plan.budget_tokens
    );
    for entry in &plan.entries {
        let score = entry
            .match_score
            .map(|s| format!("  match {s:.2}"))
            .unwrap_or_default();
        let extensions = if entry.extensions.is_empty() {
            String::new()
        } else {
            format!("  + {}", entry.extensions.join(", "))
        };
        println!(
            "  {}  {:<40} {:>6} tokens{}{}",
            entry.tier, entry.id, entry.estimated_tokens, score, extensions
        );
    }
    if plan.over_budget {
        println!("Matched summaries alone exceed the budget");
    }
}

fn print_document(doc: &Document) {
    println!("{} ({}, {} cost)", doc.name, doc.kind, doc.context_cost);
    println!("{}", doc.description);
    println!("source:    {}", doc.source_path.display());
    for (label, values) in [
        ("load when", &doc.load_when),
        ("requires", &doc.requires),
        ("enhances", &doc.enhances),
        ("tags", &doc.tags),
    ] {
        if !values.is_empty() {
            println!("{:<10} {}", format!("{label}:"), values.join(", "));
        }
    }
    for ext in &doc.extended_files {
        println!("extension: {} ({})", ext.name, ext.path.display());
    }
    if !doc.summary.is_empty() {
        println!();
        for line in &doc.summary {
            println!("- {line}");
        }
    }
    if !doc.body.is_empty() {
        println!("\n{}", doc.body);
    }
}

fn list(registry: &Registry, kind: Option<DocumentKind>, tag: Option<&str>) {
    let mut documents: Vec<&Document> = registry
        .iter()
        .filter(|doc| kind.map_or(true, |k| doc.kind == k))
        .filter(|doc| tag.map_or(true, |t| doc.has_tag(t)))
        .collect();
    documents.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));

    for doc in documents {
        println!(
            "{:<8} {:<40} {:<6} {}",
            doc.kind.as_str(),
            doc.name,
            doc.context_cost.as_str(),
            doc.description
        );
    }
}
