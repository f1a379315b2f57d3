//! Progressive disclosure
//!
//! Turns a query and a token budget into a [`LoadPlan`]:
//! - Tier 1: summaries of every matched document (always) and of their
//!   dependencies (budget permitting)
//! - Tier 2: bodies, best match first
//! - Tier 3: extension files, only when the query names them or when a body
//!   points at them and plenty of budget is left
//!
//! Admission walks one fixed sequence of steps. Summaries are admitted as a
//! prefix and decide which documents enter the plan, so a larger budget
//! never drops an entry. Bodies and extensions that do not fit are skipped
//! and later, smaller ones still get the remaining budget.

use skillhub_types::{ContentBlock, Document, LoadPlan, PlanEntry, Tier};
use std::fs;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::cost::CostEstimator;
use crate::error::{RenderError, ResolutionError};
use crate::matcher::{names_extension, TriggerMatcher};
use crate::registry::Registry;
use crate::resolver::{DependencyResolver, Origin};

/// A document considered for a plan
struct Candidate<'a> {
    document: &'a Document,
    /// Own score for matched documents, inherited otherwise
    score: f32,
    /// Directly matched by the query
    matched: bool,
    /// Pulled in through `enhances`; ranks after everything else
    enhancement: bool,
    summary_tokens: usize,
    body_tokens: usize,
}

#[derive(Clone, Copy)]
enum StepKind {
    Summary,
    Body,
    /// Index into the document's `extended_files`
    Extension(usize),
}

/// One unit of content competing for budget
struct Step {
    candidate: usize,
    kind: StepKind,
    cost: usize,
    /// Budget that must remain before this step, beyond its own cost
    headroom: usize,
}

/// Per-candidate admission record
#[derive(Default, Clone)]
struct Admitted {
    tier: Option<Tier>,
    tokens: usize,
    extensions: Vec<String>,
}

/// Selects documents and tiers for a query within a token budget
#[derive(Debug, Clone)]
pub struct DisclosureLoader<'a> {
    registry: &'a Registry,
    matcher: TriggerMatcher,
    estimator: CostEstimator,
    include_enhances: bool,
    tier3_headroom_factor: usize,
}

impl<'a> DisclosureLoader<'a> {
    /// Create a loader over a registry
    #[must_use]
    pub fn new(registry: &'a Registry, config: &LoaderConfig) -> Self {
        Self {
            registry,
            matcher: TriggerMatcher::new().with_min_score(config.min_match_score),
            estimator: CostEstimator::from_config(config),
            include_enhances: config.include_enhances,
            tier3_headroom_factor: config.tier3_headroom_factor,
        }
    }

    /// Build a load plan for a query.
    ///
    /// No match yields an empty plan. A budget of zero or less yields the
    /// Tier-1 summary of the best match only. Matched documents always get
    /// their summary, even past the budget, in which case `over_budget` is
    /// set.
    ///
    /// Fails only if the registry's acyclic `requires` invariant is broken.
    pub fn load(&self, query: &str, budget_tokens: i64) -> Result<LoadPlan, ResolutionError> {
        let matches = self.matcher.find(query, self.registry);
        let Some(best) = matches.first() else {
            debug!("No documents match query '{}'", query);
            return Ok(LoadPlan::empty(query, budget_tokens));
        };

        if budget_tokens <= 0 {
            let tokens = self.estimator.summary_tokens(best.document);
            debug!(
                "Budget {} clamped to the summary of '{}'",
                budget_tokens, best.document.id
            );
            return Ok(LoadPlan {
                query: query.to_string(),
                budget_tokens,
                entries: vec![PlanEntry {
                    id: best.document.id.clone(),
                    tier: Tier::Summary,
                    estimated_tokens: tokens,
                    extensions: Vec::new(),
                    match_score: Some(best.score),
                }],
                total_estimated_tokens: tokens,
                over_budget: tokens > 0,
            });
        }
        let budget = usize::try_from(budget_tokens).unwrap_or(usize::MAX);

        let seeds: Vec<&str> = matches.iter().map(|m| m.document.id.as_str()).collect();
        let resolved =
            DependencyResolver::new(self.registry).resolve(&seeds, self.include_enhances)?;

        let candidates: Vec<Candidate<'a>> = resolved
            .iter()
            .map(|r| {
                let score = match r.origin {
                    Origin::Seed => seeds
                        .iter()
                        .position(|id| *id == r.document.id)
                        .map_or(0.0, |p| matches[p].score),
                    Origin::Required | Origin::Enhancement => r
                        .reached_from
                        .iter()
                        .map(|&seed| matches[seed].score)
                        .fold(0.0_f32, f32::max),
                };
                Candidate {
                    document: r.document,
                    score,
                    matched: r.origin == Origin::Seed,
                    enhancement: r.origin == Origin::Enhancement,
                    summary_tokens: self.estimator.summary_tokens(r.document),
                    body_tokens: self.estimator.body_tokens(r.document),
                }
            })
            .collect();

        let matched_order = matches_order(&candidates, &seeds);
        let (mandatory, steps) = self.plan_steps(query, &matched_order, &candidates);

        let mut admitted = vec![Admitted::default(); candidates.len()];
        let mut total = 0usize;
        for step in &mandatory {
            total += step.cost;
            record(&mut admitted[step.candidate], step, candidates[step.candidate].document);
        }
        let over_budget = total > budget;

        let mut summaries_closed = false;
        for step in &steps {
            let remaining = budget.saturating_sub(total);
            let fits =
                total + step.cost <= budget && (step.headroom == 0 || remaining > step.headroom);
            let reached = admitted[step.candidate].tier;

            let admit = match step.kind {
                StepKind::Summary => {
                    if !summaries_closed && !fits {
                        debug!(
                            "Summaries closed at '{}' ({} tokens, {} remaining)",
                            candidates[step.candidate].document.id, step.cost, remaining
                        );
                        summaries_closed = true;
                    }
                    !summaries_closed
                }
                StepKind::Body => fits && reached.is_some(),
                StepKind::Extension(_) => fits && reached >= Some(Tier::Body),
            };
            if !admit {
                continue;
            }
            total += step.cost;
            record(&mut admitted[step.candidate], step, candidates[step.candidate].document);
        }

        let entries: Vec<PlanEntry> = candidates
            .iter()
            .zip(admitted)
            .filter_map(|(candidate, admitted)| {
                admitted.tier.map(|tier| PlanEntry {
                    id: candidate.document.id.clone(),
                    tier,
                    estimated_tokens: admitted.tokens,
                    extensions: admitted.extensions,
                    match_score: candidate.matched.then_some(candidate.score),
                })
            })
            .collect();

        debug!(
            "Plan for '{}': {} entries, {}/{} tokens{}",
            query,
            entries.len(),
            total,
            budget,
            if over_budget { " (over budget)" } else { "" }
        );

        Ok(LoadPlan {
            query: query.to_string(),
            budget_tokens,
            entries,
            total_estimated_tokens: total,
            over_budget,
        })
    }

    /// Lay out mandatory steps and the ordered optional steps
    fn plan_steps(
        &self,
        query: &str,
        matched_order: &[usize],
        candidates: &[Candidate<'a>],
    ) -> (Vec<Step>, Vec<Step>) {
        let mandatory: Vec<Step> = matched_order
            .iter()
            .map(|&c| Step {
                candidate: c,
                kind: StepKind::Summary,
                cost: candidates[c].summary_tokens,
                headroom: 0,
            })
            .collect();

        let mut ranked: Vec<usize> = (0..candidates.len()).collect();
        ranked.sort_by(|&a, &b| {
            let (a, b) = (&candidates[a], &candidates[b]);
            a.enhancement
                .cmp(&b.enhancement)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.document.context_cost.cmp(&b.document.context_cost))
                .then_with(|| a.document.name.cmp(&b.document.name))
        });

        let mut steps: Vec<Step> = ranked
            .iter()
            .filter(|&&c| !candidates[c].matched)
            .map(|&c| Step {
                candidate: c,
                kind: StepKind::Summary,
                cost: candidates[c].summary_tokens,
                headroom: 0,
            })
            .collect();

        steps.extend(ranked.iter().map(|&c| Step {
            candidate: c,
            kind: StepKind::Body,
            cost: candidates[c].body_tokens,
            headroom: 0,
        }));

        let mut see_also = Vec::new();
        for &c in &ranked {
            let doc = candidates[c].document;
            for (index, ext) in doc.extended_files.iter().enumerate() {
                let cost = self.estimator.extension_tokens(doc, ext);
                if names_extension(query, ext) {
                    steps.push(Step {
                        candidate: c,
                        kind: StepKind::Extension(index),
                        cost,
                        headroom: 0,
                    });
                } else {
                    see_also.push(Step {
                        candidate: c,
                        kind: StepKind::Extension(index),
                        cost,
                        headroom: self.tier3_headroom_factor * candidates[c].body_tokens,
                    });
                }
            }
        }
        steps.extend(see_also);

        (mandatory, steps)
    }

    /// Materialize a plan into text blocks, in plan order.
    ///
    /// Tier-3 files are read from disk here, never earlier.
    pub fn render(&self, plan: &LoadPlan) -> Result<Vec<ContentBlock>, RenderError> {
        plan.entries
            .iter()
            .map(|entry| {
                let doc = self.registry.fetch(&entry.id)?;
                let mut text = render_summary(doc);

                if entry.tier >= Tier::Body && !doc.body.is_empty() {
                    text.push_str("\n\n");
                    text.push_str(&doc.body);
                }

                for name in &entry.extensions {
                    let Some(ext) = doc.extension(name) else {
                        continue;
                    };
                    let content =
                        fs::read_to_string(&ext.path).map_err(|source| RenderError::ReadExtension {
                            path: ext.path.clone(),
                            source,
                        })?;
                    text.push_str(&format!(
                        "\n\n### {}\n\n{}",
                        ext.file_name().unwrap_or(&ext.name),
                        content.trim()
                    ));
                }

                Ok(ContentBlock {
                    id: entry.id.clone(),
                    tier: entry.tier,
                    text,
                })
            })
            .collect()
    }
}

/// Candidate indices of matched documents, in match order
fn matches_order(candidates: &[Candidate<'_>], seeds: &[&str]) -> Vec<usize> {
    seeds
        .iter()
        .filter_map(|id| candidates.iter().position(|c| c.document.id == *id))
        .collect()
}

fn record(admitted: &mut Admitted, step: &Step, doc: &Document) {
    let tier = match step.kind {
        StepKind::Summary => Tier::Summary,
        StepKind::Body => Tier::Body,
        StepKind::Extension(index) => {
            if let Some(ext) = doc.extended_files.get(index) {
                admitted.extensions.push(ext.name.clone());
            }
            Tier::Extended
        }
    };
    admitted.tier = admitted.tier.max(Some(tier));
    admitted.tokens += step.cost;
}

/// Tier-1 text: heading, description and summary bullets
fn render_summary(doc: &Document) -> String {
    let mut text = format!("## {} ({})\n\n{}", doc.name, doc.kind, doc.description);
    if !doc.summary.is_empty() {
        text.push('\n');
        for line in &doc.summary {
            text.push_str(&format!("\n- {line}"));
        }
    }
    text
}
