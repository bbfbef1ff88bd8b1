//! Advisory build checks.
//!
//! These look at the build as a whole rather than at pairs: CPU/GPU balance,
//! memory size, cooling margin, GPU clearance, supply sizing and a couple of
//! optimization hints. A missing or unparseable value makes a check not
//! apply. Thermal and clearance errors are left to explicit rules when the
//! rule set already covers the same properties.

use crate::analyzer::power::PowerReport;
use crate::config::HeuristicsPolicy;
use crate::model::value::{leading_digits, parse_number};
use crate::model::{CompatibilityIssue, Component, ComponentType, IssueCategory, ResolvedBuild};
use crate::rules::RuleSet;

pub struct BuildHeuristics<'a> {
    policy: &'a HeuristicsPolicy,
    performance_keys: &'a [String],
    rules: &'a RuleSet,
}

impl<'a> BuildHeuristics<'a> {
    pub fn new(policy: &'a HeuristicsPolicy, performance_keys: &'a [String], rules: &'a RuleSet) -> Self {
        Self {
            policy,
            performance_keys,
            rules,
        }
    }

    pub fn check(&self, build: &ResolvedBuild<'_>, power: &PowerReport) -> Vec<CompatibilityIssue> {
        let mut issues = Vec::new();
        issues.extend(self.check_balance(build));
        issues.extend(self.check_memory(build));
        issues.extend(self.check_thermal(build));
        issues.extend(self.check_clearance(build));
        issues.extend(self.check_supply_size(power));
        issues.extend(self.check_optimization(build));
        tracing::debug!("Heuristics produced {} issue(s)", issues.len());
        issues
    }

    fn performance(&self, component: &Component) -> Option<f64> {
        component
            .spec_any(self.performance_keys)
            .and_then(|(_, v)| parse_number(v))
            .filter(|p| *p > 0.0)
    }

    fn check_balance(&self, build: &ResolvedBuild<'_>) -> Option<CompatibilityIssue> {
        let cpu = build.first_of(ComponentType::Cpu)?;
        let gpu = build.first_of(ComponentType::Gpu)?;
        let (cpu_score, gpu_score) = (self.performance(cpu)?, self.performance(gpu)?);

        let ratio = cpu_score.max(gpu_score) / cpu_score.min(gpu_score);
        let (weak, strong) = if cpu_score < gpu_score { (cpu, gpu) } else { (gpu, cpu) };
        let details = format!("CPU score {}, GPU score {}, ratio {:.2}", cpu_score, gpu_score, ratio);

        let issue = if ratio > self.policy.balance_warning_ratio {
            CompatibilityIssue::warning(
                IssueCategory::Balance,
                "Performance bottleneck",
                format!("{} will hold back {}", weak.label(), strong.label()),
            )
            .with_suggestion(format!(
                "Pick a stronger {} to match the rest of the build",
                weak.component_type.display_name().to_lowercase()
            ))
        } else if ratio > self.policy.balance_recommendation_ratio {
            CompatibilityIssue::recommendation(
                IssueCategory::Balance,
                "Unbalanced CPU and GPU",
                format!("{} is noticeably weaker than {}", weak.label(), strong.label()),
            )
        } else {
            return None;
        };
        Some(issue.with_components(cpu.id, gpu.id).with_details(details))
    }

    fn check_memory(&self, build: &ResolvedBuild<'_>) -> Option<CompatibilityIssue> {
        let sizes: Vec<f64> = build
            .of_type(ComponentType::Ram)
            .filter_map(|item| {
                item.component
                    .spec("capacity")
                    .and_then(leading_digits)
                    .map(|gb| gb * f64::from(item.quantity))
            })
            .collect();
        if sizes.is_empty() {
            return None;
        }
        let total: f64 = sizes.iter().sum();

        if total < self.policy.min_ram_gb {
            Some(
                CompatibilityIssue::warning(
                    IssueCategory::Performance,
                    "Not enough memory",
                    format!("{}GB of RAM is below the {}GB a modern system needs", total, self.policy.min_ram_gb),
                )
                .with_suggestion(format!("Install at least {}GB of RAM", self.policy.min_ram_gb)),
            )
        } else if total > self.policy.max_ram_gb {
            Some(CompatibilityIssue::recommendation(
                IssueCategory::Performance,
                "More memory than needed",
                format!("{}GB of RAM exceeds typical workloads; the budget may be better spent elsewhere", total),
            ))
        } else {
            None
        }
    }

    fn check_thermal(&self, build: &ResolvedBuild<'_>) -> Option<CompatibilityIssue> {
        let cpu = build.first_of(ComponentType::Cpu)?;
        let cooler = build.first_of(ComponentType::Cooler)?;
        let tdp = cpu.spec("tdp").and_then(parse_number)?;
        let capacity = cooler.spec("max_tdp").and_then(parse_number)?;
        let details = format!("CPU TDP {}W, cooler rated {}W", tdp, capacity);

        let issue = if tdp > capacity {
            if self.covered((ComponentType::Cpu, "tdp"), (ComponentType::Cooler, "max_tdp")) {
                return None;
            }
            CompatibilityIssue::critical(
                IssueCategory::Thermal,
                "Cooler cannot handle the processor",
                format!("{} cannot dissipate the heat of {}", cooler.label(), cpu.label()),
            )
            .with_suggestion(format!("Choose a cooler rated for at least {}W", tdp))
        } else if tdp > capacity * self.policy.thermal_margin {
            CompatibilityIssue::warning(
                IssueCategory::Thermal,
                "Cooler near its limit",
                format!("{} runs close to the rating of {}", cpu.label(), cooler.label()),
            )
            .with_suggestion("A cooler with more headroom keeps temperatures and noise down")
        } else {
            return None;
        };
        Some(issue.with_components(cpu.id, cooler.id).with_details(details))
    }

    fn check_clearance(&self, build: &ResolvedBuild<'_>) -> Option<CompatibilityIssue> {
        let gpu = build.first_of(ComponentType::Gpu)?;
        let case = build.first_of(ComponentType::Case)?;
        let length = gpu.spec("length").and_then(parse_number)?;
        let room = case.spec("max_gpu_length").and_then(parse_number)?;
        if length <= room || self.covered((ComponentType::Gpu, "length"), (ComponentType::Case, "max_gpu_length")) {
            return None;
        }
        Some(
            CompatibilityIssue::critical(
                IssueCategory::Physical,
                "Graphics card does not fit",
                format!("{} is {}mm long but {} takes at most {}mm", gpu.label(), length, case.label(), room),
            )
            .with_components(gpu.id, case.id),
        )
    }

    fn check_supply_size(&self, power: &PowerReport) -> Option<CompatibilityIssue> {
        let load = power.load()?;
        if power.total_draw == 0 || load >= self.policy.psu_oversize_load {
            return None;
        }
        let issue = CompatibilityIssue::recommendation(
            IssueCategory::Power,
            "Oversized power supply",
            format!(
                "The build uses only {:.0}% of the {}W supply",
                load * 100.0,
                power.supply_capacity
            ),
        )
        .with_suggestion("A smaller supply runs more efficiently at this load");
        Some(match power.supply {
            Some(id) => issue.with_component(id),
            None => issue,
        })
    }

    fn check_optimization(&self, build: &ResolvedBuild<'_>) -> Vec<CompatibilityIssue> {
        let mut issues = Vec::new();

        let has_storage = build.has_type(ComponentType::Storage);
        let has_ssd = build.of_type(ComponentType::Storage).any(|item| {
            item.component
                .spec("type")
                .map(|t| t.to_lowercase().contains("ssd"))
                .unwrap_or(false)
        });
        if has_storage && !has_ssd {
            issues.push(
                CompatibilityIssue::recommendation(
                    IssueCategory::Performance,
                    "No SSD",
                    "The build has no solid-state drive; boot and load times will suffer",
                )
                .with_suggestion("Add an SSD for the operating system"),
            );
        }

        if build.count_of(ComponentType::Ram) == 1 {
            let stick = build.first_of(ComponentType::Ram).map(|c| c.id);
            let issue = CompatibilityIssue::recommendation(
                IssueCategory::Performance,
                "Single memory module",
                "One memory module runs in single-channel mode",
            )
            .with_suggestion("Two matched modules enable dual-channel memory");
            issues.push(match stick {
                Some(id) => issue.with_component(id),
                None => issue,
            });
        }

        issues
    }

    /// An active rule already compares exactly these two properties.
    fn covered(&self, a: (ComponentType, &str), b: (ComponentType, &str)) -> bool {
        self.rules.applicable(a.0, b.0).any(|rule| {
            let props = (rule.source_property.as_str(), rule.target_property.as_str());
            if rule.source_type == a.0 {
                props == (a.1, b.1)
            } else {
                props == (b.1, a.1)
            }
        })
    }
}
