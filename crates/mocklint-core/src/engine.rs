//! Analyzer driver: runs every enabled rule on every library call site.
//!
//! Call sites are independent, so they are fanned out with rayon. Each site
//! collects into its own buffer; the buffers are concatenated in node order
//! and then sorted by location and rule id, so the output does not depend on
//! scheduling.
//!
//! A site whose rules observed cancellation is dropped whole. Diagnostics of
//! sites that finished before cancellation are kept.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::cancel::CancellationToken;
use crate::catalog::CatalogCache;
use crate::config::Config;
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, RuleCode, Severity};
use crate::model::{Compilation, NodeId, NodeKind};
use crate::rules::{all_rules, Rule};

/// Result of one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Sorted by location, then rule id.
    pub diagnostics: Vec<Diagnostic>,
    /// Call sites that touch the mocking library.
    pub call_sites: usize,
    pub cancelled: bool,
}

impl Analysis {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Rule set plus the configuration that filters and reweights it.
pub struct Analyzer {
    rules: Vec<Box<dyn Rule>>,
    config: Config,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// All rules with default severities.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let rules = all_rules()
            .into_iter()
            .filter(|rule| rule.codes().iter().any(|code| config.is_enabled(*code)))
            .collect();
        Analyzer { rules, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Codes the active rules can report.
    pub fn enabled_codes(&self) -> Vec<RuleCode> {
        RuleCode::ALL
            .iter()
            .copied()
            .filter(|code| self.config.is_enabled(*code))
            .collect()
    }

    /// Analyze one compilation.
    ///
    /// A compilation that does not reference the mocking library yields an
    /// empty analysis.
    pub fn analyze(
        &self,
        compilation: &Arc<Compilation>,
        cache: &CatalogCache,
        cancel: &CancellationToken,
    ) -> Analysis {
        let Some(catalog) = cache.get_or_resolve(compilation) else {
            return Analysis::default();
        };
        let ctx = AnalysisContext::new(&catalog, cancel);

        let sites: Vec<NodeId> = compilation
            .call_sites()
            .into_iter()
            .filter(|site| touches_library(&ctx, *site))
            .collect();
        debug!(
            compilation = %compilation.id,
            call_sites = sites.len(),
            rules = self.rules.len(),
            "analyzing"
        );

        let mut diagnostics: Vec<Diagnostic> = sites
            .par_iter()
            .flat_map_iter(|site| self.check_site(&ctx, *site))
            .collect();
        diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let cancelled = cancel.is_cancelled();
        if cancelled {
            debug!(compilation = %compilation.id, kept = diagnostics.len(), "analysis cancelled");
        }
        Analysis {
            diagnostics,
            call_sites: sites.len(),
            cancelled,
        }
    }

    fn check_site(&self, ctx: &AnalysisContext<'_>, site: NodeId) -> Vec<Diagnostic> {
        if ctx.cancel.is_cancelled() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.check(ctx, site, &mut out);
        }
        if ctx.cancel.is_cancelled() {
            return Vec::new();
        }
        out.retain(|d| self.config.is_enabled(d.rule));
        for diagnostic in &mut out {
            diagnostic.severity = self.config.severity_for(diagnostic.rule);
        }
        let kind = ctx.compilation.node(site).map_or("missing", |n| n.kind.label());
        trace!(site = %site, kind, count = out.len(), "site checked");
        out
    }
}

/// Invocations bound to a library method and `new Mock<T>(..)` expressions.
fn touches_library(ctx: &AnalysisContext<'_>, site: NodeId) -> bool {
    let Some(node) = ctx.node(site) else {
        return false;
    };
    match node.kind {
        NodeKind::Invocation { .. } => node
            .symbol
            .is_some_and(|method| ctx.catalog.is_library_symbol(method)),
        NodeKind::ObjectCreation { .. } => node
            .type_
            .is_some_and(|ty| ctx.catalog.is_mock_type(ty)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MoqFixture;
    use crate::model::CompilationBuilder;
    use crate::model::CompilationId;

    fn analyze(fx: MoqFixture, config: Config) -> Analysis {
        let compilation = Arc::new(fx.finish());
        let cache = CatalogCache::new();
        Analyzer::with_config(config).analyze(&compilation, &cache, &CancellationToken::new())
    }

    /// `new Mock<IFoo>()` with no setup or verification: ML1000 and ML1009.
    fn bare_mock() -> MoqFixture {
        let mut fx = MoqFixture::new();
        let foo = fx.interface("IFoo");
        fx.mock_local("mock", foo);
        fx
    }

    mod dispatch {
        use super::*;

        #[test]
        fn compilation_without_the_library_is_empty() {
            let mut b = CompilationBuilder::new(CompilationId(7));
            b.add_file("Plain.cs");
            let compilation = Arc::new(b.finish());
            let cache = CatalogCache::new();
            let analysis =
                Analyzer::new().analyze(&compilation, &cache, &CancellationToken::new());
            assert_eq!(analysis, Analysis::default());
        }

        #[test]
        fn every_rule_sees_the_site() {
            let analysis = analyze(bare_mock(), Config::default());
            let codes: Vec<RuleCode> = analysis.diagnostics.iter().map(|d| d.rule).collect();
            assert_eq!(codes, vec![RuleCode::StrictBehavior, RuleCode::MissingVerifyAll]);
            assert_eq!(analysis.call_sites, 1);
            assert_eq!(analysis.warning_count(), 2);
            assert_eq!(analysis.error_count(), 0);
        }

        #[test]
        fn output_is_sorted_by_location() {
            let mut fx = MoqFixture::new();
            let foo = fx.interface("IFoo");
            let int = fx.int();
            let one = fx.number(int);
            let two = fx.number(int);
            let creation = fx.new_mock(foo, &[one, two]);
            fx.declare("mock", creation);
            let analysis = analyze(fx, Config::default());
            let keys: Vec<_> = analysis
                .diagnostics
                .iter()
                .map(|d| (d.location.clone(), d.rule))
                .collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted);
            assert_eq!(analysis.error_count(), 2);
        }

        #[test]
        fn repeated_runs_agree() {
            let first = analyze(bare_mock(), Config::default());
            let second = analyze(bare_mock(), Config::default());
            assert_eq!(first, second);
        }
    }

    mod configuration {
        use super::*;

        #[test]
        fn disabled_rules_are_dropped() {
            let config = Config::parse("[rules]\ndisabled = [\"ML1009\"]\n").unwrap();
            let analysis = analyze(bare_mock(), config);
            let codes: Vec<RuleCode> = analysis.diagnostics.iter().map(|d| d.rule).collect();
            assert_eq!(codes, vec![RuleCode::StrictBehavior]);
        }

        #[test]
        fn severity_overrides_apply() {
            let config = Config::parse("[rules.severity]\nML1000 = \"error\"\n").unwrap();
            let analysis = analyze(bare_mock(), config);
            assert_eq!(analysis.error_count(), 1);
            assert_eq!(analysis.diagnostics[0].severity, Severity::Error);
        }

        #[test]
        fn enabled_codes_reflect_the_config() {
            let config = Config::parse("[rules]\ndisabled = [\"ML1000\", \"ML1017\"]\n").unwrap();
            let analyzer = Analyzer::with_config(config);
            let codes = analyzer.enabled_codes();
            assert_eq!(codes.len(), RuleCode::ALL.len() - 2);
            assert!(!codes.contains(&RuleCode::StrictBehavior));
        }
    }

    mod cancellation {
        use super::*;

        #[test]
        fn cancelled_before_start_reports_nothing() {
            let compilation = Arc::new(bare_mock().finish());
            let cache = CatalogCache::new();
            let cancel = CancellationToken::new();
            cancel.cancel();
            let analysis = Analyzer::new().analyze(&compilation, &cache, &cancel);
            assert!(analysis.cancelled);
            assert!(analysis.diagnostics.is_empty());
        }
    }
}
