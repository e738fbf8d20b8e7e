use lazy_static::lazy_static;
use regex::Regex;

use super::collision::resolve_sibling_collisions;
use crate::backend::{ImportSession, StateImportEngine};
use crate::error::{ExportError, ExportResult, ImportFailure};
use crate::model::{
    DASHBOARD_TYPE, GroupLink, NodeId, ResourceGraph, ResourceKind, ResourceNode,
    widget_backend_type,
};
use crate::naming::normalize;
use crate::platform::{MetadataClient, ResourceMetadata};
use crate::traits::Output;

lazy_static! {
    static ref CHART_REFERENCE: Regex =
        Regex::new(r#"(?m)^[ \t]*chart_id[ \t]*=[ \t]*"([^"]+)""#).expect("Invalid chart_id regex");
}

/// A resource that did not make it into the output
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedResource {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub reason: String,
}

/// Result of walking the platform from one root
#[derive(Debug)]
pub struct BuildOutcome {
    pub graph: ResourceGraph,
    pub skipped: Vec<SkippedResource>,
}

/// Discovers the resource tree below a root and imports every node.
///
/// Groups expand into their dashboards (listed by the platform), dashboards
/// into the charts referenced from their own state text. Charts, detectors and
/// SLOs are leaves.
pub struct GraphBuilder<'a> {
    metadata: MetadataClient<'a>,
    engine: StateImportEngine<'a>,
    output: &'a dyn Output,
    session: &'a ImportSession,
    graph: ResourceGraph,
    skipped: Vec<SkippedResource>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        metadata: MetadataClient<'a>,
        engine: StateImportEngine<'a>,
        output: &'a dyn Output,
        session: &'a ImportSession,
    ) -> Self {
        Self {
            metadata,
            engine,
            output,
            session,
            graph: ResourceGraph::new(),
            skipped: Vec::new(),
        }
    }

    pub fn build(mut self, root_kind: ResourceKind, root_id: &str) -> ExportResult<BuildOutcome> {
        // Any fetch failure on the root aborts the run
        let metadata = self.metadata.fetch_metadata(root_kind, root_id)?;

        match root_kind {
            ResourceKind::Group => self.build_group(root_id, metadata)?,
            ResourceKind::CompositeView => {
                self.build_view(root_id, metadata, None, GroupLink::Placeholder)?
            }
            ResourceKind::Widget => self.build_widget(root_id, metadata, None)?,
            ResourceKind::AlertRule | ResourceKind::Objective => {
                self.build_leaf(root_kind, root_id, metadata)?
            }
        }

        Ok(BuildOutcome {
            graph: self.graph,
            skipped: self.skipped,
        })
    }

    fn build_group(&mut self, id: &str, metadata: ResourceMetadata) -> ExportResult<()> {
        let kind = ResourceKind::Group;
        let node = ResourceNode::new(
            id,
            kind,
            &metadata.display_name,
            &normalize(&metadata.display_name),
            kind.backend_type().unwrap_or_default(),
        );
        let group = self.graph.insert(node, None);
        self.materialize(group)?;

        let link = GroupLink::Symbolic(self.graph.get(group).symbolic_id());
        for child_id in &metadata.children {
            if let Some(child) = self.fetch_child(ResourceKind::CompositeView, child_id)? {
                self.build_view(child_id, child, Some(group), link.clone())?;
            }
        }

        for renamed in resolve_sibling_collisions(&mut self.graph, group) {
            let node = self.graph.get(renamed);
            self.output.info(&format!(
                "Dashboard {} renamed to '{}' to keep identifiers unique",
                node.id, node.display_name
            ));
            let resource_id = node.id.clone();
            self.skipped.retain(|s| s.resource_id != resource_id);

            self.graph.clear_children(renamed);
            self.graph.get_mut(renamed).generated_text = None;
            self.expand_view(renamed)?;
        }

        Ok(())
    }

    fn build_view(
        &mut self,
        id: &str,
        metadata: ResourceMetadata,
        parent: Option<NodeId>,
        link: GroupLink,
    ) -> ExportResult<()> {
        let mut node = ResourceNode::new(
            id,
            ResourceKind::CompositeView,
            &metadata.display_name,
            &normalize(&metadata.display_name),
            DASHBOARD_TYPE,
        );
        node.group_link = Some(link);

        let view = self.graph.insert(node, parent);
        self.expand_view(view)
    }

    /// Import a dashboard and build the charts its state refers to
    fn expand_view(&mut self, view: NodeId) -> ExportResult<()> {
        self.materialize(view)?;

        let Some(text) = self.graph.get(view).generated_text.clone() else {
            return Ok(());
        };

        for chart_id in chart_references(&text) {
            if let Some(metadata) = self.fetch_child(ResourceKind::Widget, &chart_id)? {
                self.build_widget(&chart_id, metadata, Some(view))?;
            }
        }

        Ok(())
    }

    fn build_widget(
        &mut self,
        id: &str,
        metadata: ResourceMetadata,
        parent: Option<NodeId>,
    ) -> ExportResult<()> {
        let subtype = metadata.subtype.clone().unwrap_or_default();
        let Some(backend_type) = widget_backend_type(&subtype) else {
            self.output.warning(&format!(
                "Skipping chart '{}' ({}): unsupported chart type '{}'",
                metadata.display_name, id, subtype
            ));
            self.skip(ResourceKind::Widget, id, format!("unsupported chart type '{}'", subtype));
            return Ok(());
        };

        // Chart identifiers come from the chart id so dashboard references can be matched
        let node = ResourceNode::new(
            id,
            ResourceKind::Widget,
            &metadata.display_name,
            &normalize(id),
            backend_type,
        );
        let widget = self.graph.insert(node, parent);
        self.materialize(widget)
    }

    fn build_leaf(&mut self, kind: ResourceKind, id: &str, metadata: ResourceMetadata) -> ExportResult<()> {
        let node = ResourceNode::new(
            id,
            kind,
            &metadata.display_name,
            &normalize(&metadata.display_name),
            kind.backend_type().unwrap_or_default(),
        );
        let leaf = self.graph.insert(node, None);
        self.materialize(leaf)
    }

    /// Fetch metadata for a non-root resource. Upstream failures only drop the
    /// subtree; authentication failures abort.
    fn fetch_child(&mut self, kind: ResourceKind, id: &str) -> ExportResult<Option<ResourceMetadata>> {
        match self.metadata.fetch_metadata(kind, id) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(ExportError::Upstream { message, .. }) => {
                self.output
                    .warning(&format!("Skipping {} {}: {}", kind, id, message));
                self.skip(kind, id, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn materialize(&mut self, id: NodeId) -> ExportResult<()> {
        let node = self.graph.get(id);
        self.output.info(&format!(
            "Importing {} '{}' as {}",
            node.kind,
            node.display_name,
            node.address()
        ));

        match self.engine.materialize(node, self.session) {
            Ok(text) if text.trim().is_empty() => {
                let (kind, resource_id, address) = (node.kind, node.id.clone(), node.address());
                self.output
                    .warning(&format!("No state available for {}; nothing will be written", address));
                self.skip(kind, &resource_id, "no state text".to_string());
            }
            Ok(text) => {
                self.graph.get_mut(id).generated_text = Some(text);
            }
            Err(ImportFailure::BackendUnavailable { command, message }) => {
                return Err(ExportError::BackendUnavailable { command, message });
            }
            // sibling dashboards sharing a name; collision resolution renames and retries them
            Err(failure @ ImportFailure::AddressTaken { .. }) => {
                let (kind, resource_id) = (node.kind, node.id.clone());
                self.output.dimmed(&failure.to_string());
                self.skip(kind, &resource_id, failure.to_string());
            }
            Err(failure) => {
                let (kind, resource_id) = (node.kind, node.id.clone());
                self.output.warning(&failure.to_string());
                self.skip(kind, &resource_id, failure.to_string());
            }
        }

        Ok(())
    }

    fn skip(&mut self, kind: ResourceKind, resource_id: &str, reason: String) {
        self.skipped.push(SkippedResource {
            kind,
            resource_id: resource_id.to_string(),
            reason,
        });
    }
}

/// Chart ids referenced by a dashboard's state, first occurrence order
pub fn chart_references(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in CHART_REFERENCE.captures_iter(text) {
        let id = caps[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::context::Context;
    use crate::platform::Credentials;
    use crate::test_helpers::Fixture;
    use crate::traits::MockCommandResult;
    use std::path::Path;

    fn build(fixture: &Fixture, kind: ResourceKind, id: &str) -> ExportResult<BuildOutcome> {
        let ctx: Context = fixture.context();
        let config = ExportConfig {
            realm: "us1".to_string(),
            ..ExportConfig::default()
        };
        let credentials = Credentials::new("tok", "us1");
        let session = ImportSession::new(Path::new("/out"), credentials.clone(), false);
        let metadata = MetadataClient::new(&*ctx.http, &credentials, &config.api_domain);
        let engine = StateImportEngine::new(&ctx, &config);
        let builder = GraphBuilder::new(metadata, engine, &*ctx.output, &session);
        builder.build(kind, id)
    }

    fn identifiers(outcome: &BuildOutcome) -> Vec<String> {
        outcome
            .graph
            .walk()
            .into_iter()
            .map(|id| outcome.graph.get(id).identifier.clone())
            .collect()
    }

    #[test]
    fn test_chart_references_in_order_without_repeats() {
        let text = "  chart {\n    chart_id = \"B\"\n  }\n  chart {\n    chart_id = \"A\"\n  }\n  chart {\n    chart_id = \"B\"\n  }\n";
        assert_eq!(chart_references(text), vec!["B", "A"]);
    }

    #[test]
    fn test_group_tree() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops Team", &["D1", "D2"]);
        fixture.dashboard("D1", "Hosts", &["C1"]);
        fixture.dashboard("D2", "Services", &["C2"]);
        fixture.chart("C1", "CPU", "TimeSeriesChart");
        fixture.chart("C2", "Logs", "LogsChart");

        let outcome = build(&fixture, ResourceKind::Group, "G1").unwrap();

        assert_eq!(identifiers(&outcome), vec!["Ops_Team", "Hosts", "C1", "Services"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].resource_id, "C2");

        let root = outcome.graph.root().unwrap();
        let hosts = outcome.graph.get(root).children[0];
        let text = outcome.graph.get(hosts).generated_text.clone().unwrap();
        assert!(text.contains("dashboard_group = signalfx_dashboard_group.Ops_Team.id"));
    }

    #[test]
    fn test_duplicate_dashboard_names_are_reimported() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops", &["D1", "D2", "D3"]);
        fixture.dashboard("D1", "A", &[]);
        fixture.dashboard("D2", "A", &["C1"]);
        fixture.dashboard("D3", "B", &[]);
        fixture.dashboard_state("A1", "D2", &["C1"]);
        fixture.chart("C1", "CPU", "SingleValue");

        let outcome = build(&fixture, ResourceKind::Group, "G1").unwrap();

        assert_eq!(identifiers(&outcome), vec!["Ops", "A", "A1", "C1", "B"]);
        assert!(outcome.skipped.is_empty());
        assert_eq!(fixture.command.calls_matching("signalfx_dashboard.A1 D2").len(), 1);
        assert!(fixture.command.calls_matching("signalfx_dashboard.A D2").is_empty());
        assert!(fixture.output.get_warnings().is_empty());
    }

    #[test]
    fn test_child_upstream_failure_skips_subtree() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops", &["D1", "D404"]);
        fixture.dashboard("D1", "Hosts", &[]);

        let outcome = build(&fixture, ResourceKind::Group, "G1").unwrap();
        assert_eq!(identifiers(&outcome), vec!["Ops", "Hosts"]);
        assert_eq!(outcome.skipped[0].resource_id, "D404");
    }

    #[test]
    fn test_root_failures_abort() {
        let fixture = Fixture::new();
        assert!(matches!(
            build(&fixture, ResourceKind::Group, "missing"),
            Err(ExportError::Upstream { .. })
        ));

        fixture.http.respond("https://api.us1.signalfx.com/v2/detector/X", 401, "{}");
        assert!(matches!(
            build(&fixture, ResourceKind::AlertRule, "X"),
            Err(ExportError::Auth { .. })
        ));
    }

    #[test]
    fn test_child_auth_failure_aborts() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops", &["D1"]);
        fixture.http.respond("https://api.us1.signalfx.com/v2/dashboard/D1", 403, "{}");

        assert!(matches!(
            build(&fixture, ResourceKind::Group, "G1"),
            Err(ExportError::Auth { .. })
        ));
    }

    #[test]
    fn test_rejected_import_keeps_node_without_text() {
        let fixture = Fixture::new();
        fixture.detector("X1", "High CPU");
        fixture.reject_import("signalfx_detector.High_CPU");

        let outcome = build(&fixture, ResourceKind::AlertRule, "X1").unwrap();
        let root = outcome.graph.root().unwrap();
        assert!(outcome.graph.get(root).generated_text.is_none());
        assert_eq!(outcome.skipped.len(), 1);
        assert!(fixture.output.get_warnings()[0].contains("rejected"));
    }

    #[test]
    fn test_timed_out_chart_is_skipped_and_siblings_continue() {
        let fixture = Fixture::new();
        fixture.dashboard("D1", "Hosts", &["C1", "C2"]);
        fixture.chart("C1", "CPU", "TimeSeriesChart");
        fixture.chart("C2", "Memory", "TimeSeriesChart");
        fixture.command.add_output(
            MockCommandResult::new("terraform", &["import", "signalfx_time_chart.C1"]).timing_out(),
        );

        let outcome = build(&fixture, ResourceKind::CompositeView, "D1").unwrap();

        assert_eq!(identifiers(&outcome), vec!["Hosts", "C1", "C2"]);
        let with_text: Vec<String> = outcome
            .graph
            .walk()
            .into_iter()
            .map(|id| outcome.graph.get(id))
            .filter(|n| n.generated_text.is_some())
            .map(|n| n.identifier.clone())
            .collect();
        assert_eq!(with_text, vec!["Hosts", "C2"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].resource_id, "C1");
        assert!(outcome.skipped[0].reason.contains("did not finish"));
    }

    #[test]
    fn test_missing_backend_aborts() {
        let fixture = Fixture::with_unavailable_backend();
        fixture.slo("S1", "Latency");

        assert!(matches!(
            build(&fixture, ResourceKind::Objective, "S1"),
            Err(ExportError::BackendUnavailable { .. })
        ));
    }

    #[test]
    fn test_standalone_dashboard_uses_placeholder_group() {
        let fixture = Fixture::new();
        fixture.dashboard("D1", "Hosts", &[]);

        let outcome = build(&fixture, ResourceKind::CompositeView, "D1").unwrap();
        let root = outcome.graph.root().unwrap();
        let text = outcome.graph.get(root).generated_text.clone().unwrap();
        assert!(text.contains("dashboard_group = PLACEHOLDER"));
        assert!(text.contains("parent = \"G0\""));
    }
}
