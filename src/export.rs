use std::path::PathBuf;

use crate::backend::{ImportSession, StateImportEngine, cleanup_working_state};
use crate::config::ExportConfig;
use crate::context::Context;
use crate::error::{ExportError, ExportResult};
use crate::graph::{GraphBuilder, SkippedResource};
use crate::model::ResourceKind;
use crate::platform::{Credentials, MetadataClient};
use crate::reconcile::{
    ConfigDirectory, DedupRename, PruneReport, dedup_identifiers, link_references, prune_orphans,
    random_token,
};
use crate::writer::OutputWriter;

/// Inputs of one export run
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub credentials: Credentials,
    pub output_dir: PathBuf,
    pub verbose: bool,
}

/// What an export run produced
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub files_written: Vec<PathBuf>,
    pub nodes_exported: usize,
    /// Resources brought into backend state during this run
    pub imports: usize,
    pub skipped: Vec<SkippedResource>,
    pub references_linked: usize,
    pub pruned: PruneReport,
    pub renames: Vec<DedupRename>,
}

/// Export the resource tree below `request.resource_id` into
/// `request.output_dir`.
///
/// Every node is imported through the state backend, the collected text is
/// written out, and the directory is reconciled as a whole: chart references
/// are linked and pruned (for group and dashboard roots) and chart identifiers
/// repeated across files are made unique. Backend working files are removed
/// at the end.
pub fn export(ctx: &Context, config: &ExportConfig, request: &ExportRequest) -> ExportResult<ExportSummary> {
    let session = ImportSession::new(
        &request.output_dir,
        request.credentials.clone(),
        request.verbose,
    );

    let outcome = {
        let metadata = MetadataClient::new(&*ctx.http, &request.credentials, &config.api_domain);
        let engine = StateImportEngine::new(ctx, config);
        let builder = GraphBuilder::new(metadata, engine, &*ctx.output, &session);
        builder.build(request.kind, &request.resource_id)
    };
    let result = outcome.and_then(|outcome| {
        let mut summary = ExportSummary {
            nodes_exported: outcome
                .graph
                .walk()
                .into_iter()
                .filter(|id| outcome.graph.get(*id).generated_text.is_some())
                .count(),
            imports: session.imported_count(),
            skipped: outcome.skipped,
            ..ExportSummary::default()
        };

        summary.files_written = OutputWriter::new(&*ctx.fs, &request.output_dir)
            .write(&outcome.graph)
            .map_err(ExportError::file_system)?;

        reconcile(ctx, request, &mut summary)?;
        Ok(summary)
    });

    for path in cleanup_working_state(&*ctx.fs, &request.output_dir) {
        ctx.output
            .warning(&format!("Could not remove backend file {}", path));
    }

    result
}

fn reconcile(ctx: &Context, request: &ExportRequest, summary: &mut ExportSummary) -> ExportResult<()> {
    let mut dir = ConfigDirectory::load(&*ctx.fs, &request.output_dir).map_err(ExportError::file_system)?;

    if matches!(request.kind, ResourceKind::Group | ResourceKind::CompositeView) {
        summary.references_linked = link_references(&mut dir);
        summary.pruned = prune_orphans(&mut dir);
    }

    let mut token = random_token;
    summary.renames = dedup_identifiers(&mut dir, &mut token);

    dir.save(&*ctx.fs).map_err(ExportError::file_system)?;

    // pruning can empty a file completely
    for file in dir.files.iter().filter(|f| f.is_modified() && f.content.trim().is_empty()) {
        let path = request.output_dir.join(&file.name);
        ctx.fs.remove_file(&path).map_err(ExportError::file_system)?;
        summary.files_written.retain(|p| p != &path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::resource_blocks;
    use crate::test_helpers::Fixture;
    use crate::traits::FileSystem;
    use std::path::Path;

    fn request(kind: ResourceKind, id: &str) -> ExportRequest {
        ExportRequest {
            kind,
            resource_id: id.to_string(),
            credentials: Credentials::new("tok", "us1"),
            output_dir: PathBuf::from("/out"),
            verbose: false,
        }
    }

    fn tf_files(fixture: &Fixture) -> Vec<String> {
        let mut names: Vec<String> = fixture
            .fs
            .list_files()
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "tf"))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    fn read(fixture: &Fixture, name: &str) -> String {
        fixture
            .fs
            .get_file_contents(&Path::new("/out").join(name))
            .unwrap_or_default()
    }

    #[test]
    fn test_group_with_supported_and_unsupported_charts() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops", &["D1", "D2"]);
        fixture.dashboard("D1", "Hosts", &["C1"]);
        fixture.dashboard("D2", "Logs", &["C2"]);
        fixture.chart("C1", "CPU", "TimeSeriesChart");
        fixture.chart("C2", "Log lines", "LogsChart");

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::Group, "G1")).unwrap();

        assert_eq!(tf_files(&fixture), vec!["Hosts.tf", "Logs.tf", "Ops-Group.tf"]);
        assert_eq!(summary.files_written.len(), 3);
        assert_eq!(summary.nodes_exported, 4);
        assert_eq!(summary.imports, 4);

        let all: String = ["Hosts.tf", "Logs.tf", "Ops-Group.tf"]
            .iter()
            .map(|n| read(&fixture, n))
            .collect();
        assert!(!all.contains("C2"));

        let hosts = read(&fixture, "Hosts.tf");
        assert!(hosts.contains("chart_id = signalfx_time_chart.C1.id"));
        assert!(hosts.contains("dashboard_group = signalfx_dashboard_group.Ops.id"));
        let blocks: Vec<String> = resource_blocks(&hosts).into_iter().map(|b| b.name).collect();
        assert_eq!(blocks, vec!["Hosts", "C1"]);

        assert_eq!(summary.references_linked, 1);
        assert_eq!(summary.pruned.dangling_references, 1);
        assert!(summary.renames.is_empty());
    }

    #[test]
    fn test_rejected_chart_leaves_no_reference() {
        let fixture = Fixture::new();
        fixture.dashboard("D1", "Hosts", &["C1", "C2"]);
        fixture.chart("C1", "CPU", "TimeSeriesChart");
        fixture.chart("C2", "Memory", "TimeSeriesChart");
        fixture.reject_import("signalfx_time_chart.C2");

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::CompositeView, "D1")).unwrap();

        let hosts = read(&fixture, "Hosts.tf");
        assert!(!hosts.contains("C2"));
        assert!(hosts.contains("signalfx_time_chart.C1.id"));
        assert!(hosts.contains("dashboard_group = PLACEHOLDER"));
        assert_eq!(summary.skipped.len(), 1);
    }

    #[test]
    fn test_shared_chart_is_deduplicated() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops", &["D1", "D2"]);
        fixture.dashboard("D1", "Alpha", &["C1"]);
        fixture.dashboard("D2", "Beta", &["C1"]);
        fixture.chart("C1", "CPU", "List");

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::Group, "G1")).unwrap();

        assert_eq!(summary.renames.len(), 1);
        assert_eq!(summary.renames[0].file, "Beta.tf");
        let beta = read(&fixture, "Beta.tf");
        let renamed = &summary.renames[0].to;
        assert!(beta.contains(&format!("resource \"signalfx_list_chart\" \"{}\"", renamed)));
        assert!(beta.contains(&format!("chart_id = signalfx_list_chart.{}.id", renamed)));
        assert!(read(&fixture, "Alpha.tf").contains("resource \"signalfx_list_chart\" \"C1\""));
        // the second dashboard only re-read the state of the shared chart
        assert_eq!(fixture.command.calls_matching("signalfx_list_chart.C1 C1").len(), 1);
    }

    #[test]
    fn test_standalone_detector() {
        let fixture = Fixture::new();
        fixture.detector("X1", "High CPU");

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::AlertRule, "X1")).unwrap();

        assert_eq!(tf_files(&fixture), vec!["High_CPU.tf"]);
        let text = read(&fixture, "High_CPU.tf");
        assert!(!text.contains("label_resolutions"));
        assert!(!text.contains("tags"));
        assert!(text.trim_end().ends_with("# signalfx_detector.High_CPU:"));
        assert_eq!(summary.references_linked, 0);
    }

    #[test]
    fn test_backend_files_cleaned_even_on_failure() {
        let fixture = Fixture::new();
        fixture.fs.write(Path::new("/out/terraform.tfstate"), "{}").unwrap();
        fixture.fs.write(Path::new("/out/.terraform.lock.hcl"), "x").unwrap();

        let result = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::Group, "missing"));

        assert!(matches!(result, Err(ExportError::Upstream { .. })));
        assert!(!fixture.fs.has_file(Path::new("/out/terraform.tfstate")));
        assert!(!fixture.fs.has_file(Path::new("/out/.terraform.lock.hcl")));
    }

    #[test]
    fn test_rejected_group_still_exports_dashboards() {
        let fixture = Fixture::new();
        fixture.group("G1", "Ops", &["D1"]);
        fixture.dashboard("D1", "Hosts", &["C1"]);
        fixture.chart("C1", "CPU", "TimeSeriesChart");
        fixture.reject_import("signalfx_dashboard_group.Ops");

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::Group, "G1")).unwrap();

        assert_eq!(tf_files(&fixture), vec!["Hosts.tf"]);
        assert!(read(&fixture, "Hosts.tf").contains("chart_id = signalfx_time_chart.C1.id"));
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].kind, ResourceKind::Group);
        assert_eq!(summary.skipped[0].resource_id, "G1");
    }

    #[test]
    fn test_resource_named_main_keeps_bootstrap_file() {
        let fixture = Fixture::new();
        fixture.fs.write(Path::new("/out/main.tf"), "provider \"signalfx\" {}\n").unwrap();
        fixture.dashboard("D1", "main", &[]);

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::CompositeView, "D1")).unwrap();

        assert_eq!(read(&fixture, "main.tf"), "provider \"signalfx\" {}\n");
        assert!(read(&fixture, "main-1.tf").contains("resource \"signalfx_dashboard\" \"main\""));
        assert_eq!(summary.files_written, vec![PathBuf::from("/out/main-1.tf")]);
    }

    #[test]
    fn test_no_text_means_no_files() {
        let fixture = Fixture::new();
        fixture.slo("S1", "Latency");
        fixture.reject_import("signalfx_slo.Latency");

        let summary = export(&fixture.context(), &ExportConfig::default(), &request(ResourceKind::Objective, "S1")).unwrap();
        assert!(summary.files_written.is_empty());
        assert!(tf_files(&fixture).is_empty());
    }
}
