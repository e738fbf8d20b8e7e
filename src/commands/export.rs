use anyhow::{Context as AnyhowContext, Result};
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_CONFIG_FILE, ExportConfig};
use crate::context::Context;
use crate::export::{self, ExportRequest, ExportSummary};
use crate::model::ResourceKind;
use crate::platform::Credentials;
use crate::workspace::{self, WorkspaceStatus};

pub struct ExportCommand;

/// Command line inputs of an export
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub realm: Option<String>,
    pub api_key: Option<String>,
    pub target: Option<(ResourceKind, String)>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub yes: bool,
    pub verbose: bool,
}

impl ExportCommand {
    pub fn execute(ctx: &Context, args: &ExportArgs, cwd: &Path) -> Result<()> {
        let config_path = cwd.join(
            args.config
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        );
        let mut config = ExportConfig::load(&*ctx.fs, &config_path)?;
        if let Some(realm) = &args.realm {
            config.realm = realm.clone();
        }

        let api_token = match &args.api_key {
            Some(token) => token.clone(),
            None => ctx
                .input
                .password("API token:")
                .context("Failed to read API token")?,
        };
        if api_token.trim().is_empty() {
            anyhow::bail!("An API token is required (--api-key or O11Y_API_TOKEN)");
        }

        let (kind, resource_id) = match &args.target {
            Some((kind, id)) => (*kind, id.clone()),
            None => Self::prompt_target(ctx)?,
        };

        let output_dir = cwd.join(
            args.output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.output_dir)),
        );

        ctx.output.section("Export to Terraform");
        ctx.output.key_value("Realm", &config.realm);
        ctx.output
            .key_value("Resource", &format!("{} {}", kind, resource_id));
        ctx.output
            .key_value("Output", &output_dir.display().to_string());
        ctx.output.blank();

        if workspace::prepare(ctx, &config, &output_dir, args.yes)? == WorkspaceStatus::Declined {
            ctx.output.info("Existing files kept, nothing exported");
            return Ok(());
        }

        let request = ExportRequest {
            kind,
            resource_id: resource_id.trim().to_string(),
            credentials: Credentials::new(api_token.trim(), &config.realm),
            output_dir,
            verbose: args.verbose,
        };

        let summary = export::export(ctx, &config, &request)
            .with_context(|| format!("Failed to export {} {}", kind, request.resource_id))?;

        Self::print_summary(ctx, &summary);
        Ok(())
    }

    fn prompt_target(ctx: &Context) -> Result<(ResourceKind, String)> {
        let options: Vec<String> = ResourceKind::all()
            .iter()
            .map(|k| k.label().to_string())
            .collect();
        let selected = ctx
            .input
            .select("What do you want to export?", options)
            .context("Failed to select resource kind")?;
        let kind: ResourceKind = selected.parse()?;

        let id = ctx
            .input
            .text(&format!("Enter the {} id:", kind), None)
            .context("Failed to read resource id")?;
        if id.trim().is_empty() {
            anyhow::bail!("A {} id is required", kind);
        }

        Ok((kind, id))
    }

    fn print_summary(ctx: &Context, summary: &ExportSummary) {
        ctx.output.blank();
        ctx.output.success(&format!(
            "Exported {} resource(s) into {} file(s)",
            summary.nodes_exported,
            summary.files_written.len()
        ));

        for path in &summary.files_written {
            ctx.output.dimmed(&format!("  {}", path.display()));
        }

        ctx.output
            .key_value("Imported into state", &summary.imports.to_string());

        if summary.references_linked > 0 {
            ctx.output
                .key_value("Chart references linked", &summary.references_linked.to_string());
        }
        if summary.pruned.dangling_references > 0 || !summary.pruned.unreferenced_widgets.is_empty() {
            ctx.output.key_value(
                "Pruned",
                &format!(
                    "{} dangling reference(s), {} unreferenced chart(s)",
                    summary.pruned.dangling_references,
                    summary.pruned.unreferenced_widgets.len()
                ),
            );
        }

        if !summary.renames.is_empty() {
            ctx.output
                .key_value("Renamed duplicates", &summary.renames.len().to_string());
            for rename in &summary.renames {
                ctx.output.dimmed(&format!(
                    "  {}: {} -> {}",
                    rename.file, rename.from, rename.to
                ));
            }
        }

        if !summary.skipped.is_empty() {
            ctx.output
                .warning(&format!("{} resource(s) skipped", summary.skipped.len()));
            for skipped in &summary.skipped {
                ctx.output.dimmed(&format!(
                    "  {} {}: {}",
                    skipped.kind, skipped.resource_id, skipped.reason
                ));
            }
        }
    }
}
