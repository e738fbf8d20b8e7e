use std::path::PathBuf;
use std::process::Output as ProcessOutput;
use std::time::Duration;

use super::sanitize::sanitize;
use super::session::{AddressClaim, ImportSession};
use crate::config::ExportConfig;
use crate::context::Context;
use crate::error::ImportFailure;
use crate::model::ResourceNode;
use crate::traits::{CommandExecutor, CommandTimedOut, FileSystem, Output};

/// Drives the state backend: one-time `init`, then `import` and
/// `state show` per resource
pub struct StateImportEngine<'a> {
    command: &'a dyn CommandExecutor,
    fs: &'a dyn FileSystem,
    output: &'a dyn Output,
    binary: String,
    timeout: Option<Duration>,
}

impl<'a> StateImportEngine<'a> {
    pub fn new(ctx: &'a Context, config: &ExportConfig) -> Self {
        Self {
            command: &*ctx.command,
            fs: &*ctx.fs,
            output: &*ctx.output,
            binary: config.backend_binary.clone(),
            timeout: config.command_timeout(),
        }
    }

    /// Import `node` into the session's state and return its sanitized
    /// configuration text. An empty string means the backend had nothing to
    /// show for the address.
    pub fn materialize(
        &self,
        node: &ResourceNode,
        session: &ImportSession,
    ) -> Result<String, ImportFailure> {
        if session.begin_init() {
            self.initialize(session)?;
        }

        let address = node.address();
        match session.claim(&address, &node.id) {
            AddressClaim::Fresh => self.import(node, session)?,
            AddressClaim::AlreadyImported => {}
            AddressClaim::TakenBy(holder) => {
                return Err(ImportFailure::AddressTaken { address, holder });
            }
        }

        let raw = self.show(&address, session)?;
        if raw.trim().is_empty() {
            return Ok(String::new());
        }

        Ok(sanitize(node.kind, &raw, node.group_link.as_ref()))
    }

    /// Initialization is attempted once. A failed init is reported and the
    /// run carries on; only a missing binary stops it.
    fn initialize(&self, session: &ImportSession) -> Result<(), ImportFailure> {
        let creds = credential_vars(session);
        let args = ["init", "-input=false", "-var", &creds[0], "-var", &creds[1]];

        match self.run(&args, session) {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                self.output.warning(&format!(
                    "{} init failed with exit code {:?}; continuing with imports",
                    self.binary,
                    output.status.code()
                ));
                Ok(())
            }
            Err(failure) if failure.is_fatal() => Err(failure),
            Err(failure) => {
                self.output
                    .warning(&format!("{}; continuing with imports", failure));
                Ok(())
            }
        }
    }

    fn import(&self, node: &ResourceNode, session: &ImportSession) -> Result<(), ImportFailure> {
        let address = node.address();
        let stub = self.write_stub(node, session);

        let creds = credential_vars(session);
        let args = [
            "import",
            "-input=false",
            "-var",
            &creds[0],
            "-var",
            &creds[1],
            &address,
            &node.id,
        ];
        let result = self.run(&args, session);

        if let Some(stub) = stub
            && let Err(e) = self.fs.remove_file(&stub)
        {
            self.output
                .warning(&format!("Failed to remove import stub {:?}: {:#}", stub, e));
        }

        let output = result?;
        if !output.status.success() {
            return Err(ImportFailure::ImportRejected {
                address,
                message: exit_message(&output),
            });
        }

        session.record_import(&address, &node.id);
        Ok(())
    }

    fn show(&self, address: &str, session: &ImportSession) -> Result<String, ImportFailure> {
        let output = self.run(&["state", "show", "-no-color", address], session)?;

        if !output.status.success() {
            return Err(ImportFailure::StateUnreadable {
                address: address.to_string(),
                message: exit_message(&output),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// The backend only imports into addresses declared in configuration, so
    /// an empty block is put in place for the duration of the import
    fn write_stub(&self, node: &ResourceNode, session: &ImportSession) -> Option<PathBuf> {
        let path = session.working_dir().join(format!(
            "_import_{}_{}.tf",
            node.backend_type, node.identifier
        ));
        let stub = format!(
            "resource \"{}\" \"{}\" {{}}\n",
            node.backend_type, node.identifier
        );

        match self.fs.write(&path, &stub) {
            Ok(()) => Some(path),
            Err(e) => {
                self.output
                    .warning(&format!("Failed to write import stub {:?}: {:#}", path, e));
                None
            }
        }
    }

    fn run(&self, args: &[&str], session: &ImportSession) -> Result<ProcessOutput, ImportFailure> {
        let command_line = format!("{} {}", self.binary, args.first().copied().unwrap_or_default());

        let output = self
            .command
            .execute(&self.binary, args, session.working_dir(), self.timeout)
            .map_err(|e| match e.downcast_ref::<CommandTimedOut>() {
                Some(timed_out) => ImportFailure::BackendTimeout {
                    command: command_line.clone(),
                    seconds: timed_out.limit.as_secs(),
                },
                None => ImportFailure::BackendUnavailable {
                    command: command_line.clone(),
                    message: format!("{:#}", e),
                },
            })?;

        if session.verbose() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim().is_empty() {
                self.output.dimmed(stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                self.output.dimmed(stderr.trim_end());
            }
        }

        Ok(output)
    }
}

fn credential_vars(session: &ImportSession) -> [String; 2] {
    let creds = session.credentials();
    [
        format!("o11y_api_token={}", creds.api_token),
        format!("o11y_realm={}", creds.realm),
    ]
}

fn exit_message(output: &ProcessOutput) -> String {
    match output.status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupLink, ResourceKind};
    use crate::platform::Credentials;
    use crate::traits::{
        MockCommandExecutor, MockCommandResult, MockFileSystem, MockHttpClient, MockOutput,
        MockUserInput,
    };
    use std::path::Path;
    use std::sync::Arc;

    const SLO_STATE: &str = "# signalfx_slo.Latency:\nresource \"signalfx_slo\" \"Latency\" {\n    id   = \"S1\"\n    name = \"Latency\"\n}\n";

    struct Harness {
        ctx: Context,
        command: Arc<MockCommandExecutor>,
        fs: Arc<MockFileSystem>,
        output: Arc<MockOutput>,
    }

    fn harness(command: MockCommandExecutor) -> Harness {
        let command = Arc::new(command);
        let fs = Arc::new(MockFileSystem::new());
        let output = Arc::new(MockOutput::new());
        let ctx = Context::test_with(
            fs.clone(),
            Arc::new(MockUserInput::new()),
            output.clone(),
            command.clone(),
            Arc::new(MockHttpClient::new()),
        );
        Harness {
            ctx,
            command,
            fs,
            output,
        }
    }

    fn session(verbose: bool) -> ImportSession {
        ImportSession::new(Path::new("/out"), Credentials::new("tok", "us1"), verbose)
    }

    fn slo() -> ResourceNode {
        ResourceNode::new("S1", ResourceKind::Objective, "Latency", "Latency", "signalfx_slo")
    }

    #[test]
    fn test_materialize_runs_init_import_show() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["state", "show", "signalfx_slo.Latency"]).stdout(SLO_STATE),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        let text = engine.materialize(&slo(), &session).unwrap();

        assert!(text.contains("name = \"Latency\""));
        assert!(!text.contains("id   = \"S1\""));
        assert_eq!(
            h.command.calls(),
            vec![
                "terraform init -input=false -var o11y_api_token=tok -var o11y_realm=us1",
                "terraform import -input=false -var o11y_api_token=tok -var o11y_realm=us1 signalfx_slo.Latency S1",
                "terraform state show -no-color signalfx_slo.Latency",
            ]
        );
        // stub is gone once the import ran
        assert!(h.fs.list_files().is_empty());
    }

    #[test]
    fn test_init_runs_once_per_session() {
        let h = harness(MockCommandExecutor::new());
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        engine.materialize(&slo(), &session).unwrap();
        let other = ResourceNode::new("S2", ResourceKind::Objective, "Errors", "Errors", "signalfx_slo");
        engine.materialize(&other, &session).unwrap();

        assert_eq!(h.command.calls_matching(" init ").len(), 1);
        assert_eq!(h.command.calls_matching(" import ").len(), 2);
    }

    #[test]
    fn test_init_failure_is_not_fatal() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["init"]).failing(1, "provider error"),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        assert!(engine.materialize(&slo(), &session).is_ok());
        assert_eq!(h.output.get_warnings().len(), 1);
        assert_eq!(h.command.calls_matching(" import ").len(), 1);
    }

    #[test]
    fn test_reimport_of_same_address_only_shows_state() {
        let h = harness(MockCommandExecutor::new());
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        engine.materialize(&slo(), &session).unwrap();
        engine.materialize(&slo(), &session).unwrap();

        assert_eq!(h.command.calls_matching(" import ").len(), 1);
        assert_eq!(h.command.calls_matching("state show").len(), 2);
    }

    #[test]
    fn test_address_held_by_other_resource_is_rejected() {
        let h = harness(MockCommandExecutor::new());
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        engine.materialize(&slo(), &session).unwrap();
        let impostor = ResourceNode::new("S9", ResourceKind::Objective, "Latency", "Latency", "signalfx_slo");
        let err = engine.materialize(&impostor, &session).unwrap_err();

        assert_eq!(
            err,
            ImportFailure::AddressTaken {
                address: "signalfx_slo.Latency".to_string(),
                holder: "S1".to_string(),
            }
        );
        assert_eq!(h.command.calls_matching(" import ").len(), 1);
    }

    #[test]
    fn test_rejected_import_skips_show() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["import", "signalfx_slo.Latency"]).failing(1, "gone"),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        let err = engine.materialize(&slo(), &session).unwrap_err();
        assert_eq!(
            err,
            ImportFailure::ImportRejected {
                address: "signalfx_slo.Latency".to_string(),
                message: "exit code 1".to_string(),
            }
        );
        assert!(h.command.calls_matching("state show").is_empty());
        assert!(h.fs.list_files().is_empty());
    }

    #[test]
    fn test_import_timeout_is_recoverable() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["import", "signalfx_slo.Latency"]).timing_out(),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());
        let session = session(false);

        let err = engine.materialize(&slo(), &session).unwrap_err();
        assert_eq!(
            err,
            ImportFailure::BackendTimeout {
                command: "terraform import".to_string(),
                seconds: 300,
            }
        );
        assert!(!err.is_fatal());
        assert!(h.command.calls_matching("state show").is_empty());
        assert!(h.fs.list_files().is_empty());
        assert_eq!(session.imported_count(), 0);
    }

    #[test]
    fn test_init_timeout_only_warns() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["init"]).timing_out(),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());

        assert!(engine.materialize(&slo(), &session(false)).is_ok());
        let warnings = h.output.get_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("did not finish within 300s"));
    }

    #[test]
    fn test_unreadable_state() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["state", "show"]).failing(1, "no state"),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());

        let err = engine.materialize(&slo(), &session(false)).unwrap_err();
        assert!(matches!(err, ImportFailure::StateUnreadable { .. }));
    }

    #[test]
    fn test_missing_binary_is_fatal() {
        let h = harness(MockCommandExecutor::unavailable());
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());

        let err = engine.materialize(&slo(), &session(false)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(h.command.calls().len(), 1);
    }

    #[test]
    fn test_configured_binary_and_group_link() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("tofu", &["state", "show"]).stdout(
                "resource \"signalfx_dashboard\" \"Hosts\" {\n    dashboard_group = \"G1\"\n    parent = \"G1\"\n}\n",
            ),
        ]));
        let config = ExportConfig {
            backend_binary: "tofu".to_string(),
            ..ExportConfig::default()
        };
        let engine = StateImportEngine::new(&h.ctx, &config);

        let mut node = ResourceNode::new("D1", ResourceKind::CompositeView, "Hosts", "Hosts", "signalfx_dashboard");
        node.group_link = Some(GroupLink::Symbolic("signalfx_dashboard_group.Ops.id".to_string()));
        let text = engine.materialize(&node, &session(false)).unwrap();

        assert!(text.contains("dashboard_group = signalfx_dashboard_group.Ops.id"));
        assert!(text.contains("parent = signalfx_dashboard_group.Ops.id"));
        assert!(h.command.calls().iter().all(|c| c.starts_with("tofu ")));
    }

    #[test]
    fn test_verbose_surfaces_backend_output() {
        let h = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["import"]).failing(1, "Error: Cannot import non-existent remote object"),
        ]));
        let engine = StateImportEngine::new(&h.ctx, &ExportConfig::default());

        let _ = engine.materialize(&slo(), &session(true));
        assert!(
            h.output
                .get_dimmed()
                .iter()
                .any(|m| m.contains("Cannot import non-existent remote object"))
        );

        let quiet = harness(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::new("terraform", &["import"]).failing(1, "Error: hidden"),
        ]));
        let engine = StateImportEngine::new(&quiet.ctx, &ExportConfig::default());
        let _ = engine.materialize(&slo(), &session(false));
        assert!(quiet.output.get_dimmed().is_empty());
    }
}
