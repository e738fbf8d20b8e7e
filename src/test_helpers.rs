//! Test helpers for scripting the platform API and the state backend
//!
//! A [`Fixture`] registers platform responses on a mock HTTP client and the
//! matching `terraform state show` output on a mock command executor, so a
//! whole export can run in memory.

#![cfg(test)]

use serde_json::json;
use std::sync::Arc;

use crate::context::Context;
use crate::model::{ResourceKind, widget_backend_type};
use crate::naming::normalize;
use crate::traits::{
    MockCommandExecutor, MockCommandResult, MockFileSystem, MockHttpClient, MockOutput,
    MockUserInput,
};

const REALM: &str = "us1";
const BINARY: &str = "terraform";

/// In-memory platform plus backend
pub struct Fixture {
    pub fs: Arc<MockFileSystem>,
    pub http: Arc<MockHttpClient>,
    pub command: Arc<MockCommandExecutor>,
    pub output: Arc<MockOutput>,
    pub input: Arc<MockUserInput>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_executor(MockCommandExecutor::new())
    }

    /// Fixture whose backend binary cannot be started
    pub fn with_unavailable_backend() -> Self {
        Self::with_executor(MockCommandExecutor::unavailable())
    }

    fn with_executor(command: MockCommandExecutor) -> Self {
        Self {
            fs: Arc::new(MockFileSystem::new()),
            http: Arc::new(MockHttpClient::new()),
            command: Arc::new(command),
            output: Arc::new(MockOutput::new()),
            input: Arc::new(MockUserInput::new()),
        }
    }

    pub fn context(&self) -> Context {
        Context::test_with(
            self.fs.clone(),
            self.input.clone(),
            self.output.clone(),
            self.command.clone(),
            self.http.clone(),
        )
    }

    pub fn api_url(kind: ResourceKind, id: &str) -> String {
        format!("https://api.{}.signalfx.com/v2/{}/{}", REALM, kind.api_path(), id)
    }

    fn respond(&self, kind: ResourceKind, id: &str, body: serde_json::Value) {
        self.http.respond(&Self::api_url(kind, id), 200, &body.to_string());
    }

    fn state(&self, address: &str, text: &str) {
        self.command
            .add_output(MockCommandResult::new(BINARY, &["state", "show", address]).stdout(text));
    }

    pub fn group(&self, id: &str, name: &str, dashboards: &[&str]) {
        self.respond(
            ResourceKind::Group,
            id,
            json!({ "id": id, "name": name, "dashboards": dashboards, "teams": [] }),
        );

        let ident = normalize(name);
        self.state(
            &format!("signalfx_dashboard_group.{}", ident),
            &format!(
                "# signalfx_dashboard_group.{ident}:\nresource \"signalfx_dashboard_group\" \"{ident}\" {{\n    id = \"{id}\"\n    name = \"{name}\"\n    teams = []\n}}\n"
            ),
        );
    }

    /// Dashboard whose state references `charts`
    pub fn dashboard(&self, id: &str, name: &str, charts: &[&str]) {
        self.respond(
            ResourceKind::CompositeView,
            id,
            json!({ "id": id, "name": name, "groupId": "G0" }),
        );
        self.dashboard_state(&normalize(name), id, charts);
    }

    /// State of a dashboard imported under `ident`
    pub fn dashboard_state(&self, ident: &str, id: &str, charts: &[&str]) {
        let entries: String = charts
            .iter()
            .enumerate()
            .map(|(i, chart)| {
                format!(
                    "\n    chart {{\n        chart_id = \"{chart}\"\n        column = {}\n        height = 1\n        row = 0\n        width = 6\n    }}\n",
                    i * 6
                )
            })
            .collect();

        self.state(
            &format!("signalfx_dashboard.{}", ident),
            &format!(
                "# signalfx_dashboard.{ident}:\nresource \"signalfx_dashboard\" \"{ident}\" {{\n    charts_resolution = \"default\"\n    dashboard_group = \"G0\"\n    id = \"{id}\"\n    name = \"{ident}\"\n    parent = \"G0\"\n    url = \"https://app.us1.signalfx.com/#/dashboard/{id}\"\n{entries}}}\n"
            ),
        );
    }

    pub fn chart(&self, id: &str, name: &str, chart_type: &str) {
        self.respond(
            ResourceKind::Widget,
            id,
            json!({ "id": id, "name": name, "options": { "type": chart_type } }),
        );

        let Some(backend_type) = widget_backend_type(chart_type) else {
            return;
        };
        let ident = normalize(id);
        self.state(
            &format!("{}.{}", backend_type, ident),
            &format!(
                "# {backend_type}.{ident}:\nresource \"{backend_type}\" \"{ident}\" {{\n    id = \"{id}\"\n    name = \"{name}\"\n    program_text = <<-EOF\n        A = data('cpu.utilization').publish(label='A')\n    EOF\n    tags = []\n}}\n"
            ),
        );
    }

    pub fn detector(&self, id: &str, name: &str) {
        self.respond(ResourceKind::AlertRule, id, json!({ "id": id, "name": name }));

        let ident = normalize(name);
        self.state(
            &format!("signalfx_detector.{}", ident),
            &format!(
                "# signalfx_detector.{ident}:\nresource \"signalfx_detector\" \"{ident}\" {{\n    id = \"{id}\"\n    label_resolutions = {{\n        \"Critical\" = 1000\n    }}\n    name = \"{name}\"\n    tags = [\"a\",\"b\"]\n\n    rule {{\n        detect_label = \"Critical\"\n        severity = \"Critical\"\n    }}\n}}\n"
            ),
        );
    }

    pub fn slo(&self, id: &str, name: &str) {
        self.respond(ResourceKind::Objective, id, json!({ "id": id, "name": name }));

        let ident = normalize(name);
        self.state(
            &format!("signalfx_slo.{}", ident),
            &format!(
                "# signalfx_slo.{ident}:\nresource \"signalfx_slo\" \"{ident}\" {{\n    id = \"{id}\"\n    name = \"{name}\"\n    type = \"RequestBased\"\n}}\n"
            ),
        );
    }

    /// Make `terraform import` fail for `address`
    pub fn reject_import(&self, address: &str) {
        self.command.add_output(
            MockCommandResult::new(BINARY, &["import", address])
                .failing(1, "Error: Cannot import non-existent remote object"),
        );
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
