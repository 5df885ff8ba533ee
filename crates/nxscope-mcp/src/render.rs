//! Text renderings of a snapshot for language models.
//!
//! Graph output is compact and tag-delimited. When the rendering of a
//! workspace exceeds the token budget, detail is dropped in stages.

use std::fmt::Write as _;

use nxscope_core::{NxError, NxJson, TargetConfiguration, WorkspaceGraph};
use nxscope_workspace::ConfigurationSnapshot;
use serde_json::Value;

/// Default budget for one `nx_workspace` answer.
pub const DEFAULT_MAX_TOKENS: usize = 25_000;

/// Characters per token used for estimates.
const CHARS_PER_TOKEN: usize = 3;

/// Dependency lists longer than this are shortened in the graph view.
const MAX_LISTED_DEPS: usize = 10;

/// Targets the tool adds to every project.
const HIDDEN_TARGETS: &[&str] = &["nx-release-publish", "nxProjectGraph", "nxProjectReport"];

/// What to leave out of the graph rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphRenderOptions {
    pub skip_owners: bool,
    pub skip_technologies: bool,
    pub skip_tags: bool,
    /// Replace target lists with a count
    pub truncate_targets: bool,
}

impl GraphRenderOptions {
    /// Progressively terser options, from full detail to minimal.
    fn stages() -> [Self; 4] {
        let compact = Self {
            skip_owners: true,
            skip_technologies: true,
            ..Self::default()
        };
        [
            Self::default(),
            compact,
            Self {
                truncate_targets: true,
                ..compact
            },
            Self {
                truncate_targets: true,
                skip_tags: true,
                ..compact
            },
        ]
    }
}

/// nx.json, pretty printed, with a short preamble.
pub fn nx_json_prompt(nx_json: Option<&NxJson>) -> String {
    let body = nx_json
        .and_then(|nx| serde_json::to_string_pretty(nx).ok())
        .unwrap_or_else(|| "{}".to_string());
    format!(
        "Below is the content of nx.json, the configuration file for the Nx workspace. \
         It is at the root of the workspace and defines how nx is configured.\n\n\
         -- start of nx.json --\n{body}\n-- end of nx.json --"
    )
}

/// One `<name>...</name>` line per project.
pub fn project_graph_prompt(graph: &WorkspaceGraph, options: GraphRenderOptions) -> String {
    let mut out = String::from(
        "The following is a representation of the Nx workspace. Each project is enclosed in \
         <name></name> tags and lists its dependencies (deps), runnable targets, type, \
         root and metadata. Use nx_project_details for the full configuration of one project.\n\n",
    );

    for (name, node) in &graph.nodes {
        let deps = graph.dependencies_of(name);
        let deps = if deps.len() > MAX_LISTED_DEPS {
            let shown = MAX_LISTED_DEPS - 2;
            format!("{},...{} more", deps[..shown].join(", "), deps.len() - shown)
        } else {
            deps.join(", ")
        };

        let _ = write!(out, "<{name}>deps:[{deps}]");

        let targets: Vec<&str> = node
            .data
            .targets
            .keys()
            .map(String::as_str)
            .filter(|t| !HIDDEN_TARGETS.contains(t))
            .collect();
        if options.truncate_targets {
            let _ = write!(out, "targets:[{} targets]", targets.len());
        } else {
            let _ = write!(out, "targets:[{}]", targets.join(", "));
        }

        let _ = write!(out, "type:[{}]root:[{}]", node.node_type, node.data.root);

        let metadata = node.data.extra.get("metadata");
        if !options.skip_technologies {
            if let Some(list) = metadata.and_then(|m| m.get("technologies")).and_then(Value::as_array) {
                let _ = write!(out, "technologies:[{}]", join_strings(list));
            }
        }
        if !options.skip_owners {
            if let Some(owners) = metadata.and_then(|m| m.get("owners")).and_then(Value::as_object) {
                let owners: Vec<&str> = owners.keys().map(String::as_str).collect();
                let _ = write!(out, "owners:[{}]", owners.join(", "));
            }
        }
        if !options.skip_tags && !node.data.tags.is_empty() {
            let _ = write!(out, "tags:[{}]", node.data.tags.join(", "));
        }
        let _ = writeln!(out, "</{name}>");
    }
    out
}

/// Bulleted error list, worded for partial or total failure.
pub fn errors_prompt(errors: &[NxError], is_partial: bool) -> String {
    let mut out = String::from("There were errors while calculating the project graph. ");
    out.push_str(if is_partial {
        "The projects listed are still usable; the following could not be processed:\n"
    } else {
        "Due to these errors, project graph creation failed completely:\n"
    });
    for error in errors {
        let _ = writeln!(out, "- {}", error.summary());
    }
    out
}

/// Sections answering `nx_workspace`, shrunk until they fit `max_tokens`.
///
/// Returns nx.json, the graph and, when present, the errors. The last stage
/// is returned even if it is still over budget.
pub fn workspace_prompt(snapshot: &ConfigurationSnapshot, max_tokens: usize) -> Vec<String> {
    let nx_json = nx_json_prompt(snapshot.config_file.nx_json.as_ref());
    let errors = match &snapshot.errors {
        Some(errors) if !errors.is_empty() => Some(errors_prompt(errors, snapshot.is_partial)),
        _ => None,
    };
    let fixed = nx_json.len() + errors.as_ref().map_or(0, String::len);

    let mut graph = String::new();
    for options in GraphRenderOptions::stages() {
        graph = project_graph_prompt(&snapshot.graph, options);
        if (fixed + graph.len()) / CHARS_PER_TOKEN < max_tokens {
            break;
        }
    }

    let mut sections = vec![nx_json, graph];
    sections.extend(errors);
    sections
}

/// One-line summary of a target.
///
/// `build: nx:run-commands - 'tsc -p .' | cache: false | depends: [^build]`
pub fn compress_target(name: &str, target: &TargetConfiguration) -> String {
    let Some(executor) = target.executor.as_deref() else {
        return match &target.command {
            Some(command) => format!("{name}: '{command}'"),
            None => format!("{name}: no executor"),
        };
    };

    let mut line = format!("{name}: {executor}");
    let options = target.options.as_ref();
    match executor {
        "nx:run-commands" => {
            let commands = options
                .and_then(|o| o.get("commands"))
                .and_then(Value::as_array);
            let command = target
                .command
                .clone()
                .or_else(|| options.and_then(|o| o.get("command")).and_then(Value::as_str).map(str::to_string));
            match (commands, command) {
                (Some(list), _) if list.len() > 1 => {
                    let _ = write!(line, " - {} commands", list.len());
                }
                (Some(list), None) if list.len() == 1 => {
                    let _ = write!(line, " - '{}'", join_strings(list));
                }
                (_, Some(command)) => {
                    let _ = write!(line, " - '{command}'");
                }
                _ => {}
            }
        }
        "nx:run-script" => {
            let script = target
                .extra
                .get("metadata")
                .and_then(|m| m.get("runCommand"))
                .and_then(Value::as_str)
                .or_else(|| options.and_then(|o| o.get("script")).and_then(Value::as_str));
            if let Some(script) = script {
                let _ = write!(line, " - '{script}'");
            }
        }
        _ => {}
    }

    if target.extra.get("cache") == Some(&Value::Bool(false)) {
        line.push_str(" | cache: false");
    }

    if let Some(Value::Array(deps)) = &target.depends_on {
        let deps: Vec<String> = deps.iter().map(dependency_label).collect();
        if !deps.is_empty() {
            let listed = if deps.len() > 5 {
                format!("{}, +{} more", deps[..3].join(", "), deps.len() - 3)
            } else {
                deps.join(", ")
            };
            let _ = write!(line, " | depends: [{listed}]");
        }
    }
    line
}

fn dependency_label(dep: &Value) -> String {
    match dep {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let target = obj.get("target").and_then(Value::as_str).unwrap_or("?");
            match obj.get("projects") {
                Some(Value::String(p)) => format!("{p}:{target}"),
                _ if obj.get("dependencies") == Some(&Value::Bool(true)) => format!("^{target}"),
                _ => target.to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn join_strings(list: &[Value]) -> String {
    list.iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Value at a dot path such as `targets.build.options`.
pub fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxscope_core::{GraphDependency, ProjectGraphNode, ProjectNodeData};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn target(value: Value) -> TargetConfiguration {
        serde_json::from_value(value).unwrap()
    }

    fn graph() -> WorkspaceGraph {
        let mut graph = WorkspaceGraph::default();
        for (name, tags) in [("app", vec!["type:app"]), ("lib", vec![])] {
            let mut data = ProjectNodeData {
                root: format!("libs/{name}"),
                tags: tags.into_iter().map(str::to_string).collect(),
                ..Default::default()
            };
            data.targets.insert("build".to_string(), TargetConfiguration::default());
            data.targets
                .insert("nx-release-publish".to_string(), TargetConfiguration::default());
            data.extra.insert(
                "metadata".to_string(),
                json!({"technologies": ["react"], "owners": {"@team/web": {}}}),
            );
            graph.nodes.insert(
                name.to_string(),
                ProjectGraphNode {
                    name: name.to_string(),
                    node_type: "lib".to_string(),
                    data,
                },
            );
        }
        graph.dependencies.insert(
            "app".to_string(),
            vec![GraphDependency {
                source: "app".to_string(),
                target: "lib".to_string(),
                dependency_type: "static".to_string(),
            }],
        );
        graph
    }

    #[test]
    fn test_project_graph_prompt_lines() {
        let text = project_graph_prompt(&graph(), GraphRenderOptions::default());
        assert!(text.contains(
            "<app>deps:[lib]targets:[build]type:[lib]root:[libs/app]technologies:[react]owners:[@team/web]tags:[type:app]</app>"
        ));
        assert!(text.contains("<lib>deps:[]"));
        assert!(!text.contains("nx-release-publish"));
    }

    #[test]
    fn test_project_graph_prompt_trimmed() {
        let options = GraphRenderOptions::stages()[3];
        let text = project_graph_prompt(&graph(), options);
        assert!(text.contains("<app>deps:[lib]targets:[1 targets]type:[lib]root:[libs/app]</app>"));
    }

    #[test]
    fn test_errors_prompt_wording() {
        let errors = vec![NxError::named("CreateNodesError", "bad json").with_file("libs/x/project.json")];
        assert!(errors_prompt(&errors, true).contains("still usable"));
        let fatal = errors_prompt(&errors, false);
        assert!(fatal.contains("failed completely"));
        assert!(fatal.contains("- CreateNodesError (libs/x/project.json): bad json"));
    }

    #[test]
    fn test_compress_target() {
        assert_eq!(
            compress_target("build", &target(json!({"executor": "nx:run-commands", "command": "echo test", "cache": true}))),
            "build: nx:run-commands - 'echo test'"
        );
        assert_eq!(
            compress_target("build", &target(json!({"executor": "nx:run-commands", "command": "echo test", "cache": false}))),
            "build: nx:run-commands - 'echo test' | cache: false"
        );
        assert_eq!(
            compress_target("build", &target(json!({"executor": "nx:run-commands", "options": {"commands": ["a", "b", "c"]}}))),
            "build: nx:run-commands - 3 commands"
        );
        assert_eq!(
            compress_target("test", &target(json!({"executor": "nx:run-script", "metadata": {"runCommand": "npm run test"}}))),
            "test: nx:run-script - 'npm run test'"
        );
        assert_eq!(compress_target("build", &target(json!({"cache": true}))), "build: no executor");
    }

    #[test]
    fn test_compress_target_dependencies() {
        let deps: Vec<String> = (1..=11).map(|i| format!("dep{i}")).collect();
        assert_eq!(
            compress_target("build", &target(json!({"executor": "@nx/gradle:gradle", "dependsOn": deps}))),
            "build: @nx/gradle:gradle | depends: [dep1, dep2, dep3, +8 more]"
        );
        assert_eq!(
            compress_target(
                "build",
                &target(json!({"executor": "x:y", "dependsOn": [{"target": "build", "dependencies": true}, {"projects": "lib", "target": "lint"}]}))
            ),
            "build: x:y | depends: [^build, lib:lint]"
        );
    }

    #[test]
    fn test_select_path() {
        let value = json!({"targets": {"build": {"executor": "e"}}, "tags": ["a", "b"]});
        assert_eq!(select_path(&value, "targets.build.executor"), Some(&json!("e")));
        assert_eq!(select_path(&value, "tags.1"), Some(&json!("b")));
        assert_eq!(select_path(&value, "targets.test"), None);
        assert_eq!(select_path(&value, ""), Some(&value));
    }
}
