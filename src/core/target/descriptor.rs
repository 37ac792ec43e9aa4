//! Descriptor blocks handed to the build-file renderer.
//!
//! A target's descriptor is an ordered list of blocks, one per build rule,
//! each an ordered list of `(keyword, value)` pairs. Rendering them into a
//! concrete build-file dialect is left to the consumer.

use serde::Serialize;

use super::core::{Target, TargetKind, TestRunner};
use crate::core::target::requirement_key;
use crate::resolver::errors::RegistrationError;
use crate::util::config::Config;

/// A value in a descriptor block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Str(String),
    List(Vec<String>),
    /// Unordered in the build file; kept sorted here
    Set(Vec<String>),
    Bool(bool),
}

/// One keyword argument of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorField {
    pub keyword: String,
    pub value: FieldValue,
}

/// One build rule invocation, e.g. `python_library(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorBlock {
    pub rule: String,
    pub fields: Vec<DescriptorField>,
}

impl DescriptorBlock {
    fn new(rule: &str) -> Self {
        DescriptorBlock {
            rule: rule.to_string(),
            fields: Vec::new(),
        }
    }

    fn field(mut self, keyword: &str, value: FieldValue) -> Self {
        self.fields.push(DescriptorField {
            keyword: keyword.to_string(),
            value,
        });
        self
    }

    fn str(self, keyword: &str, value: impl Into<String>) -> Self {
        self.field(keyword, FieldValue::Str(value.into()))
    }

    fn list<I, S>(self, keyword: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field(
            keyword,
            FieldValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Value of a field by keyword.
    pub fn get(&self, keyword: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.keyword == keyword)
            .map(|f| &f.value)
    }

    /// The `name` field, if set.
    pub fn name(&self) -> Option<&str> {
        match self.get("name") {
            Some(FieldValue::Str(name)) => Some(name),
            _ => None,
        }
    }
}

/// Sort dependency strings case-insensitively, dropping duplicates.
pub fn sort_dependencies(mut dependencies: Vec<String>) -> Vec<String> {
    dependencies.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));
    dependencies.dedup();
    dependencies
}

impl Target {
    /// Descriptor blocks for this target.
    ///
    /// `dependencies` holds the [`Target::dependency_descriptor`] of every
    /// resolved dependency. Returns no blocks when the package opted out of
    /// build file generation.
    pub fn descriptor_blocks(
        &self,
        dependencies: &[String],
        config: &Config,
    ) -> Result<Vec<DescriptorBlock>, RegistrationError> {
        if !self.config().generate_build_file {
            tracing::debug!("Skipping descriptor for {}", self.key());
            return Ok(Vec::new());
        }

        let blocks = match self.kind() {
            TargetKind::Library => {
                let mut blocks = Vec::new();
                if self.config().resource_glob_path.is_some() {
                    blocks.push(self.resources_block());
                }
                blocks.push(self.library_block(None, self.package_sources(), dependencies, true));
                blocks
            }

            TargetKind::Binary => {
                let script = self.console_script(&config.manifest_marker)?;
                let mut blocks = vec![
                    self.library_block(Some("lib"), self.package_sources(), dependencies, true),
                    DescriptorBlock::new("python_binary")
                        .str("name", script.name.clone())
                        .list("dependencies", [":lib"])
                        .list("sources", [script.source_path()])
                        .field("zip_safe", FieldValue::Bool(self.config().zip_safe))
                        .field("tags", self.tags_value()),
                ];
                if self.config().generate_local_binary {
                    blocks.push(self.local_binary_block(config));
                }
                if self.config().resource_glob_path.is_some() {
                    blocks.push(self.resources_block());
                }
                blocks
            }

            TargetKind::Lambda => {
                let script = self.console_script(&config.manifest_marker)?;
                let handler_path = format!("{}/lambda_handler.py", self.package_name());
                let runtime = self
                    .config()
                    .python_runtime
                    .clone()
                    .unwrap_or_else(|| config.default_python_runtime.clone());

                let mut blocks = vec![
                    self.library_block(Some("lib"), self.package_sources(), dependencies, true),
                    DescriptorBlock::new("python_binary")
                        .str("name", "bin")
                        .list("dependencies", [":lib"])
                        .list("sources", [handler_path.clone()])
                        .str("entry_point", handler_path)
                        .field("zip_safe", FieldValue::Bool(self.config().zip_safe))
                        .field("tags", self.tags_value()),
                    DescriptorBlock::new("python_awslambda")
                        .str("name", script.name)
                        .list("dependencies", [":bin"])
                        .str(
                            "handler",
                            format!("{}.lambda_handler:lambda_handler", self.package_name()),
                        )
                        .str("runtime", runtime)
                        .field("tags", self.tags_value()),
                ];
                if self.config().generate_local_binary {
                    blocks.push(self.local_binary_block(config));
                }
                blocks
            }

            TargetKind::Migration => vec![
                self.library_block(Some("lib"), "**/*.py".to_string(), dependencies, true),
                self.pex_binary_block("alembic", "alembic.config", vec![":lib".to_string()]),
                DescriptorBlock::new("archive")
                    .str("name", self.package_name())
                    .str("format", "tar")
                    .list("packages", [":alembic"])
                    .list("files", [":files"])
                    .field("tags", self.tags_value()),
                DescriptorBlock::new("files")
                    .str("name", "files")
                    .list("sources", ["alembic.ini", "env.py", "versions/*.py"]),
            ],

            TargetKind::TestSuite if self.runs_behave() => {
                let mut blocks = vec![
                    self.library_block(Some("lib"), self.package_sources(), dependencies, true),
                    DescriptorBlock::new("python_binary")
                        .str("name", "behave")
                        .list("sources", ["behave_cli.py"])
                        .list("dependencies", [":lib"])
                        .field("tags", self.tags_value()),
                ];
                if self.config().resource_glob_path.is_some() {
                    blocks.push(self.resources_block());
                }
                blocks
            }

            TargetKind::TestSuite => {
                let rendered = self.rendered_name();
                let library_dep = format!(":{}", rendered);

                let mut blocks = vec![
                    self.library_block(Some(&rendered), "**/*.py".to_string(), dependencies, false),
                    DescriptorBlock::new("python_tests")
                        .str("name", "tests")
                        .list(
                            "dependencies",
                            sort_dependencies(
                                std::iter::once(library_dep.clone())
                                    .chain(self.config().extra_dependencies.iter().cloned())
                                    .collect(),
                            ),
                        )
                        .list("sources", ["**/test_*.py"])
                        .field("tags", self.tags_value()),
                    self.pex_binary_block("unittest", "unittest", vec![library_dep.clone()]),
                ];
                if self.config().generate_pytest_binary {
                    blocks.push(self.pex_binary_block(
                        "pytest",
                        "pytest",
                        vec![
                            library_dep,
                            requirement_key(&config.requirements_dir, "pytest"),
                        ],
                    ));
                }
                if self.config().resource_glob_path.is_some() {
                    blocks.push(self.resources_block());
                }
                blocks
            }

            TargetKind::AggregateProject => vec![DescriptorBlock::new("target")
                .list("dependencies", self.dependency_list(dependencies, true))
                .field("tags", self.tags_value())],

            TargetKind::Requirement => Vec::new(),
        };

        Ok(blocks)
    }

    /// Name of a test suite's library block.
    pub fn rendered_name(&self) -> String {
        if let Some(name) = &self.config().rendered_name {
            return name.clone();
        }
        match self.test_scope() {
            Some(scope) => scope.category.as_str().to_string(),
            None => self.package_name().to_string(),
        }
    }

    fn runs_behave(&self) -> bool {
        self.test_scope()
            .is_some_and(|scope| scope.runner == TestRunner::Behave)
    }

    fn dependency_list(&self, dependencies: &[String], include_extra: bool) -> Vec<String> {
        let mut all: Vec<String> = dependencies.to_vec();
        if include_extra {
            all.extend(self.config().extra_dependencies.iter().cloned());
        }
        sort_dependencies(all)
    }

    fn tags_value(&self) -> FieldValue {
        FieldValue::Set(self.tags().iter().cloned().collect())
    }

    fn package_sources(&self) -> String {
        format!("{}/**/*.py", self.package_name())
    }

    fn library_block(
        &self,
        name: Option<&str>,
        sources: String,
        dependencies: &[String],
        include_extra: bool,
    ) -> DescriptorBlock {
        let mut block = DescriptorBlock::new("python_library");
        if let Some(name) = name {
            block = block.str("name", name);
        }
        block
            .list("dependencies", self.dependency_list(dependencies, include_extra))
            .list("sources", [sources])
            .field("tags", self.tags_value())
    }

    fn resources_block(&self) -> DescriptorBlock {
        let mut globs = self.config().resource_globs();
        if globs.is_empty() {
            globs.push("**/*".to_string());
        }
        DescriptorBlock::new("resources")
            .str("name", "resources")
            .list("sources", globs)
    }

    fn local_binary_block(&self, config: &Config) -> DescriptorBlock {
        DescriptorBlock::new("python_binary")
            .str("name", "local")
            .list(
                "dependencies",
                [requirement_key(&config.requirements_dir, "aiohttp"), ":lib".to_string()],
            )
            .list("sources", [format!("{}/local.py", self.package_name())])
            .field("tags", self.tags_value())
    }

    fn pex_binary_block(&self, name: &str, entry_point: &str, dependencies: Vec<String>) -> DescriptorBlock {
        DescriptorBlock::new("pex_binary")
            .str("name", name)
            .str("entry_point", entry_point)
            .list("dependencies", dependencies)
            .field("zip_safe", FieldValue::Bool(self.config().zip_safe))
    }
}
