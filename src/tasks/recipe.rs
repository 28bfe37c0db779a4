//! Drives one [`InstallRecipe`] from prerequisites to verification.
use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, bail};

use super::{Context, Task, TaskResult, actions, verify};
use crate::error::{InstallError, InstallWarning};
use crate::recipes::{InstallRecipe, Plan, VersionSource, Vars};
use crate::resources::ResourceChange;
use crate::resources::package::PackageManagerKind;
use crate::resources::env_fragment::EnvFragment;

/// Progress of a recipe; a fatal error at any point ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing done yet.
    Pending,
    /// Prerequisite packages are present.
    PrerequisitesChecked,
    /// Install steps completed (or were not needed).
    Installed,
    /// Environment fragment written.
    EnvWritten,
    /// Verification command ran.
    Verified,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::PrerequisitesChecked => "prerequisites checked",
            Self::Installed => "installed",
            Self::EnvWritten => "environment written",
            Self::Verified => "verified",
        })
    }
}

/// Installs one tool.
#[derive(Debug)]
pub struct RecipeTask {
    recipe: InstallRecipe,
}

impl RecipeTask {
    /// Wrap a recipe.
    #[must_use]
    pub const fn new(recipe: InstallRecipe) -> Self {
        Self { recipe }
    }

    fn advance(&self, ctx: &Context, stage: &mut Stage, next: Stage) {
        ctx.log
            .debug(&format!("{}: {stage} -> {next}", self.recipe.name));
        *stage = next;
    }

    /// The tool's profile fragment, rendered with `vars`.
    fn fragment(&self, ctx: &Context, plan: &Plan, vars: &Vars) -> Option<EnvFragment> {
        if plan.env.is_empty() {
            return None;
        }
        let path = ctx
            .settings
            .paths
            .profile_dir
            .join(format!("{}.sh", self.recipe.name));
        Some(
            plan.env
                .iter()
                .fold(EnvFragment::new(path), |fragment, (key, value)| {
                    fragment.export(key, &vars.render(value))
                }),
        )
    }

    fn version(&self, ctx: &Context, plan: &Plan) -> Result<Option<String>, InstallError> {
        if !plan.needs_version() {
            return Ok(None);
        }
        if ctx.dry_run
            && matches!(self.recipe.version, VersionSource::Latest { .. })
            && ctx.settings.version_for(self.recipe.name).is_none()
        {
            return Ok(Some("latest".to_string()));
        }
        let version = self
            .recipe
            .resolve_version(&ctx.settings, ctx.fetcher.as_ref())?;
        if let Some(version) = &version {
            ctx.log
                .info(&format!("{}: version {version}", self.recipe.name));
        }
        Ok(version)
    }

    fn ensure_prerequisites(
        &self,
        ctx: &Context,
        warnings: &mut Vec<InstallWarning>,
    ) -> Result<(), InstallError> {
        let adapter = ctx.adapter()?;
        let prerequisites = self.recipe.prerequisites_for(adapter.kind());
        if prerequisites.is_empty() {
            return Ok(());
        }
        if ctx.dry_run {
            ctx.log.dry_run(&format!(
                "ensure prerequisites: {}",
                prerequisites.join(" ")
            ));
            return Ok(());
        }
        actions::install_packages(
            ctx,
            adapter,
            prerequisites,
            self.recipe.refresh_is_fatal,
            warnings,
        )?;
        Ok(())
    }

    fn install(
        &self,
        ctx: &Context,
        plan: &Plan,
        vars: &Vars,
        warnings: &mut Vec<InstallWarning>,
    ) -> Result<(), InstallError> {
        let adapter = ctx.adapter()?;
        for action in &plan.actions {
            let action = action.render(vars);
            if ctx.dry_run {
                ctx.log.dry_run(&action.describe());
                continue;
            }
            match actions::apply(ctx, adapter, &action, self.recipe.refresh_is_fatal, warnings)? {
                ResourceChange::Applied => ctx.log.debug(&format!("applied: {}", action.describe())),
                ResourceChange::AlreadyCorrect => {
                    ctx.log.debug(&format!("ok: {}", action.describe()));
                }
                ResourceChange::Skipped { reason } => {
                    ctx.log.debug(&format!("skipped {}: {reason}", action.describe()));
                }
            }
        }
        Ok(())
    }

    /// For a tool found before installing: the first directory `fragment`
    /// names that does not exist, unless the tool was found through the
    /// fragment's own `PATH` entries.
    fn stale_target(&self, ctx: &Context, fragment: &EnvFragment) -> Option<PathBuf> {
        let own_path = fragment.path_prepends(&ctx.home);
        if self
            .recipe
            .probe
            .is_some_and(|p| verify::locate_in(p, &own_path).is_some())
        {
            return None;
        }
        fragment.missing_dirs(&ctx.home).into_iter().next()
    }

    fn verify(&self, ctx: &Context, extra_path: &[PathBuf], warnings: &mut Vec<InstallWarning>) {
        let Some(command) = self.recipe.verify else {
            return;
        };
        ctx.log.debug(&format!(
            "verifying `{command}` on {}",
            verify::describe_search(extra_path)
        ));
        match verify::verify(ctx.executor.as_ref(), command, extra_path) {
            Ok(version) => ctx.log.info(&format!("{}: {version}", self.recipe.name)),
            Err(e) => warnings.push(e.into()),
        }
    }
}

impl Task for RecipeTask {
    fn name(&self) -> &str {
        self.recipe.name
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let kind = ctx.adapter()?.kind();
        let Some(plan) = self.recipe.plan(kind) else {
            bail!("{} has no install path for {kind}", self.recipe.name);
        };
        let mut stage = Stage::Pending;
        let mut warnings = Vec::new();

        let base = Vars::new(&ctx.profile, &ctx.settings.paths, &ctx.home);
        let extra_path = self
            .fragment(ctx, plan, &base)
            .map(|f| f.path_prepends(&ctx.home))
            .unwrap_or_default();
        let present = self
            .recipe
            .probe
            .is_some_and(|p| verify::is_present(ctx.executor.as_ref(), p, &extra_path));

        if present {
            ctx.log
                .info(&format!("{} already present, skipping install", self.recipe.name));
            self.advance(ctx, &mut stage, Stage::PrerequisitesChecked);
            self.advance(ctx, &mut stage, Stage::Installed);
        } else {
            self.ensure_prerequisites(ctx, &mut warnings)?;
            self.advance(ctx, &mut stage, Stage::PrerequisitesChecked);
        }

        let vars = if present {
            base
        } else {
            let version = self.version(ctx, plan)?;
            base.with_version(version.as_deref())
        };

        if !present {
            self.install(ctx, plan, &vars, &mut warnings)?;
            self.advance(ctx, &mut stage, Stage::Installed);
        }

        if let Some(fragment) = self.fragment(ctx, plan, &vars) {
            let stale = if present {
                self.stale_target(ctx, &fragment)
            } else {
                None
            };
            if let Some(missing) = stale {
                let warning = InstallWarning::EnvSkipped {
                    path: fragment.path.display().to_string(),
                    missing: missing.display().to_string(),
                };
                ctx.log.warn(&warning.to_string());
                warnings.push(warning);
            } else if ctx.dry_run {
                ctx.log
                    .dry_run(&format!("write {}", fragment.path.display()));
            } else if fragment.write()? == ResourceChange::Applied {
                ctx.log.info(&format!("wrote {}", fragment.path.display()));
            }
        }
        self.advance(ctx, &mut stage, Stage::EnvWritten);

        if ctx.dry_run {
            return Ok(TaskResult::DryRun);
        }

        self.verify(ctx, &extra_path, &mut warnings);
        self.advance(ctx, &mut stage, Stage::Verified);

        if warnings.is_empty() {
            Ok(TaskResult::Ok)
        } else {
            Ok(TaskResult::Warn(
                warnings.iter().map(ToString::to_string).collect(),
            ))
        }
    }
}

/// Re-runs a tool's verification command without installing anything.
#[derive(Debug)]
pub struct VerifyTask {
    inner: RecipeTask,
}

impl VerifyTask {
    /// Wrap a recipe.
    #[must_use]
    pub const fn new(recipe: InstallRecipe) -> Self {
        Self {
            inner: RecipeTask::new(recipe),
        }
    }
}

impl Task for VerifyTask {
    fn name(&self) -> &str {
        self.inner.recipe.name
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let recipe = &self.inner.recipe;
        let Some(command) = recipe.verify else {
            return Ok(TaskResult::Skipped("no verification command".to_string()));
        };
        let kind = ctx.adapter.as_ref().map_or_else(
            || PackageManagerKind::for_os_id(&ctx.profile.id),
            |adapter| adapter.kind(),
        );
        let vars = Vars::new(&ctx.profile, &ctx.settings.paths, &ctx.home);
        let extra_path = recipe
            .plan(kind)
            .and_then(|plan| self.inner.fragment(ctx, plan, &vars))
            .map(|f| f.path_prepends(&ctx.home))
            .unwrap_or_default();
        let version = verify::verify(ctx.executor.as_ref(), command, &extra_path)?;
        ctx.log.info(&format!("{}: {version}", recipe.name));
        Ok(TaskResult::Ok)
    }
}

/// Task recorded for a name with no recipe.
#[derive(Debug)]
pub struct UnknownTool {
    name: String,
}

impl UnknownTool {
    /// Create the placeholder task.
    #[must_use]
    pub const fn new(name: String) -> Self {
        Self { name }
    }
}

impl Task for UnknownTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, _ctx: &Context) -> Result<TaskResult> {
        Err(InstallError::UnknownTool(self.name.clone()).into())
    }
}
