//! Run orchestration.
//!
//! A run moves through `Validating → Bootstrapping → Rendering → Committing →
//! HookRunning → Finalizing`. Nothing is written before `Committing`, so only
//! failures from that point on need a rollback of the destination.

use log::{debug, info, warn};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::hooks::run_hooks;
use crate::ignore::parse_ignore_file;
use crate::processor::{commit, Processor, RenderItem};
use crate::renderer::{MiniJinjaRenderer, TemplateRenderer};

/// Stages of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Validating,
    Bootstrapping,
    Rendering,
    Committing,
    HookRunning,
    Finalizing,
    Done,
    RolledBack,
}

/// How a run ended, as seen by [`crate::loader::Source::finalize`].
#[derive(Debug)]
pub enum RunOutcome<'a> {
    Success,
    Failure {
        error: &'a Error,
        /// The destination had been written to and was rolled back.
        partially_written: bool,
    },
}

impl RunOutcome<'_> {
    pub fn is_rollback(&self) -> bool {
        matches!(
            self,
            RunOutcome::Failure {
                partially_written: true,
                ..
            }
        )
    }
}

/// Materializes a [`Context`] with a template engine.
pub struct Runner {
    engine: Box<dyn TemplateRenderer>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(Box::new(MiniJinjaRenderer::new()))
    }
}

impl Runner {
    pub fn new(engine: Box<dyn TemplateRenderer>) -> Self {
        Self { engine }
    }

    fn enter(&self, state: RunState) {
        debug!("Run state: {state:?}");
    }

    /// Runs the whole pipeline for `context`.
    ///
    /// # Errors
    /// Any stage error is returned as is. When the destination was already
    /// written and cleaning up fails too, an `Error::RollbackError` carrying
    /// the original error is returned instead.
    pub fn run(&self, context: &mut Context) -> Result<()> {
        let dry_run = context.options().dry_run;

        self.enter(RunState::Validating);
        context.destination().check()?;
        context.source().validate()?;
        if !dry_run {
            context.destination().validate()?;
        }

        self.enter(RunState::Bootstrapping);
        info!("Using template from the {}", context.source());
        if let Err(error) = context.source_mut().bootstrap() {
            context.destination().discard_if_created();
            return Err(error);
        }

        self.enter(RunState::Rendering);
        let items = match self.render(context) {
            Ok(items) => items,
            Err(error) => return Err(self.abort(context, error, false)),
        };

        if dry_run {
            for item in &items {
                let kind = if item.is_directory { "directory" } else { "file" };
                info!("Would create {kind}: '{}'", item.target().display());
            }
        } else {
            self.enter(RunState::Committing);
            if let Err(error) = commit(items) {
                return Err(self.abort(context, error, true));
            }

            self.enter(RunState::HookRunning);
            if let Err(error) = self.run_hooks(context) {
                return Err(self.abort(context, error, true));
            }
        }

        self.enter(RunState::Finalizing);
        context.source_mut().finalize(&RunOutcome::Success)?;

        if dry_run {
            info!("Dry run finished; nothing was written.");
        } else {
            info!(
                "Template generation completed successfully in {}.",
                context.destination().path().display()
            );
        }
        self.enter(RunState::Done);
        Ok(())
    }

    /// Plans the output without writing anything.
    pub fn render(&self, context: &Context) -> Result<Vec<RenderItem>> {
        let template_context = context.template_context()?;
        let source = context.source();
        let template_root = source.template_root();
        if !template_root.is_dir() {
            return Err(Error::NotADirectoryError {
                path: template_root,
            });
        }

        let ignored_patterns = parse_ignore_file(source.absolute_path())?;
        let processor = Processor::new(
            &*self.engine,
            template_context,
            &context.options().template_marker_ext,
            &ignored_patterns,
        );
        processor.render(&template_root, context.destination().absolute_path())
    }

    fn run_hooks(&self, context: &Context) -> Result<()> {
        let values = context.template_context()?.values();
        run_hooks(
            context.source().hooks_root(),
            context.destination().absolute_path(),
            values,
        )
    }

    /// Cleans up after a failed stage and returns the error to report.
    fn abort(&self, context: &mut Context, error: Error, partially_written: bool) -> Error {
        let mut failures = Vec::new();

        if partially_written {
            self.enter(RunState::RolledBack);
            if let Err(e) = context.destination().rollback() {
                failures.push(format!("removing destination: {e}"));
            }
        } else {
            context.destination().discard_if_created();
        }

        let outcome = RunOutcome::Failure {
            error: &error,
            partially_written,
        };
        if let Err(e) = context.source_mut().finalize(&outcome) {
            failures.push(format!("finalizing source: {e}"));
        }

        if failures.is_empty() {
            if partially_written {
                warn!("Run failed; destination rolled back.");
            }
            error
        } else {
            Error::RollbackError {
                original: Box::new(error),
                reason: failures.join("; "),
            }
        }
    }
}
