//! Everything one run needs: where the template comes from, where it goes,
//! how to run, and the values to render with.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::config::Options;
use crate::destination::Destination;
use crate::error::Result;
use crate::loader::{create_source, Source};
use crate::values::{
    build_context, find_default_values, validate_values, TemplateContext, VALUES_SCHEMA_FILE,
};

/// A single source/destination pair plus the options for materializing it.
pub struct Context {
    source: Box<dyn Source>,
    destination: Destination,
    options: Options,
    values_file: Option<PathBuf>,
    template_context: OnceCell<TemplateContext>,
}

impl Context {
    pub fn new(
        source: Box<dyn Source>,
        destination: Destination,
        values_file: Option<PathBuf>,
        options: Options,
    ) -> Self {
        Self {
            source,
            destination,
            options,
            values_file,
            template_context: OnceCell::new(),
        }
    }

    /// Builds a context from the three inputs the command line supplies.
    pub fn from_locators<P: AsRef<Path>>(
        source: &str,
        destination: P,
        values_file: Option<PathBuf>,
        options: Options,
    ) -> Result<Self> {
        let source = create_source(source, &options)?;
        let destination = Destination::new(destination)?;
        Ok(Self::new(source, destination, values_file, options))
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn Source {
        self.source.as_mut()
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The merged values, read on first use and reused for the rest of the run.
    ///
    /// Must not be called before the source is bootstrapped: a remote source's
    /// default values only exist once it has been cloned.
    pub fn template_context(&self) -> Result<&TemplateContext> {
        if let Some(context) = self.template_context.get() {
            return Ok(context);
        }

        let source_root = self.source.absolute_path();
        let defaults = find_default_values(source_root)?;
        let context = build_context(&defaults, self.values_file.as_deref())?;

        let schema = source_root.join(VALUES_SCHEMA_FILE);
        if schema.is_file() {
            validate_values(&schema, &context)?;
        }

        Ok(self.template_context.get_or_init(|| context))
    }
}
