//! The rich-text save pipeline that hosts [`LinkProtector`](crate::LinkProtector).
//!
//! A [`SavePipeline`] runs [`ContentProcessor`] steps in order over a shared
//! [`SaveContentArgs`]. Any step may abort the pipeline; later steps are then
//! skipped.

/// Arguments passed through the save pipeline: the content being saved and
/// whether a previous step aborted the save.
#[derive(Clone, Debug, Default)]
pub struct SaveContentArgs {
    content: String,
    aborted: bool,
}

impl SaveContentArgs {
    /// Create new arguments for saving `content`, not aborted.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            aborted: false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Mutable access for steps that rewrite the content in place.
    pub fn content_mut(&mut self) -> &mut String {
        &mut self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn into_content(self) -> String {
        self.content
    }

    /// Stop the pipeline after the current step.
    pub fn abort_pipeline(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

/// A single step of the save pipeline.
///
/// Steps must be `Send + Sync` so one pipeline can serve concurrent save
/// requests. Any `Fn(&mut SaveContentArgs)` closure is a step.
pub trait ContentProcessor: Send + Sync {
    /// Inspect or rewrite the content, or abort the pipeline.
    fn process(&self, args: &mut SaveContentArgs);
}

impl<F> ContentProcessor for F
where
    F: Fn(&mut SaveContentArgs) + Send + Sync,
{
    fn process(&self, args: &mut SaveContentArgs) {
        self(args)
    }
}

/// An ordered chain of [`ContentProcessor`] steps.
///
/// # Example
///
/// ```
/// use link_protector::{LinkProtector, SaveContentArgs, SavePipeline};
///
/// let mut pipeline = SavePipeline::new();
/// pipeline.add(|args: &mut SaveContentArgs| {
///     let trimmed = args.content().trim().to_string();
///     args.set_content(trimmed);
/// });
/// pipeline.add(LinkProtector::builder().build().unwrap());
///
/// let out = pipeline.process_content(r#"  <a href="https://example.org" target="_blank">x</a> "#);
/// assert!(out.starts_with(r#"<a rel="noopener noreferrer""#));
/// ```
pub struct SavePipeline {
    processors: Vec<Box<dyn ContentProcessor>>,
}

impl SavePipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Append a step to the end of the pipeline.
    pub fn add(&mut self, processor: impl ContentProcessor + 'static) {
        self.processors.push(Box::new(processor));
    }

    /// Run the steps in order, stopping once `args` is aborted.
    pub fn run(&self, args: &mut SaveContentArgs) {
        for (index, processor) in self.processors.iter().enumerate() {
            if args.is_aborted() {
                tracing::debug!("Save pipeline aborted before step {index}");
                return;
            }
            processor.process(args);
        }
    }

    /// Run the pipeline over `content` and return the result.
    pub fn process_content(&self, content: &str) -> String {
        let mut args = SaveContentArgs::new(content);
        self.run(&mut args);
        args.into_content()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Returns `true` if no steps have been added.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl Default for SavePipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn pipeline_empty_is_empty() {
        let pipeline = SavePipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.len(), 0);
    }

    #[test]
    fn pipeline_default_is_empty() {
        assert!(SavePipeline::default().is_empty());
    }

    #[test]
    fn pipeline_with_no_steps_returns_original() {
        let pipeline = SavePipeline::new();
        assert_eq!(pipeline.process_content("<p>original</p>"), "<p>original</p>");
    }

    #[test]
    fn pipeline_runs_steps_in_order() {
        let mut pipeline = SavePipeline::new();
        pipeline.add(|args: &mut SaveContentArgs| args.content_mut().push_str("-a"));
        pipeline.add(|args: &mut SaveContentArgs| args.content_mut().push_str("-b"));
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.process_content("x"), "x-a-b");
    }

    #[test]
    fn pipeline_stops_after_abort() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_calls);

        let mut pipeline = SavePipeline::new();
        pipeline.add(|args: &mut SaveContentArgs| args.abort_pipeline());
        pipeline.add(move |_: &mut SaveContentArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut args = SaveContentArgs::new("<p>x</p>");
        pipeline.run(&mut args);
        assert!(args.is_aborted());
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn args_accessors() {
        let mut args = SaveContentArgs::new("a");
        args.set_content("b");
        assert_eq!(args.content(), "b");
        assert!(!args.is_aborted());
        assert_eq!(args.into_content(), "b");
    }
}
