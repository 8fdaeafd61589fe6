//! Interpretation engine: run the right transformer for a source file.
//!
//! The engine resolves a transformer through the [`Registry`] and hands it the
//! source path, a writer and the context. It performs no post-processing; the
//! transformer owns reading the source and producing the complete output.
//! Errors from the transformer come back to the caller unchanged.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::trace;

use crate::registry::{Context, Registry, TransformError, Transformer};

/// Interpret `source` into an already open writer.
pub fn interpret_to_stream(
    registry: &Registry,
    source: &Path,
    destination: &mut dyn Write,
    context: &Context,
) -> Result<(), TransformError> {
    let filename = source
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let transformer = registry.resolve_transformer(&filename);
    trace!(source = %source.display(), transformer = transformer.name(), "interpreting");
    transformer.invoke(source, destination, context)
}

/// Interpret `source` into a file at `destination`, creating or truncating it.
///
/// The file handle is dropped (and therefore closed) on every return path,
/// including a failing transformer. Output written before the failure is
/// left in place.
pub fn interpret_to_path(
    registry: &Registry,
    source: &Path,
    destination: &Path,
    context: &Context,
) -> Result<(), TransformError> {
    let mut writer = BufWriter::new(File::create(destination)?);
    interpret_to_stream(registry, source, &mut writer, context)?;
    writer.flush()?;
    Ok(())
}

/// Stream the raw bytes of `source` into `destination`.
///
/// Uses a bounded buffer, so file size does not affect memory use. Returns the
/// number of bytes copied.
pub fn default_copy(source: &Path, destination: &mut dyn Write) -> io::Result<u64> {
    let mut file = File::open(source)?;
    io::copy(&mut file, destination)
}

/// Adapt a renderer that returns its output into a stream-writing transformer.
///
/// Template engines usually render to a `String`; the adapter writes the
/// returned value to the destination in one call.
pub fn save_returned<F>(name: impl Into<String>, render: F) -> Transformer
where
    F: Fn(&Path, &Context) -> Result<String, TransformError> + Send + Sync + 'static,
{
    Transformer::new(name, move |source, destination, context| {
        let rendered = render(source, context)?;
        destination.write_all(rendered.as_bytes())?;
        Ok(())
    })
}
