//! Operation bodies shared by the synchronous and asynchronous surfaces.
//!
//! Everything here is `Send`-only: buffer handles and owned inputs. The sync
//! methods call these directly on the main thread; the async methods move
//! the same calls into a job body.

use crate::env::JobOutput;
use crate::{Error, HostResult};
use carta_core::{BufferHandle, Palette, RgbaBuffer};
use carta_io::ImageReader;
use tracing::debug;

impl JobOutput {
    pub(crate) fn into_bytes(self) -> HostResult<Vec<u8>> {
        match self {
            JobOutput::Bytes(b) => Ok(b),
            other => Err(unexpected("bytes", &other)),
        }
    }

    pub(crate) fn into_buffer(self) -> HostResult<RgbaBuffer> {
        match self {
            JobOutput::Buffer(b) => Ok(b),
            other => Err(unexpected("buffer", &other)),
        }
    }
}

fn unexpected(wanted: &str, got: &JobOutput) -> Error {
    let got = match got {
        JobOutput::Unit => "unit",
        JobOutput::Bytes(_) => "bytes",
        JobOutput::Buffer(_) => "buffer",
    };
    Error::Internal(format!("job produced {} where {} was expected", got, wanted))
}

pub(crate) fn clear(buffer: &BufferHandle) {
    buffer.write().clear();
}

pub(crate) fn premultiply(buffer: &BufferHandle) {
    buffer.write().premultiply();
}

pub(crate) fn demultiply(buffer: &BufferHandle) {
    buffer.write().demultiply();
}

pub(crate) fn encode(buffer: &BufferHandle, format: &str, palette: Option<&Palette>) -> HostResult<Vec<u8>> {
    Ok(carta_io::save_to_string(&buffer.read(), format, palette)?)
}

fn read_all(reader: &mut dyn ImageReader) -> HostResult<RgbaBuffer> {
    let mut buffer = RgbaBuffer::new(reader.width(), reader.height())?;
    reader.read(0, 0, &mut buffer)?;
    Ok(buffer)
}

pub(crate) fn load_file(filename: &str) -> HostResult<RgbaBuffer> {
    let Some(format) = carta_io::type_from_filename(filename) else {
        return Err(Error::load(format!("Unsupported image format: {}", filename)));
    };
    let mut reader = carta_io::get_image_reader(filename, format).map_err(|e| {
        debug!(filename, error = %e, "reader construction failed");
        Error::load(format!("Failed to load: {}", filename))
    })?;
    read_all(reader.as_mut())
}

pub(crate) fn load_bytes(bytes: &[u8]) -> HostResult<RgbaBuffer> {
    let mut reader = carta_io::get_image_reader_from_bytes(bytes).map_err(|e| {
        debug!(len = bytes.len(), error = %e, "reader construction failed");
        Error::load("Failed to load from buffer")
    })?;
    read_all(reader.as_mut())
}

/// Inputs of a composite job, minus the host objects.
#[cfg(feature = "composite")]
#[derive(Debug, Clone)]
pub(crate) struct CompositeJob {
    pub(crate) source: BufferHandle,
    pub(crate) mode: carta_ops::CompositeMode,
    pub(crate) opacity: f32,
    pub(crate) dx: i32,
    pub(crate) dy: i32,
    pub(crate) filters: Vec<carta_ops::ImageFilter>,
}

/// Filters the source in place, then composites a copy of it onto `target`.
///
/// Copying first means the source lock is never held together with the
/// target lock, and a source that is also the target reads unmodified pixels.
#[cfg(feature = "composite")]
pub(crate) fn composite(target: &BufferHandle, job: &CompositeJob) -> HostResult<()> {
    if !job.filters.is_empty() {
        carta_ops::apply_filters(&mut job.source.write(), &job.filters)?;
    }
    let source = job.source.snapshot();
    carta_ops::composite(&mut target.write(), &source, job.mode, job.opacity, job.dx, job.dy)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use carta_core::Color;

    #[test]
    fn load_errors_are_load_kind() {
        let err = load_file("picture.bmp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert_eq!(err.message(), "Unsupported image format: picture.bmp");

        let err = load_file("/definitely/not/here.png").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert_eq!(err.message(), "Failed to load: /definitely/not/here.png");

        let err = load_bytes(b"nope").unwrap_err();
        assert_eq!(err.message(), "Failed to load from buffer");
    }

    #[test]
    fn encode_then_load() {
        let handle = BufferHandle::new(RgbaBuffer::new(3, 2).unwrap());
        handle.write().fill(Color::new(1, 2, 3, 4));
        let bytes = encode(&handle, "png", None).unwrap();
        let back = load_bytes(&bytes).unwrap();
        assert_eq!(back, *handle.read());
    }

    #[test]
    fn output_mismatch_is_internal() {
        let err = JobOutput::Unit.into_bytes().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[cfg(feature = "composite")]
    #[test]
    fn self_composite_reads_original_pixels() {
        let handle = BufferHandle::new(RgbaBuffer::new(2, 1).unwrap());
        let red = Color::new(255, 0, 0, 255).to_word();
        handle.write().set_pixel(0, 0, red).unwrap();

        let job = CompositeJob {
            source: handle.clone(),
            mode: carta_ops::CompositeMode::Src,
            opacity: 1.0,
            dx: 1,
            dy: 0,
            filters: Vec::new(),
        };
        composite(&handle, &job).unwrap();
        assert_eq!(handle.read().data(), &[red, red]);
    }
}
