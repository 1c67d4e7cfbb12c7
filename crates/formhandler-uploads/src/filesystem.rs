//! Filesystem and transport seams used by the placer

use std::fs;
use std::io;
use std::path::Path;

/// Filesystem queries and the one mutation the placer needs besides the move.
pub trait FileSystem {
	fn exists(&self, path: &Path) -> bool;
	fn is_dir(&self, path: &Path) -> bool;
	fn is_writable(&self, path: &Path) -> bool;
	/// Create `path` and any missing parents
	fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Moves a received temporary file to its final location.
pub trait UploadTransport {
	fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
	fn exists(&self, path: &Path) -> bool {
		(**self).exists(path)
	}

	fn is_dir(&self, path: &Path) -> bool {
		(**self).is_dir(path)
	}

	fn is_writable(&self, path: &Path) -> bool {
		(**self).is_writable(path)
	}

	fn create_dir_all(&self, path: &Path) -> io::Result<()> {
		(**self).create_dir_all(path)
	}
}

impl<T: UploadTransport + ?Sized> UploadTransport for &T {
	fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
		(**self).move_file(from, to)
	}
}

/// [`FileSystem`] and [`UploadTransport`] over the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
	fn exists(&self, path: &Path) -> bool {
		path.exists()
	}

	fn is_dir(&self, path: &Path) -> bool {
		path.is_dir()
	}

	/// Whether a file can actually be created in `path` by this process.
	fn is_writable(&self, path: &Path) -> bool {
		match tempfile::tempfile_in(path) {
			Ok(_) => true,
			Err(e) => {
				tracing::debug!("{} is not writable: {}", path.display(), e);
				false
			}
		}
	}

	fn create_dir_all(&self, path: &Path) -> io::Result<()> {
		fs::create_dir_all(path)
	}
}

impl UploadTransport for LocalFileSystem {
	fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
		match fs::rename(from, to) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
				tracing::debug!(
					"{} is on another device than {}, copying instead",
					from.display(),
					to.display()
				);
				copy_across_devices(from, to)
			}
			Err(e) => Err(e),
		}
	}
}

/// Copy `from` into a sibling of `to`, then swap it into place.
///
/// `to` is only replaced once the copy is complete. A source that cannot be
/// removed afterwards is logged and left behind.
fn copy_across_devices(from: &Path, to: &Path) -> io::Result<()> {
	let parent = match to.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};

	let mut source = fs::File::open(from)?;
	let mut staged = tempfile::NamedTempFile::new_in(parent)?;
	io::copy(&mut source, staged.as_file_mut())?;
	fs::set_permissions(staged.path(), source.metadata()?.permissions())?;
	staged.persist(to).map_err(|e| e.error)?;

	if let Err(e) = fs::remove_file(from) {
		tracing::warn!(
			"placed {} but could not remove {}: {}",
			to.display(),
			from.display(),
			e
		);
	}
	Ok(())
}
