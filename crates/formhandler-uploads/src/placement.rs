//! Upload destination resolution and collision handling
//!
//! [`UploadPlacer::move_pending`] decides where each received file goes,
//! applies the collision [`PlacementPolicy`] and performs the move.
//!
//! Existence checks and the following move are not atomic. Two writers
//! targeting the same directory can still collide; no lock is taken.

use crate::descriptor::{PendingUpload, UploadDescriptor};
use crate::errors::{UploadError, UploadResult};
use crate::filesystem::{FileSystem, LocalFileSystem, UploadTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::str::FromStr;

/// What to do when the target path already exists.
///
/// There is deliberately no `Default`; callers pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
	/// Replace the existing file
	Overwrite,
	/// Pick a free `name(n).ext` next to it
	Rename,
	/// Fail with [`UploadError::DestinationAlreadyExists`]
	#[serde(alias = "raise")]
	RaiseOnConflict,
}

impl PlacementPolicy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Overwrite => "overwrite",
			Self::Rename => "rename",
			Self::RaiseOnConflict => "raise_on_conflict",
		}
	}
}

impl fmt::Display for PlacementPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PlacementPolicy {
	type Err = UploadError;

	/// # Examples
	///
	/// ```
	/// use formhandler_uploads::{PlacementPolicy, UploadError};
	///
	/// assert_eq!("Rename".parse::<PlacementPolicy>().unwrap(), PlacementPolicy::Rename);
	/// assert!(matches!(
	///     "shred".parse::<PlacementPolicy>(),
	///     Err(UploadError::UnsupportedPolicy { .. })
	/// ));
	/// ```
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"overwrite" => Ok(Self::Overwrite),
			"rename" => Ok(Self::Rename),
			"raise" | "raise_on_conflict" => Ok(Self::RaiseOnConflict),
			_ => Err(UploadError::UnsupportedPolicy {
				policy: s.to_string(),
			}),
		}
	}
}

/// Final location(s) of a placed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementResult {
	Single(PathBuf),
	/// One path per descriptor, in input order
	Multiple(Vec<PathBuf>),
}

impl PlacementResult {
	pub fn paths(&self) -> &[PathBuf] {
		match self {
			Self::Single(path) => std::slice::from_ref(path),
			Self::Multiple(paths) => paths,
		}
	}

	pub fn into_paths(self) -> Vec<PathBuf> {
		match self {
			Self::Single(path) => vec![path],
			Self::Multiple(paths) => paths,
		}
	}
}

/// Lower-cased extension of the final path component.
///
/// Names without a dot, ending in a dot, or consisting of a leading dot only
/// (".htaccess") have no extension.
///
/// # Examples
///
/// ```
/// use formhandler_uploads::placement::file_extension;
///
/// assert_eq!(file_extension("Report.PDF"), Some("pdf".to_string()));
/// assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
/// assert_eq!(file_extension(".htaccess"), None);
/// assert_eq!(file_extension("README"), None);
/// ```
pub fn file_extension(name: &str) -> Option<String> {
	let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
	match base.rfind('.') {
		Some(idx) if idx > 0 && idx + 1 < base.len() => Some(base[idx + 1..].to_ascii_lowercase()),
		_ => None,
	}
}

/// Reduces a client-declared filename to a bare file name.
///
/// Directory components (either separator style) are dropped so the result
/// cannot escape the destination directory.
///
/// # Errors
///
/// Returns [`UploadError::InvalidFilename`] when nothing usable is left.
///
/// # Examples
///
/// ```
/// use formhandler_uploads::placement::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
/// assert_eq!(sanitize_filename("C:\\Users\\me\\cv.doc").unwrap(), "cv.doc");
/// assert!(sanitize_filename("uploads/..").is_err());
/// ```
pub fn sanitize_filename(filename: &str) -> UploadResult<String> {
	let base = filename
		.rsplit(['/', '\\'])
		.next()
		.unwrap_or_default()
		.trim_matches(|c: char| c.is_control() || c.is_whitespace());

	match base {
		"" | "." | ".." => Err(UploadError::InvalidFilename {
			filename: filename.to_string(),
		}),
		name => Ok(name.to_string()),
	}
}

/// Returns `path` if it is free, otherwise the first free `name(n).ext`.
///
/// Uses the local filesystem; see [`UploadPlacer::resolve_non_conflicting_path`].
pub fn resolve_non_conflicting_path(path: impl AsRef<Path>) -> PathBuf {
	UploadPlacer::local().resolve_non_conflicting_path(path.as_ref())
}

/// Places received uploads on disk.
///
/// Generic over the [`FileSystem`] queries and the [`UploadTransport`] move so
/// both can be substituted.
#[derive(Debug, Clone, Default)]
pub struct UploadPlacer<F = LocalFileSystem, T = LocalFileSystem> {
	fs: F,
	transport: T,
}

impl UploadPlacer {
	/// Placer over the local disk
	pub fn local() -> Self {
		Self::new(LocalFileSystem, LocalFileSystem)
	}
}

impl<F: FileSystem, T: UploadTransport> UploadPlacer<F, T> {
	pub fn new(fs: F, transport: T) -> Self {
		Self { fs, transport }
	}

	/// Returns `path` if nothing exists there, otherwise inserts `(n)` before
	/// the extension with the smallest `n >= 1` that is free.
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_uploads::UploadPlacer;
	///
	/// let dir = tempfile::tempdir().unwrap();
	/// let taken = dir.path().join("moved.pdf");
	/// std::fs::write(&taken, b"x").unwrap();
	///
	/// let placer = UploadPlacer::local();
	/// assert_eq!(
	///     placer.resolve_non_conflicting_path(&taken),
	///     dir.path().join("moved(1).pdf")
	/// );
	/// ```
	pub fn resolve_non_conflicting_path(&self, path: &Path) -> PathBuf {
		if !self.fs.exists(path) {
			return path.to_path_buf();
		}

		let stem = path.file_stem().unwrap_or_default().to_os_string();
		let extension = path.extension().map(|ext| ext.to_os_string());
		let mut counter: u64 = 1;
		loop {
			let mut name = stem.clone();
			name.push(format!("({})", counter));
			if let Some(ext) = &extension {
				name.push(".");
				name.push(ext);
			}
			let candidate = path.with_file_name(name);
			if !self.fs.exists(&candidate) {
				return candidate;
			}
			counter += 1;
		}
	}

	/// Moves the pending upload(s) into `destination`.
	///
	/// `destination` is a directory when it ends with a separator or names an
	/// existing directory; otherwise it is the full target path of a single
	/// file, used as given. Files are processed in input order and the batch stops at the
	/// first failure; files already moved stay where they are.
	///
	/// # Errors
	///
	/// - [`UploadError::MultipleFilesSingleDestination`] for several files
	///   and a file-shaped destination, before anything is touched
	/// - [`UploadError::DestinationDirectoryMissing`] /
	///   [`UploadError::DirectoryCreationFailed`] /
	///   [`UploadError::DirectoryNotWritable`] for directory problems
	/// - [`UploadError::InvalidFilename`] when a declared name is unusable or
	///   a file destination has no final name
	/// - [`UploadError::DestinationAlreadyExists`] under
	///   [`PlacementPolicy::RaiseOnConflict`]
	/// - [`UploadError::MoveFailed`] when the transport fails
	pub fn move_pending(
		&self,
		pending: &PendingUpload,
		destination: impl AsRef<Path>,
		policy: PlacementPolicy,
		create_dir_if_missing: bool,
	) -> UploadResult<PlacementResult> {
		let destination = destination.as_ref();
		let descriptors = pending.descriptors();
		let target = self.destination_kind(destination);

		if matches!(target, Destination::File { .. }) && descriptors.len() > 1 {
			return Err(UploadError::MultipleFilesSingleDestination {
				destination: destination.to_path_buf(),
				count: descriptors.len(),
			});
		}

		let mut placed = Vec::with_capacity(descriptors.len());
		for descriptor in descriptors {
			placed.push(self.place_one(descriptor, &target, policy, create_dir_if_missing)?);
		}

		if pending.is_multiple() {
			Ok(PlacementResult::Multiple(placed))
		} else {
			// A single descriptor always produces exactly one path.
			Ok(PlacementResult::Single(placed.into_iter().next().unwrap_or_default()))
		}
	}

	fn destination_kind<'a>(&self, destination: &'a Path) -> Destination<'a> {
		let raw = destination.as_os_str().to_string_lossy();
		if raw.ends_with(['/', MAIN_SEPARATOR]) || self.fs.is_dir(destination) {
			return Destination::Directory(destination);
		}

		let directory = match destination.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		Destination::File {
			directory,
			path: destination,
		}
	}

	fn place_one(
		&self,
		descriptor: &UploadDescriptor,
		target: &Destination<'_>,
		policy: PlacementPolicy,
		create_dir_if_missing: bool,
	) -> UploadResult<PathBuf> {
		let directory = target.directory();
		self.ensure_directory(directory, create_dir_if_missing)?;

		// Explicit destinations are the caller's own path and are kept as given.
		let mut path = match target {
			Destination::File { path, .. } if path.file_name().is_some() => path.to_path_buf(),
			Destination::File { path, .. } => {
				return Err(UploadError::InvalidFilename {
					filename: path.display().to_string(),
				});
			}
			Destination::Directory(_) => directory.join(sanitize_filename(&descriptor.filename)?),
		};
		if self.fs.exists(&path) {
			match policy {
				PlacementPolicy::Overwrite => {
					tracing::debug!("overwriting existing file {}", path.display());
				}
				PlacementPolicy::Rename => {
					let renamed = self.resolve_non_conflicting_path(&path);
					tracing::warn!(
						"{} already exists, placing upload at {}",
						path.display(),
						renamed.display()
					);
					path = renamed;
				}
				PlacementPolicy::RaiseOnConflict => {
					return Err(UploadError::DestinationAlreadyExists { path });
				}
			}
		}

		self.transport
			.move_file(&descriptor.temp_path, &path)
			.map_err(|source| UploadError::MoveFailed {
				from: descriptor.temp_path.clone(),
				to: path.clone(),
				source,
			})?;

		tracing::info!(
			"placed upload '{}' at {}",
			descriptor.filename,
			path.display()
		);
		Ok(path)
	}

	fn ensure_directory(&self, directory: &Path, create_dir_if_missing: bool) -> UploadResult<()> {
		if !self.fs.is_dir(directory) {
			if !create_dir_if_missing {
				return Err(UploadError::DestinationDirectoryMissing {
					directory: directory.to_path_buf(),
				});
			}
			self.fs
				.create_dir_all(directory)
				.map_err(|source| UploadError::DirectoryCreationFailed {
					directory: directory.to_path_buf(),
					source,
				})?;
			tracing::info!("created upload directory {}", directory.display());
		}

		if !self.fs.is_writable(directory) {
			return Err(UploadError::DirectoryNotWritable {
				directory: directory.to_path_buf(),
			});
		}
		Ok(())
	}
}

enum Destination<'a> {
	Directory(&'a Path),
	File {
		directory: &'a Path,
		path: &'a Path,
	},
}

impl Destination<'_> {
	fn directory(&self) -> &Path {
		match self {
			Self::Directory(dir) => dir,
			Self::File { directory, .. } => directory,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;
	use std::collections::HashSet;
	use std::io;

	/// In-memory filesystem that records moves and can be told to fail.
	#[derive(Default)]
	struct FakeFs {
		dirs: RefCell<HashSet<PathBuf>>,
		files: RefCell<HashSet<PathBuf>>,
		read_only: HashSet<PathBuf>,
		fail_create: bool,
		fail_move_from: Option<PathBuf>,
		moves: RefCell<Vec<(PathBuf, PathBuf)>>,
		calls: RefCell<usize>,
	}

	impl FakeFs {
		fn with_dir(self, dir: &str) -> Self {
			self.dirs.borrow_mut().insert(PathBuf::from(dir));
			self
		}

		fn with_file(self, file: &str) -> Self {
			self.files.borrow_mut().insert(PathBuf::from(file));
			self
		}

		fn touch(&self) {
			*self.calls.borrow_mut() += 1;
		}
	}

	impl FileSystem for FakeFs {
		fn exists(&self, path: &Path) -> bool {
			self.touch();
			self.files.borrow().contains(path) || self.dirs.borrow().contains(path)
		}

		fn is_dir(&self, path: &Path) -> bool {
			self.touch();
			self.dirs.borrow().contains(path)
		}

		fn is_writable(&self, path: &Path) -> bool {
			self.touch();
			!self.read_only.contains(path)
		}

		fn create_dir_all(&self, path: &Path) -> io::Result<()> {
			self.touch();
			if self.fail_create {
				return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
			}
			self.dirs.borrow_mut().insert(path.to_path_buf());
			Ok(())
		}
	}

	impl UploadTransport for FakeFs {
		fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
			self.touch();
			if self.fail_move_from.as_deref() == Some(from) {
				return Err(io::Error::other("disk full"));
			}
			self.files.borrow_mut().insert(to.to_path_buf());
			self.moves
				.borrow_mut()
				.push((from.to_path_buf(), to.to_path_buf()));
			Ok(())
		}
	}

	fn upload(temp: &str, name: &str) -> UploadDescriptor {
		UploadDescriptor::new(temp, name, 10)
	}

	#[rstest]
	#[case("overwrite", PlacementPolicy::Overwrite)]
	#[case("RENAME", PlacementPolicy::Rename)]
	#[case("raise", PlacementPolicy::RaiseOnConflict)]
	#[case(" raise_on_conflict ", PlacementPolicy::RaiseOnConflict)]
	fn test_policy_from_str(#[case] input: &str, #[case] expected: PlacementPolicy) {
		assert_eq!(input.parse::<PlacementPolicy>().unwrap(), expected);
	}

	#[rstest]
	fn test_unknown_policy_fails_before_filesystem_access() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");

		// Act
		let result = "append".parse::<PlacementPolicy>().and_then(|policy| {
			UploadPlacer::new(&fs, &fs).move_pending(
				&upload("/tmp/a", "a.txt").into(),
				"/srv/",
				policy,
				false,
			)
		});

		// Assert
		assert!(matches!(result, Err(UploadError::UnsupportedPolicy { ref policy }) if policy == "append"));
		assert_eq!(*fs.calls.borrow(), 0);
	}

	#[rstest]
	#[case("a.txt", Some("txt"))]
	#[case("dir.d/file", None)]
	#[case("name.", None)]
	#[case("..", None)]
	#[case("x/.bashrc", None)]
	#[case("photo.JPeG", Some("jpeg"))]
	fn test_file_extension(#[case] name: &str, #[case] expected: Option<&str>) {
		assert_eq!(file_extension(name).as_deref(), expected);
	}

	#[rstest]
	#[case("report.pdf", "report.pdf")]
	#[case("/etc/passwd", "passwd")]
	#[case("..\\..\\boot.ini", "boot.ini")]
	#[case("  spaced.txt ", "spaced.txt")]
	fn test_sanitize_filename(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(sanitize_filename(input).unwrap(), expected);
	}

	#[rstest]
	#[case("")]
	#[case("..")]
	#[case("a/.")]
	#[case("dir/")]
	fn test_sanitize_filename_rejects(#[case] input: &str) {
		assert!(matches!(
			sanitize_filename(input),
			Err(UploadError::InvalidFilename { .. })
		));
	}

	#[rstest]
	fn test_resolve_counts_up_until_free() {
		// Arrange
		let fs = FakeFs::default()
			.with_file("/srv/moved.pdf")
			.with_file("/srv/moved(1).pdf");
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let resolved = placer.resolve_non_conflicting_path(Path::new("/srv/moved.pdf"));

		// Assert
		assert_eq!(resolved, PathBuf::from("/srv/moved(2).pdf"));
	}

	#[rstest]
	#[case("/srv/README", "/srv/README(1)")]
	#[case("/srv/.htaccess", "/srv/.htaccess(1)")]
	#[case("/srv/a.tar.gz", "/srv/a.tar(1).gz")]
	fn test_resolve_name_shapes(#[case] taken: &str, #[case] expected: &str) {
		// Arrange
		let fs = FakeFs::default().with_file(taken);
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let resolved = placer.resolve_non_conflicting_path(Path::new(taken));

		// Assert
		assert_eq!(resolved, PathBuf::from(expected));
	}

	#[rstest]
	fn test_missing_directory_without_create() {
		// Arrange
		let fs = FakeFs::default();
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer.move_pending(
			&upload("/tmp/a", "a.txt").into(),
			"/srv/new/a.txt",
			PlacementPolicy::Overwrite,
			false,
		);

		// Assert
		assert!(matches!(result, Err(UploadError::DestinationDirectoryMissing { ref directory }) if directory == Path::new("/srv/new")));
		assert!(fs.moves.borrow().is_empty());
	}

	#[rstest]
	fn test_directory_creation_failure_is_distinct() {
		// Arrange
		let fs = FakeFs {
			fail_create: true,
			..FakeFs::default()
		};
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer.move_pending(
			&upload("/tmp/a", "a.txt").into(),
			"/srv/new/",
			PlacementPolicy::Overwrite,
			true,
		);

		// Assert
		assert!(matches!(result, Err(UploadError::DirectoryCreationFailed { .. })));
	}

	#[rstest]
	fn test_not_writable_directory_is_distinct() {
		// Arrange
		let fs = FakeFs {
			read_only: HashSet::from([PathBuf::from("/srv")]),
			..FakeFs::default()
		}
		.with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer.move_pending(
			&upload("/tmp/a", "a.txt").into(),
			"/srv/a.txt",
			PlacementPolicy::Overwrite,
			false,
		);

		// Assert
		assert!(matches!(result, Err(UploadError::DirectoryNotWritable { .. })));
	}

	#[rstest]
	fn test_move_failure_names_source_and_stops_batch() {
		// Arrange
		let fs = FakeFs {
			fail_move_from: Some(PathBuf::from("/tmp/b")),
			..FakeFs::default()
		}
		.with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);
		let pending = PendingUpload::Multiple(vec![
			upload("/tmp/a", "a.txt"),
			upload("/tmp/b", "b.txt"),
			upload("/tmp/c", "c.txt"),
		]);

		// Act
		let result = placer.move_pending(&pending, "/srv", PlacementPolicy::Overwrite, false);

		// Assert
		assert!(matches!(result, Err(UploadError::MoveFailed { ref from, .. }) if from == Path::new("/tmp/b")));
		let moves = fs.moves.borrow();
		assert_eq!(moves.len(), 1);
		assert_eq!(moves[0].1, PathBuf::from("/srv/a.txt"));
	}

	#[rstest]
	fn test_multiple_files_to_file_destination_is_rejected_untouched() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);
		let pending = PendingUpload::Multiple(vec![
			upload("/tmp/a", "a.txt"),
			upload("/tmp/b", "b.txt"),
		]);

		// Act
		let result = placer.move_pending(&pending, "/srv/one.txt", PlacementPolicy::Rename, true);

		// Assert
		assert!(matches!(
			result,
			Err(UploadError::MultipleFilesSingleDestination { count: 2, .. })
		));
		assert!(fs.moves.borrow().is_empty());
	}

	#[rstest]
	fn test_rename_disambiguates_duplicates_within_batch() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);
		let pending = PendingUpload::Multiple(vec![
			upload("/tmp/a", "scan.png"),
			upload("/tmp/b", "scan.png"),
		]);

		// Act
		let result = placer
			.move_pending(&pending, "/srv/", PlacementPolicy::Rename, false)
			.unwrap();

		// Assert
		assert_eq!(
			result,
			PlacementResult::Multiple(vec![
				PathBuf::from("/srv/scan.png"),
				PathBuf::from("/srv/scan(1).png"),
			])
		);
	}

	#[rstest]
	fn test_single_multiple_upload_to_file_destination_uses_explicit_name() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);
		let pending = PendingUpload::Multiple(vec![upload("/tmp/a", "client-name.txt")]);

		// Act
		let result = placer
			.move_pending(&pending, "/srv/chosen.txt", PlacementPolicy::Overwrite, false)
			.unwrap();

		// Assert
		assert_eq!(
			result,
			PlacementResult::Multiple(vec![PathBuf::from("/srv/chosen.txt")])
		);
	}

	#[rstest]
	fn test_directory_destination_sanitizes_declared_name() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer
			.move_pending(
				&upload("/tmp/a", "../../etc/cron.d/job").into(),
				"/srv",
				PlacementPolicy::Overwrite,
				false,
			)
			.unwrap();

		// Assert
		assert_eq!(result, PlacementResult::Single(PathBuf::from("/srv/job")));
	}

	#[rstest]
	fn test_relative_file_destination_is_kept_as_given() {
		// Arrange
		let fs = FakeFs::default().with_dir(".");
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer
			.move_pending(
				&upload("/tmp/a", "x.txt").into(),
				"out.txt",
				PlacementPolicy::Overwrite,
				false,
			)
			.unwrap();

		// Assert
		assert_eq!(result.paths(), &[PathBuf::from("out.txt")]);
		assert_eq!(
			fs.moves.borrow().as_slice(),
			&[(PathBuf::from("/tmp/a"), PathBuf::from("out.txt"))]
		);
	}

	#[rstest]
	fn test_explicit_file_name_is_not_sanitized() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer
			.move_pending(
				&upload("/tmp/a", "x.txt").into(),
				"/srv/ report .txt",
				PlacementPolicy::Overwrite,
				false,
			)
			.unwrap();

		// Assert
		assert_eq!(result.paths(), &[PathBuf::from("/srv/ report .txt")]);
	}

	#[rstest]
	fn test_file_destination_without_name_is_rejected() {
		// Arrange
		let fs = FakeFs::default().with_dir("/srv");
		let placer = UploadPlacer::new(&fs, &fs);

		// Act
		let result = placer.move_pending(
			&upload("/tmp/a", "x.txt").into(),
			"/srv/..",
			PlacementPolicy::Overwrite,
			false,
		);

		// Assert
		assert!(matches!(result, Err(UploadError::InvalidFilename { .. })));
		assert!(fs.moves.borrow().is_empty());
	}
}
