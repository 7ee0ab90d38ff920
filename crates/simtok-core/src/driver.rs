//! Per-file and batch drivers.
//!
//! The batch driver walks the requested files strictly in list order and
//! concatenates their tokens into one stream. Each file contributes either
//! its structural tokens followed by one `FILE_END`, or, when anything goes
//! wrong for that file, just the `FILE_END`. A failing file never stops the
//! batch; only environment-level problems (an unusable root directory) do.

use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::provider::{FileError, Frontend};
use crate::token::{Token, TokenStream};

// ============================================================================
// Results
// ============================================================================

/// What happened to one file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file was tokenized; `tokens` counts structural tokens only.
    Parsed { tokens: usize },
    /// The file contributed only its `FILE_END`.
    Failed(FileError),
}

impl FileOutcome {
    /// True if the file failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }
}

/// A failed file in a batch, for the side log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Path relative to the batch root.
    pub file: String,
    /// Rendered error.
    pub message: String,
}

/// Output of one batch invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseBatchResult {
    /// Tokens of every file, in file-list order.
    pub stream: TokenStream,
    /// Number of files that failed.
    pub error_count: usize,
    /// The failed files, in file-list order.
    pub failures: Vec<FileFailure>,
}

impl ParseBatchResult {
    /// True if every file was tokenized.
    pub fn is_complete(&self) -> bool {
        self.error_count == 0
    }
}

/// Environment-level failures that prevent a batch from running at all.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The root directory does not exist.
    #[error("root directory not found: {path}")]
    RootNotFound { path: PathBuf },

    /// The root exists but is not a directory.
    #[error("root is not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    /// The root directory cannot be read.
    #[error("root directory unreadable: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// FILE_END guarantee
// ============================================================================

/// Appends the file's `FILE_END` when dropped, whatever happened before.
///
/// When dropped during a panic, the tokens appended since the guard was
/// created are discarded first, the same as for a returned error.
struct FileEndGuard<'a> {
    stream: &'a mut TokenStream,
    file: &'a str,
    mark: usize,
}

impl<'a> FileEndGuard<'a> {
    fn new(stream: &'a mut TokenStream, file: &'a str) -> Self {
        let mark = stream.len();
        FileEndGuard { stream, file, mark }
    }

    /// Number of tokens appended since the guard was created.
    fn appended(&self) -> usize {
        self.stream.len() - self.mark
    }

    /// Discard everything appended since the guard was created.
    fn discard(&mut self) {
        self.stream.truncate(self.mark);
    }
}

impl Deref for FileEndGuard<'_> {
    type Target = TokenStream;

    fn deref(&self) -> &TokenStream {
        self.stream
    }
}

impl DerefMut for FileEndGuard<'_> {
    fn deref_mut(&mut self) -> &mut TokenStream {
        self.stream
    }
}

impl Drop for FileEndGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.discard();
        }
        self.stream.push(Token::file_end(self.file));
    }
}

// ============================================================================
// Drivers
// ============================================================================

/// Display form of a relative path, with `/` separators on every platform.
pub fn display_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Tokenize one file into `stream`.
///
/// The file's `FILE_END` is appended in every case. On failure the tokens
/// this file appended so far are discarded first, so a failed file
/// contributes exactly one token.
pub fn parse_one<F: Frontend + ?Sized>(
    frontend: &F,
    root: &Path,
    relative: &Path,
    stream: &mut TokenStream,
) -> FileOutcome {
    let file = display_path(relative);
    let absolute = root.join(relative);

    let mut guard = FileEndGuard::new(stream, &file);
    match frontend.tokenize(&absolute, &file, &mut guard) {
        Ok(()) => {
            let tokens = guard.appended();
            debug!(file = %file, tokens, frontend = frontend.name(), "tokenized file");
            FileOutcome::Parsed { tokens }
        }
        Err(err) => {
            guard.discard();
            warn!(file = %file, error = %err, frontend = frontend.name(), "failed to tokenize file");
            FileOutcome::Failed(err)
        }
    }
}

/// Tokenize `files` (relative to `root`) in list order.
///
/// Per-file failures are counted in [`ParseBatchResult::error_count`] and
/// listed in [`ParseBatchResult::failures`]; they never abort the batch.
/// Returns [`BatchError`] only when `root` itself is unusable.
pub fn parse<F, P>(frontend: &F, root: &Path, files: &[P]) -> Result<ParseBatchResult, BatchError>
where
    F: Frontend + ?Sized,
    P: AsRef<Path>,
{
    check_root(root)?;

    let span = info_span!("parse_batch", frontend = frontend.name(), files = files.len());
    let _enter = span.enter();

    let mut result = ParseBatchResult::default();
    for relative in files {
        let relative = relative.as_ref();
        if let FileOutcome::Failed(err) = parse_one(frontend, root, relative, &mut result.stream) {
            result.error_count += 1;
            result.failures.push(FileFailure {
                file: display_path(relative),
                message: err.to_string(),
            });
        }
    }

    info!(
        files = files.len(),
        tokens = result.stream.len(),
        errors = result.error_count,
        "batch complete"
    );
    Ok(result)
}

/// Check that `root` exists, is a directory and can be listed.
pub fn check_root(root: &Path) -> Result<(), BatchError> {
    let metadata = fs::metadata(root).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            BatchError::RootNotFound {
                path: root.to_path_buf(),
            }
        } else {
            BatchError::RootUnreadable {
                path: root.to_path_buf(),
                source,
            }
        }
    })?;

    if !metadata.is_dir() {
        return Err(BatchError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }

    fs::read_dir(root).map_err(|source| BatchError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::provider::ProviderError;
    use crate::token::TokenKind;
    use crate::walk::WalkError;
    use tempfile::TempDir;

    /// Front end reading one token kind code per line from the file.
    /// A line `!` fails the walk after the preceding tokens were emitted.
    struct LineFrontend;

    impl Frontend for LineFrontend {
        fn name(&self) -> &str {
            "lines"
        }

        fn tokenize(
            &self,
            path: &Path,
            file: &str,
            out: &mut TokenStream,
        ) -> Result<(), FileError> {
            let text = fs::read_to_string(path).map_err(|e| ProviderError::from_io(path, e))?;
            for (i, line) in text.lines().enumerate() {
                if line == "!" {
                    return Err(WalkError::DepthExceeded { limit: 0 }.into());
                }
                let code: u16 = line.parse().map_err(|_| ProviderError::Syntax {
                    path: path.to_path_buf(),
                    message: format!("bad line {}", i + 1),
                })?;
                let kind = TokenKind::from_code(code).ok_or_else(|| ProviderError::Syntax {
                    path: path.to_path_buf(),
                    message: format!("bad code {}", code),
                })?;
                out.push(Token::new(kind, file, Position::new(i as i32 + 1, 1), 1));
            }
            Ok(())
        }
    }

    fn workspace(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn kinds_of(stream: &TokenStream, file: &str) -> Vec<TokenKind> {
        stream.for_file(file).map(|t| t.kind).collect()
    }

    mod parse_one_tests {
        use super::*;

        #[test]
        fn success_ends_with_one_file_end() {
            let dir = workspace(&[("A.java", "3\n4\n")]);
            let mut stream = TokenStream::new();
            let outcome = parse_one(&LineFrontend, dir.path(), Path::new("A.java"), &mut stream);

            assert!(matches!(outcome, FileOutcome::Parsed { tokens: 2 }));
            assert_eq!(
                stream.kinds(),
                vec![TokenKind::ClassBegin, TokenKind::ClassEnd, TokenKind::FileEnd]
            );
            assert_eq!(stream[2].file, "A.java");
            assert!(stream[2].position().is_sentinel());
        }

        #[test]
        fn missing_file_contributes_only_file_end() {
            let dir = workspace(&[]);
            let mut stream = TokenStream::new();
            let outcome = parse_one(&LineFrontend, dir.path(), Path::new("B.java"), &mut stream);

            match outcome {
                FileOutcome::Failed(FileError::Provider(ProviderError::NotFound { .. })) => {}
                other => panic!("expected not found, got {:?}", other),
            }
            assert_eq!(stream.kinds(), vec![TokenKind::FileEnd]);
            assert_eq!(stream[0].file, "B.java");
        }

        #[test]
        fn failure_midway_discards_partial_tokens() {
            let dir = workspace(&[("C.java", "3\n12\n!\n13\n4\n")]);
            let mut stream = TokenStream::new();
            stream.push(Token::file_end("earlier.java"));

            let outcome = parse_one(&LineFrontend, dir.path(), Path::new("C.java"), &mut stream);

            assert!(outcome.is_failure());
            assert_eq!(stream.kinds(), vec![TokenKind::FileEnd, TokenKind::FileEnd]);
            assert_eq!(stream[0].file, "earlier.java");
            assert_eq!(stream[1].file, "C.java");
        }

        /// Pushes one token, then panics.
        struct PanickingFrontend;

        impl Frontend for PanickingFrontend {
            fn name(&self) -> &str {
                "panicking"
            }

            fn tokenize(&self, _: &Path, file: &str, out: &mut TokenStream) -> Result<(), FileError> {
                out.push(Token::new(TokenKind::ClassBegin, file, Position::new(1, 1), 5));
                panic!("front end bug");
            }
        }

        #[test]
        fn panic_midway_discards_partial_tokens() {
            let dir = workspace(&[("E.java", "")]);
            let mut stream = TokenStream::new();
            stream.push(Token::file_end("earlier.java"));

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                parse_one(&PanickingFrontend, dir.path(), Path::new("E.java"), &mut stream)
            }));

            assert!(result.is_err());
            assert_eq!(stream.kinds(), vec![TokenKind::FileEnd, TokenKind::FileEnd]);
            assert_eq!(stream[0].file, "earlier.java");
            assert_eq!(stream[1].file, "E.java");
        }

        #[test]
        fn nested_path_uses_forward_slashes() {
            let dir = workspace(&[("pkg/sub/D.java", "16\n")]);
            let mut stream = TokenStream::new();
            let relative: PathBuf = ["pkg", "sub", "D.java"].iter().collect();
            parse_one(&LineFrontend, dir.path(), &relative, &mut stream);
            assert!(stream.iter().all(|t| t.file == "pkg/sub/D.java"));
        }
    }

    mod batch_tests {
        use super::*;

        #[test]
        fn missing_middle_file_does_not_disturb_neighbours() {
            let dir = workspace(&[("A.java", "3\n4\n"), ("C.java", "21\n37\n22\n")]);
            let result = parse(&LineFrontend, dir.path(), &["A.java", "B.java", "C.java"]).unwrap();

            assert_eq!(result.error_count, 1);
            assert_eq!(
                kinds_of(&result.stream, "A.java"),
                vec![TokenKind::ClassBegin, TokenKind::ClassEnd, TokenKind::FileEnd]
            );
            assert_eq!(kinds_of(&result.stream, "B.java"), vec![TokenKind::FileEnd]);
            assert_eq!(
                kinds_of(&result.stream, "C.java"),
                vec![
                    TokenKind::WhileBegin,
                    TokenKind::Break,
                    TokenKind::WhileEnd,
                    TokenKind::FileEnd
                ]
            );
            assert_eq!(result.failures.len(), 1);
            assert_eq!(result.failures[0].file, "B.java");
            assert!(result.failures[0].message.contains("file not found"));
        }

        #[test]
        fn files_are_concatenated_in_list_order() {
            let dir = workspace(&[("x.java", "1\n"), ("y.java", "2\n")]);
            let result = parse(&LineFrontend, dir.path(), &["y.java", "x.java"]).unwrap();
            let files: Vec<_> = result.stream.iter().map(|t| t.file.as_str()).collect();
            assert_eq!(files, vec!["y.java", "y.java", "x.java", "x.java"]);
            assert!(result.is_complete());
        }

        #[test]
        fn one_file_end_per_requested_file() {
            let dir = workspace(&[("a", "3\n4\n"), ("b", "oops\n"), ("c", "")]);
            let files = ["a", "b", "c", "missing", "a"];
            let result = parse(&LineFrontend, dir.path(), &files).unwrap();

            let ends: Vec<_> = result
                .stream
                .iter()
                .filter(|t| t.kind == TokenKind::FileEnd)
                .map(|t| t.file.as_str())
                .collect();
            assert_eq!(ends, files.to_vec());
            assert_eq!(result.error_count, 2);
        }

        #[test]
        fn file_end_follows_all_structural_tokens_of_its_file() {
            let dir = workspace(&[("a", "3\n4\n"), ("b", "21\n22\n")]);
            let result = parse(&LineFrontend, dir.path(), &["a", "b"]).unwrap();
            let tokens = result.stream.as_slice();
            for (i, token) in tokens.iter().enumerate() {
                if token.kind == TokenKind::FileEnd {
                    assert!(tokens[i + 1..].iter().all(|t| t.file != token.file));
                }
            }
        }

        #[test]
        fn empty_file_list_yields_empty_result() {
            let dir = workspace(&[]);
            let files: [&str; 0] = [];
            let result = parse(&LineFrontend, dir.path(), &files).unwrap();
            assert!(result.stream.is_empty());
            assert_eq!(result.error_count, 0);
        }

        #[test]
        fn missing_root_is_environment_error() {
            let dir = workspace(&[]);
            let root = dir.path().join("nope");
            let err = parse(&LineFrontend, &root, &["A.java"]).unwrap_err();
            assert!(matches!(err, BatchError::RootNotFound { .. }));
        }

        #[test]
        fn file_as_root_is_environment_error() {
            let dir = workspace(&[("A.java", "3\n")]);
            let err = parse(&LineFrontend, &dir.path().join("A.java"), &["A.java"]).unwrap_err();
            assert!(matches!(err, BatchError::RootNotDirectory { .. }));
        }

        #[test]
        fn repeated_runs_are_identical() {
            let dir = workspace(&[("a", "3\n12\n13\n4\n"), ("b", "33\n34\n35\n")]);
            let first = parse(&LineFrontend, dir.path(), &["a", "b"]).unwrap();
            let second = parse(&LineFrontend, dir.path(), &["a", "b"]).unwrap();
            assert_eq!(first, second);
        }
    }
}
