//! Command runners for the `simtok` binary.
//!
//! Kept in the library so they can be driven from integration tests
//! without spawning the binary.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{CliOverrides, FrontendKind, ResolvedConfig, PROJECT_CONFIG_FILE};
use crate::driver::{check_root, parse, ParseBatchResult};
use crate::error::SimtokError;
use crate::external::ExternalAdapter;
use crate::provider::Frontend;

/// Input to the `tokens` command.
#[derive(Debug, Clone, Default)]
pub struct TokensRequest {
    /// Batch root.
    pub root: PathBuf,
    /// Files relative to `root`; empty means discover them.
    pub files: Vec<PathBuf>,
    /// Settings from command-line flags.
    pub overrides: CliOverrides,
}

/// Result of the `tokens` command.
#[derive(Debug)]
pub struct TokensOutcome {
    /// Name of the front end used.
    pub frontend: String,
    /// Files processed, in order.
    pub files: Vec<PathBuf>,
    pub result: ParseBatchResult,
}

/// Run the `tokens` command.
///
/// Per-file failures are reported in the outcome, not as `Err`.
pub fn run_tokens(request: &TokensRequest) -> Result<TokensOutcome, SimtokError> {
    check_root(&request.root)?;

    let config = ResolvedConfig::resolve(&request.root, &request.overrides)?;
    debug!(
        frontend = %config.frontend.value,
        frontend_source = %config.frontend.source,
        max_depth = config.max_depth.value,
        max_depth_source = %config.max_depth.source,
        "resolved configuration"
    );

    let frontend = build_frontend(&config)?;

    let files = if request.files.is_empty() {
        let ext = config.scan_extension().ok_or_else(|| {
            SimtokError::invalid_args(
                "no files given and no extension to scan for; pass files or --ext",
            )
        })?;
        discover_files(&request.root, ext)
    } else {
        request.files.clone()
    };
    if files.is_empty() {
        warn!(root = %request.root.display(), "no input files");
    }

    let result = parse(frontend.as_ref(), &request.root, &files)?;
    Ok(TokensOutcome {
        frontend: frontend.name().to_string(),
        files,
        result,
    })
}

/// Build the front end selected by `config`.
pub fn build_frontend(config: &ResolvedConfig) -> Result<Box<dyn Frontend>, SimtokError> {
    match config.frontend.value {
        FrontendKind::Java => Ok(Box::new(
            crate::java::frontend().with_max_depth(config.max_depth.value),
        )),
        FrontendKind::External => {
            let adapter = config.adapter_config().ok_or_else(|| {
                SimtokError::invalid_args(
                    "the external front end needs an adapter program (--adapter or SIMTOK_ADAPTER)",
                )
            })?;
            let adapter = ExternalAdapter::new(adapter)?;
            info!(program = %adapter.program().display(), "using external adapter");
            Ok(Box::new(adapter))
        }
    }
}

/// Find files under `root` with extension `ext`, as sorted relative paths.
///
/// The project config file is never an input. Unreadable entries are
/// logged and skipped.
pub fn discover_files(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative == Path::new(PROJECT_CONFIG_FILE) {
            continue;
        }
        files.push(relative.to_path_buf());
    }
    debug!(root = %root.display(), ext, count = files.len(), "discovered files");
    files
}
