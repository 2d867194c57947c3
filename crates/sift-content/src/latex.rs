//! LaTeX source fallback.
//!
//! arXiv serves sources as a gzipped tar, or as a single gzipped `.tex` for
//! one-file submissions. Everything is unpacked in memory under a byte cap,
//! the main file is picked by score, inputs are inlined, and the body is
//! reduced to plain prose.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use flate2::read::GzDecoder;
use regex::Regex;

use crate::error::FetchError;

/// Maximum nesting of `\input` / `\include` / `\subfile`.
const MAX_INPUT_DEPTH: usize = 8;

/// Environments removed wholesale.
const DROPPED_ENVS: &[&str] = &[
    "figure",
    "table",
    "equation",
    "align",
    "align*",
    "eqnarray",
    "algorithm",
    "algorithmic",
    "lstlisting",
    "verbatim",
    "tikzpicture",
    "thebibliography",
    "appendix",
];

static INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:input|include|subfile)\{([^}]+)\}").expect("valid regex")
});
static DROPPED_ENV_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DROPPED_ENVS
        .iter()
        .map(|env| {
            let env = regex::escape(env);
            Regex::new(&format!(r"(?s)\\begin\{{{env}\}}.*?\\end\{{{env}\}}")).expect("valid regex")
        })
        .collect()
});
static MATH: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)\$\$.*?\$\$",
        r"\$[^$]*\$",
        r"(?s)\\\[.*?\\\]",
        r"(?s)\\\(.*?\\\)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static REFERENCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\cite[a-zA-Z]*\*?(?:\[[^\]]*\])?\{[^}]*\}|\\ref\{[^}]*\}|\\label\{[^}]*\}|\\url\{[^}]*\}",
    )
    .expect("valid regex")
});
static COMMAND_WITH_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[a-zA-Z@]+\*?(?:\[[^\]]*\])?\{([^{}]*)\}").expect("valid regex")
});
static BARE_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z@]+\*?(?:\[[^\]]*\])?").expect("valid regex"));
static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// One text file from a source archive, keyed by its normalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexFile {
    pub path: PathBuf,
    pub text: String,
}

/// Plain text of the main document in a source archive, if there is one.
///
/// # Errors
///
/// Returns [`FetchError::TooLarge`] if the unpacked archive exceeds
/// `max_bytes`, or [`FetchError::Archive`] if it cannot be read.
pub fn source_text(archive: &[u8], max_bytes: u64) -> Result<Option<String>, FetchError> {
    let files = unpack(archive, max_bytes)?;
    let Some(main) = select_main(&files) else {
        return Ok(None);
    };
    let by_path: HashMap<&Path, &str> = files
        .iter()
        .map(|f| (f.path.as_path(), f.text.as_str()))
        .collect();
    let mut seen = HashSet::from([main.path.clone()]);
    let base = main.path.parent().unwrap_or_else(|| Path::new(""));
    let expanded = expand_inputs(&main.text, base, &by_path, &mut seen, 0);
    let text = latex_to_text(&expanded);
    Ok((!text.is_empty()).then_some(text))
}

/// Decompress and unpack a source archive.
///
/// Only regular files with safe relative paths are kept. A payload that is
/// not a tar is taken as a single `main.tex`.
///
/// # Errors
///
/// Returns [`FetchError::TooLarge`] if the decompressed data or the sum of
/// member sizes exceeds `max_bytes`, or [`FetchError::Archive`] if the data
/// cannot be decoded.
pub fn unpack(archive: &[u8], max_bytes: u64) -> Result<Vec<TexFile>, FetchError> {
    let data = if archive.starts_with(&[0x1f, 0x8b]) {
        let mut out = Vec::new();
        GzDecoder::new(archive)
            .take(max_bytes.saturating_add(1))
            .read_to_end(&mut out)
            .map_err(|e| FetchError::Archive(format!("gzip: {e}")))?;
        if out.len() as u64 > max_bytes {
            return Err(FetchError::TooLarge {
                limit_bytes: max_bytes,
            });
        }
        out
    } else {
        archive.to_vec()
    };

    if is_tar(&data) {
        return unpack_tar(&data, max_bytes);
    }
    if data.contains(&0) {
        return Err(FetchError::Archive("payload is neither tar nor text".into()));
    }
    Ok(vec![TexFile {
        path: PathBuf::from("main.tex"),
        text: String::from_utf8_lossy(&data).into_owned(),
    }])
}

fn is_tar(data: &[u8]) -> bool {
    data.get(257..262) == Some(b"ustar".as_slice())
}

fn unpack_tar(data: &[u8], max_bytes: u64) -> Result<Vec<TexFile>, FetchError> {
    let mut archive = tar::Archive::new(data);
    let entries = archive
        .entries()
        .map_err(|e| FetchError::Archive(format!("tar: {e}")))?;

    let mut total: u64 = 0;
    let mut files = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| FetchError::Archive(format!("tar: {e}")))?;
        total = total.saturating_add(entry.header().size().unwrap_or(0));
        if total > max_bytes {
            return Err(FetchError::TooLarge {
                limit_bytes: max_bytes,
            });
        }
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let Some(path) = entry.path().ok().and_then(|p| safe_relative(&p)) else {
            tracing::debug!("skipping unsafe archive member");
            continue;
        };
        let mut raw = Vec::new();
        if let Err(e) = entry.read_to_end(&mut raw) {
            tracing::debug!(path = %path.display(), %e, "skipping unreadable archive member");
            continue;
        }
        files.push(TexFile {
            path,
            text: String::from_utf8_lossy(&raw).into_owned(),
        });
    }
    Ok(files)
}

/// Lexically normalize a member path; `None` if it escapes the root.
fn safe_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Pick the `.tex` file most likely to be the main document.
#[must_use]
pub fn select_main(files: &[TexFile]) -> Option<&TexFile> {
    let mut best: Option<(&TexFile, usize)> = None;
    for file in files {
        if file.path.extension().and_then(|e| e.to_str()) != Some("tex") || file.text.is_empty() {
            continue;
        }
        let score = main_score(&file.text);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((file, score));
        }
    }
    best.map(|(file, _)| file)
}

fn main_score(text: &str) -> usize {
    let mut score = 0;
    if text.contains("\\begin{document}") {
        score += 1000;
    }
    if text.contains("\\documentclass") {
        score += 200;
    }
    if text.contains("\\end{document}") {
        score += 100;
    }
    score + (text.len() / 1000).min(200)
}

/// Remove `%` comments, keeping escaped `\%`.
#[must_use]
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| {
            let bytes = line.as_bytes();
            let cut = (0..bytes.len())
                .find(|&i| bytes[i] == b'%' && (i == 0 || bytes[i - 1] != b'\\'))
                .unwrap_or(bytes.len());
            &line[..cut]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inline `\input`, `\include` and `\subfile` references.
///
/// Each file is inlined at most once; unresolved references are dropped.
fn expand_inputs(
    text: &str,
    base: &Path,
    files: &HashMap<&Path, &str>,
    seen: &mut HashSet<PathBuf>,
    depth: usize,
) -> String {
    if depth > MAX_INPUT_DEPTH {
        return text.to_string();
    }
    let stripped = strip_comments(text);
    let mut out = String::with_capacity(stripped.len());
    let mut last = 0;
    for caps in INPUT.captures_iter(&stripped) {
        let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&stripped[last..whole.start()]);
        last = whole.end();

        let Some((path, content)) = resolve_input(reference.as_str(), base, files) else {
            continue;
        };
        if !seen.insert(path.clone()) {
            continue;
        }
        let child_base = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        out.push_str(&expand_inputs(content, &child_base, files, seen, depth + 1));
    }
    out.push_str(&stripped[last..]);
    out
}

fn resolve_input<'a>(
    reference: &str,
    base: &Path,
    files: &HashMap<&Path, &'a str>,
) -> Option<(PathBuf, &'a str)> {
    let reference = reference.trim().trim_matches(|c| c == '"' || c == '\'');
    if reference.is_empty() || reference.starts_with("http") {
        return None;
    }
    [
        base.join(reference),
        base.join(format!("{reference}.tex")),
    ]
    .into_iter()
    .filter_map(|candidate| safe_relative(&candidate))
    .find_map(|candidate| {
        files
            .get(candidate.as_path())
            .map(|content| (candidate, *content))
    })
}

/// Keep only what lies between `\begin{document}` and `\end{document}`.
#[must_use]
pub fn strip_preamble(text: &str) -> &str {
    const BEGIN: &str = "\\begin{document}";
    let text = text.find(BEGIN).map_or(text, |i| &text[i + BEGIN.len()..]);
    text.find("\\end{document}").map_or(text, |i| &text[..i])
}

/// Reduce LaTeX to readable prose.
#[must_use]
pub fn latex_to_text(source: &str) -> String {
    let mut text = strip_preamble(source).to_string();
    for pattern in DROPPED_ENV_PATTERNS.iter().chain(MATH.iter()) {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    text = REFERENCES.replace_all(&text, " ").into_owned();
    for _ in 0..3 {
        text = COMMAND_WITH_ARG.replace_all(&text, "${1}").into_owned();
    }
    text = BARE_COMMAND.replace_all(&text, " ").into_owned();
    text = text.replace(['~', '{', '}'], " ");
    for (escaped, plain) in [("\\%", "%"), ("\\&", "&"), ("\\_", "_"), ("\\#", "#")] {
        text = text.replace(escaped, plain);
    }
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string()
}
