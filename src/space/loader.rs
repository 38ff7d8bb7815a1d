//! word2vec model loading.
//!
//! Model files are matched by a glob pattern; each file becomes one time
//! slice keyed by its file stem up to the first dot (`1950_1959.w2v` is the
//! slice `1950_1959`). Both the text and the binary word2vec formats are
//! understood.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::{MemorySpace, SliceKey, SpaceRegistry};
use crate::error::ModelError;

type LoadResult<T> = std::result::Result<T, ModelError>;

/// Load every model file matching `pattern` into a registry.
pub fn load_registry(pattern: &str, binary: bool) -> LoadResult<SpaceRegistry> {
    let expanded = shellexpand::tilde(pattern);
    let paths = glob::glob(expanded.as_ref())
        .map_err(|e| ModelError::Pattern(format!("{}: {}", pattern, e)))?;

    let mut files: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    files.sort();

    if files.is_empty() {
        return Err(ModelError::NoModels(pattern.to_string()));
    }

    let mut registry = SpaceRegistry::new();
    for path in files {
        let key = slice_key_for(&path)?;
        let space = load_space(&path, binary)?;
        info!(
            slice = %key,
            terms = space.terms().len(),
            path = %path.display(),
            "Loaded embedding space"
        );
        registry.insert(key, Arc::new(space))?;
    }

    Ok(registry)
}

/// Load a single model file.
pub fn load_space(path: &Path, binary: bool) -> LoadResult<MemorySpace> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let label = path.display().to_string();

    if binary {
        parse_binary(reader, &label)
    } else {
        parse_text(reader, &label)
    }
}

/// Slice key derived from a model file name.
pub fn slice_key_for(path: &Path) -> LoadResult<SliceKey> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();

    if stem.is_empty() {
        return Err(ModelError::Malformed {
            path: path.display().to_string(),
            reason: "cannot derive a time slice from the file name".to_string(),
        });
    }
    Ok(SliceKey::new(stem))
}

fn malformed(path: &str, reason: impl Into<String>) -> ModelError {
    ModelError::Malformed {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Largest vector width accepted from a header.
const MAX_DIMENSION: usize = 1 << 16;

/// Upper bound on entries reserved up front; headers are not trusted.
const MAX_PREALLOCATED: usize = 1 << 20;

fn parse_header(line: &str, path: &str) -> LoadResult<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let count = parts
        .next()
        .and_then(|p| p.parse::<usize>().ok())
        .ok_or_else(|| malformed(path, "missing vocabulary size in header"))?;
    let dimension = parts
        .next()
        .and_then(|p| p.parse::<usize>().ok())
        .ok_or_else(|| malformed(path, "missing dimension in header"))?;
    if dimension == 0 {
        return Err(malformed(path, "dimension must be > 0"));
    }
    if dimension > MAX_DIMENSION {
        return Err(malformed(
            path,
            format!("dimension {} exceeds {}", dimension, MAX_DIMENSION),
        ));
    }
    Ok((count, dimension))
}

/// Parse the text format: a `<count> <dim>` header, then `term v1 .. vd` lines.
pub fn parse_text<R: BufRead>(reader: R, path: &str) -> LoadResult<MemorySpace> {
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| malformed(path, "empty file"))?;
    let (count, dimension) = parse_header(&header, path)?;

    let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let term = parts.next().unwrap_or_default().to_string();
        let vector = parts
            .map(|p| p.parse::<f32>())
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| malformed(path, format!("line {}: {}", line_no + 2, e)))?;
        if vector.len() != dimension {
            return Err(malformed(
                path,
                format!(
                    "line {}: expected {} components, got {}",
                    line_no + 2,
                    dimension,
                    vector.len()
                ),
            ));
        }
        entries.push((term, vector));
    }

    if entries.len() != count {
        debug!(
            path,
            declared = count,
            found = entries.len(),
            "Vocabulary size differs from header"
        );
    }

    MemorySpace::from_entries(dimension, entries)
}

/// Parse the binary format: a text header line, then for every term the
/// UTF-8 term, a single space and `dim` little-endian `f32` values.
pub fn parse_binary<R: BufRead>(mut reader: R, path: &str) -> LoadResult<MemorySpace> {
    let mut header = String::new();
    reader.read_line(&mut header)?;
    let (count, dimension) = parse_header(&header, path)?;

    let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    let mut buffer = vec![0u8; dimension * std::mem::size_of::<f32>()];

    for i in 0..count {
        let mut word = Vec::new();
        reader.read_until(b' ', &mut word)?;
        if word.last() == Some(&b' ') {
            word.pop();
        } else {
            return Err(malformed(path, format!("truncated at entry {}", i)));
        }
        // Entries may be separated by newlines
        let term = String::from_utf8_lossy(&word).trim_start_matches('\n').to_string();

        reader
            .read_exact(&mut buffer)
            .map_err(|_| malformed(path, format!("truncated vector for '{}'", term)))?;
        let vector = buffer
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        entries.push((term, vector));
    }

    MemorySpace::from_entries(dimension, entries)
}
