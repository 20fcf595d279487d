use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PipelineError, Result};

/// Write `value` as gzip compressed CBOR.
/// Parent directories are created as needed.
pub fn write_compressed<T, P>(value: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_cbor::to_writer(&mut encoder, value).map_err(|e| PipelineError::Encode(e.to_string()))?;
    let mut inner = encoder.finish().map_err(|e| PipelineError::io(path, e))?;
    inner.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

/// Read a value written by [`write_compressed`]
pub fn read_compressed<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    serde_cbor::from_reader(decoder).map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Create a directory tree, mapping the error to the offending path
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
}
