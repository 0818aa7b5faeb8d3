// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence of combinatorial test results.
//!
//! Each symbol is stored as one JSON file under `<root>/<storage-dir>/Combinatorial Testing/`,
//! named after the symbol.

use crate::{errors::StoreError, model::CompleteCt};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io::Write};
use tracing::debug;

/// The directory, relative to the storage directory, that holds the cache files.
pub const CT_DIR_NAME: &str = "Combinatorial Testing";

/// A directory of persisted [`CompleteCt`] files.
#[derive(Clone, Debug)]
pub struct CtStore {
    dir: Utf8PathBuf,
}

impl CtStore {
    /// Creates a store for a workspace root and a storage directory relative to it.
    pub fn new(root: &Utf8Path, storage_dir: &Utf8Path) -> Self {
        Self {
            dir: root.join(storage_dir).join(CT_DIR_NAME),
        }
    }

    /// Returns the directory containing the cache files.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the path of the cache file for a symbol.
    pub fn path_for(&self, symbol_name: &str) -> Utf8PathBuf {
        self.dir.join(format!("{symbol_name}.json"))
    }

    /// Writes one file per symbol, replacing any previous contents.
    pub fn save_all(&self, cts: &[CompleteCt]) -> Result<(), StoreError> {
        if cts.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|error| StoreError::CreateDir {
            path: self.dir.clone(),
            error,
        })?;

        for ct in cts {
            let json = serde_json::to_string(ct).map_err(|error| StoreError::Serialize {
                symbol: ct.symbol_name.clone(),
                error,
            })?;
            let path = self.path_for(&ct.symbol_name);
            atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
                .write(|file| file.write_all(json.as_bytes()))
                .map_err(|error| StoreError::Write {
                    path: path.clone(),
                    error,
                })?;
            debug!("saved tests for `{}` to {path}", ct.symbol_name);
        }
        Ok(())
    }

    /// Loads every cache file in the store, ordered by file name.
    ///
    /// A missing directory is not an error and yields no symbols.
    pub fn load(&self) -> Result<Vec<CompleteCt>, StoreError> {
        let entries = match self.dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("no test cache at {}", self.dir);
                return Ok(Vec::new());
            }
            Err(error) => {
                return Err(StoreError::ReadDir {
                    path: self.dir.clone(),
                    error,
                });
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| StoreError::ReadDir {
                path: self.dir.clone(),
                error,
            })?;
            let path = entry.path();
            if path.extension() == Some("json") && path.is_file() {
                paths.push(path.to_owned());
            }
        }
        paths.sort_unstable();

        paths
            .into_iter()
            .map(|path| {
                let contents = fs::read_to_string(&path).map_err(|error| StoreError::Read {
                    path: path.clone(),
                    error,
                })?;
                serde_json::from_str(&contents)
                    .map_err(|error| StoreError::Deserialize { path, error })
            })
            .collect()
    }
}
