//! # Output Store
//! src/storage/output_store.rs
//!
//! Persistencia de artifacts en un directorio. Cada entrada es un archivo
//! `<root>/<id>.json` que se escribe una sola vez y nunca se sobrescribe.
//!
//! ## Escritura atómica
//!
//! ```text
//! put(id, bytes)
//!   ├─ escribe en <root>/.tmp-XXXX.part   (tempfile en el mismo directorio)
//!   ├─ fsync
//!   └─ persist_noclobber → <root>/<id>.json
//!        ├─ ok       → entrada visible completa
//!        └─ existe   → AlreadyExists, el temporal se borra
//! ```
//!
//! Un lector nunca ve un artifact a medio escribir y un fallo no deja
//! basura con nombre de artifact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;

/// Extensión de las entradas del store
const ENTRY_EXTENSION: &str = "json";

/// Prefijo de los archivos temporales (no cuentan como entradas)
const TEMP_PREFIX: &str = ".tmp-";

/// Largo máximo de un id
pub const MAX_ID_LEN: usize = 128;

/// Errores del Output Store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid artifact id: {0:?}")]
    InvalidId(String),

    #[error("Artifact already exists: {0}")]
    AlreadyExists(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Output directory does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("Output path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Entrada recién escrita
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Store de artifacts respaldado por un directorio
///
/// No tiene estado en memoria: compartirlo entre threads con `Arc` es
/// suficiente, el filesystem resuelve la concurrencia.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    /// Abre el store sobre un directorio que ya debe existir
    ///
    /// Nunca crea el directorio: en el contenedor lo crea el build.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let metadata = match fs::metadata(&root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::MissingRoot(root));
            }
            Err(e) => return Err(StoreError::io(&root, e)),
        };

        if !metadata.is_dir() {
            return Err(StoreError::NotADirectory(root));
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Crea una entrada nueva
    ///
    /// Falla con `AlreadyExists` si el id ya está en el store; el contenido
    /// existente queda intacto.
    pub fn put(&self, id: &str, content: &[u8]) -> Result<StoredEntry, StoreError> {
        validate_id(id)?;
        let path = self.entry_path(id);

        if path.exists() {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let mut temp = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.root)
            .map_err(|e| StoreError::io(&self.root, e))?;

        temp.write_all(content)
            .and_then(|_| temp.flush())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StoreError::io(temp.path(), e))?;

        // persist_noclobber es atómico: si dos threads escriben el mismo id
        // exactamente uno gana. El perdedor recibe el temporal de vuelta en
        // el error y al soltarlo se borra.
        temp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists(id.to_string())
            } else {
                StoreError::io(&path, e.error)
            }
        })?;

        Ok(StoredEntry {
            id: id.to_string(),
            path,
            size: content.len() as u64,
        })
    }

    /// Lee el contenido de una entrada
    pub fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        validate_id(id)?;
        let path = self.entry_path(id);

        fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::io(&path, e)
            }
        })
    }

    pub fn contains(&self, id: &str) -> Result<bool, StoreError> {
        validate_id(id)?;
        Ok(self.entry_path(id).is_file())
    }

    /// Cantidad de entradas completas (ignora temporales)
    pub fn len(&self) -> Result<usize, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            let is_temp = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(true, |name| name.starts_with(TEMP_PREFIX));
            let is_entry = path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION);

            if is_entry && !is_temp && path.is_file() {
                count += 1;
            }
        }

        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, ENTRY_EXTENSION))
    }
}

/// Un id válido es `[A-Za-z0-9_-]{1,128}`
///
/// Así un id nunca puede escapar del directorio ni chocar con un temporal.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}
