//! Zip container access by entry name.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DatSheetError, DatSheetResult};

/// Write-only package. Entries are added whole, in call order.
pub struct PackageWriter {
    path: PathBuf,
    zip: ZipWriter<BufWriter<File>>,
}

impl PackageWriter {
    /// Create (or truncate) the package file.
    pub fn create(path: &Path) -> DatSheetResult<Self> {
        let file = File::create(path).map_err(|e| DatSheetError::archive(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(BufWriter::new(file)),
        })
    }

    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> DatSheetResult<()> {
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(name, options)
            .map_err(|e| DatSheetError::archive(&self.path, e))?;
        self.zip.write_all(data)?;
        Ok(())
    }

    /// Write the central directory and flush to disk.
    pub fn finish(self) -> DatSheetResult<()> {
        let Self { path, mut zip } = self;
        let mut out = zip.finish().map_err(|e| DatSheetError::archive(&path, e))?;
        out.flush()?;
        Ok(())
    }
}

/// Read-only package.
pub struct PackageReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl PackageReader {
    pub fn open(path: &Path) -> DatSheetResult<Self> {
        let file = File::open(path).map_err(|e| DatSheetError::archive(path, e))?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| DatSheetError::archive(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_exists(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Raw bytes of an entry. A missing entry is [`DatSheetError::MissingEntry`].
    pub fn read_entry(&mut self, name: &str) -> DatSheetResult<Vec<u8>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(DatSheetError::MissingEntry(name.to_string()));
            }
            Err(e) => return Err(DatSheetError::archive(&self.path, e)),
        };
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Entry as UTF-8 text (a leading BOM is dropped).
    pub fn read_text(&mut self, name: &str) -> DatSheetResult<String> {
        let bytes = self.read_entry(name)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
        String::from_utf8(bytes.to_vec()).map_err(|e| DatSheetError::xml(name, e))
    }
}
