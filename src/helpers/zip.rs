//! ZIP archive helper utilities for the Office Open XML (.xlsx) container
//! Provides convenient methods for accessing and writing files within ZIP archives

use crate::error::MdrError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, MdrError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, MdrError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Gets a file from the ZIP archive by name with case-insensitive matching
    /// and path separator normalization (backslash to forward slash)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, MdrError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, MdrError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }
}

/// Helper trait for writing whole parts into a ZIP archive
pub(crate) trait ZipWriterHelper {
    /// Writes `bytes` as a deflated entry named `name`
    fn write_part(&mut self, name: &str, bytes: &[u8]) -> Result<(), MdrError>;
}

impl<W: Write + Seek> ZipWriterHelper for ZipWriter<W> {
    fn write_part(&mut self, name: &str, bytes: &[u8]) -> Result<(), MdrError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.start_file(name, options)?;
        self.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn written_parts_are_found_case_insensitively() -> Result<(), MdrError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.write_part("xl/workbook.xml", b"<workbook/>")?;
        let bytes = zip.finish()?.into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut content = String::new();
        archive
            .file("XL\\Workbook.xml")?
            .expect("workbook part")
            .read_to_string(&mut content)?;
        assert_eq!(content, "<workbook/>");
        assert!(archive.file("xl/missing.xml")?.is_none());
        Ok(())
    }
}
