//! DIVOC certificates: a ZIP archive holding `certificate.json`.

/// ZIP local file header signature.
pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub const CERTIFICATE_ENTRY: &str = "certificate.json";

#[cfg(feature = "divoc")]
pub use self::archive::extract_certificate;

#[cfg(feature = "divoc")]
mod archive {
    use std::io::{Cursor, Read};

    use super::CERTIFICATE_ENTRY;
    use crate::error::{DecodeStage, Error};
    use crate::inflate::MAX_INFLATED_LEN;

    /// Return the bytes of the `certificate.json` entry.
    pub fn extract_certificate(zip: &[u8]) -> Result<Vec<u8>, Error> {
        let mut archive = zip::ZipArchive::new(Cursor::new(zip))?;
        let entry = archive.by_name(CERTIFICATE_ENTRY)?;
        if entry.size() > MAX_INFLATED_LEN {
            return Err(Error::decode(
                DecodeStage::Zip,
                format!("{} is {} bytes", CERTIFICATE_ENTRY, entry.size()),
            ));
        }
        let mut out = Vec::with_capacity(entry.size() as usize);
        entry
            .take(MAX_INFLATED_LEN)
            .read_to_end(&mut out)
            .map_err(|e| Error::decode(DecodeStage::Zip, e))?;
        Ok(out)
    }

    #[cfg(test)]
    pub(crate) fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        use std::io::Write;
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

}

#[cfg(all(test, feature = "divoc"))]
pub(crate) use self::archive::zip_archive;
