use crate::s3::checksum::Checksum;

/// Unit of work queued to an uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartTask {
    part_number: u16,
}

impl PartTask {
    #[must_use]
    pub const fn new(part_number: u16) -> Self {
        Self { part_number }
    }

    #[must_use]
    pub const fn part_number(&self) -> u16 {
        self.part_number
    }
}

/// Outcome of one successful part write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartResult {
    number: u16,
    etag: String,
    size: u64,
    checksum: Option<Checksum>,
}

impl PartResult {
    #[must_use]
    pub const fn new(number: u16, etag: String, size: u64) -> Self {
        Self {
            number,
            etag,
            size,
            checksum: None,
        }
    }

    #[must_use]
    pub fn set_checksum(mut self, checksum: Option<Checksum>) -> Self {
        self.checksum = checksum;
        self
    }

    #[must_use]
    pub const fn get_number(&self) -> u16 {
        self.number
    }

    #[must_use]
    pub fn get_etag(&self) -> &str {
        &self.etag
    }

    #[must_use]
    pub const fn get_size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn get_checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    /// Drop the accounting data, keeping what the commit call needs.
    #[must_use]
    pub fn into_completed(self) -> CompletedPart {
        CompletedPart {
            number: self.number,
            etag: self.etag,
            checksum: self.checksum,
        }
    }
}

/// Manifest entry: part number, confirmation tag and optional checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub number: u16,
    pub etag: String,
    pub checksum: Option<Checksum>,
}

impl CompletedPart {
    #[must_use]
    pub fn new(number: u16, etag: &str) -> Self {
        Self {
            number,
            etag: etag.to_string(),
            checksum: None,
        }
    }
}
