use crate::stream::{
    error::UploadError,
    part::{CompletedPart, PartResult},
};

/// Parts submitted to complete a multipart upload.
///
/// Strictly ascending part numbers starting at 1, no gaps, no duplicates.
/// The only way to build one is through validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedManifest {
    parts: Vec<CompletedPart>,
}

impl CompletedManifest {
    /// Validate parts already in ascending order.
    ///
    /// # Errors
    ///
    /// Will return `InvalidManifest` if the parts are empty, unordered,
    /// duplicated or have gaps
    pub fn from_parts(parts: Vec<CompletedPart>) -> Result<Self, UploadError> {
        if parts.is_empty() {
            return Err(UploadError::InvalidManifest("no parts".to_string()));
        }

        for (expected, part) in (1_u16..).zip(&parts) {
            if part.number != expected {
                return Err(UploadError::InvalidManifest(format!(
                    "expected part number {expected}, found {}",
                    part.number
                )));
            }
        }

        Ok(Self { parts })
    }

    #[must_use]
    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Order the collected part results and build the manifest.
///
/// Results may arrive in any order. `expected` is the number of parts the
/// upload must have, `None` when the stream length decided it.
///
/// # Errors
///
/// Will return `InvalidManifest` on duplicate part numbers and `MissingPart`
/// on gaps or parts missing at the end
pub fn assemble(
    mut results: Vec<PartResult>,
    expected: Option<u16>,
) -> Result<CompletedManifest, UploadError> {
    results.sort_by_key(PartResult::get_number);

    let mut parts = Vec::with_capacity(results.len());
    let mut next: u16 = 1;

    for result in results {
        let number = result.get_number();

        if number < next {
            return Err(UploadError::InvalidManifest(format!(
                "duplicate part number {number}"
            )));
        }

        if number > next {
            return Err(UploadError::MissingPart(next));
        }

        parts.push(result.into_completed());
        next = next.saturating_add(1);
    }

    let count = next - 1;

    if count == 0 {
        return Err(UploadError::MissingPart(1));
    }

    match expected {
        Some(expected) if count < expected => return Err(UploadError::MissingPart(next)),
        Some(expected) if count > expected => {
            return Err(UploadError::InvalidManifest(format!(
                "found {count} parts, expected {expected}"
            )));
        }
        _ => {}
    }

    log::debug!("manifest assembled with {count} parts");

    CompletedManifest::from_parts(parts)
}
