//! Part layout of a multipart upload.
//! <https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html>

use crate::{
    s3::limits::{
        DEFAULT_PART_SIZE_BYTES, MAX_OBJECT_SIZE_BYTES, MAX_PART_SIZE_BYTES, MAX_PARTS_PER_UPLOAD,
        MIN_PART_SIZE_BYTES,
    },
    stream::{error::PlanError, part::PartTask},
};

/// Immutable part layout, computed once per upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPlan {
    total_size: Option<u64>,
    part_size: u64,
    part_count: u16,
    last_part_size: u64,
}

impl UploadPlan {
    /// Declared object size, `None` when the stream length is unknown.
    #[must_use]
    pub const fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    #[must_use]
    pub const fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Number of parts, for unknown sizes the maximum the stream may use.
    #[must_use]
    pub const fn part_count(&self) -> u16 {
        self.part_count
    }

    #[must_use]
    pub const fn last_part_size(&self) -> u64 {
        self.last_part_size
    }

    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.total_size.is_some()
    }

    /// Byte range `(offset, length)` of a part, the last part is read from
    /// `total_size - last_part_size`.
    #[must_use]
    pub fn part_range(&self, number: u16) -> (u64, u64) {
        match self.total_size {
            Some(total) if number == self.part_count => {
                (total - self.last_part_size, self.last_part_size)
            }
            _ => (u64::from(number.saturating_sub(1)) * self.part_size, self.part_size),
        }
    }

    #[cfg(test)]
    pub(crate) const fn unbounded(part_size: u64, part_count: u16) -> Self {
        Self {
            total_size: None,
            part_size,
            part_count,
            last_part_size: part_size,
        }
    }

    /// Every part of the plan in submission order.
    pub fn tasks(&self) -> impl Iterator<Item = PartTask> + use<> {
        (1..=self.part_count).map(PartTask::new)
    }
}

/// Compute the part layout for an object.
///
/// `total_size` is `None` for streams of unknown length, they are planned
/// against the maximum object size. `size_hint` forces the part size.
///
/// # Errors
///
/// Will return `Err` if the object is too large or the requested part size is
/// out of bounds
pub fn plan(total_size: Option<u64>, size_hint: Option<u64>) -> Result<UploadPlan, PlanError> {
    if let Some(size) = total_size.filter(|size| *size > MAX_OBJECT_SIZE_BYTES) {
        return Err(PlanError::ObjectTooLarge {
            size,
            max: MAX_OBJECT_SIZE_BYTES,
        });
    }

    let size = total_size.unwrap_or(MAX_OBJECT_SIZE_BYTES);

    let part_size = match size_hint.filter(|hint| *hint > 0) {
        Some(hint) => {
            if hint < MIN_PART_SIZE_BYTES {
                return Err(PlanError::PartSizeTooSmall {
                    size: hint,
                    min: MIN_PART_SIZE_BYTES,
                });
            }

            if hint > MAX_PART_SIZE_BYTES {
                return Err(PlanError::PartSizeTooLarge {
                    size: hint,
                    max: MAX_PART_SIZE_BYTES,
                });
            }

            // streams of unknown length end whenever they end, the part
            // count ceiling is enforced while reading
            if total_size.is_some() && hint.saturating_mul(MAX_PARTS_PER_UPLOAD as u64) < size {
                return Err(PlanError::PartSizeTooSmallForObject {
                    part_size: hint,
                    max_parts: MAX_PARTS_PER_UPLOAD,
                    size,
                });
            }

            hint
        }

        None => default_part_size(size),
    };

    let part_count = size.div_ceil(part_size).clamp(1, MAX_PARTS_PER_UPLOAD as u64);
    let part_count = u16::try_from(part_count).unwrap_or(u16::MAX);

    let last_part_size = if total_size.is_some() {
        size - u64::from(part_count - 1) * part_size
    } else {
        part_size
    };

    let plan = UploadPlan {
        total_size,
        part_size,
        part_count,
        last_part_size,
    };

    log::debug!("upload plan: {plan:?}");

    Ok(plan)
}

/// Same as [`plan`] with the signed conventions: `-1` is an unknown size and a
/// hint `<= 0` selects the default part size.
///
/// # Errors
///
/// Will return `Err` if the size is negative (other than `-1`) or [`plan`] fails
pub fn plan_signed(total_size: i64, size_hint: i64) -> Result<UploadPlan, PlanError> {
    let total = match total_size {
        -1 => None,
        size => Some(u64::try_from(size).map_err(|_| PlanError::NegativeSize(size))?),
    };

    plan(total, u64::try_from(size_hint).ok())
}

// smallest multiple of the default part size that fits the object in
// MAX_PARTS_PER_UPLOAD parts
fn default_part_size(size: u64) -> u64 {
    let per_part = size.div_ceil(MAX_PARTS_PER_UPLOAD as u64);

    (per_part.div_ceil(DEFAULT_PART_SIZE_BYTES) * DEFAULT_PART_SIZE_BYTES)
        .max(DEFAULT_PART_SIZE_BYTES)
}
