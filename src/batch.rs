//! Records, batches, and the size-bounded partitioner.
//!
//! Records are serialized as fields joined by `|`; a batch joins its records
//! with `;`. The [`Partitioner`] walks records lazily and closes the current
//! batch whenever the next record would push it past either limit:
//!
//! ```text
//! records:  r1 r2 r3 r4 r5 r6 r7        max_records = 3
//!           └──────┘ └──────┘ └┘
//! batches:  [r1;r2;r3] [r4;r5;r6] [r7]
//! ```
//!
//! # Example
//!
//! ```
//! use batchwire_client::batch::{partition, BatchLimits, Record};
//!
//! let records = (0..10).map(|i| Record::new(vec![i.to_string()]).unwrap());
//! let limits = BatchLimits::new(3, 1000).unwrap();
//!
//! let sizes: Vec<u32> = partition(records, limits).map(|b| b.record_count()).collect();
//! assert_eq!(sizes, vec![3, 3, 3, 1]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BatchwireError, Result};
use crate::protocol::{FIELD_DELIMITER, RECORD_DELIMITER};

/// One input row: an ordered tuple of delimiter-free string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Create a record, rejecting fields that would break the framing.
    pub fn new(fields: Vec<String>) -> Result<Self> {
        if fields.is_empty() {
            return Err(BatchwireError::InvalidRecord(
                "record has no fields".to_string(),
            ));
        }
        // A lone empty field would serialize to a zero-length payload.
        if fields.len() == 1 && fields[0].is_empty() {
            return Err(BatchwireError::InvalidRecord("record is empty".to_string()));
        }

        for field in &fields {
            if let Some(c) = field
                .chars()
                .find(|c| matches!(c, '|' | ';' | '\n' | '\r'))
            {
                return Err(BatchwireError::InvalidRecord(format!(
                    "field {:?} contains reserved character {:?}",
                    field, c
                )));
            }
        }

        Ok(Self { fields })
    }

    /// The record's fields in order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Serialized length without any trailing delimiter.
    pub fn serialized_len(&self) -> usize {
        let separators = self.fields.len() - 1;
        self.fields.iter().map(String::len).sum::<usize>() + separators
    }

    fn write_to(&self, buf: &mut BytesMut) {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                buf.put_u8(FIELD_DELIMITER);
            }
            buf.put_slice(field.as_bytes());
        }
    }
}

/// Upper bounds applied to every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    max_records: u32,
    max_bytes: usize,
}

impl BatchLimits {
    /// Create limits; both must be non-zero and fit the 32-bit header fields.
    pub fn new(max_records: usize, max_bytes: usize) -> Result<Self> {
        if max_records == 0 || max_bytes == 0 {
            return Err(BatchwireError::Config(format!(
                "Batch limits must be positive (records {}, bytes {})",
                max_records, max_bytes
            )));
        }
        let max_records = u32::try_from(max_records).map_err(|_| {
            BatchwireError::Config(format!(
                "Batch record limit {} exceeds {}",
                max_records,
                u32::MAX
            ))
        })?;
        if u32::try_from(max_bytes).is_err() {
            return Err(BatchwireError::Config(format!(
                "Batch byte limit {} exceeds {}",
                max_bytes,
                u32::MAX
            )));
        }
        Ok(Self {
            max_records,
            max_bytes,
        })
    }

    /// Maximum records per batch.
    pub fn max_records(&self) -> usize {
        self.max_records as usize
    }

    /// Maximum serialized bytes per batch (advisory for a single oversized record).
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

/// A serialized, non-empty group of records sent as one payload frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    payload: Bytes,
    record_count: u32,
}

impl Batch {
    /// Wrap an already-serialized payload.
    ///
    /// Only the frame codec (decoding a batch frame) and tests build batches
    /// this way; the partitioner builds them itself.
    pub fn from_wire(payload: Bytes, record_count: u32) -> Self {
        Self {
            payload,
            record_count,
        }
    }

    /// Serialized batch: records joined by `;`, no trailing delimiter.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Serialized length in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.payload.len()
    }

    /// Number of records in the batch.
    #[inline]
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Decode the payload back into records.
    pub fn records(&self) -> Result<Vec<Record>> {
        let text = std::str::from_utf8(&self.payload)
            .map_err(|e| BatchwireError::Decode(format!("batch is not UTF-8: {}", e)))?;

        if text.is_empty() {
            return Ok(Vec::new());
        }

        text.split(RECORD_DELIMITER as char)
            .map(|row| {
                Record::new(
                    row.split(FIELD_DELIMITER as char)
                        .map(str::to_string)
                        .collect(),
                )
            })
            .collect()
    }
}

/// Accumulates records for the batch currently being built.
#[derive(Debug, Default)]
struct BatchBuilder {
    buf: BytesMut,
    count: u32,
    // Sum of record sizes, each counted with its trailing delimiter.
    accounted: usize,
}

impl BatchBuilder {
    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn would_overflow(&self, record_size: usize, limits: &BatchLimits) -> bool {
        self.count >= limits.max_records || self.accounted + record_size > limits.max_bytes
    }

    fn push(&mut self, record: &Record, record_size: usize) {
        if self.count > 0 {
            self.buf.put_u8(RECORD_DELIMITER);
        }
        record.write_to(&mut self.buf);
        self.count += 1;
        self.accounted += record_size;
    }

    fn finish(&mut self) -> Batch {
        let batch = Batch {
            payload: self.buf.split().freeze(),
            record_count: self.count,
        };
        self.count = 0;
        self.accounted = 0;
        batch
    }
}

/// Lazy iterator splitting records into bounded batches.
///
/// Only the batch under construction is buffered.
#[derive(Debug)]
pub struct Partitioner<I> {
    records: I,
    limits: BatchLimits,
    current: BatchBuilder,
}

impl<I> Partitioner<I>
where
    I: Iterator<Item = Record>,
{
    /// Create a partitioner over `records`.
    pub fn new<T>(records: T, limits: BatchLimits) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            records: records.into_iter(),
            limits,
            current: BatchBuilder::default(),
        }
    }
}

impl<I> Iterator for Partitioner<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        for record in self.records.by_ref() {
            let record_size = record.serialized_len() + 1;

            if !self.current.is_empty() && self.current.would_overflow(record_size, &self.limits)
            {
                let closed = self.current.finish();
                self.current.push(&record, record_size);
                return Some(closed);
            }

            self.current.push(&record, record_size);
        }

        if self.current.is_empty() {
            None
        } else {
            Some(self.current.finish())
        }
    }
}

/// Partition `records` into batches bounded by `limits`.
pub fn partition<T>(records: T, limits: BatchLimits) -> Partitioner<T::IntoIter>
where
    T: IntoIterator<Item = Record>,
{
    Partitioner::new(records, limits)
}
