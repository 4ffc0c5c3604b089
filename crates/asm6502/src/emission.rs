//! Emission buffer for assembled bytes.
//!
//! Bytes are recorded as `(address, byte)` pairs in emission order. The
//! buffer may hold several non-contiguous regions but never two bytes at the
//! same address.

use std::collections::BTreeMap;

use thiserror::Error;

/// Emission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmissionError {
    /// A byte was already emitted at this address.
    #[error("address collision at ${address:04X}")]
    AddressCollision {
        /// First conflicting address.
        address: u16,
    },
    /// The write would run past `$FFFF`.
    #[error("write of {len} bytes at ${start:04X} runs past $FFFF")]
    OutOfRange {
        /// Start address of the write.
        start: u16,
        /// Number of bytes.
        len: usize,
    },
}

/// A contiguous run of emitted bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Address of the first byte.
    pub start: u16,
    /// Bytes in address order.
    pub bytes: Vec<u8>,
}

/// Append-only store of emitted bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmissionBuffer {
    bytes: Vec<(u16, u8)>,
    occupied: BTreeMap<u16, usize>,
}

impl EmissionBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            occupied: BTreeMap::new(),
        }
    }

    /// Emits `data` starting at `address`.
    ///
    /// The write is all-or-nothing: if any target address is already
    /// occupied, nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`EmissionError::AddressCollision`] for the first occupied
    /// address, or [`EmissionError::OutOfRange`] when the data does not fit
    /// below `$10000`.
    pub fn emit(&mut self, address: u16, data: &[u8]) -> Result<(), EmissionError> {
        let mut addresses = Vec::with_capacity(data.len());
        for offset in 0..data.len() {
            let target = u16::try_from(usize::from(address) + offset).map_err(|_| {
                EmissionError::OutOfRange {
                    start: address,
                    len: data.len(),
                }
            })?;
            if self.occupied.contains_key(&target) {
                return Err(EmissionError::AddressCollision { address: target });
            }
            addresses.push(target);
        }

        for (target, &byte) in addresses.into_iter().zip(data) {
            self.occupied.insert(target, self.bytes.len());
            self.bytes.push((target, byte));
        }
        Ok(())
    }

    /// Byte at `address`, if emitted.
    #[must_use]
    pub fn get(&self, address: u16) -> Option<u8> {
        self.occupied.get(&address).map(|&i| self.bytes[i].1)
    }

    /// Number of emitted bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true when nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `(address, byte)` pairs in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.bytes.iter().copied()
    }

    /// Lowest and highest emitted addresses.
    #[must_use]
    pub fn bounds(&self) -> Option<(u16, u16)> {
        let low = *self.occupied.keys().next()?;
        let high = *self.occupied.keys().next_back()?;
        Some((low, high))
    }

    /// Contiguous regions in ascending address order.
    #[must_use]
    pub fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = Vec::new();
        for (&address, &index) in &self.occupied {
            let byte = self.bytes[index].1;
            match regions.last_mut() {
                Some(region)
                    if usize::from(region.start) + region.bytes.len() == usize::from(address) =>
                {
                    region.bytes.push(byte);
                }
                _ => regions.push(Region {
                    start: address,
                    bytes: vec![byte],
                }),
            }
        }
        regions
    }

    /// Flat image from the lowest to the highest emitted address, gaps
    /// filled with `fill`. Returns the start address and the bytes, or
    /// `None` when the buffer is empty.
    #[must_use]
    pub fn to_image(&self, fill: u8) -> Option<(u16, Vec<u8>)> {
        let (low, high) = self.bounds()?;
        let mut image = vec![fill; usize::from(high - low) + 1];
        for (&address, &index) in &self.occupied {
            image[usize::from(address - low)] = self.bytes[index].1;
        }
        Some((low, image))
    }
}
