use std::collections::BTreeSet;

use egui::Color32;

use crate::error::CoreError;

/// The default plot color cycle (matplotlib's ten-color tab palette, which
/// the instrument software also uses).
const DEFAULT_PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

/// A checked-out index into the palette.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct PaletteSlot(pub(crate) usize);

/// Hands out palette colors to visible curves and takes them back when
/// curves disappear. Allocation is deterministic: always the lowest free
/// index, so colors are reproducible regardless of selection order.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<Color32>,
    in_use: BTreeSet<usize>,
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

impl ColorAllocator {
    pub fn new(palette: Vec<Color32>) -> Self {
        assert!(!palette.is_empty(), "palette must hold at least one color");
        Self {
            palette,
            in_use: BTreeSet::new(),
        }
    }

    /// Check out the lowest free palette slot. When every slot is taken
    /// the allocator refuses rather than reusing a color; callers check
    /// [`ColorAllocator::free_slots`] before starting a batch.
    pub fn allocate(&mut self) -> Result<PaletteSlot, CoreError> {
        let slot = (0..self.palette.len()).find(|i| !self.in_use.contains(i));
        match slot {
            Some(index) => {
                self.in_use.insert(index);
                Ok(PaletteSlot(index))
            }
            None => Err(CoreError::ResourceExhausted(format!(
                "all {} palette colors are in use",
                self.palette.len()
            ))),
        }
    }

    /// Return a slot. Releasing a slot that is not checked out is a no-op
    /// so overlapping UI events cannot corrupt the bookkeeping.
    pub fn release(&mut self, slot: PaletteSlot) {
        self.in_use.remove(&slot.0);
    }

    pub fn color(&self, slot: PaletteSlot) -> Color32 {
        self.palette[slot.0]
    }

    pub fn free_slots(&self) -> usize {
        self.palette.len() - self.in_use.len()
    }

    pub fn slots_in_use(&self) -> usize {
        self.in_use.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_lowest_free_index() {
        let mut colors = ColorAllocator::default();
        let first = colors.allocate().unwrap();
        let second = colors.allocate().unwrap();
        assert_eq!(first, PaletteSlot(0));
        assert_eq!(second, PaletteSlot(1));

        colors.release(first);
        // slot 0 is free again and must be preferred over slot 2
        assert_eq!(colors.allocate().unwrap(), PaletteSlot(0));
    }

    #[test]
    fn test_no_collisions_under_interleaved_use() {
        let mut colors = ColorAllocator::default();
        let mut held = Vec::new();
        for _ in 0..5 {
            held.push(colors.allocate().unwrap());
        }
        colors.release(held.remove(2));
        colors.release(held.remove(0));
        held.push(colors.allocate().unwrap());
        held.push(colors.allocate().unwrap());
        held.push(colors.allocate().unwrap());

        let mut seen = std::collections::HashSet::new();
        for slot in &held {
            assert!(seen.insert(*slot), "slot {:?} allocated twice", slot);
        }
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut colors = ColorAllocator::new(vec![Color32::RED, Color32::BLUE]);
        colors.allocate().unwrap();
        colors.allocate().unwrap();
        assert!(matches!(
            colors.allocate(),
            Err(CoreError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut colors = ColorAllocator::default();
        let slot = colors.allocate().unwrap();
        colors.release(slot);
        colors.release(slot);
        assert_eq!(colors.slots_in_use(), 0);
        assert_eq!(colors.allocate().unwrap(), slot);
    }
}
