/// One of the five disjoint memory regions (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// Input Process Image — VM read-only, written by HAL at cycle start.
    Ipi,
    /// Output Process Image — VM read/write, flushed by HAL at cycle end.
    Opi,
    /// Stack plus scratch/temporaries, partitioned per task.
    Work,
    /// Survives power cycles; backed by the HAL's non-volatile store.
    Retain,
    /// Loaded bytecode — VM read-only, written only by the loader.
    Code,
}

impl Region {
    /// All five regions, in address order — also the order [`super::MemoryMap::resolve`]
    /// probes them in.
    pub const ALL: [Region; 5] = [
        Region::Ipi,
        Region::Opi,
        Region::Work,
        Region::Retain,
        Region::Code,
    ];

    /// `true` if the VM (and the loader's `DATA` segment) may write this
    /// region. IPI and CODE are the two read-only regions (§3's table).
    pub const fn is_writable(self) -> bool {
        !matches!(self, Region::Ipi | Region::Code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ipi_and_code_are_read_only() {
        for region in Region::ALL {
            let expect_writable = !matches!(region, Region::Ipi | Region::Code);
            assert_eq!(region.is_writable(), expect_writable, "{region}");
        }
    }
}
