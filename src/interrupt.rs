/// Non-maskable interrupt request line between the PPU and the CPU.
///
/// The bus owns the storage. The PPU only ever raises it (vblank edge or the
/// PPUCTRL enable race) and the CPU takes it between instructions, so neither
/// side needs a reference to the other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NmiSignal {
    requested: bool,
}

impl NmiSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&mut self) {
        self.requested = true;
    }

    /// Returns the pending request and clears it.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.requested)
    }

    pub fn is_raised(&self) -> bool {
        self.requested
    }
}
