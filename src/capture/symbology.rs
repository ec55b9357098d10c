//! Machine-readable code formats.

use std::fmt;

/// A barcode symbology reported by the camera's metadata output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Code39,
    Code39Mod43,
    Code93,
    Code128,
    Ean8,
    Ean13,
    Itf14,
    UpcE,
    Interleaved2of5,
    Qr,
    Aztec,
    Pdf417,
    DataMatrix,
}

/// Symbologies the detection output is configured with.
///
/// Linear retail and logistics formats only. Fixed at session construction.
pub const DEFAULT_SYMBOLOGIES: &[Symbology] = &[
    Symbology::Code39,
    Symbology::Code39Mod43,
    Symbology::Code93,
    Symbology::Code128,
    Symbology::Ean8,
    Symbology::Ean13,
    Symbology::Itf14,
    Symbology::UpcE,
];

impl Symbology {
    /// Returns the canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Symbology::Code39 => "Code 39",
            Symbology::Code39Mod43 => "Code 39 Mod 43",
            Symbology::Code93 => "Code 93",
            Symbology::Code128 => "Code 128",
            Symbology::Ean8 => "EAN-8",
            Symbology::Ean13 => "EAN-13",
            Symbology::Itf14 => "ITF-14",
            Symbology::UpcE => "UPC-E",
            Symbology::Interleaved2of5 => "Interleaved 2 of 5",
            Symbology::Qr => "QR",
            Symbology::Aztec => "Aztec",
            Symbology::Pdf417 => "PDF417",
            Symbology::DataMatrix => "Data Matrix",
        }
    }

    /// True for one-dimensional linear codes.
    pub fn is_linear(self) -> bool {
        !matches!(
            self,
            Symbology::Qr | Symbology::Aztec | Symbology::Pdf417 | Symbology::DataMatrix
        )
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed set of symbologies a detection output recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbologySet {
    allowed: Vec<Symbology>,
}

impl SymbologySet {
    /// Creates a set from the given symbologies, ignoring duplicates.
    pub fn new(symbologies: &[Symbology]) -> Self {
        let mut allowed = Vec::with_capacity(symbologies.len());
        for &s in symbologies {
            if !allowed.contains(&s) {
                allowed.push(s);
            }
        }
        Self { allowed }
    }

    #[inline]
    pub fn contains(&self, symbology: Symbology) -> bool {
        self.allowed.contains(&symbology)
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbology> + '_ {
        self.allowed.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl Default for SymbologySet {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOLOGIES)
    }
}
