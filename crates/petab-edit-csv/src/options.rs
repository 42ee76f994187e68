//! Read/write options

use petab_edit_core::TableKind;

/// Options for reading a table file
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Table kind; sniffed from the header when `None`
    pub kind: Option<TableKind>,
    /// Field delimiter; sniffed from the header when `None`
    pub delimiter: Option<u8>,
}

/// Options for writing a table file
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Field delimiter (default: tab, the PEtab convention)
    pub delimiter: u8,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { delimiter: b'\t' }
    }
}
