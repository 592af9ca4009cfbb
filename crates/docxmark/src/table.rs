//! Table region rewriting (pre-process pass)
//!
//! Template authors delimit a repeatable table region by typing
//! `{{#docxTable ...}}` and `{{/docxTable}}` into table cells. A template engine
//! cannot iterate over a row when its helper call sits deep inside a run, so
//! this pass hoists each marker out to the row level:
//!
//! ```xml
//! <docxRemove>{{#docxTable items}}</docxRemove>
//! <w:tr>...</w:tr>
//! <docxRemove>{{/docxTable}}</docxRemove>
//! ```
//!
//! The marker text is removed from the cell, and a `docxRemove` element holding
//! it is inserted before (open) or after (close) the enclosing `w:tr`. The
//! template engine later consumes and deletes those elements.
//!
//! Each part is scanned once, in document order, with a two-state machine.
//! Nested table regions are not supported: an opening marker seen while a
//! region is already open is relocated like any other and logged.

use crate::error::{DocxError, Result};
use crate::markers::{find_table_open, has_table_close, text_nodes, TABLE_CLOSE};
use crate::package::Package;
use crate::xml::{NodeId, XmlTree};

/// Element wrapping a relocated marker
pub const MARKER_ELEMENT: &str = "docxRemove";

/// Structural block the markers are hoisted next to
pub const STRUCTURAL_BLOCK: &str = "w:tr";

/// Scanner state while walking a part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No table region is open
    Closed,
    /// An opening marker was seen, its close has not been
    Open,
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Before,
    After,
}

/// Single-pass rewriter for one XML part
pub struct TableRegionRewriter<'a> {
    tree: &'a mut XmlTree,
    state: ScanState,
}

impl<'a> TableRegionRewriter<'a> {
    /// Create a rewriter with fresh state
    pub fn new(tree: &'a mut XmlTree) -> Self {
        Self {
            tree,
            state: ScanState::Closed,
        }
    }

    /// Current scanner state
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Walk every text node once and relocate the markers found
    pub fn rewrite(&mut self) -> Result<ScanState> {
        for node in text_nodes(self.tree) {
            self.visit(node)?;
        }
        Ok(self.state)
    }

    fn visit(&mut self, node: NodeId) -> Result<()> {
        if self.state == ScanState::Open && has_table_close(&self.tree.text_content(node)) {
            self.state = ScanState::Closed;
            self.close_region(node)?;
        }

        let text = self.tree.text_content(node);
        let Some(range) = find_table_open(&text)? else {
            return Ok(());
        };

        if self.state == ScanState::Open {
            log::warn!("Nested {{{{#docxTable}}}} markers are not supported; treating as a new region");
        }

        let helper_call = text[range.clone()].to_string();
        let mut remaining = text;
        remaining.replace_range(range, "");
        self.tree.set_text_content(node, remaining.as_str());
        self.relocate(node, &helper_call, Placement::Before)?;

        if has_table_close(&remaining) {
            self.close_region(node)?;
            self.state = ScanState::Closed;
        } else {
            self.state = ScanState::Open;
        }
        Ok(())
    }

    fn close_region(&mut self, node: NodeId) -> Result<()> {
        let text = self.tree.text_content(node).replacen(TABLE_CLOSE, "", 1);
        self.tree.set_text_content(node, text);
        self.relocate(node, TABLE_CLOSE, Placement::After)
    }

    fn relocate(&mut self, node: NodeId, marker: &str, placement: Placement) -> Result<()> {
        let block = self
            .tree
            .ancestor_by_name(node, STRUCTURAL_BLOCK)
            .ok_or_else(|| {
                DocxError::InvalidStructure(format!(
                    "table marker {:?} is not inside a table row",
                    marker
                ))
            })?;

        let element = self.tree.create_element(MARKER_ELEMENT);
        self.tree.set_text_content(element, marker);
        match placement {
            Placement::Before => self.tree.insert_before(block, element),
            Placement::After => self.tree.insert_after(block, element),
        }
    }
}

/// Rewrite the table markers of a single tree
pub fn rewrite_table_markers(tree: &mut XmlTree) -> Result<ScanState> {
    TableRegionRewriter::new(tree).rewrite()
}

/// Pre-process every XML part of the package
///
/// Each part gets its own scanner state.
pub fn preprocess(package: &mut Package) -> Result<()> {
    for part in package.parts_mut().filter(|p| p.path().ends_with(".xml")) {
        log::debug!("Rewriting table markers in {}", part.path());
        let tree = part.xml_mut()?;
        rewrite_table_markers(tree)?;
    }
    Ok(())
}
