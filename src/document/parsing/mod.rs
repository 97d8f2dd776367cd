//! Document parsing utilities
//!
//! This module contains specialized parsing functions for different
//! document elements: the XML tree, relationships, paragraphs, tables and
//! native equations.

pub mod equation;
pub(crate) mod paragraph;
pub(crate) mod relationships;
pub(crate) mod symbols;
pub(crate) mod table;
pub mod xml;

pub use equation::{omml_plain_text, omml_to_latex};
pub use paragraph::{ASSET_DIR_NAME, EMU_PER_PIXEL};
pub use xml::{XmlElement, XmlNode, parse_xml, write_xml};
