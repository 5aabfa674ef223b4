//! XML results document for external duplicate managers.
//!
//! The document follows the results layout read by dupeGuru:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <results>
//!   <group>
//!     <file path="/a/x.jpg" is_ref="n" marked="n"/>
//!     <file path="/b/x.jpg" is_ref="n" marked="n"/>
//!     <match first="0" second="1" percentage="100"/>
//!   </group>
//! </results>
//! ```
//!
//! Every unordered pair of members gets a `match` element at 100%. Image
//! clusters are graded by distance rather than being all-pairs matches, so
//! they cannot be written in this format and are rejected.

use std::io;

use super::{OutputError, OutputFormat};
use crate::duplicates::DuplicateGroup;

/// XML output formatter.
pub struct XmlOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> XmlOutput<'a> {
    /// Create a new XML output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the document to the given writer.
    ///
    /// Nothing is written if any group is an image cluster.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::UnsupportedFormat`] for image clusters and
    /// [`OutputError::Io`] if writing fails.
    pub fn write_to<W: io::Write>(&self, mut writer: W) -> Result<(), OutputError> {
        if self.groups.iter().any(|g| g.key.is_similar()) {
            return Err(OutputError::UnsupportedFormat {
                format: OutputFormat::Xml,
                what: "distance-graded image clusters",
            });
        }

        writeln!(writer, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
        writeln!(writer, "<results>")?;
        for group in self.groups {
            writeln!(writer, "  <group>")?;
            for file in &group.files {
                writeln!(
                    writer,
                    r#"    <file path="{}" is_ref="n" marked="n"/>"#,
                    escape_xml(&file.path.to_string_lossy())
                )?;
            }
            for first in 0..group.files.len() {
                for second in first + 1..group.files.len() {
                    writeln!(
                        writer,
                        r#"    <match first="{}" second="{}" percentage="100"/>"#,
                        first, second
                    )?;
                }
            }
            writeln!(writer, "  </group>")?;
        }
        writeln!(writer, "</results>")?;
        writer.flush()?;
        Ok(())
    }

    /// Generate the document as a string.
    ///
    /// # Errors
    ///
    /// Same as [`XmlOutput::write_to`].
    pub fn to_string(&self) -> Result<String, OutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Escape text for use inside a double-quoted attribute.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
