use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use txe_store::TransactionStore;

use crate::error::BatchResult;

/// Root element of the aggregate document.
const BATCH_ROOT: &str = "Transactions";

/// Element wrapping each member document's content.
const MEMBER_ELEMENT: &str = "Transaction";

/// Why a single member was left out of the aggregate.
#[derive(Debug, thiserror::Error)]
enum MemberError {
    #[error("not present")]
    Missing,
    #[error("no root element")]
    NoRoot,
    #[error("root element carries no attributes")]
    NoAttributes,
    #[error("document truncated")]
    Truncated,
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("attribute: {0}")]
    Attr(#[from] AttrError),
}

/// Merges the state documents of many in-flight transactions into a single
/// well-formed XML document, so a deployer can poll one URL instead of N.
///
/// The member list is only a hint about what might exist: state documents
/// appear, change, and disappear underneath this reader, so every member
/// is read on a skip-on-failure basis. A member contributes either its
/// complete `<Transaction>` element or nothing at all; the wrapper is
/// well-formed regardless of how many members survive.
pub struct BatchAggregator {
    store: Arc<TransactionStore>,
}

impl BatchAggregator {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self { store }
    }

    /// Build the aggregate document for a semicolon-separated list of
    /// state document names. Empty list segments are dropped; order and
    /// duplicates are preserved.
    pub fn aggregate(&self, batch_files: &str) -> BatchResult<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new(BATCH_ROOT)))?;

        let mut merged = 0usize;
        for name in batch_files.split(';').filter(|n| !n.is_empty()) {
            let Some(path) = self.store.resolve_plain(name) else {
                warn!(name, "member name has no usable filename component; skipped");
                continue;
            };
            // Each member renders into its own buffer and is appended only
            // on full success, so a document that fails mid-parse leaves
            // no partial element in the output.
            match render_member(&path) {
                Ok(member) => {
                    writer.get_mut().extend_from_slice(&member);
                    merged += 1;
                }
                Err(MemberError::Missing) => {
                    debug!(name, "member not present; skipped");
                }
                Err(e) => {
                    warn!(name, error = %e, "member skipped");
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new(BATCH_ROOT)))?;
        debug!(merged, "aggregate document built");
        Ok(writer.into_inner())
    }
}

/// Read one member document and render its `<Transaction>` element: the
/// member root's attributes, then its element children with their whole
/// subtrees.
fn render_member(path: &Path) -> Result<Vec<u8>, MemberError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(MemberError::Missing),
        Err(e) => return Err(e.into()),
    };
    let mut reader = Reader::from_reader(BufReader::new(file));

    // Skip the prolog (declaration, doctype, comments, whitespace) up to
    // the root element.
    let mut buf = Vec::new();
    let (root, self_closing) = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => break (e.into_owned(), false),
            Event::Empty(e) => break (e.into_owned(), true),
            Event::Eof => return Err(MemberError::NoRoot),
            _ => {}
        }
        buf.clear();
    };

    // State documents carry their status as root attributes; a root
    // without any is not a state document.
    let mut attributes = Vec::new();
    for attr in root.attributes() {
        attributes.push(attr?);
    }
    if attributes.is_empty() {
        return Err(MemberError::NoAttributes);
    }

    let mut out = Writer::new(Vec::new());
    let mut element = BytesStart::new(MEMBER_ELEMENT);
    for attr in attributes {
        element.push_attribute(attr);
    }
    out.write_event(Event::Start(element))?;
    if !self_closing {
        copy_children(&mut reader, &mut out)?;
    }
    out.write_event(Event::End(BytesEnd::new(MEMBER_ELEMENT)))?;

    Ok(out.into_inner())
}

/// Copy the element children of the just-opened root into `out`. Text,
/// CDATA, and comments sitting directly under the root are dropped;
/// everything nested inside a child element is copied verbatim.
fn copy_children<R: BufRead>(
    reader: &mut Reader<R>,
    out: &mut Writer<Vec<u8>>,
) -> Result<(), MemberError> {
    let mut buf = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                out.write_event(Event::Start(e))?;
                depth += 1;
            }
            Event::Empty(e) => out.write_event(Event::Empty(e))?,
            Event::End(e) => {
                if depth == 0 {
                    // The member root just closed.
                    return Ok(());
                }
                out.write_event(Event::End(e))?;
                depth -= 1;
            }
            Event::Eof => return Err(MemberError::Truncated),
            ev if depth > 0 => out.write_event(ev)?,
            _ => {}
        }
        buf.clear();
    }
}
